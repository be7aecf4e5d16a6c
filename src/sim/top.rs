use std::io::BufRead;

use anyhow::Result;
use serde::Serialize;

use crate::mem::cache::CacheLevel;
use crate::mem::hierarchy::Hierarchy;
use crate::mem::stats::LevelStats;
use crate::sim::config::LevelConfig;
use crate::sim::trace::{self, TraceRecord};

/// Per-level counters plus identity, as reported at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct LevelSummary {
    pub name: String,
    pub stats: LevelStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub records: u64,
    pub levels: Vec<LevelSummary>,
}

/// Owns the hierarchy and replays a trace into its CPU-facing end.
pub struct Sim {
    hierarchy: Hierarchy,
    records: u64,
}

impl Sim {
    pub fn new(configs: &[LevelConfig]) -> Self {
        let caches = configs
            .iter()
            .map(|config| CacheLevel::new(&config.name, config.geometry, config.eviction))
            .collect();
        Self {
            hierarchy: Hierarchy::new(caches),
            records: 0,
        }
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn feed(&mut self, record: TraceRecord) {
        self.hierarchy.access(record.op, record.addr);
        self.records += 1;
    }

    /// Replay every record from `reader`; the first malformed line aborts.
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for record in trace::records(reader) {
            self.feed(record?);
        }
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            records: self.records,
            levels: self
                .hierarchy
                .levels()
                .iter()
                .map(|level| LevelSummary {
                    name: level.name().to_string(),
                    stats: *level.stats(),
                })
                .collect(),
        }
    }

    pub fn print_hierarchy(&self) {
        println!("Memory Hierarchy:");
        println!("\t{}", self.hierarchy.name_chain());
    }

    pub fn print_statistics(&self) {
        for level in self.hierarchy.levels() {
            let stats = level.stats();
            println!("{} Statistics", level.name());
            println!(
                "\t{} hits ({} read, {} write)",
                stats.hits(),
                stats.read_hits(),
                stats.write_hits()
            );
            println!(
                "\t{} misses ({} read, {} write)",
                stats.misses(),
                stats.read_misses(),
                stats.write_misses()
            );
            println!("\t{} evictions", stats.evictions());
            println!("\t{} writebacks", stats.writebacks());
        }
    }
}
