use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::mem::hierarchy::Op;
use crate::sim::trace::TraceRecord;
use crate::traffic::config::{TrafficConfig, TrafficPatternSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternOp {
    Read,
    Write,
    Mixed,
}

#[derive(Debug, Clone)]
enum PatternKind {
    Strided {
        stride: u64,
    },
    Tiled {
        tile_m: u64,
        tile_n: u64,
        transpose: bool,
    },
    Random {
        seed: u64,
    },
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub name: String,
    op: PatternOp,
    req_bytes: u64,
    within_bytes: u64,
    write_every: u32,
    kind: PatternKind,
}

impl CompiledPattern {
    fn compile(spec: &TrafficPatternSpec, region_bytes: u32) -> Result<Self> {
        let kind = match spec.kind.as_str() {
            "strided" => PatternKind::Strided {
                stride: u64::from(spec.stride.max(1)),
            },
            "tiled" => PatternKind::Tiled {
                tile_m: u64::from(spec.tile_m.max(1)),
                tile_n: u64::from(spec.tile_n.max(1)),
                transpose: spec.transpose,
            },
            "random" => PatternKind::Random { seed: spec.seed },
            other => bail!(
                "unsupported traffic pattern kind '{}', expected one of: strided, tiled, random",
                other
            ),
        };
        let op = match spec.op.as_str() {
            "read" => PatternOp::Read,
            "write" => PatternOp::Write,
            "mixed" => PatternOp::Mixed,
            other => bail!(
                "unsupported traffic op '{}', expected one of: read, write, mixed",
                other
            ),
        };
        let req_bytes = u64::from(spec.req_bytes.max(1));
        let within_bytes = u64::from(spec.within_bytes.unwrap_or(region_bytes).min(region_bytes))
            .max(req_bytes);
        Ok(Self {
            name: spec.name.clone(),
            op,
            req_bytes,
            within_bytes,
            write_every: spec.write_every.max(1),
            kind,
        })
    }

    fn rng(&self) -> Option<StdRng> {
        match self.kind {
            PatternKind::Random { seed } => Some(StdRng::seed_from_u64(seed)),
            _ => None,
        }
    }

    fn offset_bytes(&self, req_idx: u32, rng: Option<&mut StdRng>) -> u64 {
        match self.kind {
            PatternKind::Strided { stride } => u64::from(req_idx) * stride * self.req_bytes,
            PatternKind::Tiled {
                tile_m,
                tile_n,
                transpose,
            } => {
                let tile_elems = tile_m.saturating_mul(tile_n).max(1);
                let elem_idx = u64::from(req_idx);
                let tile_idx = elem_idx / tile_elems;
                let idx_in_tile = elem_idx % tile_elems;
                let mut row = idx_in_tile / tile_n;
                let mut col = idx_in_tile % tile_n;
                if transpose {
                    std::mem::swap(&mut row, &mut col);
                }
                (tile_idx * tile_elems + row * tile_n + col) * self.req_bytes
            }
            PatternKind::Random { .. } => {
                let slots = (self.within_bytes / self.req_bytes).max(1);
                let rng = rng.expect("random pattern without an rng");
                rng.gen_range(0..slots) * self.req_bytes
            }
        }
    }

    fn op_for(&self, req_idx: u32) -> Op {
        match self.op {
            PatternOp::Read => Op::Read,
            PatternOp::Write => Op::Write,
            PatternOp::Mixed => {
                if req_idx % self.write_every == 0 {
                    Op::Write
                } else {
                    Op::Read
                }
            }
        }
    }
}

/// Patterns compiled against one address window, generating a reproducible
/// access stream in spec order.
#[derive(Debug, Clone)]
pub struct PatternEngine {
    patterns: Vec<CompiledPattern>,
    reqs_per_pattern: u32,
    base_addr: u32,
}

impl PatternEngine {
    pub fn compile(config: &TrafficConfig) -> Result<Self> {
        if config.patterns.is_empty() {
            bail!("traffic config has no patterns");
        }
        let patterns = config
            .patterns
            .iter()
            .map(|spec| CompiledPattern::compile(spec, config.region_bytes))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            reqs_per_pattern: config.reqs_per_pattern,
            base_addr: config.base_addr,
        })
    }

    pub fn generate(&self) -> Vec<TraceRecord> {
        let mut records =
            Vec::with_capacity(self.patterns.len() * self.reqs_per_pattern as usize);
        for pattern in &self.patterns {
            let mut rng = pattern.rng();
            for req_idx in 0..self.reqs_per_pattern {
                let offset = pattern.offset_bytes(req_idx, rng.as_mut()) % pattern.within_bytes;
                records.push(TraceRecord {
                    op: pattern.op_for(req_idx),
                    addr: self.base_addr.wrapping_add(offset as u32),
                });
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::PatternEngine;
    use crate::mem::hierarchy::Op;
    use crate::traffic::config::{TrafficConfig, TrafficPatternSpec};

    fn config(kind: &str, op: &str) -> TrafficConfig {
        TrafficConfig {
            reqs_per_pattern: 16,
            base_addr: 0x1000,
            region_bytes: 256,
            patterns: vec![TrafficPatternSpec {
                name: "t".to_string(),
                kind: kind.to_string(),
                op: op.to_string(),
                ..TrafficPatternSpec::default()
            }],
        }
    }

    #[test]
    fn strided_reads_step_by_request_size() {
        let engine = PatternEngine::compile(&config("strided", "read")).unwrap();
        let records = engine.generate();
        assert_eq!(records.len(), 16);
        assert_eq!(records[0].addr, 0x1000);
        assert_eq!(records[1].addr, 0x1004);
        assert!(records.iter().all(|r| r.op == Op::Read));
    }

    #[test]
    fn mixed_interleaves_writes() {
        let engine = PatternEngine::compile(&config("strided", "mixed")).unwrap();
        let records = engine.generate();
        // default write_every = 4
        assert_eq!(records.iter().filter(|r| r.op == Op::Write).count(), 4);
        assert_eq!(records[0].op, Op::Write);
        assert_eq!(records[1].op, Op::Read);
    }

    #[test]
    fn random_stream_is_reproducible() {
        let engine = PatternEngine::compile(&config("random", "read")).unwrap();
        assert_eq!(engine.generate(), engine.generate());
    }

    #[test]
    fn tiled_transpose_walks_columns_first() {
        let mut cfg = config("tiled", "read");
        cfg.patterns[0].tile_m = 2;
        cfg.patterns[0].tile_n = 2;
        cfg.patterns[0].transpose = true;
        let records = PatternEngine::compile(&cfg).unwrap().generate();
        // element order within a 2x2 tile becomes 0, 2, 1, 3
        assert_eq!(records[0].addr, 0x1000);
        assert_eq!(records[1].addr, 0x1008);
        assert_eq!(records[2].addr, 0x1004);
        assert_eq!(records[3].addr, 0x100c);
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(PatternEngine::compile(&config("zigzag", "read")).is_err());
    }

    #[test]
    fn rejects_empty_pattern_list() {
        let cfg = TrafficConfig::default();
        assert!(PatternEngine::compile(&cfg).is_err());
    }
}
