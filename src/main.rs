use std::fs;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use toml::Table;

use cachetron::mem::hierarchy::Op;
use cachetron::sim::config::{self, Config};
use cachetron::sim::top::Sim;
use cachetron::sim::trace::TraceRecord;
use cachetron::traffic::config::TrafficConfig;
use cachetron::traffic::patterns::PatternEngine;

#[derive(Parser)]
#[command(version, about)]
struct CachetronArgs {
    #[arg(help = "Path to the cache hierarchy config file")]
    config_path: PathBuf,
    #[arg(short, long, help = "Path to a specific trace file")]
    trace: Option<PathBuf>,
    #[arg(long, help = "Read input traces from stdin")]
    stdin: bool,
    #[arg(long, help = "Synthesize the trace from a traffic spec (TOML)")]
    traffic: Option<PathBuf>,
    #[arg(
        long,
        requires = "traffic",
        help = "Write the synthesized trace to a file instead of simulating"
    )]
    trace_out: Option<PathBuf>,
    #[arg(long, help = "Dump per-level statistics as JSON")]
    stats_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let argv = CachetronArgs::parse();
    let sources = usize::from(argv.trace.is_some())
        + usize::from(argv.stdin)
        + usize::from(argv.traffic.is_some());
    if sources != 1 {
        bail!("exactly one trace source is required: --trace, --stdin, or --traffic");
    }

    let config_text = fs::read_to_string(&argv.config_path).with_context(|| {
        format!("failed to read config file {}", argv.config_path.display())
    })?;
    let levels = config::parse_hierarchy(&config_text)?;

    if let Some(traffic_path) = &argv.traffic {
        let traffic_text = fs::read_to_string(traffic_path).with_context(|| {
            format!("failed to read traffic spec {}", traffic_path.display())
        })?;
        let table: Table = toml::from_str(&traffic_text).context("cannot parse traffic toml")?;
        let traffic = TrafficConfig::from_section(table.get("traffic"))?;
        let records = PatternEngine::compile(&traffic)?.generate();

        if let Some(out_path) = &argv.trace_out {
            return write_trace(out_path, &records);
        }

        let mut sim = Sim::new(&levels);
        sim.print_hierarchy();
        for record in records {
            sim.feed(record);
        }
        return finish(&sim, &argv);
    }

    let mut sim = Sim::new(&levels);
    sim.print_hierarchy();
    if let Some(trace_path) = &argv.trace {
        let file = File::open(trace_path)
            .with_context(|| format!("failed to open trace file {}", trace_path.display()))?;
        sim.run(BufReader::new(file))?;
    } else {
        sim.run(io::stdin().lock())?;
    }
    finish(&sim, &argv)
}

fn finish(sim: &Sim, argv: &CachetronArgs) -> Result<()> {
    sim.print_statistics();
    if let Some(path) = &argv.stats_json {
        let json = serde_json::to_string_pretty(&sim.summary())?;
        fs::write(path, json)
            .with_context(|| format!("failed to write stats to {}", path.display()))?;
    }
    Ok(())
}

fn write_trace(path: &PathBuf, records: &[TraceRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create trace file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let op = match record.op {
            Op::Read => "R",
            _ => "W",
        };
        writeln!(writer, "{},{:08x}", op, record.addr)?;
    }
    writer.flush()?;
    Ok(())
}
