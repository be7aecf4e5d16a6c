use std::io::BufRead;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::mem::hierarchy::Op;

/// One `R,addr` / `W,addr` line of a trace, address in hex with an optional
/// `0x` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub op: Op,
    pub addr: u32,
}

impl FromStr for TraceRecord {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let Some((op, addr)) = line.split_once(',') else {
            bail!("expected 'R,addr' or 'W,addr', got '{}'", line);
        };
        let op = match op.trim() {
            "R" => Op::Read,
            "W" => Op::Write,
            other => bail!("unsupported operation '{}', expected one of: R, W", other),
        };
        let digits = addr.trim();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        let addr = u32::from_str_radix(digits, 16)
            .with_context(|| format!("bad hex address '{}'", addr.trim()))?;
        Ok(Self { op, addr })
    }
}

/// Iterate trace records out of a reader, skipping blank lines. Errors carry
/// the 1-based line number.
pub fn records<R: BufRead>(reader: R) -> impl Iterator<Item = Result<TraceRecord>> {
    reader.lines().enumerate().filter_map(|(idx, line)| {
        let line = match line.with_context(|| format!("trace line {}", idx + 1)) {
            Ok(line) => line,
            Err(err) => return Some(Err(err)),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(
            trimmed
                .parse::<TraceRecord>()
                .with_context(|| format!("trace line {}", idx + 1)),
        )
    })
}
