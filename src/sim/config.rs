use std::str::FromStr;

use anyhow::{bail, Context, Result};
use log::warn;
use serde::de::DeserializeOwned;
use toml::Value;

use crate::mem::addr::Geometry;
use crate::mem::policy::EvictionPolicy;

/// Sectioned TOML configs (the traffic generator spec) deserialize through
/// this trait; a missing section falls back to defaults.
pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> Result<Self> {
        match section {
            Some(value) => value
                .clone()
                .try_into()
                .context("cannot deserialize config section"),
            None => {
                warn!("config section not found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// The only write policy the hierarchy implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    #[default]
    WriteBack,
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "WB" | "wb" | "writeback" | "write-back" => Ok(Self::WriteBack),
            _ => Err(format!(
                "unsupported write policy '{}', expected write-back (WB)",
                value
            )),
        }
    }
}

/// One `size,blockSize,associativity,evictionPolicy,writePolicy,name` record
/// of the hierarchy config file.
#[derive(Debug, Clone)]
pub struct LevelConfig {
    pub geometry: Geometry,
    pub eviction: EvictionPolicy,
    pub write: WritePolicy,
    pub name: String,
}

impl FromStr for LevelConfig {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 6 {
            bail!(
                "expected 6 comma-separated fields (size,block,assoc,eviction,write,name), got {}",
                fields.len()
            );
        }
        let size: u32 = fields[0]
            .parse()
            .with_context(|| format!("bad cache size '{}'", fields[0]))?;
        let block_size: u32 = fields[1]
            .parse()
            .with_context(|| format!("bad block size '{}'", fields[1]))?;
        let associativity: u32 = fields[2]
            .parse()
            .with_context(|| format!("bad associativity '{}'", fields[2]))?;
        let eviction = fields[3]
            .parse::<EvictionPolicy>()
            .map_err(anyhow::Error::msg)?;
        let write = fields[4].parse::<WritePolicy>().map_err(anyhow::Error::msg)?;
        if fields[5].is_empty() {
            bail!("level name is empty");
        }
        Ok(Self {
            geometry: Geometry::new(size, block_size, associativity)?,
            eviction,
            write,
            name: fields[5].to_string(),
        })
    }
}

/// Parse the hierarchy config file: a level count line followed by that many
/// level records, ordered CPU-facing first.
pub fn parse_hierarchy(text: &str) -> Result<Vec<LevelConfig>> {
    let mut lines = text.lines();
    let count_line = lines.next().context("config file is empty")?.trim();
    let count: usize = count_line
        .parse()
        .with_context(|| format!("bad level count '{}'", count_line))?;

    let mut levels = Vec::with_capacity(count);
    for i in 0..count {
        let line = lines
            .next()
            .with_context(|| format!("config ends after {} of {} levels", i, count))?;
        let level = line
            .trim()
            .parse::<LevelConfig>()
            .with_context(|| format!("config line {}", i + 2))?;
        levels.push(level);
    }
    Ok(levels)
}
