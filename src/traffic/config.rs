use serde::Deserialize;

use crate::sim::config::Config;

/// `[traffic]` section of a traffic spec file: a shared address window plus
/// the list of patterns to synthesize, in order.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrafficConfig {
    pub reqs_per_pattern: u32,
    pub base_addr: u32,
    pub region_bytes: u32,
    pub patterns: Vec<TrafficPatternSpec>,
}

impl Config for TrafficConfig {}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            reqs_per_pattern: 1024,
            base_addr: 0x1000_0000,
            region_bytes: 64 << 10,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrafficPatternSpec {
    pub name: String,
    pub kind: String,
    pub op: String,
    pub req_bytes: u32,
    pub stride: u32,
    pub tile_m: u32,
    pub tile_n: u32,
    pub transpose: bool,
    pub write_every: u32,
    pub seed: u64,
    pub within_bytes: Option<u32>,
}

impl Default for TrafficPatternSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: String::new(),
            op: "read".to_string(),
            req_bytes: 4,
            stride: 1,
            tile_m: 16,
            tile_n: 16,
            transpose: false,
            write_every: 4,
            seed: 0,
            within_bytes: None,
        }
    }
}
