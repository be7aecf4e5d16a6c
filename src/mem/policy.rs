use serde::Deserialize;
use std::str::FromStr;

/// Which resident entry a full set gives up, and whether a hit refreshes an
/// entry's position in the set order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvictionPolicy {
    Fifo,
    Lru,
    Mru,
}

impl EvictionPolicy {
    /// FIFO keeps arrival order; LRU and MRU refresh recency on every hit.
    pub fn reorders_on_hit(self) -> bool {
        !matches!(self, Self::Fifo)
    }

    /// FIFO and LRU give up the oldest end of the set order. MRU gives up the
    /// newest end: the most recently touched entry before the operation that
    /// triggered the eviction.
    pub fn evicts_newest(self) -> bool {
        matches!(self, Self::Mru)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fifo => "FIFO",
            Self::Lru => "LRU",
            Self::Mru => "MRU",
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "FIFO" => Ok(Self::Fifo),
            "LRU" => Ok(Self::Lru),
            "MRU" => Ok(Self::Mru),
            _ => Err(format!(
                "unsupported eviction policy '{}', expected one of: FIFO, LRU, MRU",
                value
            )),
        }
    }
}
