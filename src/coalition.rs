//! Coalitions partition contacts into sides

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Side an entity belongs to. Callsign lookups never cross coalitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coalition {
    Red,
    Blue,
    #[serde(alias = "neutral")]
    Neutrals,
}

impl Coalition {
    /// The hostile side. Neutrals have no opponent and map to themselves.
    pub fn opposite(self) -> Coalition {
        match self {
            Coalition::Red => Coalition::Blue,
            Coalition::Blue => Coalition::Red,
            Coalition::Neutrals => Coalition::Neutrals,
        }
    }
}

impl fmt::Display for Coalition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Coalition::Red => "red",
            Coalition::Blue => "blue",
            Coalition::Neutrals => "neutrals",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown coalition: {0}")]
pub struct UnknownCoalition(pub String);

impl FromStr for Coalition {
    type Err = UnknownCoalition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Coalition::Red),
            "blue" => Ok(Coalition::Blue),
            "neutral" | "neutrals" => Ok(Coalition::Neutrals),
            _ => Err(UnknownCoalition(s.to_string())),
        }
    }
}
