//! Radio access technologies and their export layouts.
//!
//! [`Tech`] identifies the technology a row came from.
//! [`TechConfig`] describes how a vendor export maps onto canonical columns.
//! [`TechConfigSet`] holds one config per technology, with optional JSON overrides.

mod config;

pub use config::{TechConfig, TechConfigSet};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Radio access technology of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tech {
    #[serde(rename = "4G")]
    Lte,
    #[serde(rename = "5G")]
    Nr,
}

impl Tech {
    /// Report order: 4G first.
    pub const ALL: [Tech; 2] = [Tech::Lte, Tech::Nr];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tech::Lte => "4G",
            Tech::Nr => "5G",
        }
    }
}

impl fmt::Display for Tech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tech_display() {
        assert_eq!(Tech::Lte.to_string(), "4G");
        assert_eq!(Tech::Nr.to_string(), "5G");
    }

    #[test]
    fn test_tech_serde_names() {
        assert_eq!(serde_json::to_string(&Tech::Nr).unwrap(), "\"5G\"");
        let tech: Tech = serde_json::from_str("\"4G\"").unwrap();
        assert_eq!(tech, Tech::Lte);
    }
}
