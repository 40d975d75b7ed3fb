use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::Tech;

/// Maps one technology's export headers onto canonical column names.
#[derive(Debug, Clone, Deserialize)]
pub struct TechConfig {
    pub tech: Tech,
    pub columns_rename: BTreeMap<String, String>,
    #[serde(default)]
    pub columns_to_drop: Vec<String>,
}

impl TechConfig {
    /// Layout of the 4G performance export.
    pub fn lte() -> Self {
        Self {
            tech: Tech::Lte,
            columns_rename: renames(&[
                ("TIM_THROU_USER_PDCP_DL (Kbps)", "TputDLMB"),
                ("TIM_THROU_USER_PDCP_UL (Kbps)", "TputULMB"),
                ("TIM_DISP_COUNTER_TOTAL (%)", "Disp"),
                ("TIM_VOLUME_TOTAL_DLUL_ALLOP (KB)", "VolumeGB"),
                ("TIM_PRB_UTIL_MEAN_DL (%)", "PRB_DL"),
                ("TIM_USERS_RRC_CONN_MAX_SUM (Units)", "Users"),
                ("TIM_ACC (%)", "acc"),
                ("eNodeB", "Site"),
            ]),
            columns_to_drop: vec!["Detentora".into(), "Vendor".into()],
        }
    }

    /// Layout of the 5G performance export.
    pub fn nr() -> Self {
        Self {
            tech: Tech::Nr,
            columns_rename: renames(&[
                ("TIM_ACC (%)", "acc"),
                ("TIM_DISP_COUNTER_TOTAL (%)", "Disp"),
                ("TIM_USERS_RRC_CONN_MAX_SUM (Units)", "Users"),
                ("TIM_VOLUME_TOTAL_DLUL_ALLOP (KB)", "VolumeGB"),
                ("TIM_THROU_USER_UL (Kbps)", "TputULMB"),
                ("TIM_THROU_USER_DL (Kbps)", "TputDLMB"),
                ("gNodeB", "Site"),
            ]),
            columns_to_drop: vec!["Fornecedor".into(), "gNodeB Name".into()],
        }
    }

    /// Canonical name for a source header. Unmapped headers keep their name.
    pub fn canonical<'a>(&'a self, header: &'a str) -> &'a str {
        self.columns_rename
            .get(header)
            .map(String::as_str)
            .unwrap_or(header)
    }

    pub fn is_dropped(&self, header: &str) -> bool {
        self.columns_to_drop.iter().any(|c| c == header)
    }
}

fn renames(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

/// One [`TechConfig`] per technology.
///
/// Overrides are read from a JSON object keyed by technology:
/// ```json
/// {
///   "4G": {
///     "tech": "4G",
///     "columns_rename": { "eNodeB": "Site", "Cell Name": "Cell" },
///     "columns_to_drop": ["Vendor"]
///   }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TechConfigSet {
    entries: HashMap<Tech, TechConfig>,
}

impl Default for TechConfigSet {
    fn default() -> Self {
        let entries = [TechConfig::lte(), TechConfig::nr()]
            .into_iter()
            .map(|c| (c.tech, c))
            .collect();
        Self { entries }
    }
}

impl TechConfigSet {
    /// Loads overrides from a JSON file at `path` on top of the built-in layouts.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tech config '{}'", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid tech config '{}'", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let overrides: HashMap<Tech, TechConfig> = serde_json::from_str(content)?;
        let mut set = Self::default();
        for (tech, mut config) in overrides {
            if config.tech != tech {
                tracing::warn!(key = %tech, declared = %config.tech, "tech config key and body disagree, using key");
                config.tech = tech;
            }
            set.entries.insert(tech, config);
        }
        Ok(set)
    }

    pub fn get(&self, tech: Tech) -> &TechConfig {
        // Every technology is seeded by `Default`.
        &self.entries[&tech]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_renames_known_headers() {
        let config = TechConfig::lte();
        assert_eq!(config.canonical("eNodeB"), "Site");
        assert_eq!(config.canonical("TIM_ACC (%)"), "acc");
        assert_eq!(config.canonical("Cell"), "Cell");
    }

    #[test]
    fn test_nr_layout_differs_from_lte() {
        let config = TechConfig::nr();
        assert_eq!(config.canonical("gNodeB"), "Site");
        assert_eq!(config.canonical("eNodeB"), "eNodeB");
        assert!(config.is_dropped("gNodeB Name"));
        assert!(!config.is_dropped("Vendor"));
    }

    #[test]
    fn test_from_json_overrides_single_tech() {
        let json = r#"{
            "5G": {
                "tech": "5G",
                "columns_rename": { "NR Cell": "Cell" }
            }
        }"#;
        let set = TechConfigSet::from_json(json).unwrap();

        assert_eq!(set.get(Tech::Nr).canonical("NR Cell"), "Cell");
        assert!(set.get(Tech::Nr).columns_to_drop.is_empty());
        assert_eq!(set.get(Tech::Lte).canonical("eNodeB"), "Site");
    }

    #[test]
    fn test_load_reads_file_and_reports_path() {
        let path = std::env::temp_dir().join("ran_kpi_report_test_tech.json");
        std::fs::write(&path, r#"{ "4G": { "tech": "4G", "columns_rename": { "ENB": "Site" } } }"#)
            .unwrap();

        let set = TechConfigSet::load(&path).unwrap();
        assert_eq!(set.get(Tech::Lte).canonical("ENB"), "Site");
        std::fs::remove_file(&path).unwrap();

        let err = TechConfigSet::load(&path).unwrap_err();
        assert!(err.to_string().contains("ran_kpi_report_test_tech.json"));
    }

    #[test]
    fn test_from_json_rejects_unknown_tech() {
        let json = r#"{ "3G": { "tech": "4G", "columns_rename": {} } }"#;
        assert!(TechConfigSet::from_json(json).is_err());
    }
}
