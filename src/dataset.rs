//! Loads both technology folders into one combined sample set.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::ingest::load_excel_files;
use crate::samples::{self, CellSample};
use crate::tech::{Tech, TechConfig, TechConfigSet};

/// Inputs of a report run.
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    pub input_4g: PathBuf,
    pub input_5g: PathBuf,
    pub configs: TechConfigSet,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl DatasetOptions {
    /// Builds the options, rejecting a window whose start is after its end.
    pub fn new(
        input_4g: PathBuf,
        input_5g: PathBuf,
        configs: TechConfigSet,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<Self> {
        let options = Self {
            input_4g,
            input_5g,
            configs,
            from,
            to,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(anyhow!("--from ({from}) is after --to ({to})"));
            }
        }
        Ok(())
    }
}

/// Reads and normalises every export of one technology.
pub fn load_tech(folder: &Path, config: &TechConfig) -> Result<Vec<CellSample>> {
    let table = load_excel_files(folder)
        .with_context(|| format!("failed to load {} exports", config.tech))?;
    samples::normalize(&table, config)
}

/// Loads 4G and 5G on blocking tasks, then combines, de-duplicates and
/// applies the time window.
#[tracing::instrument(skip(options), fields(input_4g = %options.input_4g.display(), input_5g = %options.input_5g.display()))]
pub async fn load(options: &DatasetOptions) -> Result<Vec<CellSample>> {
    options.validate()?;

    let spawn = |tech: Tech, folder: PathBuf| {
        let config = options.configs.get(tech).clone();
        tokio::task::spawn_blocking(move || load_tech(&folder, &config))
    };

    let lte = spawn(Tech::Lte, options.input_4g.clone());
    let nr = spawn(Tech::Nr, options.input_5g.clone());
    let (lte, nr) = tokio::try_join!(lte, nr)?;
    let (lte, nr) = (lte?, nr?);
    info!(lte = lte.len(), nr = nr.len(), "Technologies loaded");

    let combined = samples::combine(lte, nr);
    let windowed = samples::within_window(combined, options.from, options.to);
    info!(samples = windowed.len(), "Dataset ready");
    Ok(windowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::parse_datetime_str;

    fn ts(v: &str) -> Option<NaiveDateTime> {
        parse_datetime_str(v)
    }

    fn build(from: &str, to: &str) -> Result<DatasetOptions> {
        DatasetOptions::new(
            PathBuf::from("4G"),
            PathBuf::from("5G"),
            TechConfigSet::default(),
            ts(from),
            ts(to),
        )
    }

    #[test]
    fn test_new_rejects_inverted_window() {
        let err = build("2025-05-02 00:00", "2025-05-01 00:00").unwrap_err();
        assert!(err.to_string().contains("is after"));
    }

    #[test]
    fn test_new_accepts_single_instant_and_open_bounds() {
        assert!(build("2025-05-01 20:00", "2025-05-01 20:00").is_ok());
        assert!(build("2025-05-01 20:00", "").is_ok());
        assert!(build("", "").is_ok());
    }

    #[tokio::test]
    async fn test_load_rejects_inverted_window_before_reading() {
        let mut options = build("", "").unwrap();
        options.from = ts("2025-05-02 00:00");
        options.to = ts("2025-05-01 00:00");

        let err = load(&options).await.unwrap_err();
        assert!(err.to_string().contains("is after"));
    }
}
