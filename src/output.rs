//! Dataset export and summary logging.
//!
//! Supports JSON logging of group summaries and CSV export of the combined
//! samples, optionally gzip-compressed.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::kpi::SummaryMetrics;
use crate::samples::CellSample;

/// Logs a group summary as JSON.
pub fn print_json(group: &str, metrics: &SummaryMetrics) -> Result<()> {
    info!(group, summary = %serde_json::to_string(metrics)?, "Group summary");
    Ok(())
}

/// Writes samples as CSV with a header row.
///
/// With `gzip`, the output is compressed and `.gz` is appended to the path.
/// Returns the path actually written.
pub fn write_samples(path: &Path, samples: &[CellSample], gzip: bool) -> Result<PathBuf> {
    let target = if gzip {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    } else {
        path.to_path_buf()
    };
    debug!(path = %target.display(), gzip, rows = samples.len(), "Exporting samples");

    let file = File::create(&target)
        .with_context(|| format!("failed to create {}", target.display()))?;

    if gzip {
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let encoder = write_csv(encoder, samples)?;
        encoder.finish()?.flush()?;
    } else {
        write_csv(BufWriter::new(file), samples)?.flush()?;
    }

    info!(path = %target.display(), rows = samples.len(), "Samples exported");
    Ok(target)
}

fn write_csv<W: Write>(sink: W, samples: &[CellSample]) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(sink);
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to finish CSV export: {}", e.error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::parse_datetime_str;
    use crate::tech::Tech;
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn samples() -> Vec<CellSample> {
        let date = parse_datetime_str("2025-05-01 10:00").unwrap();
        let mut a = CellSample::new(date, "G", "S1", "C1", Tech::Lte);
        a.users = Some(3.0);
        let b = CellSample::new(date, "G", "S2", "N1", Tech::Nr);
        vec![a, b]
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json("G", &SummaryMetrics::default()).unwrap();
    }

    #[test]
    fn test_write_samples_plain() {
        let path = temp_path("ran_kpi_report_test_export.csv");
        let _ = fs::remove_file(&path);

        let written = write_samples(&path, &samples(), false).unwrap();
        assert_eq!(written, path);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Date,Grupo,Site,Cell,Tech,VolumeGB"));
        assert!(lines[1].contains(",4G,"));
        assert!(lines[2].contains(",5G,"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_samples_gzip_appends_extension() {
        let path = temp_path("ran_kpi_report_test_export_gz.csv");
        let written = write_samples(&path, &samples(), true).unwrap();
        assert!(written.to_string_lossy().ends_with(".csv.gz"));

        let mut decoded = String::new();
        GzDecoder::new(File::open(&written).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded.lines().count(), 3);

        fs::remove_file(&written).unwrap();
    }
}
