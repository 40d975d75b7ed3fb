//! Normalised per-cell counter samples.
//!
//! A [`CellSample`] is one spreadsheet row after the technology's column
//! layout has been applied and units converted to GB / Mbps.

use anyhow::{Result, anyhow};
use calamine::Data;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::ingest::RawTable;
use crate::tech::{Tech, TechConfig};

/// Canonical column names shared by every technology.
pub mod columns {
    pub const DATE: &str = "Date";
    pub const GROUP: &str = "Grupo";
    pub const SITE: &str = "Site";
    pub const CELL: &str = "Cell";
    pub const VOLUME: &str = "VolumeGB";
    pub const TPUT_DL: &str = "TputDLMB";
    pub const TPUT_UL: &str = "TputULMB";
    pub const USERS: &str = "Users";
    pub const AVAILABILITY: &str = "Disp";
    pub const ACCESSIBILITY: &str = "acc";
    pub const PRB_DL: &str = "PRB_DL";

    pub const REQUIRED: [&str; 4] = [DATE, GROUP, SITE, CELL];
}

/// Unit conversions applied after renaming: column, divisor.
static CONVERSIONS: &[(&str, f64)] = &[
    (columns::VOLUME, 1e6),
    (columns::TPUT_DL, 1e3),
    (columns::TPUT_UL, 1e3),
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellSample {
    #[serde(rename = "Date")]
    pub date: NaiveDateTime,
    #[serde(rename = "Grupo")]
    pub group: String,
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "Cell")]
    pub cell: String,
    #[serde(rename = "Tech")]
    pub tech: Tech,

    // metrics, already converted
    #[serde(rename = "VolumeGB")]
    pub volume_gb: Option<f64>,
    #[serde(rename = "TputDLMB")]
    pub tput_dl_mbps: Option<f64>,
    #[serde(rename = "TputULMB")]
    pub tput_ul_mbps: Option<f64>,
    #[serde(rename = "Users")]
    pub users: Option<f64>,
    #[serde(rename = "Disp")]
    pub availability: Option<f64>,
    #[serde(rename = "acc")]
    pub accessibility: Option<f64>,
    #[serde(rename = "PRB_DL")]
    pub prb_dl: Option<f64>,
}

impl CellSample {
    /// A sample with identity fields set and every metric missing.
    pub fn new(date: NaiveDateTime, group: &str, site: &str, cell: &str, tech: Tech) -> Self {
        Self {
            date,
            group: group.to_uppercase(),
            site: site.to_string(),
            cell: cell.to_string(),
            tech,
            volume_gb: None,
            tput_dl_mbps: None,
            tput_ul_mbps: None,
            users: None,
            availability: None,
            accessibility: None,
            prb_dl: None,
        }
    }

    /// Rows the report can use: users, availability and both throughputs present.
    pub fn is_report_ready(&self) -> bool {
        self.users.is_some()
            && self.availability.is_some()
            && self.tput_dl_mbps.is_some()
            && self.tput_ul_mbps.is_some()
    }

    fn metric_slot(&mut self, column: &str) -> Option<&mut Option<f64>> {
        match column {
            columns::VOLUME => Some(&mut self.volume_gb),
            columns::TPUT_DL => Some(&mut self.tput_dl_mbps),
            columns::TPUT_UL => Some(&mut self.tput_ul_mbps),
            columns::USERS => Some(&mut self.users),
            columns::AVAILABILITY => Some(&mut self.availability),
            columns::ACCESSIBILITY => Some(&mut self.accessibility),
            columns::PRB_DL => Some(&mut self.prb_dl),
            _ => None,
        }
    }

    fn dedup_key(&self) -> SampleKey {
        let bits = |v: Option<f64>| v.map(f64::to_bits);
        (
            self.date,
            self.group.clone(),
            self.site.clone(),
            self.cell.clone(),
            self.tech,
            [
                bits(self.volume_gb),
                bits(self.tput_dl_mbps),
                bits(self.tput_ul_mbps),
                bits(self.users),
                bits(self.availability),
                bits(self.accessibility),
                bits(self.prb_dl),
            ],
        )
    }
}

type SampleKey = (NaiveDateTime, String, String, String, Tech, [Option<u64>; 7]);

/// Applies a technology layout to a raw table.
///
/// # Errors
///
/// Returns an error if any of `Date`, `Grupo`, `Site`, `Cell` is absent after renaming.
#[tracing::instrument(skip(table, config), fields(tech = %config.tech, rows = table.len()))]
pub fn normalize(table: &RawTable, config: &TechConfig) -> Result<Vec<CellSample>> {
    let mut mapped: Vec<(usize, &str)> = Vec::new();
    for (idx, header) in table.columns.iter().enumerate() {
        if config.is_dropped(header) {
            continue;
        }
        let name = config.canonical(header);
        if mapped.iter().any(|(_, n)| *n == name) {
            warn!(column = name, header = %header, "duplicate column after rename, keeping first");
            continue;
        }
        mapped.push((idx, name));
    }

    let find = |name: &str| mapped.iter().find(|(_, n)| *n == name).map(|(i, _)| *i);
    let mut required = [0usize; 4];
    for (slot, name) in required.iter_mut().zip(columns::REQUIRED) {
        *slot = find(name).ok_or_else(|| {
            anyhow!("column '{}' missing from {} export", name, config.tech)
        })?;
    }
    let [date_idx, group_idx, site_idx, cell_idx] = required;

    let metric_columns: Vec<(usize, &str)> = mapped
        .iter()
        .filter(|(_, n)| !columns::REQUIRED.contains(n))
        .copied()
        .collect();

    let mut samples = Vec::with_capacity(table.len());
    let mut skipped = 0usize;

    for row in &table.rows {
        let Some(date) = parse_datetime(&row[date_idx]) else {
            debug!(value = %row[date_idx], "unparseable date, skipping row");
            skipped += 1;
            continue;
        };
        let (Some(group), Some(site), Some(cell)) = (
            text_value(&row[group_idx]),
            text_value(&row[site_idx]),
            text_value(&row[cell_idx]),
        ) else {
            skipped += 1;
            continue;
        };

        let mut sample = CellSample::new(date, &group, &site, &cell, config.tech);
        for &(idx, name) in &metric_columns {
            if let Some(slot) = sample.metric_slot(name) {
                *slot = numeric_value(&row[idx]).map(|v| v / divisor(name));
            }
        }
        samples.push(sample);
    }

    if skipped > 0 {
        warn!(skipped, tech = %config.tech, "rows without date or identity were skipped");
    }
    info!(samples = samples.len(), tech = %config.tech, "Export normalised");
    Ok(samples)
}

fn divisor(column: &str) -> f64 {
    CONVERSIONS
        .iter()
        .find(|(c, _)| *c == column)
        .map(|(_, d)| *d)
        .unwrap_or(1.0)
}

/// Concatenates both technologies and drops exact duplicates, keeping the first.
pub fn combine(lte: Vec<CellSample>, nr: Vec<CellSample>) -> Vec<CellSample> {
    let total = lte.len() + nr.len();
    let mut seen = HashSet::with_capacity(total);
    let combined: Vec<CellSample> = lte
        .into_iter()
        .chain(nr)
        .filter(|s| seen.insert(s.dedup_key()))
        .collect();

    let duplicates = total - combined.len();
    if duplicates > 0 {
        info!(duplicates, "Duplicate rows dropped");
    }
    combined
}

/// Keeps the samples the report is computed over.
pub fn report_ready(samples: Vec<CellSample>) -> Vec<CellSample> {
    let before = samples.len();
    let kept: Vec<CellSample> = samples.into_iter().filter(CellSample::is_report_ready).collect();
    debug!(before, after = kept.len(), "Incomplete samples removed");
    kept
}

/// Keeps samples with `from <= date <= to`. Open bounds are unbounded.
pub fn within_window(
    samples: Vec<CellSample>,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
) -> Vec<CellSample> {
    samples
        .into_iter()
        .filter(|s| from.is_none_or(|f| s.date >= f) && to.is_none_or(|t| s.date <= t))
        .collect()
}

/// Groups in first-seen order.
pub fn groups(samples: &[CellSample]) -> Vec<String> {
    let mut seen = HashSet::new();
    samples
        .iter()
        .filter(|s| seen.insert(s.group.as_str()))
        .map(|s| s.group.clone())
        .collect()
}

/// Parses a timestamp typed by the user or found in a text cell.
pub fn parse_datetime_str(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(s) | Data::String(s) => parse_datetime_str(s),
        Data::Float(f) => from_excel_serial(*f),
        Data::Int(i) => from_excel_serial(*i as f64),
        _ => None,
    }
}

/// Serial of 9999-12-31, the last day Excel can represent.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Converts an Excel serial day number (1900 date system) to a timestamp.
///
/// Values outside Excel's date range (such as Unix epoch milliseconds) are
/// not dates.
fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL + 1.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

fn text_value(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn numeric_value(cell: &Data) -> Option<f64> {
    let value = match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn ts(v: &str) -> NaiveDateTime {
        parse_datetime_str(v).unwrap()
    }

    fn lte_table() -> RawTable {
        RawTable {
            columns: vec![
                "Date".into(),
                "Grupo".into(),
                "eNodeB".into(),
                "Cell".into(),
                "Vendor".into(),
                "TIM_VOLUME_TOTAL_DLUL_ALLOP (KB)".into(),
                "TIM_THROU_USER_PDCP_DL (Kbps)".into(),
                "TIM_THROU_USER_PDCP_UL (Kbps)".into(),
                "TIM_USERS_RRC_CONN_MAX_SUM (Units)".into(),
                "TIM_DISP_COUNTER_TOTAL (%)".into(),
                "TIM_ACC (%)".into(),
            ],
            rows: vec![vec![
                s("2025-05-01 10:00:00"),
                s("garanhuns"),
                Data::Float(1234.0),
                s("4G-CE05CW-26-1A"),
                s("Huawei"),
                Data::Float(2_500_000.0),
                Data::Float(15_000.0),
                Data::Float(2_000.0),
                Data::Int(42),
                Data::Float(100.0),
                Data::Float(99.5),
            ]],
        }
    }

    #[test]
    fn test_normalize_renames_and_converts_units() {
        let samples = normalize(&lte_table(), &TechConfig::lte()).unwrap();
        assert_eq!(samples.len(), 1);

        let sample = &samples[0];
        assert_eq!(sample.date, ts("2025-05-01 10:00"));
        assert_eq!(sample.group, "GARANHUNS");
        assert_eq!(sample.site, "1234");
        assert_eq!(sample.cell, "4G-CE05CW-26-1A");
        assert_eq!(sample.tech, Tech::Lte);
        assert_eq!(sample.volume_gb, Some(2.5));
        assert_eq!(sample.tput_dl_mbps, Some(15.0));
        assert_eq!(sample.tput_ul_mbps, Some(2.0));
        assert_eq!(sample.users, Some(42.0));
        assert_eq!(sample.availability, Some(100.0));
        assert_eq!(sample.accessibility, Some(99.5));
        assert_eq!(sample.prb_dl, None);
    }

    #[test]
    fn test_normalize_missing_required_column() {
        let mut table = lte_table();
        table.columns[2] = "gNodeB".into();

        let err = normalize(&table, &TechConfig::lte()).unwrap_err();
        assert!(err.to_string().contains("'Site'"));
        assert!(err.to_string().contains("4G"));
    }

    #[test]
    fn test_normalize_skips_rows_without_date() {
        let mut table = lte_table();
        let mut bad = table.rows[0].clone();
        bad[0] = s("yesterday");
        table.rows.push(bad);

        let samples = normalize(&table, &TechConfig::lte()).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_normalize_blank_metric_is_missing() {
        let mut table = lte_table();
        table.rows[0][8] = Data::Empty;
        table.rows[0][10] = s("n/a");

        let samples = normalize(&table, &TechConfig::lte()).unwrap();
        assert_eq!(samples[0].users, None);
        assert_eq!(samples[0].accessibility, None);
        assert!(!samples[0].is_report_ready());
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime_str("2025-05-01 14:00:00"), Some(expected));
        assert_eq!(parse_datetime_str("2025-05-01T14:00"), Some(expected));
        assert_eq!(parse_datetime_str("01/05/2025 14:00"), Some(expected));
        assert_eq!(
            parse_datetime_str("2025-05-01"),
            expected.date().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_datetime_str("not a date"), None);
    }

    #[test]
    fn test_excel_serial_dates() {
        // 45778.5 is 2025-05-01 12:00
        assert_eq!(parse_datetime(&Data::Float(45778.5)), Some(ts("2025-05-01 12:00")));
        assert_eq!(parse_datetime(&Data::Float(-1.0)), None);
        assert_eq!(parse_datetime(&Data::Int(45778)), Some(ts("2025-05-01 00:00")));
    }

    #[test]
    fn test_excel_serial_out_of_range_is_not_a_date() {
        // Unix epoch milliseconds stored in a date column
        assert_eq!(parse_datetime(&Data::Float(1.7e12)), None);
        assert_eq!(parse_datetime(&Data::Int(1_700_000_000_000)), None);
        assert_eq!(parse_datetime(&Data::Float(f64::MAX)), None);
        assert!(parse_datetime(&Data::Float(MAX_EXCEL_SERIAL)).is_some());
    }

    #[test]
    fn test_typed_date_cells() {
        let iso = Data::DateTimeIso("2025-05-01T14:00:00".to_string());
        assert_eq!(parse_datetime(&iso), Some(ts("2025-05-01 14:00")));

        let excel = Data::DateTime(ExcelDateTime::new(
            45778.5,
            ExcelDateTimeType::DateTime,
            false,
        ));
        assert_eq!(parse_datetime(&excel), Some(ts("2025-05-01 12:00")));
    }

    #[test]
    fn test_normalize_unix_millis_date_row_is_skipped() {
        let mut table = lte_table();
        let mut bad = table.rows[0].clone();
        bad[0] = Data::Float(1.7e12);
        table.rows.push(bad);

        let mut typed = table.rows[0].clone();
        typed[0] = Data::DateTime(ExcelDateTime::new(
            45778.75,
            ExcelDateTimeType::DateTime,
            false,
        ));
        table.rows.push(typed);

        let samples = normalize(&table, &TechConfig::lte()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].date, ts("2025-05-01 18:00"));
    }

    #[test]
    fn test_numeric_value_accepts_decimal_comma() {
        assert_eq!(numeric_value(&s("98,75")), Some(98.75));
        assert_eq!(numeric_value(&Data::Bool(true)), None);
    }

    #[test]
    fn test_combine_drops_duplicates_keeps_order() {
        let a = CellSample::new(ts("2025-05-01 10:00"), "G", "S1", "C1", Tech::Lte);
        let b = CellSample::new(ts("2025-05-01 11:00"), "G", "S1", "C1", Tech::Lte);
        let c = CellSample::new(ts("2025-05-01 10:00"), "G", "S2", "N1", Tech::Nr);

        let combined = combine(vec![a.clone(), b.clone(), a.clone()], vec![c.clone(), c.clone()]);
        assert_eq!(combined, vec![a, b, c]);
    }

    #[test]
    fn test_within_window_inclusive() {
        let samples: Vec<CellSample> = ["10:00", "12:00", "14:00"]
            .iter()
            .map(|h| {
                CellSample::new(ts(&format!("2025-05-01 {h}")), "G", "S", "C", Tech::Lte)
            })
            .collect();

        let kept = within_window(
            samples.clone(),
            Some(ts("2025-05-01 12:00")),
            Some(ts("2025-05-01 14:00")),
        );
        assert_eq!(kept.len(), 2);

        let kept = within_window(samples, None, Some(ts("2025-05-01 10:00")));
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_groups_first_seen_order() {
        let t = ts("2025-05-01 10:00");
        let samples = vec![
            CellSample::new(t, "b", "S", "C", Tech::Lte),
            CellSample::new(t, "a", "S", "C", Tech::Nr),
            CellSample::new(t, "B", "S", "C", Tech::Nr),
        ];
        assert_eq!(groups(&samples), vec!["B", "A"]);
    }
}
