//! Data types used by the KPI computations.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use crate::kpi::utility::mean;
use crate::samples::CellSample;

/// How a metric is folded when several samples share a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

impl Aggregation {
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Mean => mean(values),
        }
    }
}

/// Indicators plotted for every group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    VolumeGb,
    TputDl,
    TputUl,
    Users,
    Availability,
    Accessibility,
}

impl Metric {
    /// Plot order.
    pub const ALL: [Metric; 6] = [
        Metric::VolumeGb,
        Metric::TputDl,
        Metric::TputUl,
        Metric::Users,
        Metric::Availability,
        Metric::Accessibility,
    ];

    /// Metrics that get a per-cell boxplot page.
    pub const DISTRIBUTIONS: [Metric; 3] = [Metric::TputDl, Metric::TputUl, Metric::Users];

    /// Column name, also used as the chart label.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::VolumeGb => "VolumeGB",
            Metric::TputDl => "TputDLMB",
            Metric::TputUl => "TputULMB",
            Metric::Users => "Users",
            Metric::Availability => "Disp",
            Metric::Accessibility => "acc",
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        match self {
            Metric::VolumeGb | Metric::Users => Aggregation::Sum,
            _ => Aggregation::Mean,
        }
    }

    pub fn value(&self, sample: &CellSample) -> Option<f64> {
        match self {
            Metric::VolumeGb => sample.volume_gb,
            Metric::TputDl => sample.tput_dl_mbps,
            Metric::TputUl => sample.tput_ul_mbps,
            Metric::Users => sample.users,
            Metric::Availability => sample.availability,
            Metric::Accessibility => sample.accessibility,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Time-ordered `(timestamp, value)` points.
pub type TimeSeries = Vec<(NaiveDateTime, f64)>;

/// A named series, e.g. one site or one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSeries {
    pub label: String,
    pub points: TimeSeries,
}

/// All values a cell reported for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct CellDistribution {
    pub cell: String,
    pub values: Vec<f64>,
}

/// Mean throughput per technology over the samples at the user peak (Mbps).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeakThroughput {
    pub lte_dl: Option<f64>,
    pub lte_ul: Option<f64>,
    pub nr_dl: Option<f64>,
    pub nr_ul: Option<f64>,
}

/// Headline figures of the group summary page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub vol_4g: f64,
    pub vol_5g: f64,
    pub total_volume: f64,
    /// 5G share of total volume, 0.0..=1.0.
    pub offload: f64,
    pub peak_hour: String,
    pub peak_at: Option<NaiveDateTime>,
    pub peak_4g: u64,
    pub peak_5g: u64,
    pub peak_total: u64,
    pub tput: Option<PeakThroughput>,
    /// Users per cell at the peak, largest first.
    pub top_cells: Vec<(String, u64)>,
}

impl Default for SummaryMetrics {
    fn default() -> Self {
        Self {
            vol_4g: 0.0,
            vol_5g: 0.0,
            total_volume: 0.0,
            offload: 0.0,
            peak_hour: "N/A".to_string(),
            peak_at: None,
            peak_4g: 0,
            peak_5g: 0,
            peak_total: 0,
            tput: None,
            top_cells: Vec::new(),
        }
    }
}

/// One row of the worst-accessibility table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityEntry {
    pub cell: String,
    pub date: NaiveDateTime,
    pub accessibility: f64,
}
