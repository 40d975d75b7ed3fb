//! KPI aggregation over normalised samples.
//!
//! Folds samples per timestamp, site and cell, and computes the headline
//! figures (volume, 5G offload, user peak, throughput at peak, top and worst
//! cells) shown on each group's summary pages.

pub mod aggregate;
pub mod summary;
pub mod types;
pub mod utility;

pub use aggregate::{cell_distributions, series_by_cell_users, series_by_date, series_by_site};
pub use summary::{summarize, worst_accessibility};
pub use types::{Aggregation, Metric, SummaryMetrics};
