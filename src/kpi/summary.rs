use chrono::{NaiveDateTime, Timelike};
use std::collections::{BTreeMap, HashMap};

use crate::kpi::types::{AccessibilityEntry, PeakThroughput, SummaryMetrics};
use crate::kpi::utility::{mean_opt, ratio};
use crate::samples::CellSample;
use crate::tech::Tech;

/// Number of cells listed on the summary page.
pub const TOP_CELLS: usize = 5;

/// Computes the summary page figures for one group's samples.
pub fn summarize(samples: &[CellSample]) -> SummaryMetrics {
    let volume = |tech: Tech| -> f64 {
        samples
            .iter()
            .filter(|s| s.tech == tech)
            .filter_map(|s| s.volume_gb)
            .sum()
    };

    let vol_4g = volume(Tech::Lte);
    let vol_5g = volume(Tech::Nr);
    let total_volume = vol_4g + vol_5g;

    let mut metrics = SummaryMetrics {
        vol_4g,
        vol_5g,
        total_volume,
        offload: ratio(vol_5g, total_volume),
        ..Default::default()
    };

    let Some((peak_at, lte, nr)) = peak_users(samples) else {
        return metrics;
    };

    let at_peak: Vec<&CellSample> = samples.iter().filter(|s| s.date == peak_at).collect();

    metrics.peak_at = Some(peak_at);
    metrics.peak_hour = format!("{:02}h", peak_at.hour());
    metrics.peak_4g = user_count(lte);
    metrics.peak_5g = user_count(nr);
    metrics.peak_total = user_count(lte + nr);
    metrics.tput = Some(peak_throughput(&at_peak));
    metrics.top_cells = top_cells(&at_peak, TOP_CELLS);

    metrics
}

/// Whole users shown on the summary page: fractions are truncated and
/// negative counter values read as zero.
fn user_count(users: f64) -> u64 {
    users.max(0.0).trunc() as u64
}

/// Timestamp with the largest 4G+5G user total, earliest on ties.
///
/// Returns `(timestamp, 4G users, 5G users)`.
pub fn peak_users(samples: &[CellSample]) -> Option<(NaiveDateTime, f64, f64)> {
    let mut pivot: BTreeMap<NaiveDateTime, (f64, f64)> = BTreeMap::new();
    for sample in samples {
        let entry = pivot.entry(sample.date).or_default();
        let users = sample.users.unwrap_or(0.0);
        match sample.tech {
            Tech::Lte => entry.0 += users,
            Tech::Nr => entry.1 += users,
        }
    }

    let mut peak: Option<(NaiveDateTime, f64, f64)> = None;
    for (date, (lte, nr)) in pivot {
        let better = match peak {
            None => true,
            Some((_, best_lte, best_nr)) => lte + nr > best_lte + best_nr,
        };
        if better {
            peak = Some((date, lte, nr));
        }
    }
    peak
}

fn peak_throughput(at_peak: &[&CellSample]) -> PeakThroughput {
    let collect = |tech: Tech, pick: fn(&CellSample) -> Option<f64>| -> Option<f64> {
        let values: Vec<f64> = at_peak
            .iter()
            .filter(|s| s.tech == tech)
            .filter_map(|s| pick(s))
            .collect();
        mean_opt(&values)
    };

    PeakThroughput {
        lte_dl: collect(Tech::Lte, |s| s.tput_dl_mbps),
        lte_ul: collect(Tech::Lte, |s| s.tput_ul_mbps),
        nr_dl: collect(Tech::Nr, |s| s.tput_dl_mbps),
        nr_ul: collect(Tech::Nr, |s| s.tput_ul_mbps),
    }
}

/// Cells with the most users, largest first, ties by name.
fn top_cells(at_peak: &[&CellSample], n: usize) -> Vec<(String, u64)> {
    let mut per_cell: HashMap<&str, f64> = HashMap::new();
    for sample in at_peak {
        *per_cell.entry(sample.cell.as_str()).or_default() += sample.users.unwrap_or(0.0);
    }

    let mut ranked: Vec<(&str, f64)> = per_cell.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(cell, users)| (cell.to_string(), user_count(users)))
        .collect()
}

/// The `n` samples with the lowest accessibility, ascending.
///
/// Ties keep input order. Samples without accessibility are ignored.
pub fn worst_accessibility(samples: &[CellSample], n: usize) -> Vec<AccessibilityEntry> {
    let mut entries: Vec<AccessibilityEntry> = samples
        .iter()
        .filter_map(|s| {
            s.accessibility.map(|acc| AccessibilityEntry {
                cell: s.cell.clone(),
                date: s.date,
                accessibility: acc,
            })
        })
        .collect();

    entries.sort_by(|a, b| a.accessibility.total_cmp(&b.accessibility));
    entries.truncate(n);
    entries
}
