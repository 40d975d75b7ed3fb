use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};

use crate::kpi::types::{CellDistribution, LabeledSeries, Metric, TimeSeries};
use crate::kpi::utility::max;
use crate::samples::CellSample;

fn fold(buckets: BTreeMap<NaiveDateTime, Vec<f64>>, metric: Metric) -> TimeSeries {
    let aggregation = metric.aggregation();
    buckets
        .into_iter()
        .map(|(date, values)| (date, aggregation.apply(&values)))
        .collect()
}

/// Aggregates `metric` per timestamp, ascending.
///
/// Samples without a value for the metric are ignored; timestamps with no
/// values at all are omitted.
pub fn series_by_date<'a, I>(samples: I, metric: Metric) -> TimeSeries
where
    I: IntoIterator<Item = &'a CellSample>,
{
    let mut buckets: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        if let Some(v) = metric.value(sample) {
            buckets.entry(sample.date).or_default().push(v);
        }
    }
    fold(buckets, metric)
}

/// One aggregated series per site, sites in first-seen order.
///
/// Sites without any value for the metric are left out.
pub fn series_by_site<'a, I>(samples: I, metric: Metric) -> Vec<LabeledSeries>
where
    I: IntoIterator<Item = &'a CellSample>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut sites: HashMap<&str, BTreeMap<NaiveDateTime, Vec<f64>>> = HashMap::new();
    for sample in samples {
        let Some(v) = metric.value(sample) else {
            continue;
        };
        sites
            .entry(sample.site.as_str())
            .or_insert_with(|| {
                order.push(sample.site.as_str());
                BTreeMap::new()
            })
            .entry(sample.date)
            .or_default()
            .push(v);
    }

    order
        .into_iter()
        .filter_map(|site| {
            let buckets = sites.remove(site)?;
            Some(LabeledSeries {
                label: site.to_string(),
                points: fold(buckets, metric),
            })
        })
        .collect()
}

/// Users summed per timestamp for each cell, cells in first-seen order.
pub fn series_by_cell_users<'a, I>(samples: I) -> Vec<LabeledSeries>
where
    I: IntoIterator<Item = &'a CellSample>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut cells: HashMap<&str, BTreeMap<NaiveDateTime, Vec<f64>>> = HashMap::new();
    for sample in samples {
        let buckets = cells.entry(sample.cell.as_str()).or_insert_with(|| {
            order.push(sample.cell.as_str());
            BTreeMap::new()
        });
        if let Some(users) = sample.users {
            buckets.entry(sample.date).or_default().push(users);
        }
    }

    order
        .into_iter()
        .map(|cell| LabeledSeries {
            label: cell.to_string(),
            points: cells
                .remove(cell)
                .map(|b| fold(b, Metric::Users))
                .unwrap_or_default(),
        })
        .collect()
}

/// Every value of `metric` per cell, cells ordered by ascending maximum
/// (ties by cell name). Cells without any value are left out.
pub fn cell_distributions<'a, I>(samples: I, metric: Metric) -> Vec<CellDistribution>
where
    I: IntoIterator<Item = &'a CellSample>,
{
    let mut cells: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        if let Some(v) = metric.value(sample) {
            cells.entry(sample.cell.as_str()).or_default().push(v);
        }
    }

    let mut distributions: Vec<(f64, CellDistribution)> = cells
        .into_iter()
        .filter_map(|(cell, values)| {
            let peak = max(&values)?;
            Some((
                peak,
                CellDistribution {
                    cell: cell.to_string(),
                    values,
                },
            ))
        })
        .collect();

    // BTreeMap order already sorts by name, the stable sort keeps it for ties.
    distributions.sort_by(|a, b| a.0.total_cmp(&b.0));
    distributions.into_iter().map(|(_, d)| d).collect()
}
