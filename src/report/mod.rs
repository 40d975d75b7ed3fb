//! Report composition.
//!
//! [`ReportGenerator`] walks every group and produces the page sequence:
//! summary, worst accessibility, metric grid, then per technology the
//! boxplots, per-site metric lines and users-per-cell facets.

pub mod charts;
pub mod page;
pub mod pdf;

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::kpi::{self, Metric};
use crate::samples::{self, CellSample};
use crate::tech::Tech;
pub use page::{ChartPage, Page};

/// Facet grid per users-per-cell page.
pub const FACET_ROWS: usize = 24;
pub const FACET_COLS: usize = 3;

/// Number of cells on the worst-accessibility page.
pub const WORST_CELLS: usize = 5;

pub struct ReportGenerator {
    samples: Vec<CellSample>,
    groups: Vec<String>,
}

impl ReportGenerator {
    /// Builds a generator over the report-ready subset of `samples`.
    ///
    /// `groups` restricts and orders the groups; `None` means every group in
    /// first-seen order. Requested groups without any report-ready sample
    /// are dropped with a warning.
    pub fn new(samples: Vec<CellSample>, groups: Option<Vec<String>>) -> Self {
        let samples = samples::report_ready(samples);
        let present = samples::groups(&samples);
        let groups = match groups {
            Some(groups) => groups
                .into_iter()
                .map(|g| g.to_uppercase())
                .filter(|g| {
                    let found = present.contains(g);
                    if !found {
                        warn!(group = %g, "Requested group has no complete samples, skipping");
                    }
                    found
                })
                .collect(),
            None => present,
        };
        Self { samples, groups }
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn samples(&self) -> &[CellSample] {
        &self.samples
    }

    fn group_samples(&self, group: &str) -> Vec<CellSample> {
        self.samples
            .iter()
            .filter(|s| s.group == group)
            .cloned()
            .collect()
    }

    /// Renders every page of the report, in order.
    ///
    /// # Errors
    ///
    /// Fails when no group has a complete sample, or a chart cannot be drawn.
    pub fn pages(&self) -> Result<Vec<Page>> {
        if self.groups.is_empty() {
            return Err(anyhow!("no complete samples to report on"));
        }
        let mut pages = Vec::new();
        for group in &self.groups {
            let before = pages.len();
            self.group_pages(group, &mut pages)
                .with_context(|| format!("failed to build pages for group {group}"))?;
            info!(group = %group, pages = pages.len() - before, "Group rendered");
        }
        Ok(pages)
    }

    #[tracing::instrument(skip(self, pages))]
    fn group_pages(&self, group: &str, pages: &mut Vec<Page>) -> Result<()> {
        let rows = self.group_samples(group);

        let summary = kpi::summarize(&rows);
        crate::output::print_json(group, &summary)?;
        pages.push(page::summary_page(group, &summary));

        let worst = kpi::worst_accessibility(&rows, WORST_CELLS);
        pages.push(page::accessibility_page(group, &worst));

        pages.push(Page::Chart(self.metric_grid(group, &rows)?));

        for tech in Tech::ALL {
            let tech_rows: Vec<&CellSample> = rows.iter().filter(|s| s.tech == tech).collect();
            self.boxplot_pages(group, tech, &tech_rows, pages)?;
            if tech_rows.is_empty() {
                debug!(group, %tech, "no samples for technology");
                continue;
            }
            self.site_pages(group, tech, &tech_rows, pages)?;
            self.facet_pages(group, tech, &tech_rows, pages)?;
        }
        Ok(())
    }

    fn metric_grid(&self, group: &str, rows: &[CellSample]) -> Result<ChartPage> {
        let panels: Vec<_> = Metric::ALL
            .iter()
            .map(|&metric| {
                let lte = kpi::series_by_date(rows.iter().filter(|s| s.tech == Tech::Lte), metric);
                let nr = kpi::series_by_date(rows.iter().filter(|s| s.tech == Tech::Nr), metric);
                (metric, lte, nr)
            })
            .collect();
        charts::dual_axis_grid(&format!("Metrics for Grupo {group}"), &panels)
    }

    fn boxplot_pages(
        &self,
        group: &str,
        tech: Tech,
        rows: &[&CellSample],
        pages: &mut Vec<Page>,
    ) -> Result<()> {
        for metric in Metric::DISTRIBUTIONS {
            let cells = kpi::cell_distributions(rows.iter().copied(), metric);
            if cells.is_empty() {
                continue;
            }
            let title = format!("Boxplot for {metric} - {tech} - {group}");
            pages.push(Page::Chart(charts::boxplots(&title, metric, &cells)?));
        }
        Ok(())
    }

    fn site_pages(
        &self,
        group: &str,
        tech: Tech,
        rows: &[&CellSample],
        pages: &mut Vec<Page>,
    ) -> Result<()> {
        for metric in Metric::ALL {
            let series = kpi::series_by_site(rows.iter().copied(), metric);
            let title = format!("{metric} for Grupo {group} - {tech}");
            pages.push(Page::Chart(charts::line_series(&title, metric, &series)?));
        }
        Ok(())
    }

    fn facet_pages(
        &self,
        group: &str,
        tech: Tech,
        rows: &[&CellSample],
        pages: &mut Vec<Page>,
    ) -> Result<()> {
        let cells = kpi::series_by_cell_users(rows.iter().copied());
        for (n, chunk) in cells.chunks(FACET_ROWS * FACET_COLS).enumerate() {
            let title = format!("Users per Cell - {group} - {tech} (Page {})", n + 1);
            pages.push(Page::Chart(charts::facets(&title, chunk, FACET_ROWS, FACET_COLS)?));
        }
        Ok(())
    }
}

/// Writes each chart page as `NNN_<title>.svg` into `dir`.
pub fn write_svgs(dir: &Path, pages: &[Page]) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut written = 0;
    for (idx, page) in pages.iter().enumerate() {
        let Page::Chart(chart) = page else { continue };
        let path = dir.join(format!("{:03}_{}.svg", idx + 1, slug(&chart.title)));
        fs::write(&path, &chart.svg).with_context(|| format!("failed to write {}", path.display()))?;
        written += 1;
    }
    info!(dir = %dir.display(), written, "Chart SVGs written");
    Ok(written)
}

fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
