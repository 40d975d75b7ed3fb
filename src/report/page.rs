//! Page model shared by the chart renderer and the PDF writer.

use crate::kpi::SummaryMetrics;
use crate::kpi::types::AccessibilityEntry;

/// Pixels per inch of rendered figures; also the PDF placement DPI.
pub const DPI: f32 = 100.0;

/// First text line, as a fraction of the page height from the bottom.
const TEXT_TOP: f32 = 0.93;
const LINE_HEIGHT: f32 = 0.038;
const TEXT_BOTTOM: f32 = 0.05;

/// Longest cell name printed before truncation.
const CELL_NAME_WIDTH: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Header,
    Subheader,
    Value,
    Highlight,
    Spacer,
}

impl TextStyle {
    pub fn font_size(&self) -> f32 {
        match self {
            TextStyle::Header => 12.0,
            TextStyle::Spacer => 1.0,
            _ => 11.0,
        }
    }

    pub fn bold(&self) -> bool {
        matches!(self, TextStyle::Header | TextStyle::Highlight)
    }

    /// RGB, 0-255.
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            TextStyle::Header => (0x2e, 0x74, 0xb5),
            TextStyle::Highlight => (0xc0, 0x00, 0x00),
            _ => (0x40, 0x40, 0x40),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub style: TextStyle,
}

impl TextLine {
    fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    fn spacer() -> Self {
        Self::new("", TextStyle::Spacer)
    }
}

/// A page of centred text lines.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPage {
    pub width_in: f32,
    pub height_in: f32,
    pub lines: Vec<TextLine>,
}

impl TextPage {
    fn square(lines: Vec<TextLine>) -> Self {
        Self {
            width_in: 10.0,
            height_in: 10.0,
            lines,
        }
    }

    /// Vertical positions (fraction of page height) of the printable lines.
    ///
    /// Spacers consume a line without producing output; lines that would
    /// fall below the bottom margin are dropped.
    pub fn layout(&self) -> Vec<(f32, &TextLine)> {
        let mut placed = Vec::new();
        let mut y = TEXT_TOP;
        for line in &self.lines {
            if line.style != TextStyle::Spacer {
                placed.push((y, line));
            }
            y -= LINE_HEIGHT;
            if y < TEXT_BOTTOM {
                break;
            }
        }
        placed
    }
}

/// A rendered chart, one per page.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPage {
    pub title: String,
    pub svg: String,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Text(TextPage),
    Chart(ChartPage),
}

impl Page {
    /// Page size in inches.
    pub fn size_in(&self) -> (f32, f32) {
        match self {
            Page::Text(p) => (p.width_in, p.height_in),
            Page::Chart(c) => (c.width_px as f32 / DPI, c.height_px as f32 / DPI),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Text(p) => p.lines.first().map(|l| l.text.as_str()).unwrap_or(""),
            Page::Chart(c) => &c.title,
        }
    }
}

/// Shortens long cell names to 15 characters plus `...`.
pub fn truncate_cell(name: &str) -> String {
    if name.chars().count() > CELL_NAME_WIDTH {
        let head: String = name.chars().take(CELL_NAME_WIDTH).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

/// Formats an integer with `,` thousands separators.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn or_dash(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}

/// Compact one-page summary of a group.
pub fn summary_page(group: &str, m: &SummaryMetrics) -> Page {
    use TextStyle::*;

    let mut lines = vec![
        TextLine::new(format!("Report: {group}"), Header),
        TextLine::spacer(),
        TextLine::new("Data volume (GB):", Subheader),
        TextLine::new(format!("4G: {:.2} | 5G: {:.2}", m.vol_4g, m.vol_5g), Value),
        TextLine::new(format!("Total: {:.2}", m.total_volume), Highlight),
        TextLine::spacer(),
        TextLine::new("5G offload:", Subheader),
        TextLine::new(format!("{:.2}%", m.offload * 100.0), Highlight),
        TextLine::spacer(),
        TextLine::new(format!("User peak @ {}", m.peak_hour), Subheader),
        TextLine::new(
            format!("4G: {} | 5G: {}", thousands(m.peak_4g), thousands(m.peak_5g)),
            Value,
        ),
        TextLine::new(format!("Total: {}", thousands(m.peak_total)), Highlight),
    ];

    if let Some(tput) = &m.tput {
        lines.extend([
            TextLine::spacer(),
            TextLine::new("Average throughput (Mbps):", Subheader),
            TextLine::new(
                format!("4G DL: {} UL: {}", or_dash(tput.lte_dl), or_dash(tput.lte_ul)),
                Value,
            ),
            TextLine::new(
                format!("5G DL: {} UL: {}", or_dash(tput.nr_dl), or_dash(tput.nr_ul)),
                Value,
            ),
        ]);
    }

    if !m.top_cells.is_empty() {
        lines.push(TextLine::spacer());
        lines.push(TextLine::new("Top cells (users):", Subheader));
        for (cell, users) in &m.top_cells {
            lines.push(TextLine::new(
                format!("{}: {}", truncate_cell(cell), thousands(*users)),
                Value,
            ));
        }
    }

    Page::Text(TextPage::square(lines))
}

/// The cells with the lowest accessibility.
pub fn accessibility_page(group: &str, worst: &[AccessibilityEntry]) -> Page {
    use TextStyle::*;

    let mut lines = vec![
        TextLine::new(format!("5 worst cells by accessibility ({group})"), Header),
        TextLine::spacer(),
    ];

    if worst.is_empty() {
        lines.push(TextLine::new("Accessibility data not available.", Value));
    } else {
        lines.push(TextLine::new("Cell          Accessibility (%)", Subheader));
        lines.push(TextLine::spacer());
        for entry in worst {
            lines.push(TextLine::new(
                format!("{}: {:.2}", truncate_cell(&entry.cell), entry.accessibility),
                Value,
            ));
        }
    }

    Page::Text(TextPage::square(lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::types::PeakThroughput;

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_truncate_cell() {
        assert_eq!(truncate_cell("SHORT"), "SHORT");
        assert_eq!(truncate_cell("123456789012345"), "123456789012345");
        assert_eq!(truncate_cell("4G-CE05CW-26-1A-EXTRA"), "4G-CE05CW-26-1A...");
    }

    #[test]
    fn test_summary_page_without_peak() {
        let Page::Text(page) = summary_page("GRP", &SummaryMetrics::default()) else {
            panic!("expected text page");
        };
        assert_eq!(page.lines[0].text, "Report: GRP");
        assert_eq!(page.lines[0].style, TextStyle::Header);
        assert!(page.lines.iter().any(|l| l.text == "User peak @ N/A"));
        assert!(page.lines.iter().any(|l| l.text == "0.00%"));
        assert!(!page.lines.iter().any(|l| l.text.contains("throughput")));
    }

    #[test]
    fn test_summary_page_with_throughput_and_cells() {
        let metrics = SummaryMetrics {
            offload: 0.4567,
            peak_hour: "20h".into(),
            peak_4g: 1200,
            peak_5g: 300,
            peak_total: 1500,
            tput: Some(PeakThroughput {
                lte_dl: Some(12.345),
                lte_ul: Some(1.0),
                nr_dl: None,
                nr_ul: None,
            }),
            top_cells: vec![("CELL-WITH-A-VERY-LONG-NAME".into(), 1100)],
            ..Default::default()
        };
        let Page::Text(page) = summary_page("GRP", &metrics) else {
            panic!("expected text page");
        };
        let texts: Vec<&str> = page.lines.iter().map(|l| l.text.as_str()).collect();

        assert!(texts.contains(&"45.67%"));
        assert!(texts.contains(&"4G: 1,200 | 5G: 300"));
        assert!(texts.contains(&"4G DL: 12.3 UL: 1.0"));
        assert!(texts.contains(&"5G DL: - UL: -"));
        assert!(texts.contains(&"CELL-WITH-A-VER...: 1,100"));
    }

    #[test]
    fn test_accessibility_page_empty() {
        let Page::Text(page) = accessibility_page("GRP", &[]) else {
            panic!("expected text page");
        };
        assert_eq!(page.lines.last().unwrap().text, "Accessibility data not available.");
    }

    #[test]
    fn test_layout_skips_spacers_and_stops_at_margin() {
        let mut lines = vec![TextLine::new("title", TextStyle::Header), TextLine::spacer()];
        for i in 0..40 {
            lines.push(TextLine::new(format!("line {i}"), TextStyle::Value));
        }
        let page = TextPage::square(lines);
        let placed = page.layout();

        assert_eq!(placed[0].0, TEXT_TOP);
        assert_eq!(placed[0].1.text, "title");
        assert!((placed[1].0 - (TEXT_TOP - 2.0 * LINE_HEIGHT)).abs() < 1e-6);
        assert!(placed.iter().all(|(y, _)| *y >= TEXT_BOTTOM));
        assert!(placed.len() < 41);
    }
}
