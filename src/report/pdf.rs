//! PDF assembly with printpdf.
//!
//! Text pages are typeset with the built-in Helvetica faces; chart pages
//! embed the chart SVG scaled to fill the page.

use anyhow::{Result, anyhow};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rgb, Svg, SvgTransform,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use crate::report::page::{ChartPage, DPI, Page, TextPage};

const MM_PER_INCH: f32 = 25.4;
const LAYER: &str = "Layer 1";

/// Approximate Helvetica advance width, as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const MM_PER_PT: f32 = MM_PER_INCH / 72.0;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn page_size_mm(page: &Page) -> (Mm, Mm) {
    let (w, h) = page.size_in();
    (Mm(w * MM_PER_INCH), Mm(h * MM_PER_INCH))
}

/// Writes `pages` into a new PDF at `path`.
///
/// # Errors
///
/// Fails when there is nothing to write, a chart cannot be converted, or
/// the file cannot be written.
#[tracing::instrument(skip(path, pages), fields(path = %path.display(), pages = pages.len()))]
pub fn write_pdf(path: &Path, title: &str, pages: &[Page]) -> Result<()> {
    let Some(first) = pages.first() else {
        return Err(anyhow!("report has no pages"));
    };

    let (w, h) = page_size_mm(first);
    let (doc, page_idx, layer_idx) = PdfDocument::new(title, w, h, LAYER);
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("failed to load Helvetica: {e:?}"))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow!("failed to load Helvetica-Bold: {e:?}"))?,
    };

    let layer = doc.get_page(page_idx).get_layer(layer_idx);
    draw_page(&layer, first, &fonts)?;

    for page in &pages[1..] {
        let (w, h) = page_size_mm(page);
        let (page_idx, layer_idx) = doc.add_page(w, h, LAYER);
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        draw_page(&layer, page, &fonts)?;
    }

    save(doc, path)?;
    info!(path = %path.display(), pages = pages.len(), "PDF written");
    Ok(())
}

fn save(doc: PdfDocumentReference, path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| anyhow!("failed to create {}: {e}", path.display()))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| anyhow!("failed to write {}: {e:?}", path.display()))
}

fn draw_page(layer: &PdfLayerReference, page: &Page, fonts: &Fonts) -> Result<()> {
    debug!(title = page.title(), "Drawing page");
    match page {
        Page::Text(text) => {
            draw_text(layer, text, fonts);
            Ok(())
        }
        Page::Chart(chart) => draw_chart(layer, chart),
    }
}

fn draw_text(layer: &PdfLayerReference, page: &TextPage, fonts: &Fonts) {
    let width_mm = page.width_in * MM_PER_INCH;
    let height_mm = page.height_in * MM_PER_INCH;

    for (y_frac, line) in page.layout() {
        let size = line.style.font_size();
        let (r, g, b) = line.style.color();
        let font = if line.style.bold() {
            &fonts.bold
        } else {
            &fonts.regular
        };

        let text_width = line.text.chars().count() as f32 * size * AVG_GLYPH_WIDTH * MM_PER_PT;
        let x = ((width_mm - text_width) / 2.0).max(0.0);
        // Baseline sits a third of the font size below the line centre.
        let y = y_frac * height_mm - size * MM_PER_PT / 3.0;

        layer.set_fill_color(Color::Rgb(Rgb::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            None,
        )));
        layer.use_text(line.text.as_str(), size, Mm(x), Mm(y), font);
    }
}

fn draw_chart(layer: &PdfLayerReference, chart: &ChartPage) -> Result<()> {
    let svg = Svg::parse(&chart.svg)
        .map_err(|e| anyhow!("failed to convert chart '{}': {e:?}", chart.title))?;
    svg.add_to_layer(
        layer,
        SvgTransform {
            dpi: Some(DPI),
            ..Default::default()
        },
    );
    Ok(())
}
