use std::ops::Range;

use printpdf::lopdf::Document;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference,
    Point, Rect, Rgb,
};

use crate::domain::export::ReportTable;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_X: f32 = 14.0;
const TOP: f32 = 282.0;
const TABLE_BOTTOM: f32 = 20.0;
const FOOTER_Y: f32 = 10.0;
const ROW_HEIGHT: f32 = 7.0;
const FIRST_TABLE_TOP: f32 = 248.0;
const CELL_PADDING: f32 = 1.5;
const BODY_SIZE: f32 = 8.0;
// average Helvetica glyph width at BODY_SIZE, in mm
const GLYPH_WIDTH: f32 = 1.45;

const HEADER_SHADE: (f32, f32, f32) = (0.886, 0.910, 0.941);
const STRIPE_SHADE: (f32, f32, f32) = (0.969, 0.976, 0.984);
const RULE_SHADE: (f32, f32, f32) = (0.6, 0.6, 0.6);

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// A4 portrait: header block on the first page, table header repeated on every page.
pub fn render_document(table: &ReportTable) -> Result<Vec<u8>, printpdf::Error> {
    let pages = paginate(table.rows.len());
    let page_count = pages.len();

    let (document, first_page, first_layer) =
        PdfDocument::new(table.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");
    let fonts = Fonts {
        regular: document.add_builtin_font(BuiltinFont::Helvetica)?,
        bold: document.add_builtin_font(BuiltinFont::HelveticaBold)?,
    };

    for (index, rows) in pages.into_iter().enumerate() {
        let layer = if index == 0 {
            document.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = document.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");
            document.get_page(page).get_layer(layer)
        };

        let table_top = if index == 0 {
            draw_heading(&layer, table, &fonts);
            FIRST_TABLE_TOP
        } else {
            TOP
        };

        draw_table(&layer, table, &fonts, rows, table_top);
        layer.use_text(
            format!("Page {} of {}", index + 1, page_count),
            BODY_SIZE,
            Mm(PAGE_WIDTH / 2.0 - 10.0),
            Mm(FOOTER_Y),
            &fonts.regular,
        );
    }

    document.save_to_bytes()
}

/// Row ranges per page; an empty table still yields one page.
pub fn paginate(row_count: usize) -> Vec<Range<usize>> {
    let first = rows_fitting(FIRST_TABLE_TOP);
    let rest = rows_fitting(TOP);

    let mut pages = Vec::new();
    let mut start = 0;
    let mut capacity = first;
    loop {
        let end = (start + capacity).min(row_count);
        pages.push(start..end);
        if end >= row_count {
            return pages;
        }
        start = end;
        capacity = rest;
    }
}

fn rows_fitting(table_top: f32) -> usize {
    // one row is the repeated column header
    let rows = ((table_top - TABLE_BOTTOM) / ROW_HEIGHT).floor() as usize;
    rows.saturating_sub(1).max(1)
}

fn draw_heading(layer: &PdfLayerReference, table: &ReportTable, fonts: &Fonts) {
    layer.use_text(
        win_ansi(&table.organization),
        14.0,
        Mm(MARGIN_X),
        Mm(TOP),
        &fonts.bold,
    );
    layer.use_text(table.title, 12.0, Mm(MARGIN_X), Mm(TOP - 7.0), &fonts.bold);
    layer.use_text(
        win_ansi(&format!("Period: {}", table.summary.period)),
        9.0,
        Mm(MARGIN_X),
        Mm(TOP - 14.0),
        &fonts.regular,
    );
    layer.use_text(
        format!("Generated: {}", table.summary.generated),
        9.0,
        Mm(MARGIN_X),
        Mm(TOP - 19.0),
        &fonts.regular,
    );
    layer.use_text(
        win_ansi(&table.summary.headline()),
        9.0,
        Mm(MARGIN_X),
        Mm(TOP - 26.0),
        &fonts.bold,
    );

    layer.set_outline_color(rgb(RULE_SHADE));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN_X), Mm(TOP - 29.0)), false),
            (Point::new(Mm(PAGE_WIDTH - MARGIN_X), Mm(TOP - 29.0)), false),
        ],
        is_closed: false,
    });
}

fn draw_table(
    layer: &PdfLayerReference,
    table: &ReportTable,
    fonts: &Fonts,
    rows: Range<usize>,
    table_top: f32,
) {
    let width: f32 = table.columns.iter().map(|column| column.pdf_width_mm).sum();

    shade(layer, table_top, width, HEADER_SHADE);
    let labels: Vec<&str> = table.columns.iter().map(|column| column.label).collect();
    draw_row(layer, table, &labels, table_top, &fonts.bold);

    let mut top = table_top - ROW_HEIGHT;
    for (stripe, row) in table.rows[rows].iter().enumerate() {
        if stripe % 2 == 1 {
            shade(layer, top, width, STRIPE_SHADE);
        }
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        draw_row(layer, table, &cells, top, &fonts.regular);
        top -= ROW_HEIGHT;
    }
}

fn shade(layer: &PdfLayerReference, top: f32, width: f32, color: (f32, f32, f32)) {
    layer.set_fill_color(rgb(color));
    layer.add_rect(
        Rect::new(
            Mm(MARGIN_X),
            Mm(top - ROW_HEIGHT),
            Mm(MARGIN_X + width),
            Mm(top),
        )
        .with_mode(PaintMode::Fill),
    );
    layer.set_fill_color(rgb((0.0, 0.0, 0.0)));
}

fn draw_row(
    layer: &PdfLayerReference,
    table: &ReportTable,
    cells: &[&str],
    top: f32,
    font: &IndirectFontRef,
) {
    let baseline = top - ROW_HEIGHT + 2.2;
    let mut x = MARGIN_X;
    for (column, cell) in table.columns.iter().zip(cells) {
        layer.use_text(
            fit(&win_ansi(cell), column.pdf_width_mm),
            BODY_SIZE,
            Mm(x + CELL_PADDING),
            Mm(baseline),
            font,
        );
        x += column.pdf_width_mm;
    }
}

/// The builtin fonts only cover WinAnsi; anything else would be dropped silently.
fn win_ansi(text: &str) -> String {
    let mut buffer = [0_u8; 4];
    text.chars()
        .map(|ch| {
            let encoded = Document::encode_text(Some("WinAnsiEncoding"), ch.encode_utf8(&mut buffer));
            if encoded.len() == 1 { ch } else { '?' }
        })
        .collect()
}

/// Truncates text that would overflow its column.
fn fit(text: &str, width_mm: f32) -> String {
    let max_chars = ((width_mm - 2.0 * CELL_PADDING) / GLYPH_WIDTH).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(2)).collect();
    format!("{kept}..")
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}
