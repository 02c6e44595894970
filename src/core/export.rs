//! CSV, spreadsheet and PDF serialization of [`TableData`].

use crate::core::error::ExportError;
use crate::core::tables::{CellValue, TableData};
use chrono::NaiveDate;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};
use tracing::info;

const PAGE_WIDTH_MM: f32 = 297.0;
const PAGE_HEIGHT_MM: f32 = 210.0;
const MARGIN_MM: f32 = 14.0;
const ROW_HEIGHT_MM: f32 = 6.0;
const BODY_FONT_SIZE: f32 = 8.0;
/// Rough width of one Helvetica glyph at the body font size.
const CHAR_WIDTH_MM: f32 = 1.6;

pub fn transaction_csv_name(transaction_id: &str) -> String {
    format!("transaksi_{transaction_id}.csv")
}

pub fn stock_csv_name(today: NaiveDate) -> String {
    format!("stok_produk_{today}.csv")
}

pub fn product_csv_name(product_name: Option<&str>) -> String {
    let name = product_name.unwrap_or("produk");
    let slug = name.split_whitespace().collect::<Vec<_>>().join("_");
    format!("produk_{slug}.csv")
}

pub fn owner_workbook_name(start: NaiveDate) -> String {
    format!("Laporan_Owner_{start}.xlsx")
}

pub fn report_pdf_name(start: NaiveDate, end: NaiveDate) -> String {
    format!("Laporan_Keuangan_{start}_{end}.pdf")
}

/// Header row first, every field quoted, embedded quotes doubled.
pub fn to_csv(table: &TableData) -> Result<Vec<u8>, ExportError> {
    if table.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(CellValue::raw))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(std::io::Error::other(e.to_string())))
}

/// One worksheet per table, named after the table title.
pub fn to_xlsx(tables: &[&TableData]) -> Result<Vec<u8>, ExportError> {
    if tables.iter().all(|t| t.is_empty()) {
        return Err(ExportError::NothingToExport);
    }
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0");

    for table in tables {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&table.title)?;
        for (col, header) in table.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &bold)?;
        }

        let body = table.rows.iter().chain(table.footer.iter());
        for (idx, row) in body.enumerate() {
            let row_num = idx as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    CellValue::Text(s) => {
                        worksheet.write_string(row_num, col, s)?;
                    }
                    CellValue::Amount(_) | CellValue::Outflow(_) | CellValue::Number(_) => {
                        let value = cell.as_number().unwrap_or_default() as f64;
                        worksheet.write_number_with_format(row_num, col, value, &money)?;
                    }
                    CellValue::Empty => {}
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn pdf_error(e: printpdf::Error) -> ExportError {
    ExportError::Pdf(e.to_string())
}

fn column_widths(table: &TableData) -> Vec<f32> {
    let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    let weights: Vec<f32> = (0..table.headers.len())
        .map(|col| {
            let longest = table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.display().chars().count())
                .chain(std::iter::once(table.headers[col].chars().count()))
                .max()
                .unwrap_or(1);
            longest.clamp(6, 60) as f32
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.iter().map(|w| usable * w / total).collect()
}

fn fit(text: &str, width_mm: f32) -> String {
    let max_chars = ((width_mm / CHAR_WIDTH_MM) as usize).max(3);
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars - 3).collect();
    format!("{cut}...")
}

fn draw_row(
    layer: &PdfLayerReference,
    cells: &[String],
    widths: &[f32],
    y: f32,
    font: &IndirectFontRef,
) {
    let mut x = MARGIN_MM;
    for (text, width) in cells.iter().zip(widths) {
        layer.use_text(fit(text, *width), BODY_FONT_SIZE, Mm(x), Mm(y), font);
        x += width;
    }
}

/// Landscape A4 summary: title, subtitle, then the table, spilling onto
/// extra pages as needed.
pub fn to_pdf(title: &str, subtitle: &str, table: &TableData) -> Result<Vec<u8>, ExportError> {
    if table.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let (doc, page, layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let widths = column_widths(table);
    let top = PAGE_HEIGHT_MM - 15.0;
    let mut current = doc.get_page(page).get_layer(layer);
    current.use_text(title, 14.0, Mm(MARGIN_MM), Mm(top), &bold);
    current.use_text(subtitle, 10.0, Mm(MARGIN_MM), Mm(top - 7.0), &regular);

    let mut y = top - 17.0;
    draw_row(&current, &table.headers, &widths, y, &bold);
    y -= ROW_HEIGHT_MM;

    let body: Vec<(&Vec<CellValue>, bool)> = table
        .rows
        .iter()
        .map(|row| (row, false))
        .chain(table.footer.iter().map(|row| (row, true)))
        .collect();
    for (row, is_footer) in body {
        if y < MARGIN_MM {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            current = doc.get_page(page).get_layer(layer);
            y = top;
            draw_row(&current, &table.headers, &widths, y, &bold);
            y -= ROW_HEIGHT_MM;
        }
        let cells: Vec<String> = row.iter().map(CellValue::display).collect();
        let font = if is_footer { &bold } else { &regular };
        draw_row(&current, &cells, &widths, y, font);
        y -= ROW_HEIGHT_MM;
    }

    doc.save_to_bytes().map_err(pdf_error)
}

/// Writes `bytes` to `dir/filename`, creating `dir` if needed.
pub fn write_file(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    std::fs::write(&path, bytes)?;
    info!("Exported {}", path.display());
    Ok(path)
}
