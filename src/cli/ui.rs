use crate::core::currency::{Amount, format_rupiah};
use crate::core::tables::{CellValue, TableData};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Money cell, green when non-negative and red otherwise.
pub fn net_cell(amount: Amount) -> Cell {
    let color = if amount >= 0 { Color::Green } else { Color::Red };
    Cell::new(format_rupiah(amount))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// Placeholder cell for missing values.
pub fn empty_cell() -> Cell {
    Cell::new("-").fg(Color::DarkGrey)
}

fn value_cell(value: &CellValue) -> Cell {
    match value {
        CellValue::Text(s) => Cell::new(s),
        CellValue::Amount(a) if *a < 0 => net_cell(*a),
        CellValue::Amount(_) | CellValue::Number(_) => {
            Cell::new(value.display()).set_alignment(CellAlignment::Right)
        }
        CellValue::Outflow(_) => Cell::new(value.display())
            .fg(Color::Red)
            .set_alignment(CellAlignment::Right),
        CellValue::Empty => empty_cell(),
    }
}

/// Renders a [`TableData`] with its footer in bold.
pub fn render_table(data: &TableData) -> Table {
    let mut table = new_styled_table();
    table.set_header(data.headers.iter().map(|h| header_cell(h)));
    for row in &data.rows {
        table.add_row(row.iter().map(value_cell));
    }
    if let Some(footer) = &data.footer {
        table.add_row(
            footer
                .iter()
                .map(|value| value_cell(value).add_attribute(Attribute::Bold)),
        );
    }
    table
}

/// Prints a titled table, or a dim notice when it has no rows.
pub fn print_table(data: &TableData, empty_message: &str) {
    println!("\n{}", style_text(&data.title, StyleType::Title));
    if data.is_empty() {
        println!("{}", style_text(empty_message, StyleType::Subtle));
    } else {
        println!("{}", render_table(data));
    }
}

pub fn print_notice(message: &str) {
    println!("{}", style_text(message, StyleType::Subtle));
}

pub fn print_error(message: &str) {
    eprintln!("{}", style_text(message, StyleType::Error));
}

/// Creates a spinner shown while data loads.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
