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
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
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

/// Formats a value in millions with thousands separators, e.g. `$12,345.6M`.
pub fn format_millions(value: f64) -> String {
    let millions = value / 1_000_000.0;
    format!("${}M", group_thousands(millions))
}

fn group_thousands(value: f64) -> String {
    let formatted = format!("{:.1}", value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, f),
        None => (formatted.as_str(), "0"),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Right-aligned money cell.
pub fn money_cell(value: f64) -> Cell {
    Cell::new(format_millions(value)).set_alignment(CellAlignment::Right)
}

/// Creates a cell for a percentage share of a total.
pub fn percent_cell(value: f64) -> Cell {
    Cell::new(format!("{value:.1}%")).set_alignment(CellAlignment::Right)
}

/// A growth rate's display text. An infinite rate means the institution had
/// no baseline value and is shown as "NEW".
fn growth_label(rate: f64) -> String {
    if rate.is_infinite() {
        "NEW".to_string()
    } else {
        format!("{rate:+.1}%")
    }
}

/// Creates a cell for a growth rate with color coding.
pub fn growth_cell(rate: f64) -> Cell {
    if rate.is_infinite() {
        return Cell::new(growth_label(rate))
            .fg(Color::Yellow)
            .add_attribute(Attribute::Bold)
            .set_alignment(CellAlignment::Right);
    }
    let color = if rate >= 0.0 { Color::Green } else { Color::Red };
    Cell::new(growth_label(rate))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// Signed absolute-change cell, colored like `growth_cell`.
pub fn change_cell(change: f64) -> Cell {
    let millions = change / 1_000_000.0;
    let text = format!("{}${}M", if change >= 0.0 { "+" } else { "" }, group_thousands(millions));
    let color = if change >= 0.0 { Color::Green } else { Color::Red };
    Cell::new(text).fg(color).set_alignment(CellAlignment::Right)
}

/// Creates a new `indicatif` spinner with standard styling.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}
