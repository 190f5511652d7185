use super::ui;
use crate::core::config::AppConfig;
use crate::core::growth::{GrowthReport, SkippedWindow, WindowGrowth};
use crate::core::{Currency, PeriodIndex, Window};
use crate::store::RecordStore;
use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell};

pub struct GrowthOptions {
    /// Restrict the report to a single window.
    pub window: Option<Window>,
    /// Show the N best-performing institutions per window.
    pub top: Option<usize>,
}

pub fn run(config: &AppConfig, options: &GrowthOptions) -> Result<()> {
    let store = RecordStore::load(&config.database_path)?;
    let index = PeriodIndex::new(store.records());

    let windows: Vec<Window> = match options.window {
        Some(w) => vec![w],
        None => Window::ALL.to_vec(),
    };
    let report = GrowthReport::build(&index, &windows, Currency::Usd)
        .context("Database contains no records")?;

    println!(
        "\nGrowth report for {} (USD)",
        ui::style_text(&report.current_period.to_string(), ui::StyleType::Title)
    );

    for skipped in &report.skipped {
        let note = match skipped {
            SkippedWindow::NoBaseline(w) => {
                format!("{w}: no baseline period for a December report")
            }
            SkippedWindow::NoData(w, baseline) => {
                format!("{w}: no data for baseline {baseline}")
            }
        };
        println!("{}", ui::style_text(&format!("Skipped {note}"), ui::StyleType::Subtle));
    }

    if report.windows.is_empty() {
        println!("No growth windows could be computed.");
        return Ok(());
    }

    let num_windows = report.windows.len();
    for (i, window) in report.windows.iter().enumerate() {
        display_window(window, options.top);
        if i < num_windows - 1 {
            ui::print_separator();
        }
    }

    Ok(())
}

fn display_window(window: &WindowGrowth, top: Option<usize>) {
    println!(
        "\n{} (vs {})",
        ui::style_text(&window.window.to_string(), ui::StyleType::TotalLabel),
        window.baseline
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Afore"),
        ui::header_cell("Mutual Funds"),
        ui::header_cell("Third-Party"),
        ui::header_cell("Total Active"),
        ui::header_cell("Change"),
    ]);

    let rows: Vec<_> = match top {
        Some(n) => window.top_performers().into_iter().take(n).collect(),
        None => window.rows.iter().collect(),
    };
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.institution),
            ui::growth_cell(row.mutual_funds.growth_rate),
            ui::growth_cell(row.third_party.growth_rate),
            ui::growth_cell(row.total_active.growth_rate),
            ui::change_cell(row.total_active.absolute_change),
        ]);
    }

    let [mutual_funds, third_party, total_active] = window.industry_totals();
    table.add_row(vec![
        Cell::new("Industry").add_attribute(Attribute::Bold),
        ui::growth_cell(mutual_funds.growth_rate),
        ui::growth_cell(third_party.growth_rate),
        ui::growth_cell(total_active.growth_rate),
        ui::change_cell(total_active.absolute_change),
    ]);

    println!("{table}");
}
