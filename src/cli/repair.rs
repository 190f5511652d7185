use super::ui;
use crate::core::config::AppConfig;
use crate::core::repair::{self, ScanReport, ValidationReport};
use crate::store::{self, RecordStore};
use anyhow::Result;
use comfy_table::Cell;
use tracing::info;

pub struct RepairOptions {
    /// Scan and validate without writing anything.
    pub dry_run: bool,
}

pub fn run(config: &AppConfig, options: &RepairOptions) -> Result<()> {
    let mut store = RecordStore::load(&config.database_path)?;

    let scan = repair::scan(store.records());
    display_scan(&scan);

    if options.dry_run {
        display_validation(&repair::validate(store.records()));
        return Ok(());
    }

    let report = repair::repair(store.records_mut());
    if report.is_noop() {
        println!("\nDatabase is already consistent; nothing to repair.");
    } else {
        let backup = store::backup_database(&config.database_path, &config.backup_dir)?;
        info!("Backed up database to {}", backup.display());
        store.save(&config.database_path)?;

        println!("\n{}", ui::style_text("Repairs applied", ui::StyleType::TotalLabel));
        if !report.flagged_periods.is_empty() {
            let periods: Vec<String> = report
                .flagged_periods
                .iter()
                .map(|p| p.to_string())
                .collect();
            println!("  Rescaled periods: {}", periods.join(", "));
            println!("  Records rescaled: {}", report.records_rescaled);
        }
        println!("  USD values generated: {}", report.usd_generated);
        println!("  Unverifiable USD values removed: {}", report.usd_removed);
    }

    display_validation(&repair::validate(store.records()));
    Ok(())
}

fn display_scan(scan: &ScanReport) {
    println!("\n{}", ui::style_text("Consistency scan", ui::StyleType::Title));

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Period"),
        ui::header_cell("Total Assets (MXN)"),
        ui::header_cell("Scale"),
    ]);
    for (period, total) in &scan.period_totals {
        let flagged = scan.flagged_periods.contains(period);
        let status = if flagged {
            Cell::new("thousands").fg(comfy_table::Color::Yellow)
        } else {
            Cell::new("ok")
        };
        table.add_row(vec![
            Cell::new(period.to_string()),
            ui::money_cell(*total),
            status,
        ]);
    }
    println!("{table}");

    let c = &scan.coverage;
    println!(
        "Coverage: {} records, {} with FX, {} with USD, {} complete",
        c.total, c.fx, c.usd, c.complete
    );
}

fn display_validation(validation: &ValidationReport) {
    println!("\n{}", ui::style_text("Validation", ui::StyleType::TotalLabel));
    for check in &validation.checks {
        let mark = if check.passed {
            ui::style_text("PASS", ui::StyleType::TotalValue)
        } else {
            ui::style_text("FAIL", ui::StyleType::Error)
        };
        println!("  [{mark}] {}: {}", check.name, check.detail);
    }
}
