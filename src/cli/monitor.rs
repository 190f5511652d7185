use super::ui;
use crate::core::config::AppConfig;
use crate::monitor::state::ApprovalStatus;
use crate::monitor::Monitor;
use anyhow::Result;
use comfy_table::Cell;

pub struct MonitorOptions {
    pub run_once: bool,
    pub approve: Option<String>,
    pub reject: Option<String>,
    pub review: Option<String>,
    pub list_pending: bool,
}

pub async fn run(config: &AppConfig, options: &MonitorOptions) -> Result<()> {
    let monitor = Monitor::new(config.clone())?;

    if let Some(id) = &options.approve {
        let merged = monitor.approve(id)?;
        println!("Approved {id}: {merged} records merged into the database.");
        return Ok(());
    }
    if let Some(id) = &options.reject {
        monitor.reject(id)?;
        println!("Rejected {id}; the database was not changed.");
        return Ok(());
    }
    if let Some(id) = &options.review {
        return review(&monitor, id);
    }
    if options.list_pending {
        return list_pending(&monitor);
    }

    if options.run_once {
        let pb = ui::new_spinner("Checking for new reporting periods...");
        let result = monitor.run_once().await;
        pb.finish_and_clear();
        result
    } else {
        monitor.run_forever().await
    }
}

const REVIEW_SAMPLE: usize = 10;

fn review(monitor: &Monitor, approval_id: &str) -> Result<()> {
    let unit = monitor.open_unit(approval_id)?;

    println!(
        "\n{}",
        ui::style_text(&format!("Review {approval_id}"), ui::StyleType::Title)
    );
    println!("\n{}", unit.summary());

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Period"),
        ui::header_cell("Afore"),
        ui::header_cell("Siefore"),
        ui::header_cell("Concept"),
        ui::header_cell("Value (MXN)"),
    ]);
    for record in unit.records().iter().take(REVIEW_SAMPLE) {
        table.add_row(vec![
            Cell::new(record.period.to_string()),
            Cell::new(&record.institution),
            Cell::new(&record.sub_fund),
            Cell::new(&record.concept),
            ui::money_cell(record.value_mxn),
        ]);
    }
    println!("{table}");

    let remaining = unit.records().len().saturating_sub(REVIEW_SAMPLE);
    if remaining > 0 {
        println!(
            "{}",
            ui::style_text(&format!("... and {remaining} more records"), ui::StyleType::Subtle)
        );
    }
    println!("\nRun with --approve {approval_id} or --reject {approval_id} to resolve.");
    Ok(())
}

fn list_pending(monitor: &Monitor) -> Result<()> {
    let state = monitor.load_state()?;
    let pending = state.pending();
    if pending.is_empty() {
        println!("No approvals pending.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Approval ID"),
        ui::header_cell("Created"),
        ui::header_cell("Records"),
        ui::header_cell("Status"),
    ]);
    for approval in pending {
        let status = match approval.status {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        };
        table.add_row(vec![
            Cell::new(&approval.approval_id),
            Cell::new(approval.created_at.format("%Y-%m-%d %H:%M UTC").to_string()),
            Cell::new(approval.record_count.to_string()),
            Cell::new(status),
        ]);
    }
    println!("{table}");
    Ok(())
}
