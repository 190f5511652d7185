//! Watches the regulator's summary page for new reporting periods and runs
//! the acquisition pipeline when something changes. New records never enter
//! the database directly; they wait in an approval unit until an operator
//! approves or rejects them.

pub mod approval;
pub mod pipeline;
pub mod source;
pub mod state;

use crate::core::config::{AppConfig, MonitorConfig};
use crate::store::{self, RecordStore};
use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

use approval::{ApprovalUnit, LogNotifier, Notifier};
use source::SummarySource;
use state::{ApprovalStatus, MonitorState, PendingApproval};

pub struct Monitor {
    config: AppConfig,
    monitor: MonitorConfig,
    notifier: Box<dyn Notifier>,
}

impl Monitor {
    pub fn new(config: AppConfig) -> Result<Self> {
        let monitor = config.monitor()?.clone();
        Ok(Monitor {
            config,
            monitor,
            notifier: Box::new(LogNotifier::from_env()),
        })
    }

    fn monitor_config(&self) -> &MonitorConfig {
        &self.monitor
    }

    /// One full check cycle: poll the summary page, and when new periods
    /// appear, run the pipeline and package the resulting records for
    /// approval. The check timestamp is recorded even when nothing changed.
    pub async fn run_once(&self) -> Result<()> {
        let monitor = self.monitor_config();
        let mut state = MonitorState::load(&monitor.state_file)?;

        match store::prune_backups(&self.config.backup_dir, monitor.retention_days) {
            Ok(0) => {}
            Ok(n) => info!("Pruned {n} old backups"),
            Err(e) => warn!("Backup pruning failed: {e:#}"),
        }

        let new_periods = self.check_for_updates(&mut state).await?;
        state.last_check = Some(Utc::now());

        if new_periods.is_empty() {
            info!("No new periods detected");
            state.save(&monitor.state_file)?;
            return Ok(());
        }

        info!("New periods detected: {}", new_periods.join(", "));
        state.save(&monitor.state_file)?;

        store::backup_database(&self.config.database_path, &self.config.backup_dir)?;
        pipeline::run(&monitor.pipeline).await?;

        let store = RecordStore::load(&self.config.database_path)?;
        let processed = RecordStore::load(&monitor.processed_output)
            .context("Pipeline finished but produced no readable output")?;
        let new_records = approval::extract_new_records(&store, &processed);

        if new_records.is_empty() {
            info!("Pipeline output contains no records the database lacks");
            state.save(&monitor.state_file)?;
            return Ok(());
        }

        let run_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let unit = ApprovalUnit::create(&monitor.pending_dir, &run_id, new_records)?;

        state.pending_approvals.push(PendingApproval {
            approval_id: unit.approval_id.clone(),
            created_at: Utc::now(),
            record_count: unit.records().len(),
            status: ApprovalStatus::Pending,
            resolved_at: None,
        });
        state.last_data_update = Some(Utc::now());
        state.save(&monitor.state_file)?;

        let subject = format!(
            "CONSAR data update pending approval ({} records)",
            unit.records().len()
        );
        if let Err(e) = self.notifier.notify(&subject, &unit.summary()).await {
            warn!("Approval notification failed: {e:#}");
        }

        info!(
            "Approval unit {} is ready for review; run with --review {} to inspect it",
            unit.approval_id, unit.approval_id
        );
        Ok(())
    }

    /// Checks the summary page for periods not yet in the known set. Updates
    /// the stored hash and known set; returns the newly seen periods.
    async fn check_for_updates(&self, state: &mut MonitorState) -> Result<Vec<String>> {
        let monitor = self.monitor_config();
        let summary = SummarySource::new(&monitor.summary_url);
        let periods = summary.fetch_periods().await?;
        let hash = source::period_hash(&periods);

        if state.period_hash.as_deref() == Some(hash.as_str()) {
            return Ok(Vec::new());
        }

        let new_periods: Vec<String> = periods
            .iter()
            .filter(|p| !state.known_periods.contains(p))
            .cloned()
            .collect();

        state.period_hash = Some(hash);
        state.known_periods = periods.into_iter().collect();
        Ok(new_periods)
    }

    /// Repeats `run_once` on the configured interval. Errors in a cycle are
    /// logged, not fatal, so a transient network failure does not stop the
    /// watch.
    pub async fn run_forever(&self) -> Result<()> {
        let interval = Duration::from_secs(self.monitor_config().check_interval_hours * 3600);
        info!(
            "Monitoring every {} hours",
            self.monitor_config().check_interval_hours
        );
        loop {
            if let Err(e) = self.run_once().await {
                warn!("Monitor cycle failed: {e:#}");
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Merges an approval unit into the database after backing it up, then
    /// removes the unit.
    pub fn approve(&self, approval_id: &str) -> Result<usize> {
        let monitor = self.monitor_config();
        let unit = ApprovalUnit::open(&monitor.pending_dir, approval_id)?;

        let mut state = MonitorState::load(&monitor.state_file)?;
        state.resolve(approval_id, ApprovalStatus::Approved)?;

        store::backup_database(&self.config.database_path, &self.config.backup_dir)?;
        let mut store = RecordStore::load(&self.config.database_path)?;
        let merged = store.merge(unit.records().to_vec());
        store.save(&self.config.database_path)?;

        state.save(&monitor.state_file)?;
        unit.discard()?;

        info!("Approved {approval_id}: merged {merged} records");
        Ok(merged)
    }

    /// Marks an approval unit rejected and removes it without touching the
    /// database.
    pub fn reject(&self, approval_id: &str) -> Result<()> {
        let monitor = self.monitor_config();
        let unit = ApprovalUnit::open(&monitor.pending_dir, approval_id)?;

        let mut state = MonitorState::load(&monitor.state_file)?;
        state.resolve(approval_id, ApprovalStatus::Rejected)?;
        state.save(&monitor.state_file)?;
        unit.discard()?;

        info!("Rejected {approval_id}");
        Ok(())
    }

    pub fn open_unit(&self, approval_id: &str) -> Result<ApprovalUnit> {
        ApprovalUnit::open(&self.monitor_config().pending_dir, approval_id)
    }

    pub fn load_state(&self) -> Result<MonitorState> {
        MonitorState::load(&self.monitor_config().state_file)
    }
}
