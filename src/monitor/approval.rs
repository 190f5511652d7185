//! Approval units: batches of new records awaiting a human decision.

use crate::core::record::{RawRecord, Record, RecordKey};
use crate::store::RecordStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const RECORDS_FILE: &str = "new_records.json";

/// Records present in freshly processed output but absent from the current
/// store, by composite key. Order of the processed output is preserved.
pub fn extract_new_records(store: &RecordStore, processed: &RecordStore) -> Vec<Record> {
    let existing: HashSet<RecordKey> = store.key_set();
    processed
        .records()
        .iter()
        .filter(|r| !existing.contains(&r.key()))
        .cloned()
        .collect()
}

/// A pending approval persisted as a directory with a `new_records.json`
/// array. Deleted on resolution; pending units persist indefinitely.
#[derive(Debug)]
pub struct ApprovalUnit {
    pub approval_id: String,
    dir: PathBuf,
    records: Vec<Record>,
}

impl ApprovalUnit {
    pub fn create<P: AsRef<Path>>(
        pending_dir: P,
        run_id: &str,
        records: Vec<Record>,
    ) -> Result<ApprovalUnit> {
        let approval_id = format!("approval_{run_id}");
        let dir = pending_dir.as_ref().join(&approval_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create approval dir: {}", dir.display()))?;

        let raw: Vec<RawRecord> = records.iter().map(Record::to_raw).collect();
        let contents = serde_json::to_string_pretty(&raw)?;
        fs::write(dir.join(RECORDS_FILE), contents)
            .with_context(|| format!("Failed to write records for {approval_id}"))?;

        info!("Created approval unit {approval_id} with {} records", records.len());
        Ok(ApprovalUnit {
            approval_id,
            dir,
            records,
        })
    }

    pub fn open<P: AsRef<Path>>(pending_dir: P, approval_id: &str) -> Result<ApprovalUnit> {
        let dir = pending_dir.as_ref().join(approval_id);
        if !dir.exists() {
            anyhow::bail!("Approval ID {approval_id} not found");
        }
        let records_path = dir.join(RECORDS_FILE);
        let contents = fs::read_to_string(&records_path)
            .with_context(|| format!("Records file not found for {approval_id}"))?;
        let raw: Vec<RawRecord> = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed records file for {approval_id}"))?;
        let records = raw
            .into_iter()
            .map(Record::from_raw)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid record in {approval_id}"))?;

        Ok(ApprovalUnit {
            approval_id: approval_id.to_string(),
            dir,
            records,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Removes the unit directory. Called on both approval and rejection.
    pub fn discard(&self) -> Result<()> {
        fs::remove_dir_all(&self.dir)
            .with_context(|| format!("Failed to remove approval dir: {}", self.dir.display()))?;
        info!("Cleaned up approval files for {}", self.approval_id);
        Ok(())
    }

    /// Human-readable summary grouped by period, for review output and the
    /// approval notification.
    pub fn summary(&self) -> String {
        if self.records.is_empty() {
            return "No new records found.".to_string();
        }

        struct PeriodSummary {
            institutions: BTreeSet<String>,
            concepts: BTreeSet<String>,
            count: usize,
        }

        let mut periods: BTreeMap<String, PeriodSummary> = BTreeMap::new();
        for record in &self.records {
            let entry = periods
                .entry(record.period.to_string())
                .or_insert_with(|| PeriodSummary {
                    institutions: BTreeSet::new(),
                    concepts: BTreeSet::new(),
                    count: 0,
                });
            entry.institutions.insert(record.institution.clone());
            entry.concepts.insert(record.concept.clone());
            entry.count += 1;
        }

        let mut summary = format!("Total new records: {}\n\n", self.records.len());
        for (period, data) in periods {
            summary.push_str(&format!("Period {period}:\n"));
            summary.push_str(&format!("  - Records: {}\n", data.count));
            summary.push_str(&format!(
                "  - Afores: {}\n",
                data.institutions.into_iter().collect::<Vec<_>>().join(", ")
            ));
            summary.push_str(&format!(
                "  - Concepts: {}\n\n",
                data.concepts.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }
        summary
    }
}

/// Delivery seam for approval notifications. Actual email transport is an
/// external collaborator; the default implementation records the summary in
/// the log so an operator sees it either way.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

pub struct LogNotifier {
    recipient: Option<String>,
}

impl LogNotifier {
    pub fn from_env() -> Self {
        let env = crate::core::config::EmailEnv::from_env();
        if env.notify_address.is_some() && !env.is_complete() {
            warn!(
                "SISET_NOTIFY_EMAIL is set but SISET_EMAIL_USER or SISET_EMAIL_PASSWORD \
                 is missing; notifications stay in the log"
            );
        }
        LogNotifier {
            recipient: env.notify_address,
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        match &self.recipient {
            Some(addr) => info!("NOTIFICATION for {addr}: {subject}\n{body}"),
            None => info!("NOTIFICATION: {subject}\n{body}"),
        }
        Ok(())
    }
}
