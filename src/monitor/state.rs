//! Persistent monitor state: last check, known periods, pending approvals.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Summary entry for one approval unit. The unit's records live in their
/// own directory; this is the index the `--list-pending` view reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApproval {
    pub approval_id: String,
    pub created_at: DateTime<Utc>,
    pub record_count: usize,
    pub status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorState {
    pub last_check: Option<DateTime<Utc>>,
    pub period_hash: Option<String>,
    #[serde(default)]
    pub known_periods: Vec<String>,
    pub last_data_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pending_approvals: Vec<PendingApproval>,
}

impl MonitorState {
    /// Loads the state file, or a default state when it does not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No monitor state at {}, starting fresh", path.display());
            return Ok(MonitorState::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read monitor state: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Malformed monitor state: {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize monitor state")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write monitor state: {}", path.display()))?;
        Ok(())
    }

    pub fn pending(&self) -> Vec<&PendingApproval> {
        self.pending_approvals
            .iter()
            .filter(|a| a.status == ApprovalStatus::Pending)
            .collect()
    }

    pub fn find_approval(&mut self, approval_id: &str) -> Option<&mut PendingApproval> {
        self.pending_approvals
            .iter_mut()
            .find(|a| a.approval_id == approval_id)
    }

    /// Marks an approval resolved. Both outcomes are terminal.
    pub fn resolve(&mut self, approval_id: &str, status: ApprovalStatus) -> Result<()> {
        let approval = self
            .find_approval(approval_id)
            .with_context(|| format!("Approval ID {approval_id} not found"))?;
        approval.status = status;
        approval.resolved_at = Some(Utc::now());
        Ok(())
    }
}
