//! The JSON record store.
//!
//! A single array file read and written wholesale. Consistency comes from
//! backup-then-rewrite, not from partial updates; the store is only mutated
//! at the end of an operation, after a backup exists.

use crate::core::record::{RawRecord, Record, RecordKey};
use anyhow::{Context, Result};
use chrono::Local;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const BACKUP_PREFIX: &str = "consar_db_backup_";

#[derive(Debug)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Loads and normalizes the store file. Records failing normalization
    /// are flagged and skipped; duplicates by composite key keep the first
    /// occurrence, in input order.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read record store: {}", path.display()))?;
        let raw: Vec<RawRecord> = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed record store: {}", path.display()))?;

        let total = raw.len();
        let mut rejected = 0;
        let mut normalized = Vec::with_capacity(total);
        for r in raw {
            match Record::from_raw(r) {
                Ok(record) => normalized.push(record),
                Err(e) => {
                    rejected += 1;
                    warn!("Skipping non-conforming record: {e}");
                }
            }
        }

        let store = Self::from_records(normalized);
        info!(
            "Loaded {} records from {} ({} rejected, {} duplicate)",
            store.len(),
            path.display(),
            rejected,
            total - rejected - store.len()
        );
        Ok(store)
    }

    /// Builds a store from normalized records, deduplicating by key.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut seen: HashSet<RecordKey> = HashSet::with_capacity(records.len());
        let mut deduped = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.key()) {
                deduped.push(record);
            }
        }
        RecordStore { records: deduped }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn key_set(&self) -> HashSet<RecordKey> {
        self.records.iter().map(Record::key).collect()
    }

    /// Appends records whose key is not already present. Returns how many
    /// were added; merging the same batch twice adds nothing.
    pub fn merge(&mut self, new_records: Vec<Record>) -> usize {
        let mut keys = self.key_set();
        let before = self.records.len();
        for record in new_records {
            if keys.insert(record.key()) {
                self.records.push(record);
            }
        }
        self.records.len() - before
    }

    /// Full-file rewrite of the wire representation.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let raw: Vec<RawRecord> = self.records.iter().map(Record::to_raw).collect();
        let contents = serde_json::to_string(&raw).context("Failed to serialize record store")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write record store: {}", path.display()))?;
        debug!("Saved {} records to {}", self.records.len(), path.display());
        Ok(())
    }
}

/// Copies the store file into `backup_dir` under a timestamped name.
/// Mandatory before any mutation of the store.
pub fn backup_database<P: AsRef<Path>, Q: AsRef<Path>>(
    database_path: P,
    backup_dir: Q,
) -> Result<PathBuf> {
    let database_path = database_path.as_ref();
    let backup_dir = backup_dir.as_ref();
    fs::create_dir_all(backup_dir)
        .with_context(|| format!("Failed to create backup dir: {}", backup_dir.display()))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = backup_dir.join(format!("{BACKUP_PREFIX}{timestamp}.json"));
    fs::copy(database_path, &backup_path).with_context(|| {
        format!(
            "Failed to back up {} to {}",
            database_path.display(),
            backup_path.display()
        )
    })?;
    info!("Database backup created: {}", backup_path.display());
    Ok(backup_path)
}

/// Removes backups older than the retention period. Returns how many were
/// deleted.
pub fn prune_backups<P: AsRef<Path>>(backup_dir: P, retention_days: u64) -> Result<usize> {
    let backup_dir = backup_dir.as_ref();
    if !backup_dir.exists() {
        return Ok(0);
    }
    let cutoff = SystemTime::now() - Duration::from_secs(retention_days * 24 * 3600);
    let mut removed = 0;

    for entry in fs::read_dir(backup_dir)
        .with_context(|| format!("Failed to read backup dir: {}", backup_dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(BACKUP_PREFIX) || !name.ends_with(".json") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if modified < cutoff {
            fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove old backup: {name}"))?;
            info!("Removed old backup: {name}");
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::period::Period;
    use tempfile::tempdir;

    fn record(period: &str, institution: &str, concept: &str) -> Record {
        Record {
            institution: institution.to_string(),
            sub_fund: "Básica Inicial".to_string(),
            concept: concept.to_string(),
            value_mxn: 1000.0,
            fx_eom: Some(20.0),
            value_usd: Some(50.0),
            period: period.parse().unwrap(),
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut a = record("2024-01", "Azteca", "Total de Activo");
        a.value_mxn = 111.0;
        let mut b = record("2024-01", "Azteca", "Total de Activo");
        b.value_mxn = 222.0;

        let store = RecordStore::from_records(vec![a, b]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].value_mxn, 111.0);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut store = RecordStore::from_records(vec![record(
            "2024-01",
            "Azteca",
            "Total de Activo",
        )]);
        let batch = vec![
            record("2024-01", "Azteca", "Total de Activo"),
            record("2024-02", "Azteca", "Total de Activo"),
        ];

        assert_eq!(store.merge(batch.clone()), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.merge(batch), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");

        let store = RecordStore::from_records(vec![
            record("2024-01", "Azteca", "Total de Activo"),
            record("2024-01", "Coppel", "Inversión en Fondos Mutuos"),
        ]);
        store.save(&path).unwrap();

        let loaded = RecordStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.records()[0].institution, "Azteca");
        assert_eq!(loaded.records()[0].period, Period::new(2024, 1));
        assert_eq!(loaded.records()[1].value_usd, Some(50.0));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let result = RecordStore::load(dir.path().join("absent.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_malformed_json_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{not json").unwrap();
        let err = RecordStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }

    #[test]
    fn test_load_skips_nonconforming_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        // Second object lacks the period fields entirely
        fs::write(
            &path,
            r#"[
              {"Afore":"Azteca","Siefore":"SB1","Concept":"Total de Activo",
               "valueMXN":10.0,"PeriodYear":"2024","PeriodMonth":"01"},
              {"Afore":"Coppel","Siefore":"SB1","Concept":"Total de Activo",
               "valueMXN":10.0}
            ]"#,
        )
        .unwrap();

        let store = RecordStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].institution, "Azteca");
    }

    #[test]
    fn test_load_resolves_concept_section_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(
            &path,
            r#"[{"Afore":"Azteca","Siefore":"SB1",
                 "Concept_Section":"Inversiones Tercerizadas",
                 "valueMXN":10.0,"PeriodYear":"2024","PeriodMonth":"01"}]"#,
        )
        .unwrap();

        let store = RecordStore::load(&path).unwrap();
        assert_eq!(store.records()[0].concept, "Inversiones Tercerizadas");
    }

    #[test]
    fn test_backup_copies_store_file() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("db.json");
        fs::write(&db, "[]").unwrap();

        let backup = backup_database(&db, dir.path().join("backups")).unwrap();
        assert!(backup.exists());
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with(BACKUP_PREFIX)
        );
    }

    #[test]
    fn test_prune_keeps_recent_backups() {
        let dir = tempdir().unwrap();
        let backups = dir.path().join("backups");
        fs::create_dir_all(&backups).unwrap();
        fs::write(backups.join("consar_db_backup_20240101_000000.json"), "[]").unwrap();

        // Fresh file, generous retention: nothing to remove.
        assert_eq!(prune_backups(&backups, 30).unwrap(), 0);
        // Zero-day retention removes it.
        assert_eq!(prune_backups(&backups, 0).unwrap(), 1);
    }
}
