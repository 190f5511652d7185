use std::fs;
use std::path::Path;
use tracing::info;

mod test_utils {
    use std::fmt::Write;
    use std::path::Path;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_summary_mock(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    /// One wire-format record object.
    pub fn raw_record(
        afore: &str,
        concept: &str,
        value_mxn: f64,
        value_usd: Option<f64>,
        year: &str,
        month: &str,
    ) -> String {
        let mut obj = format!(
            r#"{{"Afore":"{afore}","Siefore":"Básica 55-59","Concept":"{concept}","valueMXN":{value_mxn},"FX_EOM":20.0"#
        );
        if let Some(usd) = value_usd {
            write!(obj, r#","valueUSD":{usd}"#).unwrap();
        }
        write!(obj, r#","PeriodYear":"{year}","PeriodMonth":"{month}"}}"#).unwrap();
        obj
    }

    pub fn write_database(path: &Path, records: &[String]) {
        let contents = format!("[{}]", records.join(","));
        std::fs::write(path, contents).expect("Failed to write database");
    }

    pub fn write_config(dir: &Path, summary_url: &str, pipeline_yaml: &str) -> std::path::PathBuf {
        let config_path = dir.join("config.yaml");
        let content = format!(
            r#"
database_path: "{db}"
backup_dir: "{backups}"
output_dir: "{output}"
monitor:
  state_file: "{state}"
  pending_dir: "{pending}"
  summary_url: "{summary_url}"
  processed_output: "{processed}"
  pipeline:
{pipeline_yaml}
"#,
            db = dir.join("db.json").display(),
            backups = dir.join("backups").display(),
            output = dir.join("output").display(),
            state = dir.join("state.json").display(),
            pending = dir.join("pending").display(),
            processed = dir.join("processed.json").display(),
        );
        std::fs::write(&config_path, content).expect("Failed to write config file");
        config_path
    }
}

const NOOP_PIPELINE: &str = r#"    - name: "noop"
      command: ["true"]"#;

fn first_approval_id(pending_dir: &Path) -> String {
    let entry = fs::read_dir(pending_dir)
        .expect("pending dir missing")
        .next()
        .expect("no approval unit")
        .expect("unreadable entry");
    entry.file_name().to_string_lossy().into_owned()
}

#[test_log::test(tokio::test)]
async fn test_aum_flow_exports_csv() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let records = vec![
        test_utils::raw_record(
            "Azteca",
            "Total de Activo",
            80_000_000_000.0,
            Some(4_000_000_000.0),
            "2025",
            "07",
        ),
        test_utils::raw_record(
            "Azteca",
            "Inversión en Fondos Mutuos",
            20_000_000_000.0,
            Some(1_000_000_000.0),
            "2025",
            "07",
        ),
        test_utils::raw_record(
            "Coppel",
            "Total de Activo",
            40_000_000_000.0,
            Some(2_000_000_000.0),
            "2025",
            "07",
        ),
    ];
    test_utils::write_database(&dir.path().join("db.json"), &records);
    let config_path = test_utils::write_config(dir.path(), "http://localhost/unused", NOOP_PIPELINE);

    let result = siset::run_command(
        siset::AppCommand::Aum(siset::cli::aum::AumOptions {
            period: None,
            table: Some(siset::cli::aum::TableKind::MutualFunds),
            currency: siset::core::Currency::Usd,
            csv: true,
            list_periods: false,
        }),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Aum command failed: {:?}", result.err());

    let csv_path = dir.path().join("output/fondos_mutuos_2025_07.csv");
    let contents = fs::read_to_string(&csv_path).expect("CSV not written");
    info!("CSV contents:\n{contents}");

    let lines: Vec<&str> = contents.lines().collect();
    assert!(lines[0].starts_with("Afore,"));
    // Azteca: 1B of 4B total assets = 25%
    assert!(lines[1].starts_with("Azteca,4000000000.00,1000000000.00,25.00"));
    // Coppel has no mutual fund assets
    assert!(lines[2].starts_with("Coppel,2000000000.00,0.00,0.00"));
    assert!(lines[3].starts_with("TOTAL,6000000000.00,1000000000.00,"));
}

#[test_log::test(tokio::test)]
async fn test_aum_flow_exports_mxn_csv() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let records = vec![
        test_utils::raw_record(
            "Azteca",
            "Total de Activo",
            80_000_000_000.0,
            Some(4_000_000_000.0),
            "2025",
            "07",
        ),
        test_utils::raw_record(
            "Azteca",
            "Inversión en Fondos Mutuos",
            20_000_000_000.0,
            Some(1_000_000_000.0),
            "2025",
            "07",
        ),
    ];
    test_utils::write_database(&dir.path().join("db.json"), &records);
    let config_path = test_utils::write_config(dir.path(), "http://localhost/unused", NOOP_PIPELINE);

    let result = siset::run_command(
        siset::AppCommand::Aum(siset::cli::aum::AumOptions {
            period: None,
            table: Some(siset::cli::aum::TableKind::MutualFunds),
            currency: siset::core::Currency::Mxn,
            csv: true,
            list_periods: false,
        }),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Aum command failed: {:?}", result.err());

    let csv_path = dir.path().join("output/fondos_mutuos_mxn_2025_07.csv");
    let contents = fs::read_to_string(&csv_path).expect("CSV not written");
    info!("CSV contents:\n{contents}");

    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "Afore,Total Assets (MXN),Mutual Funds (MXN),% of Total");
    // Peso amounts pass through untouched: 20B of 80B = 25%
    assert!(lines[1].starts_with("Azteca,80000000000.00,20000000000.00,25.00"));
    assert!(lines[2].starts_with("TOTAL,80000000000.00,20000000000.00,"));
}

#[test_log::test(tokio::test)]
async fn test_growth_flow_with_ytd_and_one_year_baselines() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut records = Vec::new();
    for (year, month, usd) in [
        ("2024", "07", 1_000_000_000.0),
        ("2024", "12", 1_200_000_000.0),
        ("2025", "07", 1_500_000_000.0),
    ] {
        for concept in [
            "Total de Activo",
            "Inversión en Fondos Mutuos",
            "Inversiones Tercerizadas",
        ] {
            records.push(test_utils::raw_record(
                "Azteca",
                concept,
                usd * 20.0,
                Some(usd),
                year,
                month,
            ));
        }
    }
    test_utils::write_database(&dir.path().join("db.json"), &records);
    let config_path = test_utils::write_config(dir.path(), "http://localhost/unused", NOOP_PIPELINE);

    let result = siset::run_command(
        siset::AppCommand::Growth(siset::cli::growth::GrowthOptions {
            window: None,
            top: Some(5),
        }),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Growth command failed: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_repair_rescales_thousands_database() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    // Total assets sum to 5e9 MXN, far below any plausible industry total,
    // so the period is in thousands and must be scaled up.
    let records = vec![
        test_utils::raw_record(
            "Azteca",
            "Total de Activo",
            5_000_000_000.0,
            Some(250_000_000.0),
            "2025",
            "07",
        ),
    ];
    test_utils::write_database(&dir.path().join("db.json"), &records);
    let config_path = test_utils::write_config(dir.path(), "http://localhost/unused", NOOP_PIPELINE);

    let result = siset::run_command(
        siset::AppCommand::Repair(siset::cli::repair::RepairOptions { dry_run: false }),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Repair command failed: {:?}", result.err());

    let store = siset::store::RecordStore::load(dir.path().join("db.json")).unwrap();
    let record = &store.records()[0];
    assert_eq!(record.value_mxn, 5_000_000_000_000.0);
    // Stale USD was dropped and rederived from MXN and the FX rate
    assert_eq!(record.value_usd, Some(250_000_000_000.0));

    // A backup of the pre-repair file exists
    let backups: Vec<_> = fs::read_dir(dir.path().join("backups"))
        .expect("backup dir missing")
        .collect();
    assert_eq!(backups.len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_repair_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let records = vec![test_utils::raw_record(
        "Azteca",
        "Total de Activo",
        5_000_000_000.0,
        None,
        "2025",
        "07",
    )];
    test_utils::write_database(&dir.path().join("db.json"), &records);
    let before = fs::read_to_string(dir.path().join("db.json")).unwrap();
    let config_path = test_utils::write_config(dir.path(), "http://localhost/unused", NOOP_PIPELINE);

    let result = siset::run_command(
        siset::AppCommand::Repair(siset::cli::repair::RepairOptions { dry_run: true }),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Repair command failed: {:?}", result.err());

    assert_eq!(
        fs::read_to_string(dir.path().join("db.json")).unwrap(),
        before
    );
    assert!(!dir.path().join("backups").exists());
}

#[test_log::test(tokio::test)]
async fn test_monitor_run_once_packages_new_records_for_approval() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let existing = test_utils::raw_record(
        "Azteca",
        "Total de Activo",
        80_000_000_000_000.0,
        None,
        "2025",
        "06",
    );
    test_utils::write_database(&dir.path().join("db.json"), &[existing.clone()]);

    // The "pipeline" is a no-op; its output is pre-staged with one new period.
    let new_record = test_utils::raw_record(
        "Azteca",
        "Total de Activo",
        82_000_000_000_000.0,
        None,
        "2025",
        "07",
    );
    test_utils::write_database(&dir.path().join("processed.json"), &[existing, new_record]);

    let server = test_utils::create_summary_mock("<td>Ene 25-Jul 25</td>").await;
    let config_path = test_utils::write_config(dir.path(), &server.uri(), NOOP_PIPELINE);

    let result = siset::run_command(
        siset::AppCommand::Monitor(siset::cli::monitor::MonitorOptions {
            run_once: true,
            approve: None,
            reject: None,
            review: None,
            list_pending: false,
        }),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Monitor run failed: {:?}", result.err());

    // One approval unit was packaged, nothing was merged yet
    let approval_id = first_approval_id(&dir.path().join("pending"));
    assert!(approval_id.starts_with("approval_"));
    let store = siset::store::RecordStore::load(dir.path().join("db.json")).unwrap();
    assert_eq!(store.len(), 1);

    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("state.json")).unwrap()).unwrap();
    assert_eq!(state["pending_approvals"][0]["status"], "pending");
    assert_eq!(state["pending_approvals"][0]["record_count"], 1);

    // Approving merges the new record into the database and clears the unit
    let result = siset::run_command(
        siset::AppCommand::Monitor(siset::cli::monitor::MonitorOptions {
            run_once: false,
            approve: Some(approval_id.clone()),
            reject: None,
            review: None,
            list_pending: false,
        }),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Approve failed: {:?}", result.err());

    let store = siset::store::RecordStore::load(dir.path().join("db.json")).unwrap();
    assert_eq!(store.len(), 2);
    assert!(!dir.path().join("pending").join(&approval_id).exists());
}

#[test_log::test(tokio::test)]
async fn test_monitor_run_once_is_quiet_when_unchanged() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    test_utils::write_database(
        &dir.path().join("db.json"),
        &[test_utils::raw_record(
            "Azteca",
            "Total de Activo",
            80_000_000_000_000.0,
            None,
            "2025",
            "06",
        )],
    );

    let server = test_utils::create_summary_mock("<td>Ene 25-Jun 25</td>").await;
    let config_path = test_utils::write_config(dir.path(), &server.uri(), NOOP_PIPELINE);

    // Prime the state with a first run; the pipeline output matches the
    // database so nothing is pending afterwards.
    test_utils::write_database(
        &dir.path().join("processed.json"),
        &[test_utils::raw_record(
            "Azteca",
            "Total de Activo",
            80_000_000_000_000.0,
            None,
            "2025",
            "06",
        )],
    );
    let options = || {
        siset::AppCommand::Monitor(siset::cli::monitor::MonitorOptions {
            run_once: true,
            approve: None,
            reject: None,
            review: None,
            list_pending: false,
        })
    };
    siset::run_command(options(), Some(config_path.to_str().unwrap()))
        .await
        .expect("first check failed");

    // Second run sees the same period hash and does nothing.
    siset::run_command(options(), Some(config_path.to_str().unwrap()))
        .await
        .expect("second check failed");

    let pending: Vec<_> = fs::read_dir(dir.path().join("pending"))
        .map(|d| d.collect())
        .unwrap_or_default();
    assert!(pending.is_empty());

    let state: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("state.json")).unwrap()).unwrap();
    assert!(state["last_check"].is_string());
}
