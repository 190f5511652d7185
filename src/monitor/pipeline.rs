//! Execution of the external processing pipeline.
//!
//! The downloader, report processor, FX updater and USD converter are
//! external tools configured as commands. Steps run sequentially; any
//! failure aborts the run and leaves the record store untouched.

use crate::core::config::PipelineStep;
use anyhow::{Context, Result, bail};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::info;

/// Runs every configured step in order. Returns an error on the first step
/// that fails to spawn, times out, or exits non-zero.
pub async fn run(steps: &[PipelineStep]) -> Result<()> {
    if steps.is_empty() {
        bail!("Processing pipeline has no configured steps");
    }

    for (i, step) in steps.iter().enumerate() {
        info!("Pipeline step {}/{}: {}", i + 1, steps.len(), step.name);
        run_step(step).await?;
    }
    info!("Processing pipeline completed successfully");
    Ok(())
}

async fn run_step(step: &PipelineStep) -> Result<()> {
    let (program, args) = step
        .command
        .split_first()
        .with_context(|| format!("Pipeline step '{}' has an empty command", step.name))?;

    let output = timeout(
        Duration::from_secs(step.timeout_secs),
        Command::new(program).args(args).output(),
    )
    .await
    .map_err(|_| {
        anyhow::anyhow!(
            "Pipeline step '{}' timed out after {}s",
            step.name,
            step.timeout_secs
        )
    })?
    .with_context(|| format!("Failed to run pipeline step '{}'", step.name))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "Pipeline step '{}' failed ({}): {}",
            step.name,
            output.status,
            stderr.trim()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, command: &[&str], timeout_secs: u64) -> PipelineStep {
        PipelineStep {
            name: name.to_string(),
            command: command.iter().map(|s| s.to_string()).collect(),
            timeout_secs,
        }
    }

    #[tokio::test]
    async fn test_successful_steps_run_in_order() {
        let steps = vec![
            step("first", &["true"], 10),
            step("second", &["true"], 10),
        ];
        assert!(run(&steps).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_step_aborts_run() {
        let steps = vec![step("boom", &["false"], 10)];
        let err = run(&steps).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let steps = vec![step("ghost", &["definitely-not-a-real-program-xyz"], 10)];
        assert!(run(&steps).await.is_err());
    }

    #[tokio::test]
    async fn test_timeout_aborts_step() {
        let steps = vec![step("slow", &["sleep", "5"], 1)];
        let err = run(&steps).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_error() {
        assert!(run(&[]).await.is_err());
    }
}
