//! Detection of available reporting periods on the public summary page.

use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Polls the summary page for period tokens.
pub struct SummarySource {
    base_url: String,
    client: reqwest::Client,
}

impl SummarySource {
    pub fn new(base_url: &str) -> Self {
        SummarySource {
            base_url: base_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fetches the summary page and extracts the advertised periods.
    pub async fn fetch_periods(&self) -> Result<BTreeSet<String>> {
        debug!("Fetching summary page: {}", self.base_url);
        let response = self
            .client
            .get(&self.base_url)
            .header("User-Agent", "Mozilla/5.0 (X11; Linux x86_64)")
            .send()
            .await
            .with_context(|| format!("Failed to fetch summary page: {}", self.base_url))?
            .error_for_status()
            .context("Summary page returned an error status")?;
        let body = response
            .text()
            .await
            .context("Failed to read summary page body")?;

        let periods = extract_periods(&body);
        info!("Found {} periods on summary page", periods.len());
        Ok(periods)
    }
}

/// Extracts `Mon YY` period tokens (Spanish month abbreviations) from the
/// page, e.g. "Ene 25-Jun 25" yields "Ene 25" and "Jun 25".
pub fn extract_periods(html: &str) -> BTreeSet<String> {
    // Unwrap is fine: the pattern is a compile-time constant.
    let re = Regex::new(r"(Ene|Feb|Mar|Abr|May|Jun|Jul|Ago|Sep|Oct|Nov|Dic)\s+(\d{2})").unwrap();
    re.captures_iter(html)
        .map(|c| format!("{} {}", &c[1], &c[2]))
        .collect()
}

/// Hash of the sorted period set, compared across polls to detect change.
pub fn period_hash(periods: &BTreeSet<String>) -> String {
    let joined = periods.iter().cloned().collect::<Vec<_>>().join("|");
    let digest = Sha256::digest(joined.as_bytes());
    hex::encode(digest)
}
