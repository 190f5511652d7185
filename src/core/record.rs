//! The flat disclosure record and its normalization boundary.
//!
//! The record store file uses the legacy field names produced by the report
//! processing pipeline (`Afore`, `Siefore`, `valueMXN`, ...). Everything past
//! ingestion works with the normalized [`Record`]; `Concept_Section` and other
//! schema drift is resolved here, once.

use crate::core::period::Period;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// The three concept labels the analysis tables are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concept {
    TotalAssets,
    MutualFunds,
    ThirdPartyMandates,
}

impl Concept {
    /// The label as it appears in the disclosure data.
    pub fn label(&self) -> &'static str {
        match self {
            Concept::TotalAssets => "Total de Activo",
            Concept::MutualFunds => "Inversión en Fondos Mutuos",
            Concept::ThirdPartyMandates => "Inversiones Tercerizadas",
        }
    }
}

impl Display for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Concept {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Total de Activo" => Ok(Concept::TotalAssets),
            "Inversión en Fondos Mutuos" => Ok(Concept::MutualFunds),
            "Inversiones Tercerizadas" => Ok(Concept::ThirdPartyMandates),
            _ => Err(anyhow::anyhow!("Unknown concept label: {}", s)),
        }
    }
}

/// A record exactly as stored in the JSON database file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Afore")]
    pub afore: Option<String>,
    #[serde(rename = "Siefore")]
    pub siefore: Option<String>,
    #[serde(rename = "Concept", skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    /// Older ingestion runs wrote the concept under this name.
    #[serde(rename = "Concept_Section", skip_serializing_if = "Option::is_none")]
    pub concept_section: Option<String>,
    #[serde(rename = "valueMXN")]
    pub value_mxn: Option<f64>,
    #[serde(rename = "FX_EOM", skip_serializing_if = "Option::is_none")]
    pub fx_eom: Option<f64>,
    #[serde(rename = "valueUSD", skip_serializing_if = "Option::is_none")]
    pub value_usd: Option<f64>,
    #[serde(rename = "PeriodYear")]
    pub period_year: Option<String>,
    #[serde(rename = "PeriodMonth")]
    pub period_month: Option<String>,
}

/// A normalized disclosure record. Immutable once ingested, except through
/// the consistency repair pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Reporting institution (Afore).
    pub institution: String,
    /// Sub-fund classification (Siefore).
    pub sub_fund: String,
    /// Concept label; the vocabulary is open, the fixed labels are in
    /// [`Concept`].
    pub concept: String,
    /// Value in local currency (MXN pesos), always present.
    pub value_mxn: f64,
    /// End-of-month FX rate, when the FX update produced one.
    pub fx_eom: Option<f64>,
    /// Derived USD value, nominally `value_mxn / fx_eom`.
    pub value_usd: Option<f64>,
    pub period: Period,
}

/// Composite identity used for deduplication and new-record detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub institution: String,
    pub sub_fund: String,
    pub concept: String,
    pub period: Period,
}

impl Record {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            institution: self.institution.clone(),
            sub_fund: self.sub_fund.clone(),
            concept: self.concept.clone(),
            period: self.period,
        }
    }

    /// Normalizes a wire record, rejecting ones that lack required fields.
    pub fn from_raw(raw: RawRecord) -> Result<Record> {
        let institution = raw
            .afore
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Record missing Afore"))?;
        let sub_fund = raw
            .siefore
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Record missing Siefore"))?;
        let concept = raw
            .concept
            .or(raw.concept_section)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Record missing Concept"))?;
        let value_mxn = raw
            .value_mxn
            .ok_or_else(|| anyhow::anyhow!("Record missing valueMXN"))?;
        let year = raw
            .period_year
            .ok_or_else(|| anyhow::anyhow!("Record missing PeriodYear"))?;
        let month = raw
            .period_month
            .ok_or_else(|| anyhow::anyhow!("Record missing PeriodMonth"))?;
        let period: Period = format!("{year}-{month}").parse()?;

        Ok(Record {
            institution,
            sub_fund,
            concept,
            value_mxn,
            fx_eom: raw.fx_eom,
            value_usd: raw.value_usd,
            period,
        })
    }

    /// Converts back to the wire representation for a full-file rewrite.
    pub fn to_raw(&self) -> RawRecord {
        RawRecord {
            afore: Some(self.institution.clone()),
            siefore: Some(self.sub_fund.clone()),
            concept: Some(self.concept.clone()),
            concept_section: None,
            value_mxn: Some(self.value_mxn),
            fx_eom: self.fx_eom,
            value_usd: self.value_usd,
            period_year: Some(self.period.year_str()),
            period_month: Some(self.period.month_str()),
        }
    }
}
