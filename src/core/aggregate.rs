//! Per-institution aggregation for a reporting period.
//!
//! One parameterized grouping function feeds every table; combined
//! categories (e.g. total active management) are a post-aggregation sum per
//! institution, never a re-scan.

use crate::core::index::Currency;
use crate::core::record::{Concept, Record};
use std::collections::BTreeMap;

/// Label of the synthetic grand-total row, always rendered last.
pub const TOTAL_ROW: &str = "TOTAL";

/// Sums a period's records by institution for one concept, in the requested
/// currency. Records without a value in that currency are ignored. The
/// `BTreeMap` keeps institutions in case-sensitive ASCII order.
pub fn aggregate(
    records: &[&Record],
    concept: Concept,
    currency: Currency,
) -> BTreeMap<String, f64> {
    let mut by_institution: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        if record.concept != concept.label() {
            continue;
        }
        if let Some(value) = record.value_in(currency) {
            *by_institution.entry(record.institution.clone()).or_insert(0.0) += value;
        }
    }
    by_institution
}

/// Per-institution sum of several aggregated maps.
pub fn combine(maps: &[&BTreeMap<String, f64>]) -> BTreeMap<String, f64> {
    let mut combined: BTreeMap<String, f64> = BTreeMap::new();
    for map in maps {
        for (institution, value) in map.iter() {
            *combined.entry(institution.clone()).or_insert(0.0) += value;
        }
    }
    combined
}

/// Sum across all institutions of one aggregated map.
pub fn grand_total(map: &BTreeMap<String, f64>) -> f64 {
    map.values().sum()
}

/// Percent of total, exactly `0` when the total is `0`. This policy is a
/// business rule the tables rely on; it must not produce NaN.
pub fn percent_of(value: f64, total: f64) -> f64 {
    if total > 0.0 { value / total * 100.0 } else { 0.0 }
}

/// One table row: an institution's total assets, one value per requested
/// category, and the last category as percent of total.
#[derive(Debug, Clone)]
pub struct AumRow {
    pub institution: String,
    pub total: f64,
    pub categories: Vec<f64>,
    pub pct_of_total: f64,
}

/// An AUM breakdown table: alphabetical institution rows plus the `TOTAL`
/// row last.
#[derive(Debug)]
pub struct AumTable {
    pub rows: Vec<AumRow>,
}

impl AumTable {
    /// Builds the table from a total-assets map and the category maps. Rows
    /// cover the institutions present in the total map; the percentage
    /// column uses the last category.
    pub fn build(total: &BTreeMap<String, f64>, categories: &[&BTreeMap<String, f64>]) -> AumTable {
        let mut rows = Vec::with_capacity(total.len() + 1);
        let mut total_sum = 0.0;
        let mut category_sums = vec![0.0; categories.len()];

        for (institution, total_value) in total.iter() {
            let values: Vec<f64> = categories
                .iter()
                .map(|m| m.get(institution).copied().unwrap_or(0.0))
                .collect();
            let pct = percent_of(values.last().copied().unwrap_or(0.0), *total_value);

            total_sum += total_value;
            for (sum, v) in category_sums.iter_mut().zip(&values) {
                *sum += v;
            }
            rows.push(AumRow {
                institution: institution.clone(),
                total: *total_value,
                categories: values,
                pct_of_total: pct,
            });
        }

        let total_pct = percent_of(category_sums.last().copied().unwrap_or(0.0), total_sum);
        rows.push(AumRow {
            institution: TOTAL_ROW.to_string(),
            total: total_sum,
            categories: category_sums,
            pct_of_total: total_pct,
        });

        AumTable { rows }
    }
}
