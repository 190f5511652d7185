//! Period-indexed access to the record set.

use crate::core::period::Period;
use crate::core::record::Record;
use anyhow::Result;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

/// Which currency a query should read values in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Mxn,
    Usd,
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Currency::Mxn => "MXN",
            Currency::Usd => "USD",
        })
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mxn" => Ok(Currency::Mxn),
            "usd" => Ok(Currency::Usd),
            other => Err(anyhow::anyhow!("Unknown currency `{other}`; expected mxn or usd")),
        }
    }
}

impl Record {
    /// The record's value in the requested currency, if computable.
    ///
    /// USD prefers the stored derived value and falls back to deriving it
    /// from the MXN value and FX rate; after a repair pass both agree.
    pub fn value_in(&self, currency: Currency) -> Option<f64> {
        match currency {
            Currency::Mxn => Some(self.value_mxn),
            Currency::Usd => self.value_usd.or_else(|| {
                self.fx_eom
                    .filter(|fx| *fx > 0.0)
                    .map(|fx| self.value_mxn / fx)
            }),
        }
    }
}

/// Derived view over a record slice. Built by a single linear scan per
/// query; nothing is cached or persisted.
pub struct PeriodIndex<'a> {
    records: &'a [Record],
}

impl<'a> PeriodIndex<'a> {
    pub fn new(records: &'a [Record]) -> Self {
        PeriodIndex { records }
    }

    /// All distinct periods, sorted ascending.
    pub fn periods(&self) -> Vec<Period> {
        let set: BTreeSet<Period> = self.records.iter().map(|r| r.period).collect();
        set.into_iter().collect()
    }

    /// The most recent period across all records, if any exist.
    pub fn latest(&self) -> Option<Period> {
        self.records.iter().map(|r| r.period).max()
    }

    /// Records for a period, in input order. An unknown period yields an
    /// empty result.
    pub fn records_for(&self, period: Period) -> Vec<&'a Record> {
        self.records
            .iter()
            .filter(|r| r.period == period)
            .collect()
    }

    /// Records for a period that carry a value in the requested currency.
    pub fn records_for_currency(&self, period: Period, currency: Currency) -> Vec<&'a Record> {
        self.records
            .iter()
            .filter(|r| r.period == period && r.value_in(currency).is_some())
            .collect()
    }

    /// Whether a period has any records at all.
    pub fn has_period(&self, period: Period) -> bool {
        self.records.iter().any(|r| r.period == period)
    }
}
