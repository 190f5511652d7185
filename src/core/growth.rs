//! Growth computation between a current and a historical aggregate.

use crate::core::aggregate::{aggregate, combine};
use crate::core::index::{Currency, PeriodIndex};
use crate::core::period::{Period, Window};
use crate::core::record::Concept;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Growth of one asset category for one institution.
///
/// The growth rate is a deliberate business rule, not ordinary arithmetic:
/// a zero baseline with a positive current value is "new assets", carried
/// internally as positive infinity and rendered as `NEW` only at the
/// presentation boundary. A zero-zero comparison is `0`, never NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryGrowth {
    pub current: f64,
    pub historical: f64,
    pub growth_rate: f64,
    pub absolute_change: f64,
}

impl CategoryGrowth {
    pub fn compute(current: f64, historical: f64) -> CategoryGrowth {
        let growth_rate = if historical > 0.0 {
            (current - historical) / historical * 100.0
        } else if current > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        CategoryGrowth {
            current,
            historical,
            growth_rate,
            absolute_change: current - historical,
        }
    }

    pub fn is_new(&self) -> bool {
        self.growth_rate.is_infinite()
    }
}

/// Growth across the three asset categories for one institution.
#[derive(Debug, Clone)]
pub struct GrowthRow {
    pub institution: String,
    pub mutual_funds: CategoryGrowth,
    pub third_party: CategoryGrowth,
    pub total_active: CategoryGrowth,
}

/// Per-institution category values for one period.
#[derive(Debug, Default)]
pub struct PeriodAggregates {
    pub mutual_funds: BTreeMap<String, f64>,
    pub third_party: BTreeMap<String, f64>,
    pub total_active: BTreeMap<String, f64>,
}

impl PeriodAggregates {
    pub fn build(index: &PeriodIndex<'_>, period: Period, currency: Currency) -> PeriodAggregates {
        let records = index.records_for_currency(period, currency);
        let mutual_funds = aggregate(&records, Concept::MutualFunds, currency);
        let third_party = aggregate(&records, Concept::ThirdPartyMandates, currency);
        let total_active = combine(&[&mutual_funds, &third_party]);
        PeriodAggregates {
            mutual_funds,
            third_party,
            total_active,
        }
    }
}

/// Computes growth rows over the union of institutions from both sides; an
/// institution absent from one side contributes zero there.
pub fn growth_rows(current: &PeriodAggregates, historical: &PeriodAggregates) -> Vec<GrowthRow> {
    let mut institutions: BTreeSet<&String> = BTreeSet::new();
    for map in [
        &current.total_active,
        &historical.total_active,
        &current.mutual_funds,
        &historical.mutual_funds,
        &current.third_party,
        &historical.third_party,
    ] {
        institutions.extend(map.keys());
    }

    let value = |map: &BTreeMap<String, f64>, key: &str| map.get(key).copied().unwrap_or(0.0);

    institutions
        .into_iter()
        .map(|institution| GrowthRow {
            institution: institution.clone(),
            mutual_funds: CategoryGrowth::compute(
                value(&current.mutual_funds, institution),
                value(&historical.mutual_funds, institution),
            ),
            third_party: CategoryGrowth::compute(
                value(&current.third_party, institution),
                value(&historical.third_party, institution),
            ),
            total_active: CategoryGrowth::compute(
                value(&current.total_active, institution),
                value(&historical.total_active, institution),
            ),
        })
        .collect()
}

/// One computed comparison window.
#[derive(Debug)]
pub struct WindowGrowth {
    pub window: Window,
    pub baseline: Period,
    pub rows: Vec<GrowthRow>,
}

impl WindowGrowth {
    /// Industry-wide growth per category, from summed current and
    /// historical values.
    pub fn industry_totals(&self) -> [CategoryGrowth; 3] {
        let sum = |f: fn(&GrowthRow) -> &CategoryGrowth| {
            let current: f64 = self.rows.iter().map(|r| f(r).current).sum();
            let historical: f64 = self.rows.iter().map(|r| f(r).historical).sum();
            CategoryGrowth::compute(current, historical)
        };
        [
            sum(|r| &r.mutual_funds),
            sum(|r| &r.third_party),
            sum(|r| &r.total_active),
        ]
    }

    /// Rows ordered by total-active growth rate, best first. `NEW`
    /// (infinite) entries sort ahead of any finite rate.
    pub fn top_performers(&self) -> Vec<&GrowthRow> {
        let mut sorted: Vec<&GrowthRow> = self.rows.iter().collect();
        sorted.sort_by(|a, b| {
            b.total_active
                .growth_rate
                .total_cmp(&a.total_active.growth_rate)
        });
        sorted
    }
}

/// A window that could not be computed, and why.
#[derive(Debug)]
pub enum SkippedWindow {
    /// No baseline exists (YTD when the latest period is December).
    NoBaseline(Window),
    /// The baseline period has no records; nothing is fabricated for it.
    NoData(Window, Period),
}

/// The full growth report for the latest period.
#[derive(Debug)]
pub struct GrowthReport {
    pub current_period: Period,
    pub windows: Vec<WindowGrowth>,
    pub skipped: Vec<SkippedWindow>,
}

impl GrowthReport {
    /// Computes every requested window against the latest period. Windows
    /// whose baseline period holds no records are skipped entirely and
    /// reported as such, so the caller knows what was actually computed.
    pub fn build(
        index: &PeriodIndex<'_>,
        windows: &[Window],
        currency: Currency,
    ) -> Option<GrowthReport> {
        let current_period = index.latest()?;
        let current = PeriodAggregates::build(index, current_period, currency);

        let mut computed = Vec::new();
        let mut skipped = Vec::new();

        for &window in windows {
            let Some(baseline) = window.baseline(current_period) else {
                debug!("No baseline period for {window} window");
                skipped.push(SkippedWindow::NoBaseline(window));
                continue;
            };
            if !index.has_period(baseline) {
                debug!("No records for {window} baseline {baseline}");
                skipped.push(SkippedWindow::NoData(window, baseline));
                continue;
            }
            let historical = PeriodAggregates::build(index, baseline, currency);
            computed.push(WindowGrowth {
                window,
                baseline,
                rows: growth_rows(&current, &historical),
            });
        }

        Some(GrowthReport {
            current_period,
            windows: computed,
            skipped,
        })
    }
}
