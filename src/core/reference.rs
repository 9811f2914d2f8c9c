use crate::core::currency::CurrencyCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of reference ("central bank") rates.
///
/// Each rate is the amount of that currency per one unit of the fixed base
/// asset. A table is replaced wholesale on every feed refresh and is never
/// patched in place; only positive finite rates are admitted.
///
/// # Examples
///
/// ```
/// use exchange_desk::core::currency::CurrencyCode;
/// use exchange_desk::core::reference::ReferenceRateTable;
///
/// let table = ReferenceRateTable::from_rates([
///     (CurrencyCode::new("RUB"), 95.5),
///     (CurrencyCode::new("THB"), -1.0),
/// ]);
/// assert_eq!(table.rate(&CurrencyCode::new("RUB")), Some(95.5));
/// assert_eq!(table.rate(&CurrencyCode::new("THB")), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRateTable {
    rates: HashMap<CurrencyCode, f64>,
    fetched_at: Option<DateTime<Utc>>,
}

impl ReferenceRateTable {
    /// An empty table: nothing loaded yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table stamped with the current time, dropping unusable rates.
    pub fn from_rates(rates: impl IntoIterator<Item = (CurrencyCode, f64)>) -> Self {
        Self {
            rates: rates
                .into_iter()
                .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
                .collect(),
            fetched_at: Some(Utc::now()),
        }
    }

    /// Reference rate for `code`, if the feed supplied one.
    pub fn rate(&self, code: &CurrencyCode) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Reference rate for `code`, or `0` when missing.
    pub fn rate_or_zero(&self, code: &CurrencyCode) -> f64 {
        self.rate(code).unwrap_or(0.0)
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.rates.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, f64)> {
        self.rates.iter().map(|(c, r)| (c, *r))
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
