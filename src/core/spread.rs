use crate::core::currency::{CurrencyCode, Side};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Differences smaller than this count as exact equality.
///
/// Absorbs floating-point noise left by rate → spread → rate round-trips.
pub const SPREAD_EPSILON: f64 = 1e-8;

/// Signed percentage deviation of `quoted` from `reference`.
///
/// Positive means the quoted rate is above the reference. Returns `0` when
/// either input is zero or not finite (reference feed not loaded yet) and
/// when the two rates are equal within [`SPREAD_EPSILON`].
///
/// # Examples
///
/// ```
/// use exchange_desk::core::spread::spread_pct;
///
/// assert_eq!(spread_pct(100.0, 100.0), 0.0);
/// assert!((spread_pct(105.0, 100.0) - 5.0).abs() < 1e-12);
/// assert_eq!(spread_pct(105.0, 0.0), 0.0);
/// ```
pub fn spread_pct(quoted: f64, reference: f64) -> f64 {
    if !quoted.is_finite() || !reference.is_finite() || quoted == 0.0 || reference == 0.0 {
        return 0.0;
    }
    let diff = quoted - reference;
    if diff.abs() < SPREAD_EPSILON {
        return 0.0;
    }
    diff / reference * 100.0
}

/// Quoted rate obtained by applying a percentage spread to a reference rate.
pub fn apply_spread(reference: f64, pct: f64) -> f64 {
    reference * (1.0 + pct / 100.0)
}

/// Render a spread for comparison listings: `+1.05%`, `-0.50%`, `0%`.
pub fn format_signed_spread(pct: f64) -> String {
    let rounded = (pct * 100.0).round() / 100.0;
    if !rounded.is_finite() || rounded == 0.0 {
        return "0%".to_string();
    }
    if rounded > 0.0 {
        format!("+{:.2}%", rounded)
    } else {
        format!("{:.2}%", rounded)
    }
}

/// Stored spreads for one currency.
///
/// `buy_pct` applies when the currency is the pair's source (buy rate),
/// `sell_pct` when it is the target (sell rate).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadEntry {
    pub buy_pct: f64,
    pub sell_pct: f64,
}

impl SpreadEntry {
    pub fn new(buy_pct: f64, sell_pct: f64) -> Self {
        Self { buy_pct, sell_pct }
    }

    pub fn for_side(&self, side: Side) -> f64 {
        match side {
            Side::Source => self.buy_pct,
            Side::Target => self.sell_pct,
        }
    }
}

/// Per-currency spread entries.
///
/// A missing entry reads as zero spread. Entries are created on the first
/// explicit-rate commit for a currency and only ever overwritten after that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadTable {
    entries: BTreeMap<CurrencyCode, SpreadEntry>,
}

impl SpreadTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `code`, zero spread if none was ever committed.
    pub fn entry(&self, code: &CurrencyCode) -> SpreadEntry {
        self.entries.get(code).copied().unwrap_or_default()
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.entries.contains_key(code)
    }

    /// Spread applied on `side` when `code` sits on that side of the pair.
    pub fn pct(&self, code: &CurrencyCode, side: Side) -> f64 {
        self.entry(code).for_side(side)
    }

    /// Overwrite one side of the entry for `code`, creating it if needed.
    pub fn set(&mut self, code: CurrencyCode, side: Side, pct: f64) {
        let entry = self.entries.entry(code).or_default();
        match side {
            Side::Source => entry.buy_pct = pct,
            Side::Target => entry.sell_pct = pct,
        }
    }

    pub fn insert(&mut self, code: CurrencyCode, entry: SpreadEntry) {
        self.entries.insert(code, entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, &SpreadEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(CurrencyCode, SpreadEntry)> for SpreadTable {
    fn from_iter<T: IntoIterator<Item = (CurrencyCode, SpreadEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
