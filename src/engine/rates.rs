//! Quoted rate derivation.
//!
//! In derived mode the buy and sell rates are always the reference rates
//! with the stored spreads applied. In explicit mode the operator types the
//! rates and the spreads are back-computed from them.

use crate::core::currency::{PairSelection, Side};
use crate::core::reference::ReferenceRateTable;
use crate::core::spread::{apply_spread, spread_pct, SpreadTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the quoted rates are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalcMode {
    /// Rates recomputed from stored spreads and the live reference rate.
    #[default]
    #[serde(rename = "approx")]
    Derived,
    /// Rates typed by the operator; spreads follow from them.
    #[serde(rename = "exact")]
    Explicit,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown calculation mode '{0}': expected 'approx' or 'exact'")]
pub struct UnknownCalcMode(pub String);

impl CalcMode {
    /// Persisted name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CalcMode::Derived => "approx",
            CalcMode::Explicit => "exact",
        }
    }
}

impl FromStr for CalcMode {
    type Err = UnknownCalcMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "approx" | "derived" => Ok(CalcMode::Derived),
            "exact" | "explicit" => Ok(CalcMode::Explicit),
            other => Err(UnknownCalcMode(other.to_string())),
        }
    }
}

impl fmt::Display for CalcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rates actually used for conversion, in currency per unit of the
/// settlement asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotedRates {
    /// Source currency paid per settlement unit.
    pub buy: f64,
    /// Target currency paid out per settlement unit.
    pub sell: f64,
}

impl QuotedRates {
    pub fn new(buy: f64, sell: f64) -> Self {
        Self { buy, sell }
    }

    pub fn get(&self, side: Side) -> f64 {
        match side {
            Side::Source => self.buy,
            Side::Target => self.sell,
        }
    }

    pub fn set(&mut self, side: Side, rate: f64) {
        match side {
            Side::Source => self.buy = rate,
            Side::Target => self.sell = rate,
        }
    }

    /// Both rates are usable as divisors.
    pub fn is_usable(&self) -> bool {
        usable(self.buy) && usable(self.sell)
    }
}

pub(crate) fn usable(rate: f64) -> bool {
    rate.is_finite() && rate != 0.0
}

/// Derived quoted rate for one side of the pair.
///
/// `None` when the reference table lacks that side's currency.
pub fn derive_side(
    side: Side,
    pair: &PairSelection,
    references: &ReferenceRateTable,
    spreads: &SpreadTable,
) -> Option<f64> {
    let code = pair.code(side);
    let reference = references.rate(code)?;
    Some(apply_spread(reference, spreads.pct(code, side)))
}

/// Derived quoted rates for the pair.
///
/// `None` unless both reference rates are available.
pub fn derive_rates(
    pair: &PairSelection,
    references: &ReferenceRateTable,
    spreads: &SpreadTable,
) -> Option<QuotedRates> {
    Some(QuotedRates::new(
        derive_side(Side::Source, pair, references, spreads)?,
        derive_side(Side::Target, pair, references, spreads)?,
    ))
}

/// Spread implied by a typed rate on one side of the pair.
///
/// `None` when the reference rate is unavailable or the typed rate is zero,
/// in which case no spread should be stored.
pub fn implied_spread(
    side: Side,
    typed_rate: f64,
    pair: &PairSelection,
    references: &ReferenceRateTable,
) -> Option<f64> {
    let reference = references.rate(pair.code(side))?;
    if !usable(typed_rate) {
        return None;
    }
    Some(spread_pct(typed_rate, reference))
}

/// Live spreads of the quoted rates against the reference table.
///
/// Zero on a side where either rate is missing.
pub fn live_spreads(
    rates: &QuotedRates,
    pair: &PairSelection,
    references: &ReferenceRateTable,
) -> (f64, f64) {
    (
        spread_pct(rates.buy, references.rate_or_zero(&pair.source)),
        spread_pct(rates.sell, references.rate_or_zero(&pair.target)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use approx::assert_relative_eq;

    fn references() -> ReferenceRateTable {
        ReferenceRateTable::from_rates([
            (CurrencyCode::new("RUB"), 95.5),
            (CurrencyCode::new("THB"), 35.2),
        ])
    }

    #[test]
    fn test_derive_without_spreads_is_reference() {
        let rates =
            derive_rates(&PairSelection::default(), &references(), &SpreadTable::new()).unwrap();
        assert_eq!(rates, QuotedRates::new(95.5, 35.2));
    }

    #[test]
    fn test_derive_applies_side_specific_spreads() {
        let mut spreads = SpreadTable::new();
        spreads.set(CurrencyCode::new("RUB"), Side::Source, 2.0);
        spreads.set(CurrencyCode::new("RUB"), Side::Target, 50.0);
        spreads.set(CurrencyCode::new("THB"), Side::Target, -1.0);
        let rates = derive_rates(&PairSelection::default(), &references(), &spreads).unwrap();
        assert_relative_eq!(rates.buy, 97.41, max_relative = 1e-12);
        assert_relative_eq!(rates.sell, 34.848, max_relative = 1e-12);
    }

    #[test]
    fn test_derive_missing_reference() {
        let pair = PairSelection::new(CurrencyCode::new("RUB"), CurrencyCode::new("EUR"));
        assert!(derive_rates(&pair, &references(), &SpreadTable::new()).is_none());
        assert!(derive_side(Side::Source, &pair, &references(), &SpreadTable::new()).is_some());
    }

    #[test]
    fn test_implied_spread() {
        let pct = implied_spread(Side::Source, 96.5, &PairSelection::default(), &references());
        assert_relative_eq!(pct.unwrap(), 1.0471204188, max_relative = 1e-9);
        let empty = ReferenceRateTable::empty();
        assert!(implied_spread(Side::Source, 96.5, &PairSelection::default(), &empty).is_none());
        assert!(implied_spread(Side::Source, 0.0, &PairSelection::default(), &references()).is_none());
    }

    #[test]
    fn test_calc_mode_names() {
        assert_eq!("approx".parse::<CalcMode>().unwrap(), CalcMode::Derived);
        assert_eq!("exact".parse::<CalcMode>().unwrap(), CalcMode::Explicit);
        assert!("fast".parse::<CalcMode>().is_err());
        assert_eq!(CalcMode::Explicit.to_string(), "exact");
        assert_eq!(serde_json::to_string(&CalcMode::Derived).unwrap(), "\"approx\"");
    }

    #[test]
    fn test_live_spreads() {
        let (buy, sell) = live_spreads(
            &QuotedRates::new(101.23, 35.2),
            &PairSelection::default(),
            &references(),
        );
        assert_relative_eq!(buy, 6.0, max_relative = 1e-9);
        assert_eq!(sell, 0.0);
    }
}
