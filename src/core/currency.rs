use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Currencies shown first in every currency list, in this order.
///
/// Codes supplied by the reference feed are appended after these.
pub const PRIORITY_CURRENCIES: [&str; 10] = [
    "RUB", "THB", "USD", "EUR", "CNY", "KZT", "TRY", "AED", "GBP", "JPY",
];

/// Three-letter uppercase currency code.
///
/// A code is only a key: no currency carries state of its own. Rates and
/// spreads are looked up by code in the reference table and spread table.
///
/// # Examples
///
/// ```
/// use exchange_desk::core::currency::CurrencyCode;
///
/// let rub = CurrencyCode::parse("rub").unwrap();
/// assert_eq!(rub, CurrencyCode::new("RUB"));
/// assert!(CurrencyCode::parse("RUBLE").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

/// Rejected currency code text.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid currency code '{0}': expected three ASCII letters")]
pub struct InvalidCurrencyCode(pub String);

impl CurrencyCode {
    /// Wrap a code that is already known to be valid (literals, trusted data).
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Validate free-form text as a currency code, normalising to uppercase.
    pub fn parse(text: &str) -> Result<Self, InvalidCurrencyCode> {
        let trimmed = text.trim();
        if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(InvalidCurrencyCode(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Position in [`PRIORITY_CURRENCIES`], if listed there.
    pub fn priority(&self) -> Option<usize> {
        PRIORITY_CURRENCIES.iter().position(|c| *c == self.0)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Which side of the active pair an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The source currency, bought settlement asset with (buy rate).
    Source,
    /// The target currency, received for settlement asset (sell rate).
    Target,
}

/// The active currency pair.
///
/// `source` is the currency the operator buys settlement asset with,
/// `target` is the currency the operator sells settlement asset for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairSelection {
    pub source: CurrencyCode,
    pub target: CurrencyCode,
}

impl PairSelection {
    pub fn new(source: CurrencyCode, target: CurrencyCode) -> Self {
        Self { source, target }
    }

    /// The same pair with source and target exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }

    pub fn code(&self, side: Side) -> &CurrencyCode {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }

    /// Replace the currency on one side.
    pub fn with(&self, side: Side, code: CurrencyCode) -> Self {
        match side {
            Side::Source => Self::new(code, self.target.clone()),
            Side::Target => Self::new(self.source.clone(), code),
        }
    }
}

impl Default for PairSelection {
    fn default() -> Self {
        Self::new(CurrencyCode::new("RUB"), CurrencyCode::new("THB"))
    }
}

impl fmt::Display for PairSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.target)
    }
}

/// Merge the priority list with feed-supplied codes.
///
/// Priority codes come first in their fixed order, the rest follow sorted
/// alphabetically. Duplicates are removed.
pub fn known_currencies<'a>(
    feed_codes: impl IntoIterator<Item = &'a CurrencyCode>,
) -> Vec<CurrencyCode> {
    let mut codes: Vec<CurrencyCode> = PRIORITY_CURRENCIES
        .iter()
        .map(|c| CurrencyCode::new(*c))
        .collect();
    let mut extra: Vec<CurrencyCode> = feed_codes
        .into_iter()
        .filter(|c| c.priority().is_none())
        .cloned()
        .collect();
    extra.sort();
    extra.dedup();
    codes.extend(extra);
    codes
}

/// Ordering used by every currency listing: priority list first, then by code.
pub fn display_order(a: &CurrencyCode, b: &CurrencyCode) -> std::cmp::Ordering {
    match (a.priority(), b.priority()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_equality() {
        let a = CurrencyCode::new("USD");
        let b = CurrencyCode::new("USD");
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_normalises_case() {
        assert_eq!(CurrencyCode::parse(" thb ").unwrap().as_str(), "THB");
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        assert!(CurrencyCode::parse("US").is_err());
        assert!(CurrencyCode::parse("US1").is_err());
        assert!(CurrencyCode::parse("").is_err());
    }

    #[test]
    fn test_pair_swap() {
        let pair = PairSelection::default();
        let swapped = pair.swapped();
        assert_eq!(swapped.source.as_str(), "THB");
        assert_eq!(swapped.target.as_str(), "RUB");
        assert_eq!(swapped.swapped(), pair);
    }

    #[test]
    fn test_pair_with_side() {
        let pair = PairSelection::default().with(Side::Target, CurrencyCode::new("USD"));
        assert_eq!(pair.to_string(), "RUB/USD");
    }

    #[test]
    fn test_known_currencies_order() {
        let feed = vec![
            CurrencyCode::new("ZAR"),
            CurrencyCode::new("USD"),
            CurrencyCode::new("BRL"),
        ];
        let known = known_currencies(&feed);
        assert_eq!(known[0].as_str(), "RUB");
        assert_eq!(known.len(), PRIORITY_CURRENCIES.len() + 2);
        assert_eq!(known[known.len() - 2].as_str(), "BRL");
        assert_eq!(known[known.len() - 1].as_str(), "ZAR");
    }

    #[test]
    fn test_display_order() {
        let mut codes = vec![
            CurrencyCode::new("BRL"),
            CurrencyCode::new("EUR"),
            CurrencyCode::new("RUB"),
        ];
        codes.sort_by(display_order);
        let order: Vec<&str> = codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(order, vec!["RUB", "EUR", "BRL"]);
    }
}
