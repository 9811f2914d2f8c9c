use crate::core::currency::CurrencyCode;
use crate::core::reference::ReferenceRateTable;
use log::debug;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from fetching the reference feed.
///
/// Callers treat every variant as "no data": the engine keeps whatever
/// table it had and the operator can carry on in explicit mode.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read rates from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("rate feed response is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),
    #[error("rate feed response contains no usable rates")]
    NoRates,
}

/// A source of reference rates, fetched once per refresh.
pub trait RateFeed {
    fn name(&self) -> &str;

    fn fetch(&self) -> Result<ReferenceRateTable, FeedError>;
}

/// Parse a feed response body.
///
/// Accepts either `{"rates": {"RUB": 95.5, ...}}` or a flat
/// `{"RUB": 95.5, ...}` object. Rates may be numbers or numeric strings.
/// Keys that are not currency codes and values that are not positive
/// numbers are dropped.
///
/// # Examples
///
/// ```
/// use exchange_desk::feed::parse_feed;
///
/// let table = parse_feed(r#"{"rates": {"RUB": 95.5, "thb": "35.2", "USDT": 1}}"#).unwrap();
/// assert_eq!(table.len(), 2);
/// ```
pub fn parse_feed(body: &str) -> Result<ReferenceRateTable, FeedError> {
    let value: Value = serde_json::from_str(body)?;
    let object = match value.get("rates") {
        Some(Value::Object(rates)) => rates,
        _ => value.as_object().ok_or(FeedError::NoRates)?,
    };
    let table = ReferenceRateTable::from_rates(object.iter().filter_map(|(key, rate)| {
        let code = CurrencyCode::parse(key).ok()?;
        let rate = match rate {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        Some((code, rate))
    }));
    if table.is_empty() {
        return Err(FeedError::NoRates);
    }
    debug!("Parsed {} reference rates", table.len());
    Ok(table)
}

/// Feed returning a fixed table. Useful for tests and offline use.
#[derive(Debug, Clone)]
pub struct StaticFeed {
    table: ReferenceRateTable,
}

impl StaticFeed {
    pub fn new(table: ReferenceRateTable) -> Self {
        Self { table }
    }

    pub fn from_rates<'a>(rates: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self::new(ReferenceRateTable::from_rates(
            rates
                .into_iter()
                .map(|(code, rate)| (CurrencyCode::new(code), rate)),
        ))
    }
}

impl RateFeed for StaticFeed {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self) -> Result<ReferenceRateTable, FeedError> {
        if self.table.is_empty() {
            return Err(FeedError::NoRates);
        }
        Ok(ReferenceRateTable::from_rates(
            self.table.iter().map(|(c, r)| (c.clone(), r)),
        ))
    }
}

/// Feed reading a saved response body from disk.
#[derive(Debug, Clone)]
pub struct JsonFileFeed {
    path: PathBuf,
}

impl JsonFileFeed {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RateFeed for JsonFileFeed {
    fn name(&self) -> &str {
        "json-file"
    }

    fn fetch(&self) -> Result<ReferenceRateTable, FeedError> {
        let body = fs::read_to_string(&self.path).map_err(|source| FeedError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_feed(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_rates() {
        let table = parse_feed(r#"{"base": "USD", "rates": {"RUB": 95.5, "THB": 35.2}}"#).unwrap();
        assert_eq!(table.rate(&CurrencyCode::new("RUB")), Some(95.5));
        assert_eq!(table.rate(&CurrencyCode::new("THB")), Some(35.2));
    }

    #[test]
    fn test_parse_flat_rates() {
        let table = parse_feed(r#"{"EUR": 0.92, "USD": "1"}"#).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_parse_drops_invalid_entries() {
        let table =
            parse_feed(r#"{"rates": {"RUB": -1, "THB": null, "USDT": 1, "EUR": 0.92}}"#).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains(&CurrencyCode::new("EUR")));
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(parse_feed("<html>"), Err(FeedError::NotJson(_))));
        assert!(matches!(parse_feed("[1, 2]"), Err(FeedError::NoRates)));
        assert!(matches!(parse_feed(r#"{"rates": {}}"#), Err(FeedError::NoRates)));
    }

    #[test]
    fn test_static_feed() {
        let feed = StaticFeed::from_rates([("RUB", 95.5)]);
        assert_eq!(feed.fetch().unwrap().len(), 1);
        let empty = StaticFeed::new(ReferenceRateTable::empty());
        assert!(matches!(empty.fetch(), Err(FeedError::NoRates)));
    }

    #[test]
    fn test_missing_file() {
        let feed = JsonFileFeed::new("/nonexistent/rates.json");
        assert!(matches!(feed.fetch(), Err(FeedError::Io { .. })));
    }
}
