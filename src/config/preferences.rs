//! Operator preferences and their persisted representation.
//!
//! Every value is stored as plain text under its own key. A missing or
//! unreadable value falls back to its default; it is never an error.

use crate::config::store::{ConfigStore, StoreError};
use crate::core::currency::{CurrencyCode, PairSelection};
use crate::core::spread::{SpreadEntry, SpreadTable};
use crate::engine::rates::{CalcMode, QuotedRates};
use log::warn;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

pub const KEY_PAIR: &str = "pair";
pub const KEY_CALC_MODE: &str = "calc_mode";
pub const KEY_ADVANCED: &str = "advanced";
pub const KEY_SPREADS: &str = "spreads";
pub const KEY_CONFIGURED: &str = "configured";
pub const KEY_LAST_BUY_RATE: &str = "last_buy_rate";
pub const KEY_LAST_SELL_RATE: &str = "last_sell_rate";

/// Currencies configured out of the box.
pub const DEFAULT_CONFIGURED: [&str; 4] = ["RUB", "THB", "USD", "EUR"];

/// Decimal places kept when persisting a spread percentage.
const SPREAD_DECIMALS: u32 = 10;

/// Tunables of the engine itself, not persisted.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Absolute spread, in percent, above which the risk gate flags.
    pub risk_threshold_pct: f64,
    /// Delay before a flagged spread is shown to the operator.
    pub warning_debounce: Duration,
    /// Decimal places for recomputed amount fields.
    pub display_decimals: usize,
    /// Decimal places for rendered quoted rates.
    pub rate_decimals: usize,
    /// Name of the intermediate settlement asset.
    pub settlement_asset: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_threshold_pct: 5.0,
            warning_debounce: Duration::from_millis(3000),
            display_decimals: 2,
            rate_decimals: 4,
            settlement_asset: "USDT".to_string(),
        }
    }
}

/// Everything restored from the config store at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub pair: PairSelection,
    pub mode: CalcMode,
    pub advanced: bool,
    pub spreads: SpreadTable,
    pub configured: BTreeSet<CurrencyCode>,
    pub last_rates: Option<QuotedRates>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            pair: PairSelection::default(),
            mode: CalcMode::Derived,
            advanced: false,
            spreads: SpreadTable::new(),
            configured: DEFAULT_CONFIGURED
                .iter()
                .map(|c| CurrencyCode::new(*c))
                .collect(),
            last_rates: None,
        }
    }
}

/// Spread entry as persisted: decimal strings.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSpread {
    #[serde(with = "rust_decimal::serde::str")]
    buy: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    sell: Decimal,
}

fn to_decimal(pct: f64) -> Decimal {
    Decimal::from_f64(pct)
        .map(|d| d.round_dp(SPREAD_DECIMALS).normalize())
        .unwrap_or(Decimal::ZERO)
}

fn from_decimal(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Decode a value, logging and discarding it when malformed.
fn decode<T>(key: &str, raw: Option<String>, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = raw?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!("Ignoring malformed stored value for '{}': {:?}", key, raw);
    }
    parsed
}

fn parse_pair(raw: &str) -> Option<PairSelection> {
    let [source, target]: [String; 2] = serde_json::from_str(raw).ok()?;
    Some(PairSelection::new(
        CurrencyCode::parse(&source).ok()?,
        CurrencyCode::parse(&target).ok()?,
    ))
}

fn parse_spreads(raw: &str) -> Option<SpreadTable> {
    let map: BTreeMap<String, PersistedSpread> = serde_json::from_str(raw).ok()?;
    map.into_iter()
        .map(|(code, spread)| {
            Some((
                CurrencyCode::parse(&code).ok()?,
                SpreadEntry::new(from_decimal(spread.buy), from_decimal(spread.sell)),
            ))
        })
        .collect()
}

fn parse_configured(raw: &str) -> Option<BTreeSet<CurrencyCode>> {
    let codes: Vec<String> = serde_json::from_str(raw).ok()?;
    codes.iter().map(|c| CurrencyCode::parse(c).ok()).collect()
}

fn parse_rate(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r > 0.0)
}

impl Preferences {
    /// Read all preferences, substituting defaults for absent values.
    pub fn load(store: &impl ConfigStore) -> Self {
        let defaults = Self::default();
        let last_buy = decode(KEY_LAST_BUY_RATE, store.get(KEY_LAST_BUY_RATE), parse_rate);
        let last_sell = decode(KEY_LAST_SELL_RATE, store.get(KEY_LAST_SELL_RATE), parse_rate);
        Self {
            pair: decode(KEY_PAIR, store.get(KEY_PAIR), parse_pair).unwrap_or(defaults.pair),
            mode: decode(KEY_CALC_MODE, store.get(KEY_CALC_MODE), |s| s.parse().ok())
                .unwrap_or(defaults.mode),
            advanced: decode(KEY_ADVANCED, store.get(KEY_ADVANCED), |s| s.trim().parse().ok())
                .unwrap_or(defaults.advanced),
            spreads: decode(KEY_SPREADS, store.get(KEY_SPREADS), parse_spreads)
                .unwrap_or(defaults.spreads),
            configured: decode(KEY_CONFIGURED, store.get(KEY_CONFIGURED), parse_configured)
                .unwrap_or(defaults.configured),
            last_rates: last_buy
                .zip(last_sell)
                .map(|(buy, sell)| QuotedRates::new(buy, sell)),
        }
    }

    /// Write every preference.
    pub fn save(&self, store: &mut impl ConfigStore) -> Result<(), StoreError> {
        save_pair(store, &self.pair)?;
        save_mode(store, self.mode)?;
        save_advanced(store, self.advanced)?;
        save_spreads(store, &self.spreads)?;
        save_configured(store, &self.configured)?;
        if let Some(rates) = &self.last_rates {
            save_last_rates(store, rates)?;
        }
        Ok(())
    }
}

pub fn save_pair(store: &mut impl ConfigStore, pair: &PairSelection) -> Result<(), StoreError> {
    let value = serde_json::to_string(&[pair.source.as_str(), pair.target.as_str()])?;
    store.set(KEY_PAIR, value)
}

pub fn save_mode(store: &mut impl ConfigStore, mode: CalcMode) -> Result<(), StoreError> {
    store.set(KEY_CALC_MODE, mode.as_str().to_string())
}

pub fn save_advanced(store: &mut impl ConfigStore, advanced: bool) -> Result<(), StoreError> {
    store.set(KEY_ADVANCED, advanced.to_string())
}

pub fn save_spreads(store: &mut impl ConfigStore, spreads: &SpreadTable) -> Result<(), StoreError> {
    let map: BTreeMap<&str, PersistedSpread> = spreads
        .iter()
        .map(|(code, entry)| {
            (
                code.as_str(),
                PersistedSpread {
                    buy: to_decimal(entry.buy_pct),
                    sell: to_decimal(entry.sell_pct),
                },
            )
        })
        .collect();
    store.set(KEY_SPREADS, serde_json::to_string(&map)?)
}

pub fn save_configured(
    store: &mut impl ConfigStore,
    configured: &BTreeSet<CurrencyCode>,
) -> Result<(), StoreError> {
    store.set(KEY_CONFIGURED, serde_json::to_string(configured)?)
}

pub fn save_last_rates(store: &mut impl ConfigStore, rates: &QuotedRates) -> Result<(), StoreError> {
    store.set(KEY_LAST_BUY_RATE, rates.buy.to_string())?;
    store.set(KEY_LAST_SELL_RATE, rates.sell.to_string())
}
