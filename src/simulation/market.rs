//! Random reference markets for benchmarks, demos and testing.

use crate::core::currency::{CurrencyCode, PRIORITY_CURRENCIES};
use crate::core::reference::ReferenceRateTable;
use crate::core::spread::{SpreadEntry, SpreadTable};
use rand::Rng;

/// Configuration for generating a random reference table.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Currencies to quote.
    pub currencies: Vec<CurrencyCode>,
    /// Smallest rate per base unit.
    pub min_rate: f64,
    /// Largest rate per base unit.
    pub max_rate: f64,
    /// Largest absolute spread, in percent, for generated spread entries.
    pub max_spread_pct: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            currencies: PRIORITY_CURRENCIES
                .iter()
                .map(|c| CurrencyCode::new(*c))
                .collect(),
            min_rate: 0.5,
            max_rate: 500.0,
            max_spread_pct: 3.0,
        }
    }
}

/// Generate a reference table with a random rate for every configured
/// currency.
pub fn generate_reference_table(config: &MarketConfig) -> ReferenceRateTable {
    let mut rng = rand::thread_rng();
    ReferenceRateTable::from_rates(
        config
            .currencies
            .iter()
            .map(|code| (code.clone(), rng.gen_range(config.min_rate..config.max_rate))),
    )
}

/// Generate buy and sell spreads for every configured currency.
pub fn generate_spreads(config: &MarketConfig) -> SpreadTable {
    let mut rng = rand::thread_rng();
    let max = config.max_spread_pct;
    config
        .currencies
        .iter()
        .map(|code| {
            (
                code.clone(),
                SpreadEntry::new(rng.gen_range(-max..=max), rng.gen_range(-max..=max)),
            )
        })
        .collect()
}

/// Move every rate of `table` by a random relative shock of at most
/// `max_shock_pct` percent in either direction.
pub fn shock_table(table: &ReferenceRateTable, max_shock_pct: f64) -> ReferenceRateTable {
    let mut rng = rand::thread_rng();
    ReferenceRateTable::from_rates(table.iter().map(|(code, rate)| {
        let shock = rng.gen_range(-max_shock_pct..=max_shock_pct);
        (code.clone(), rate * (1.0 + shock / 100.0))
    }))
}
