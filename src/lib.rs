//! # exchange-desk
//!
//! Rate and amount reconciliation engine for a currency exchange desk.
//!
//! Given live reference rates and per-currency spreads, the engine derives
//! the buy and sell quotes for a currency pair, keeps the three linked
//! amounts (given, received, settlement asset) consistent as the operator
//! edits any of them, and holds back persistence of suspiciously wide
//! spreads until the operator confirms them.
//!
//! ## Architecture
//!
//! - **core** — Currency codes, reference tables, spreads, amount text parsing
//! - **engine** — Rate derivation, amount reconciliation, spread risk gate, the desk facade
//! - **config** — Engine tunables, persisted preferences, key/value stores
//! - **feed** — Reference rate feed interface and parsers
//! - **simulation** — Random markets for benchmarks and testing

pub mod config;
pub mod core;
pub mod engine;
pub mod feed;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{ConfigStore, EngineConfig, JsonFileStore, MemoryStore};
    pub use crate::core::currency::{CurrencyCode, PairSelection, Side};
    pub use crate::core::numeric::{format_for_display, format_for_edit, parse_amount};
    pub use crate::core::reference::ReferenceRateTable;
    pub use crate::core::spread::{spread_pct, SpreadEntry, SpreadTable};
    pub use crate::engine::amounts::{AmountField, AmountTriple};
    pub use crate::engine::desk::ExchangeDesk;
    pub use crate::engine::rates::{CalcMode, QuotedRates};
    pub use crate::engine::risk::{Clock, ManualClock, RiskPhase, RiskState, SystemClock};
    pub use crate::feed::{RateFeed, StaticFeed};
}
