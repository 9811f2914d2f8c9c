//! The exchange desk: one event handler per operator action.
//!
//! Every handler runs to completion and leaves rates, amounts and the risk
//! gate mutually consistent. Handlers never fail; malformed input degrades
//! to zero and missing reference rates freeze the affected rate.

use crate::config::preferences::{self, EngineConfig, Preferences};
use crate::config::store::{ConfigStore, StoreError};
use crate::core::currency::{display_order, known_currencies, CurrencyCode, PairSelection, Side};
use crate::core::numeric::{format_for_display, format_for_edit, parse_amount};
use crate::core::reference::ReferenceRateTable;
use crate::core::spread::{apply_spread, format_signed_spread, spread_pct, SpreadTable};
use crate::engine::amounts::{AmountField, AmountFields, AmountTriple};
use crate::engine::rates::{
    derive_side, implied_spread, live_spreads, usable, CalcMode, QuotedRates,
};
use crate::engine::risk::{
    check_spreads, Clock, GateError, RiskGate, RiskPhase, RiskState, SpreadViolation, SystemClock,
};
use crate::feed::FeedError;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;

/// One row of the reference comparison listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyComparison {
    pub code: CurrencyCode,
    pub reference_rate: f64,
    /// Rate quoted when this currency is the pair's source.
    pub buy_rate: f64,
    pub buy_spread_text: String,
    /// Rate quoted when this currency is the pair's target.
    pub sell_rate: f64,
    pub sell_spread_text: String,
}

/// Everything the presentation layer renders, in one value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeskSnapshot {
    pub pair: PairSelection,
    pub mode: CalcMode,
    pub advanced: bool,
    pub rates: QuotedRates,
    pub buy_rate_text: String,
    pub sell_rate_text: String,
    pub buy_rate_editable: bool,
    pub sell_rate_editable: bool,
    pub amounts: AmountTriple,
    pub give_text: String,
    pub receive_text: String,
    pub settlement_text: String,
    pub settlement_asset: String,
    pub risk: RiskState,
}

/// Rate and amount reconciliation engine for a single operator.
pub struct ExchangeDesk<S: ConfigStore, C: Clock = SystemClock> {
    config: EngineConfig,
    store: S,
    clock: C,
    references: ReferenceRateTable,
    pair: PairSelection,
    mode: CalcMode,
    advanced: bool,
    spreads: SpreadTable,
    configured: BTreeSet<CurrencyCode>,
    rates: QuotedRates,
    buy_rate_text: String,
    sell_rate_text: String,
    amounts: AmountFields,
    gate: RiskGate,
}

impl<S: ConfigStore> ExchangeDesk<S, SystemClock> {
    /// Engine on the wall clock with default tunables.
    pub fn with_store(store: S) -> Self {
        Self::new(store, SystemClock, EngineConfig::default())
    }
}

impl<S: ConfigStore, C: Clock> ExchangeDesk<S, C> {
    /// Restore preferences from `store` and start with an empty reference
    /// table. The last persisted rates, if any, stand in until the feed
    /// arrives.
    pub fn new(store: S, clock: C, config: EngineConfig) -> Self {
        let prefs = Preferences::load(&store);
        let rates = prefs.last_rates.unwrap_or_default();
        let gate = RiskGate::new(config.warning_debounce);
        let mut desk = Self {
            config,
            store,
            clock,
            references: ReferenceRateTable::empty(),
            pair: prefs.pair,
            mode: prefs.mode,
            advanced: prefs.advanced,
            spreads: prefs.spreads,
            configured: prefs.configured,
            rates,
            buy_rate_text: String::new(),
            sell_rate_text: String::new(),
            amounts: AmountFields::new(),
            gate,
        };
        desk.render_rate_text(Side::Source);
        desk.render_rate_text(Side::Target);
        debug!(
            "Desk restored: pair {}, mode {}, advanced {}, {} spread entries",
            desk.pair,
            desk.mode,
            desk.advanced,
            desk.spreads.len()
        );
        desk
    }

    // --- Feed events ---

    /// Replace the reference table with a fresh snapshot.
    pub fn apply_reference_rates(&mut self, table: ReferenceRateTable) {
        info!("Reference rates refreshed: {} currencies", table.len());
        self.references = table;
        match self.mode {
            CalcMode::Derived => self.rederive(false),
            // Typed rates stay authoritative; only sides never set are seeded.
            CalcMode::Explicit => self.rederive(true),
        }
        self.on_rates_changed();
    }

    /// Record a failed feed fetch. The current table is kept.
    pub fn reference_fetch_failed(&mut self, error: &FeedError) {
        warn!(
            "Reference rate fetch failed, keeping {} cached rates: {}",
            self.references.len(),
            error
        );
    }

    // --- Operator events ---

    pub fn edit_give(&mut self, text: &str) {
        self.edit_amount(AmountField::Give, text);
    }

    pub fn edit_receive(&mut self, text: &str) {
        self.edit_amount(AmountField::Receive, text);
    }

    pub fn edit_settlement(&mut self, text: &str) {
        self.edit_amount(AmountField::Settlement, text);
    }

    pub fn edit_amount(&mut self, field: AmountField, text: &str) {
        self.amounts
            .edit(field, text, &self.rates, self.config.display_decimals);
        self.persist_if_allowed();
    }

    /// Commit a typed rate for one side of the pair.
    ///
    /// Ignored while the rate is derived. When the reference rate is known,
    /// the implied spread is stored for later derived-mode use.
    pub fn edit_rate(&mut self, side: Side, text: &str) {
        if !self.rate_editable(side) {
            debug!("Ignoring typed {:?} rate: rate is derived", side);
            return;
        }
        let cleaned = format_for_edit(text);
        let rate = parse_amount(&cleaned);
        *self.rate_text_mut(side) = cleaned;
        self.rates.set(side, rate);

        let code = self.pair.code(side).clone();
        match implied_spread(side, rate, &self.pair, &self.references) {
            Some(pct) => {
                info!("Spread for {} ({:?}) set to {:.4}% from typed rate", code, side, pct);
                self.spreads.set(code, side, pct);
            }
            None => debug!("No reference for {}: typed rate kept without spread", code),
        }
        self.on_rates_changed();
    }

    pub fn swap_pair(&mut self) {
        self.change_pair(self.pair.swapped());
    }

    /// Choose the currency on one side. Picking the other side's currency
    /// swaps the pair.
    pub fn select_currency(&mut self, side: Side, code: CurrencyCode) {
        let other = match side {
            Side::Source => Side::Target,
            Side::Target => Side::Source,
        };
        if *self.pair.code(other) == code {
            self.swap_pair();
        } else if *self.pair.code(side) != code {
            self.change_pair(self.pair.with(side, code));
        }
    }

    pub fn set_mode(&mut self, mode: CalcMode) {
        if self.mode == mode {
            return;
        }
        info!("Calculation mode {} -> {}", self.mode, mode);
        self.mode = mode;
        log_store_error(preferences::save_mode(&mut self.store, mode));
        if mode == CalcMode::Derived {
            self.rederive(false);
        }
        self.render_rate_text(Side::Source);
        self.render_rate_text(Side::Target);
        self.on_rates_changed();
    }

    pub fn set_advanced(&mut self, advanced: bool) {
        if self.advanced == advanced {
            return;
        }
        self.advanced = advanced;
        log_store_error(preferences::save_advanced(&mut self.store, advanced));
        self.evaluate_risk();
        self.persist_if_allowed();
    }

    /// Toggle the "entered rates are correct" confirmation of the warning.
    pub fn set_content_confirmed(&mut self, confirmed: bool) {
        self.gate.set_content_confirmed(confirmed);
    }

    /// Toggle the "remember this spread" confirmation of the warning.
    pub fn set_remember_spread(&mut self, remember: bool) {
        self.gate.set_remember_spread(remember);
    }

    /// Dismiss the spread warning.
    ///
    /// With `remember_spread` or the remember confirmation set, both
    /// currencies of the pair become configured. Persistence resumes
    /// immediately.
    pub fn acknowledge_warning(&mut self, remember_spread: bool) -> Result<(), GateError> {
        if self.gate.acknowledge(remember_spread)? {
            self.configured.insert(self.pair.source.clone());
            self.configured.insert(self.pair.target.clone());
            log_store_error(preferences::save_configured(
                &mut self.store,
                &self.configured,
            ));
        }
        self.persist_if_allowed();
        Ok(())
    }

    /// Fire the warning timer if due. Returns `true` when the warning was
    /// just shown.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        self.gate.poll(now)
    }

    // --- Queries ---

    pub fn quoted_rates(&self) -> QuotedRates {
        self.rates
    }

    pub fn amounts(&self) -> AmountTriple {
        self.amounts.values()
    }

    pub fn amount_text(&self, field: AmountField) -> &str {
        self.amounts.text(field)
    }

    pub fn rate_text(&self, side: Side) -> &str {
        match side {
            Side::Source => &self.buy_rate_text,
            Side::Target => &self.sell_rate_text,
        }
    }

    /// Whether the operator may type this rate. Derived rates are read-only
    /// unless their reference rate is missing.
    pub fn rate_editable(&self, side: Side) -> bool {
        self.mode == CalcMode::Explicit || !self.references.contains(self.pair.code(side))
    }

    pub fn risk_state(&self) -> RiskState {
        self.gate.state()
    }

    pub fn risk_phase(&self) -> RiskPhase {
        self.gate.phase()
    }

    pub fn violation(&self) -> Option<SpreadViolation> {
        self.gate.violation()
    }

    /// Live buy and sell spreads of the quoted rates.
    pub fn live_spreads(&self) -> (f64, f64) {
        live_spreads(&self.rates, &self.pair, &self.references)
    }

    pub fn pair(&self) -> &PairSelection {
        &self.pair
    }

    pub fn mode(&self) -> CalcMode {
        self.mode
    }

    pub fn advanced(&self) -> bool {
        self.advanced
    }

    pub fn spreads(&self) -> &SpreadTable {
        &self.spreads
    }

    pub fn configured(&self) -> &BTreeSet<CurrencyCode> {
        &self.configured
    }

    pub fn references(&self) -> &ReferenceRateTable {
        &self.references
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Priority currencies followed by everything the feed supplied.
    pub fn known_currencies(&self) -> Vec<CurrencyCode> {
        known_currencies(self.references.codes())
    }

    /// Reference versus quoted rates for every configured currency the feed
    /// covers.
    pub fn comparisons(&self) -> Vec<CurrencyComparison> {
        let mut codes: Vec<&CurrencyCode> = self
            .configured
            .iter()
            .filter(|c| self.references.contains(c))
            .collect();
        codes.sort_by(|a, b| display_order(a, b));
        codes
            .into_iter()
            .map(|code| {
                let reference = self.references.rate_or_zero(code);
                let buy = apply_spread(reference, self.spreads.pct(code, Side::Source));
                let sell = apply_spread(reference, self.spreads.pct(code, Side::Target));
                CurrencyComparison {
                    code: code.clone(),
                    reference_rate: reference,
                    buy_rate: buy,
                    buy_spread_text: format_signed_spread(spread_pct(buy, reference)),
                    sell_rate: sell,
                    sell_spread_text: format_signed_spread(spread_pct(sell, reference)),
                }
            })
            .collect()
    }

    pub fn snapshot(&self) -> DeskSnapshot {
        DeskSnapshot {
            pair: self.pair.clone(),
            mode: self.mode,
            advanced: self.advanced,
            rates: self.rates,
            buy_rate_text: self.buy_rate_text.clone(),
            sell_rate_text: self.sell_rate_text.clone(),
            buy_rate_editable: self.rate_editable(Side::Source),
            sell_rate_editable: self.rate_editable(Side::Target),
            amounts: self.amounts.values(),
            give_text: self.amounts.text(AmountField::Give).to_string(),
            receive_text: self.amounts.text(AmountField::Receive).to_string(),
            settlement_text: self.amounts.text(AmountField::Settlement).to_string(),
            settlement_asset: self.config.settlement_asset.clone(),
            risk: self.gate.state(),
        }
    }

    // --- Internals ---

    fn change_pair(&mut self, pair: PairSelection) {
        info!("Pair {} -> {}", self.pair, pair);
        self.pair = pair;
        log_store_error(preferences::save_pair(&mut self.store, &self.pair));
        self.rederive(false);
        self.on_rates_changed();
    }

    /// Recompute rates from reference and spreads on every side whose
    /// reference is available. With `only_unset`, sides already holding a
    /// usable rate are left alone.
    fn rederive(&mut self, only_unset: bool) {
        for side in [Side::Source, Side::Target] {
            if only_unset && usable(self.rates.get(side)) {
                continue;
            }
            if let Some(rate) = derive_side(side, &self.pair, &self.references, &self.spreads) {
                self.rates.set(side, rate);
                self.render_rate_text(side);
            }
        }
    }

    fn render_rate_text(&mut self, side: Side) {
        let text = format_for_display(self.rates.get(side), self.config.rate_decimals);
        *self.rate_text_mut(side) = text;
    }

    fn rate_text_mut(&mut self, side: Side) -> &mut String {
        match side {
            Side::Source => &mut self.buy_rate_text,
            Side::Target => &mut self.sell_rate_text,
        }
    }

    fn on_rates_changed(&mut self) {
        self.amounts
            .rates_changed(&self.rates, self.config.display_decimals);
        self.evaluate_risk();
        self.persist_if_allowed();
    }

    fn current_violation(&self) -> Option<SpreadViolation> {
        if !self.advanced {
            return None;
        }
        let buy_ref = self.references.rate(&self.pair.source)?;
        let sell_ref = self.references.rate(&self.pair.target)?;
        if !self.rates.is_usable() {
            return None;
        }
        check_spreads(
            spread_pct(self.rates.buy, buy_ref),
            spread_pct(self.rates.sell, sell_ref),
            self.config.risk_threshold_pct,
        )
    }

    fn evaluate_risk(&mut self) {
        let violation = self.current_violation();
        let now = self.clock.now();
        self.gate.observe(violation, now);
    }

    /// Persist the last good rates and the spread table, and reset the
    /// warning confirmations, unless an unacknowledged violation is live.
    fn persist_if_allowed(&mut self) {
        if self.gate.blocks_persistence() {
            debug!("Spread warning outstanding: persistence suspended");
            return;
        }
        log_store_error(preferences::save_spreads(&mut self.store, &self.spreads));
        if self.rates.is_usable() {
            log_store_error(preferences::save_last_rates(&mut self.store, &self.rates));
        }
        self.gate.clear_checks();
    }
}

fn log_store_error(result: Result<(), StoreError>) {
    if let Err(e) = result {
        warn!("Failed to persist desk state: {}", e);
    }
}
