//! The three linked amounts and their reconciliation.
//!
//! `give` (source currency), `receive` (target currency) and `settlement`
//! (settlement asset) are tied together by the quoted rates:
//! `give = settlement * buy` and `receive = settlement * sell`.

use crate::core::numeric::{format_for_display, format_for_edit, parse_amount};
use crate::engine::rates::QuotedRates;
use serde::{Deserialize, Serialize};

/// Which amount field the operator edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountField {
    Give,
    Receive,
    Settlement,
}

/// Numeric values of the three linked amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountTriple {
    pub give: f64,
    pub receive: f64,
    pub settlement: f64,
}

impl AmountTriple {
    pub fn get(&self, field: AmountField) -> f64 {
        match field {
            AmountField::Give => self.give,
            AmountField::Receive => self.receive,
            AmountField::Settlement => self.settlement,
        }
    }

    fn set(&mut self, field: AmountField, value: f64) {
        match field {
            AmountField::Give => self.give = value,
            AmountField::Receive => self.receive = value,
            AmountField::Settlement => self.settlement = value,
        }
    }

    /// Set `field` to `value` and recompute the other two from it.
    ///
    /// Returns `false` and leaves the dependents untouched when the rates
    /// cannot be used as divisors.
    pub fn reconcile(&mut self, field: AmountField, value: f64, rates: &QuotedRates) -> bool {
        self.set(field, value);
        if !rates.is_usable() {
            return false;
        }
        let settlement = match field {
            AmountField::Give => value / rates.buy,
            AmountField::Receive => value / rates.sell,
            AmountField::Settlement => value,
        };
        self.settlement = settlement;
        if field != AmountField::Give {
            self.give = settlement * rates.buy;
        }
        if field != AmountField::Receive {
            self.receive = settlement * rates.sell;
        }
        true
    }

    /// Whether `give = settlement * buy` and `receive = settlement * sell`
    /// hold within `tolerance` relative error.
    pub fn is_consistent(&self, rates: &QuotedRates, tolerance: f64) -> bool {
        close(self.give, self.settlement * rates.buy, tolerance)
            && close(self.receive, self.settlement * rates.sell, tolerance)
    }
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs());
    scale == 0.0 || (a - b).abs() <= tolerance * scale
}

/// The amount fields as the operator sees them.
///
/// The edited field keeps the operator's sanitised text; recomputed fields
/// show a display rendering of their new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountFields {
    values: AmountTriple,
    give_text: String,
    receive_text: String,
    settlement_text: String,
}

impl AmountFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> AmountTriple {
        self.values
    }

    pub fn text(&self, field: AmountField) -> &str {
        match field {
            AmountField::Give => &self.give_text,
            AmountField::Receive => &self.receive_text,
            AmountField::Settlement => &self.settlement_text,
        }
    }

    fn text_mut(&mut self, field: AmountField) -> &mut String {
        match field {
            AmountField::Give => &mut self.give_text,
            AmountField::Receive => &mut self.receive_text,
            AmountField::Settlement => &mut self.settlement_text,
        }
    }

    /// Apply an operator edit to `field`.
    pub fn edit(&mut self, field: AmountField, text: &str, rates: &QuotedRates, decimals: usize) {
        let cleaned = format_for_edit(text);
        let value = parse_amount(&cleaned);
        *self.text_mut(field) = cleaned;
        if self.values.reconcile(field, value, rates) {
            self.render_except(Some(field), decimals);
        }
    }

    /// Recompute after a rate change, keeping `give` as the anchor.
    ///
    /// Does nothing when `give` is zero or the rates are unusable.
    pub fn rates_changed(&mut self, rates: &QuotedRates, decimals: usize) {
        if self.values.give == 0.0 {
            return;
        }
        if self.values.reconcile(AmountField::Give, self.values.give, rates) {
            self.render_except(Some(AmountField::Give), decimals);
        }
    }

    fn render_except(&mut self, keep: Option<AmountField>, decimals: usize) {
        for field in [AmountField::Give, AmountField::Receive, AmountField::Settlement] {
            if Some(field) != keep {
                *self.text_mut(field) = format_for_display(self.values.get(field), decimals);
            }
        }
    }
}
