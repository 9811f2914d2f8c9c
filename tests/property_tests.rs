use exchange_desk::config::preferences::EngineConfig;
use exchange_desk::config::store::MemoryStore;
use exchange_desk::core::currency::{CurrencyCode, PairSelection, Side};
use exchange_desk::core::numeric::{format_for_display, format_for_edit, parse_amount};
use exchange_desk::core::reference::ReferenceRateTable;
use exchange_desk::core::spread::{apply_spread, spread_pct, SpreadEntry, SpreadTable};
use exchange_desk::engine::amounts::{AmountField, AmountTriple};
use exchange_desk::engine::desk::ExchangeDesk;
use exchange_desk::engine::rates::{derive_rates, implied_spread, CalcMode, QuotedRates};
use exchange_desk::engine::risk::{ManualClock, RiskPhase};
use proptest::prelude::*;
use std::rc::Rc;

/// Generate a realistic positive rate (0.01 to 10 000).
fn arb_rate() -> impl Strategy<Value = f64> {
    0.01f64..10_000.0
}

/// Generate a positive amount (0.01 to 100 000 000).
fn arb_amount() -> impl Strategy<Value = f64> {
    0.01f64..100_000_000.0
}

/// Generate a spread percentage within a plausible band.
fn arb_spread() -> impl Strategy<Value = f64> {
    -20.0f64..20.0
}

/// Generate a field the operator may edit.
fn arb_field() -> impl Strategy<Value = AmountField> {
    prop::sample::select(vec![
        AmountField::Give,
        AmountField::Receive,
        AmountField::Settlement,
    ])
}

/// Generate operator-ish text: digits, separators, spaces, signs and noise.
fn arb_typed_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ',', ' ', '-', 'a', '$',
        ]),
        0..16,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tolerance * scale
}

proptest! {
    // ===================================================================
    // Cleaning up an edit never changes the number it reads as.
    // ===================================================================
    #[test]
    fn edit_formatting_preserves_value(text in arb_typed_text()) {
        let cleaned = format_for_edit(&text);
        prop_assert_eq!(parse_amount(&cleaned), parse_amount(&text));
        // Cleaning is idempotent.
        prop_assert_eq!(format_for_edit(&cleaned), cleaned);
    }

    // ===================================================================
    // Parsing never yields a non-finite value.
    // ===================================================================
    #[test]
    fn parse_is_total(text in ".{0,24}") {
        prop_assert!(parse_amount(&text).is_finite());
    }

    // ===================================================================
    // Display rendering reads back as the value rounded to its decimals.
    // ===================================================================
    #[test]
    fn display_reads_back(value in arb_amount()) {
        let shown = format_for_display(value, 2);
        let read_back = parse_amount(&shown);
        prop_assert!((read_back - value).abs() <= 0.005 + 1e-12 * value, "{} -> {}", value, shown);
    }

    // ===================================================================
    // A rate has zero spread against itself.
    // ===================================================================
    #[test]
    fn spread_against_self_is_zero(rate in arb_rate()) {
        prop_assert_eq!(spread_pct(rate, rate), 0.0);
    }

    // ===================================================================
    // Applying a spread and measuring it again gives the spread back.
    // ===================================================================
    #[test]
    fn spread_round_trip(reference in 1.0f64..10_000.0, pct in arb_spread()) {
        let quoted = apply_spread(reference, pct);
        let measured = spread_pct(quoted, reference);
        prop_assert!((measured - pct).abs() < 1e-6, "pct {} measured {}", pct, measured);
    }

    // ===================================================================
    // Any edit leaves the triple consistent with the rates.
    // ===================================================================
    #[test]
    fn reconciled_triple_is_consistent(
        buy in arb_rate(),
        sell in arb_rate(),
        field in arb_field(),
        value in arb_amount(),
    ) {
        let rates = QuotedRates::new(buy, sell);
        let mut triple = AmountTriple::default();
        prop_assert!(triple.reconcile(field, value, &rates));
        prop_assert_eq!(triple.get(field), value);
        prop_assert!(triple.is_consistent(&rates, 1e-9));
    }

    // ===================================================================
    // Give -> settlement -> give returns the original amount.
    // ===================================================================
    #[test]
    fn give_settlement_round_trip(buy in arb_rate(), sell in arb_rate(), give in arb_amount()) {
        let rates = QuotedRates::new(buy, sell);
        let mut triple = AmountTriple::default();
        triple.reconcile(AmountField::Give, give, &rates);
        let settlement = triple.settlement;
        triple.reconcile(AmountField::Settlement, settlement, &rates);
        prop_assert!(close(triple.give, give, 1e-6));
    }

    // ===================================================================
    // A typed rate's implied spread re-derives the same rate.
    // ===================================================================
    #[test]
    fn implied_spread_rederives_typed_rate(
        buy_ref in arb_rate(),
        sell_ref in arb_rate(),
        typed in arb_rate(),
    ) {
        let pair = PairSelection::new(CurrencyCode::new("RUB"), CurrencyCode::new("THB"));
        let references = ReferenceRateTable::from_rates([
            (CurrencyCode::new("RUB"), buy_ref),
            (CurrencyCode::new("THB"), sell_ref),
        ]);
        let pct = implied_spread(Side::Source, typed, &pair, &references).unwrap();
        let mut spreads = SpreadTable::new();
        spreads.insert(CurrencyCode::new("RUB"), SpreadEntry::new(pct, 0.0));
        let rates = derive_rates(&pair, &references, &spreads).unwrap();
        prop_assert!(close(rates.buy, typed, 1e-9));
        prop_assert!(close(rates.sell, sell_ref, 1e-12));
    }

    // ===================================================================
    // Without advanced mode the risk gate never engages, whatever is typed.
    // ===================================================================
    #[test]
    fn basic_mode_never_blocks(typed in arb_rate(), give in arb_amount()) {
        let clock = Rc::new(ManualClock::new());
        let mut desk = ExchangeDesk::new(MemoryStore::new(), Rc::clone(&clock), EngineConfig::default());
        desk.apply_reference_rates(ReferenceRateTable::from_rates([
            (CurrencyCode::new("RUB"), 95.5),
            (CurrencyCode::new("THB"), 35.2),
        ]));
        desk.set_mode(CalcMode::Explicit);
        desk.edit_rate(Side::Source, &typed.to_string());
        desk.edit_give(&give.to_string());
        prop_assert_eq!(desk.risk_phase(), RiskPhase::Normal);
        prop_assert!(desk.amounts().is_consistent(&desk.quoted_rates(), 1e-9));
    }
}
