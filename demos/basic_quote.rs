//! Basic quoting example.
//!
//! Derives buy and sell rates from reference rates and spreads, then shows
//! how editing any one amount recomputes the other two.

use exchange_desk::config::store::MemoryStore;
use exchange_desk::core::currency::{CurrencyCode, Side};
use exchange_desk::engine::amounts::AmountField;
use exchange_desk::engine::desk::ExchangeDesk;
use exchange_desk::engine::rates::CalcMode;
use exchange_desk::feed::{RateFeed, StaticFeed};

fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  exchange-desk: Basic Quote Example      ║");
    println!("╚══════════════════════════════════════════╝\n");

    let feed = StaticFeed::from_rates([
        ("RUB", 95.5),
        ("THB", 35.2),
        ("USD", 1.0),
        ("EUR", 0.92),
    ]);
    let mut desk = ExchangeDesk::with_store(MemoryStore::new());
    match feed.fetch() {
        Ok(table) => desk.apply_reference_rates(table),
        Err(e) => desk.reference_fetch_failed(&e),
    }

    // --- Scenario 1: Derived rates ---
    println!("━━━ Scenario 1: Derived Rates ━━━\n");
    desk.edit_give("10 000");
    show(&desk);

    // --- Scenario 2: Explicit buy rate ---
    println!("━━━ Scenario 2: Explicit Buy Rate ━━━\n");
    desk.set_mode(CalcMode::Explicit);
    desk.edit_rate(Side::Source, "96,5");
    show(&desk);
    println!(
        "  Stored RUB buy spread: {:.4}%\n",
        desk.spreads().pct(&CurrencyCode::new("RUB"), Side::Source)
    );

    // --- Scenario 3: Edit the received amount ---
    println!("━━━ Scenario 3: Receive-Driven Quote ━━━\n");
    desk.edit_amount(AmountField::Receive, "5 000");
    show(&desk);

    // --- Scenario 4: Swap the pair ---
    println!("━━━ Scenario 4: Swapped Pair ━━━\n");
    desk.swap_pair();
    show(&desk);

    println!("━━━ Reference Comparison ━━━\n");
    for row in desk.comparisons() {
        println!(
            "  {:<5} ref {:>10.4}  buy {:>10.4} {:>7}  sell {:>10.4} {:>7}",
            row.code,
            row.reference_rate,
            row.buy_rate,
            row.buy_spread_text,
            row.sell_rate,
            row.sell_spread_text
        );
    }
}

fn show(desk: &ExchangeDesk<MemoryStore>) {
    let pair = desk.pair();
    println!("  Pair:       {} [{}]", pair, desk.mode());
    println!("  Buy rate:   {}", desk.rate_text(Side::Source));
    println!("  Sell rate:  {}", desk.rate_text(Side::Target));
    println!("  Give:       {} {}", desk.amount_text(AmountField::Give), pair.source);
    println!("  Settlement: {} USDT", desk.amount_text(AmountField::Settlement));
    println!("  Receive:    {} {}", desk.amount_text(AmountField::Receive), pair.target);
    println!();
}
