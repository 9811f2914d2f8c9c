//! Spread risk gate example.
//!
//! Types a rate far from the reference in advanced mode and walks through
//! the deferred warning, the suspended persistence and the acknowledgment.

use exchange_desk::config::preferences::{EngineConfig, KEY_LAST_BUY_RATE};
use exchange_desk::config::store::{ConfigStore, MemoryStore};
use exchange_desk::core::currency::{CurrencyCode, Side};
use exchange_desk::core::reference::ReferenceRateTable;
use exchange_desk::engine::desk::ExchangeDesk;
use exchange_desk::engine::rates::CalcMode;
use exchange_desk::engine::risk::ManualClock;
use std::rc::Rc;
use std::time::Duration;

fn main() {
    env_logger::init();

    println!("╔══════════════════════════════════════════╗");
    println!("║  exchange-desk: Spread Risk Gate Example ║");
    println!("╚══════════════════════════════════════════╝\n");

    let clock = Rc::new(ManualClock::new());
    let mut desk = ExchangeDesk::new(MemoryStore::new(), Rc::clone(&clock), EngineConfig::default());
    desk.apply_reference_rates(ReferenceRateTable::from_rates([
        (CurrencyCode::new("CNY"), 7.2),
        (CurrencyCode::new("TRY"), 32.0),
    ]));
    desk.select_currency(Side::Source, CurrencyCode::new("CNY"));
    desk.select_currency(Side::Target, CurrencyCode::new("TRY"));
    desk.set_advanced(true);
    desk.set_mode(CalcMode::Explicit);

    let stored = |desk: &ExchangeDesk<MemoryStore, Rc<ManualClock>>| {
        desk.store().get(KEY_LAST_BUY_RATE).unwrap_or_default()
    };

    println!("Typing buy rate 7.632 (reference 7.2)...");
    desk.edit_rate(Side::Source, "7.632");
    let (buy, sell) = desk.live_spreads();
    println!("  Live spreads: buy {:.2}%, sell {:.2}%", buy, sell);
    println!("  Phase: {:?}, stored buy rate: {}", desk.risk_phase(), stored(&desk));

    for step in 1..=3 {
        clock.advance(Duration::from_millis(1000));
        let shown = desk.poll();
        let marker = if shown { "  <- warning shown" } else { "" };
        println!(
            "  +{} ms: phase {:?}{}",
            step * 1000,
            desk.risk_phase(),
            marker
        );
    }

    println!("\nDismissing without confirming the rates...");
    if let Err(e) = desk.acknowledge_warning(true) {
        println!("  Rejected: {}", e);
    }

    println!("\nConfirming and remembering the spread...");
    desk.set_content_confirmed(true);
    match desk.acknowledge_warning(true) {
        Ok(()) => println!("  Acknowledged"),
        Err(e) => println!("  Rejected: {}", e),
    }
    println!("  Phase: {:?}, stored buy rate: {}", desk.risk_phase(), stored(&desk));
    let configured: Vec<&str> = desk.configured().iter().map(|c| c.as_str()).collect();
    println!("  Configured currencies: {}", configured.join(", "));
}
