//! exchange-desk CLI
//!
//! Quote currency pairs against a reference rate file and replay operator
//! sessions from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Quote 10 000 RUB into THB
//! exchange-desk quote --rates rates.json --from RUB --to THB --give 10000
//!
//! # Reference versus quoted rates for configured currencies
//! exchange-desk compare --rates rates.json --store desk.json
//!
//! # Replay an operator session
//! exchange-desk session --rates rates.json --store desk.json --script session.txt
//!
//! # Generate a random reference table for testing
//! exchange-desk generate --currencies RUB,THB,USD --output rates.json
//! ```

use exchange_desk::config::preferences::{EngineConfig, Preferences};
use exchange_desk::config::store::{ConfigStore, JsonFileStore, MemoryStore};
use exchange_desk::core::currency::{CurrencyCode, PairSelection, Side};
use exchange_desk::core::numeric::{format_for_display, parse_amount};
use exchange_desk::core::spread::{format_signed_spread, SpreadEntry, SpreadTable};
use exchange_desk::engine::amounts::AmountField;
use exchange_desk::engine::desk::ExchangeDesk;
use exchange_desk::engine::rates::CalcMode;
use exchange_desk::engine::risk::{Clock, ManualClock, RiskPhase};
use exchange_desk::engine::script::{self, ScriptCommand};
use exchange_desk::feed::{JsonFileFeed, RateFeed};
use exchange_desk::simulation::market::{generate_reference_table, MarketConfig};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::process;
use std::rc::Rc;

fn print_usage() {
    eprintln!(
        r#"exchange-desk — rate and amount reconciliation for an exchange desk

USAGE:
    exchange-desk <COMMAND> [OPTIONS]

COMMANDS:
    quote       Quote a pair and amount against a reference rate file
    compare     List reference versus quoted rates for configured currencies
    session     Replay a script of operator events
    generate    Generate a random reference rate file (for testing)
    help        Show this message

OPTIONS (quote):
    --rates <FILE>          Reference rate JSON file (required)
    --from <CODE>           Source currency (default: RUB)
    --to <CODE>             Target currency (default: THB)
    --give <AMOUNT>         Amount given in the source currency
    --receive <AMOUNT>      Amount received in the target currency
    --settlement <AMOUNT>   Amount in the settlement asset
    --buy-spread <PCT>      Spread applied to the source currency
    --sell-spread <PCT>     Spread applied to the target currency
    --buy-rate <RATE>       Explicit buy rate (switches to exact mode)
    --sell-rate <RATE>      Explicit sell rate (switches to exact mode)
    --format <FORMAT>       Output format: text (default) or json

OPTIONS (compare, session):
    --rates <FILE>          Reference rate JSON file
    --store <FILE>          Preferences file (default: in memory only)
    --script <FILE>         Session script (session only; default: stdin)
    --format <FORMAT>       Output format: text (default) or json

OPTIONS (generate):
    --currencies <LIST>     Comma-separated currency codes (default: priority list)
    --output <FILE>         Write to file instead of stdout

EXAMPLES:
    exchange-desk quote --rates rates.json --give 10000
    exchange-desk quote --rates rates.json --from USD --to THB --buy-spread 1.5 --receive 35000
    exchange-desk compare --rates rates.json --store desk.json --format json
    exchange-desk session --rates rates.json --store desk.json --script session.txt
    exchange-desk generate --currencies RUB,THB,USD --output rates.json"#
    );
}

/// Options shared by every command, collected in one pass.
struct Options {
    values: BTreeMap<String, String>,
}

impl Options {
    fn parse(args: &[String], allowed: &[&str]) -> Self {
        let mut values = BTreeMap::new();
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            let name = flag.trim_start_matches("--");
            if !flag.starts_with("--") || !allowed.contains(&name) {
                eprintln!("Unknown option: {}", flag);
                process::exit(1);
            }
            i += 1;
            let value = args.get(i).cloned().unwrap_or_else(|| {
                eprintln!("{} requires a value", flag);
                process::exit(1);
            });
            values.insert(name.to_string(), value);
            i += 1;
        }
        Self { values }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    fn currency(&self, name: &str, default: &str) -> CurrencyCode {
        let raw = self.get(name).unwrap_or(default);
        CurrencyCode::parse(raw).unwrap_or_else(|e| {
            eprintln!("--{}: {}", name, e);
            process::exit(1);
        })
    }

    fn json(&self) -> bool {
        match self.get("format").unwrap_or("text") {
            "text" => false,
            "json" => true,
            other => {
                eprintln!("--format requires 'text' or 'json', got '{}'", other);
                process::exit(1);
            }
        }
    }
}

fn open_store(options: &Options) -> Box<dyn ConfigStore> {
    match options.get("store") {
        Some(path) => Box::new(JsonFileStore::open(path).unwrap_or_else(|e| {
            eprintln!("Error opening store: {}", e);
            process::exit(1);
        })),
        None => Box::new(MemoryStore::new()),
    }
}

/// Load reference rates into the desk; a failed fetch is logged and the
/// desk carries on without them.
fn refresh<S: ConfigStore, C: Clock>(desk: &mut ExchangeDesk<S, C>, options: &Options) {
    let Some(path) = options.get("rates") else {
        return;
    };
    let feed = JsonFileFeed::new(path);
    match feed.fetch() {
        Ok(table) => desk.apply_reference_rates(table),
        Err(e) => {
            desk.reference_fetch_failed(&e);
            eprintln!("Warning: no reference rates loaded ({})", e);
        }
    }
}

fn print_state<S: ConfigStore, C: Clock>(desk: &ExchangeDesk<S, C>) {
    let snapshot = desk.snapshot();
    let asset = &snapshot.settlement_asset;
    let label = |editable: bool, text: &str| {
        if editable {
            text.to_string()
        } else {
            format!("{} (Auto)", text)
        }
    };
    println!("Pair:       {} [{}]", snapshot.pair, snapshot.mode);
    println!(
        "Buy rate:   {} {}/{}",
        label(snapshot.buy_rate_editable, &snapshot.buy_rate_text),
        snapshot.pair.source,
        asset
    );
    println!(
        "Sell rate:  {} {}/{}",
        label(snapshot.sell_rate_editable, &snapshot.sell_rate_text),
        snapshot.pair.target,
        asset
    );
    println!("Give:       {} {}", snapshot.give_text, snapshot.pair.source);
    println!("Settlement: {} {}", snapshot.settlement_text, asset);
    println!("Receive:    {} {}", snapshot.receive_text, snapshot.pair.target);
    if snapshot.advanced {
        let (buy, sell) = desk.live_spreads();
        println!(
            "Spreads:    buy {}  sell {}",
            format_signed_spread(buy),
            format_signed_spread(sell)
        );
        let status = match desk.risk_phase() {
            RiskPhase::Normal => "ok",
            RiskPhase::Pending => "spread above threshold, warning pending",
            RiskPhase::Shown => "WARNING: spread above threshold, confirm to save",
            RiskPhase::Acknowledged => "spread above threshold, acknowledged",
        };
        println!("Risk:       {}", status);
    }
}

fn cmd_quote(args: &[String]) {
    let options = Options::parse(
        args,
        &[
            "rates",
            "from",
            "to",
            "give",
            "receive",
            "settlement",
            "buy-spread",
            "sell-spread",
            "buy-rate",
            "sell-rate",
            "format",
        ],
    );
    if options.get("rates").is_none() {
        eprintln!("Error: --rates <FILE> is required");
        process::exit(1);
    }
    let from = options.currency("from", "RUB");
    let to = options.currency("to", "THB");

    let mut store = MemoryStore::new();
    let mut spreads = SpreadTable::new();
    let buy_spread = options.get("buy-spread").map(parse_amount).unwrap_or(0.0);
    let sell_spread = options.get("sell-spread").map(parse_amount).unwrap_or(0.0);
    spreads.insert(from.clone(), SpreadEntry::new(buy_spread, 0.0));
    let to_entry = spreads.entry(&to);
    spreads.insert(to.clone(), SpreadEntry::new(to_entry.buy_pct, sell_spread));
    let prefs = Preferences {
        pair: PairSelection::new(from, to),
        spreads,
        ..Preferences::default()
    };
    if let Err(e) = prefs.save(&mut store) {
        eprintln!("Error preparing quote: {}", e);
        process::exit(1);
    }

    let mut desk = ExchangeDesk::with_store(store);
    refresh(&mut desk, &options);

    if options.get("buy-rate").is_some() || options.get("sell-rate").is_some() {
        desk.set_mode(CalcMode::Explicit);
        if let Some(rate) = options.get("buy-rate") {
            desk.edit_rate(Side::Source, rate);
        }
        if let Some(rate) = options.get("sell-rate") {
            desk.edit_rate(Side::Target, rate);
        }
    }

    if let Some(amount) = options.get("give") {
        desk.edit_amount(AmountField::Give, amount);
    } else if let Some(amount) = options.get("receive") {
        desk.edit_amount(AmountField::Receive, amount);
    } else if let Some(amount) = options.get("settlement") {
        desk.edit_amount(AmountField::Settlement, amount);
    }

    if options.json() {
        match serde_json::to_string_pretty(&desk.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error encoding output: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_state(&desk);
    }
}

fn cmd_compare(args: &[String]) {
    let options = Options::parse(args, &["rates", "store", "format"]);
    let mut desk = ExchangeDesk::with_store(open_store(&options));
    refresh(&mut desk, &options);
    let rows = desk.comparisons();

    if options.json() {
        match serde_json::to_string_pretty(&rows) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error encoding output: {}", e);
                process::exit(1);
            }
        }
        return;
    }
    if rows.is_empty() {
        println!("No configured currency has a reference rate.");
        return;
    }
    println!(
        "{:<6} {:>14} {:>14} {:>9} {:>14} {:>9}",
        "CODE", "REFERENCE", "BUY", "SPREAD", "SELL", "SPREAD"
    );
    for row in rows {
        println!(
            "{:<6} {:>14} {:>14} {:>9} {:>14} {:>9}",
            row.code,
            format_for_display(row.reference_rate, 4),
            format_for_display(row.buy_rate, 4),
            row.buy_spread_text,
            format_for_display(row.sell_rate, 4),
            row.sell_spread_text
        );
    }
}

fn cmd_session(args: &[String]) {
    let options = Options::parse(args, &["rates", "store", "script", "format"]);
    let text = match options.get("script") {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading script '{}': {}", path, e);
            process::exit(1);
        }),
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                eprintln!("Error reading script from stdin: {}", e);
                process::exit(1);
            }
            buffer
        }
    };
    let commands = script::parse_script(&text).unwrap_or_else(|e| {
        eprintln!("Error in script: {}", e);
        process::exit(1);
    });

    let clock = Rc::new(ManualClock::new());
    let mut desk = ExchangeDesk::new(
        open_store(&options),
        Rc::clone(&clock),
        EngineConfig::default(),
    );
    refresh(&mut desk, &options);
    let json = options.json();

    for command in &commands {
        if let Err(e) = script::apply(&mut desk, &clock, command) {
            eprintln!("Rejected {:?}: {}", command, e);
        }
        if json {
            match serde_json::to_string(&desk.snapshot()) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("Error encoding state: {}", e),
            }
        } else if matches!(command, ScriptCommand::Show) {
            print_state(&desk);
            println!();
        }
    }
    if !json {
        print_state(&desk);
    }
}

fn cmd_generate(args: &[String]) {
    let options = Options::parse(args, &["currencies", "output"]);
    let mut config = MarketConfig::default();
    if let Some(list) = options.get("currencies") {
        config.currencies = list
            .split(',')
            .map(|s| {
                CurrencyCode::parse(s).unwrap_or_else(|e| {
                    eprintln!("--currencies: {}", e);
                    process::exit(1);
                })
            })
            .collect();
    }

    let table = generate_reference_table(&config);
    let rates: BTreeMap<&str, f64> = table.iter().map(|(c, r)| (c.as_str(), r)).collect();
    let json = serde_json::to_string_pretty(&serde_json::json!({ "rates": rates }))
        .unwrap_or_else(|e| {
            eprintln!("Error encoding rates: {}", e);
            process::exit(1);
        });

    if let Some(path) = options.get("output") {
        fs::write(path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!("Generated {} reference rates → {}", table.len(), path);
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "quote" => cmd_quote(rest),
        "compare" => cmd_compare(rest),
        "session" => cmd_session(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
