//! Line-oriented operator scripts.
//!
//! Each non-empty line is one desk event, so a recorded session can be
//! replayed deterministically against a [`ManualClock`]:
//!
//! ```text
//! # comments and blank lines are skipped
//! advanced on
//! mode exact
//! rate buy 101,23
//! give 10 000
//! wait 3000
//! confirm on
//! ack remember
//! ```

use crate::config::store::ConfigStore;
use crate::core::currency::{CurrencyCode, Side};
use crate::engine::amounts::AmountField;
use crate::engine::desk::ExchangeDesk;
use crate::engine::rates::CalcMode;
use crate::engine::risk::{Clock, GateError, ManualClock};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Amount(AmountField, String),
    Rate(Side, String),
    Swap,
    Select(Side, CurrencyCode),
    Mode(CalcMode),
    Advanced(bool),
    Confirm(bool),
    Remember(bool),
    Acknowledge { remember: bool },
    Wait(Duration),
    Show,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: {message}")]
    BadArgument { line: usize, message: String },
}

fn bad(line: usize, message: impl Into<String>) -> ScriptError {
    ScriptError::BadArgument {
        line,
        message: message.into(),
    }
}

fn parse_switch(line: usize, arg: &str) -> Result<bool, ScriptError> {
    match arg {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(bad(line, format!("expected on/off, got '{}'", other))),
    }
}

fn parse_side(line: usize, arg: &str) -> Result<Side, ScriptError> {
    match arg {
        "buy" | "source" => Ok(Side::Source),
        "sell" | "target" => Ok(Side::Target),
        other => Err(bad(line, format!("expected buy/sell, got '{}'", other))),
    }
}

/// Parse one script line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<ScriptCommand>, ScriptError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    let parsed = match command {
        "give" => ScriptCommand::Amount(AmountField::Give, rest.to_string()),
        "receive" => ScriptCommand::Amount(AmountField::Receive, rest.to_string()),
        "settlement" => ScriptCommand::Amount(AmountField::Settlement, rest.to_string()),
        "rate" => {
            let (side, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            ScriptCommand::Rate(parse_side(line_no, side)?, text.trim().to_string())
        }
        "swap" => ScriptCommand::Swap,
        "source" | "target" => {
            let side = parse_side(line_no, command)?;
            let code = CurrencyCode::parse(rest).map_err(|e| bad(line_no, e.to_string()))?;
            ScriptCommand::Select(side, code)
        }
        "mode" => ScriptCommand::Mode(rest.parse().map_err(|e| bad(line_no, format!("{}", e)))?),
        "advanced" => ScriptCommand::Advanced(parse_switch(line_no, rest)?),
        "confirm" => ScriptCommand::Confirm(parse_switch(line_no, rest)?),
        "remember" => ScriptCommand::Remember(parse_switch(line_no, rest)?),
        "ack" => ScriptCommand::Acknowledge {
            remember: rest == "remember",
        },
        "wait" => {
            let ms: u64 = rest
                .parse()
                .map_err(|_| bad(line_no, format!("expected milliseconds, got '{}'", rest)))?;
            ScriptCommand::Wait(Duration::from_millis(ms))
        }
        "show" => ScriptCommand::Show,
        other => {
            return Err(ScriptError::UnknownCommand {
                line: line_no,
                command: other.to_string(),
            })
        }
    };
    Ok(Some(parsed))
}

/// Parse a whole script, stopping at the first bad line.
pub fn parse_script(text: &str) -> Result<Vec<ScriptCommand>, ScriptError> {
    let mut commands = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(command) = parse_line(i + 1, line)? {
            commands.push(command);
        }
    }
    Ok(commands)
}

/// Apply one command to the desk, advancing `clock` for waits.
///
/// A rejected acknowledgment is returned to the caller; everything else
/// always succeeds.
pub fn apply<S, C>(
    desk: &mut ExchangeDesk<S, C>,
    clock: &ManualClock,
    command: &ScriptCommand,
) -> Result<(), GateError>
where
    S: ConfigStore,
    C: Clock,
{
    match command {
        ScriptCommand::Amount(field, text) => desk.edit_amount(*field, text),
        ScriptCommand::Rate(side, text) => desk.edit_rate(*side, text),
        ScriptCommand::Swap => desk.swap_pair(),
        ScriptCommand::Select(side, code) => desk.select_currency(*side, code.clone()),
        ScriptCommand::Mode(mode) => desk.set_mode(*mode),
        ScriptCommand::Advanced(on) => desk.set_advanced(*on),
        ScriptCommand::Confirm(on) => desk.set_content_confirmed(*on),
        ScriptCommand::Remember(on) => desk.set_remember_spread(*on),
        ScriptCommand::Acknowledge { remember } => desk.acknowledge_warning(*remember)?,
        ScriptCommand::Wait(duration) => {
            clock.advance(*duration);
            desk.poll();
        }
        ScriptCommand::Show => {}
    }
    Ok(())
}
