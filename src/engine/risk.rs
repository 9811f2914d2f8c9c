//! Spread risk gate.
//!
//! Watches the live spreads of the quoted rates. A violation is announced
//! only after it has persisted for a debounce interval; until the operator
//! dismisses it, rate persistence is suspended so a mistyped rate is never
//! saved silently.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Source of the current instant for timers.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used for replayed sessions and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// A single cancellable one-shot timer.
///
/// Arming an armed timer restarts it; there is never more than one
/// deadline outstanding.
#[derive(Debug, Clone, Copy)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and report `true` if the deadline has been reached.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Gate phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskPhase {
    #[default]
    Normal,
    /// Violation seen, warning waiting for the debounce interval.
    Pending,
    /// Warning presented to the operator.
    Shown,
    /// Operator dismissed the warning for the current violation.
    Acknowledged,
}

/// Snapshot of the gate for the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskState {
    pub flagged: bool,
    pub acknowledged: bool,
    pub pending_warning: bool,
    pub shown: bool,
}

/// Spreads that crossed the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadViolation {
    pub buy_pct: f64,
    pub sell_pct: f64,
}

/// Check the live spreads against the threshold.
pub fn check_spreads(buy_pct: f64, sell_pct: f64, threshold_pct: f64) -> Option<SpreadViolation> {
    if buy_pct.abs() > threshold_pct || sell_pct.abs() > threshold_pct {
        Some(SpreadViolation { buy_pct, sell_pct })
    } else {
        None
    }
}

/// The two dialog confirmations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningChecks {
    /// Operator confirmed the entered rates are what they intended.
    pub content_confirmed: bool,
    /// Operator asked to remember this spread for the pair's currencies.
    pub remember_spread: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("no spread warning is awaiting acknowledgment")]
    NothingToAcknowledge,
    #[error("confirm the entered rates before dismissing the warning")]
    ContentNotConfirmed,
}

/// The spread risk state machine.
#[derive(Debug, Clone)]
pub struct RiskGate {
    phase: RiskPhase,
    timer: DebounceTimer,
    checks: WarningChecks,
    violation: Option<SpreadViolation>,
}

impl RiskGate {
    pub fn new(debounce: Duration) -> Self {
        Self {
            phase: RiskPhase::Normal,
            timer: DebounceTimer::new(debounce),
            checks: WarningChecks::default(),
            violation: None,
        }
    }

    pub fn phase(&self) -> RiskPhase {
        self.phase
    }

    pub fn violation(&self) -> Option<SpreadViolation> {
        self.violation
    }

    pub fn checks(&self) -> WarningChecks {
        self.checks
    }

    pub fn state(&self) -> RiskState {
        RiskState {
            flagged: self.violation.is_some(),
            acknowledged: self.phase == RiskPhase::Acknowledged,
            pending_warning: self.phase == RiskPhase::Pending,
            shown: self.phase == RiskPhase::Shown,
        }
    }

    /// Flagged and not yet dismissed: persistence must be held back.
    pub fn blocks_persistence(&self) -> bool {
        matches!(self.phase, RiskPhase::Pending | RiskPhase::Shown)
    }

    /// Feed the outcome of a fresh spread check after the rates changed.
    pub fn observe(&mut self, violation: Option<SpreadViolation>, now: Instant) {
        self.violation = violation;
        match (violation, self.phase) {
            (None, RiskPhase::Normal) => {}
            (None, previous) => {
                self.timer.cancel();
                self.phase = RiskPhase::Normal;
                debug!("Spread back within threshold (was {:?})", previous);
            }
            (Some(v), RiskPhase::Normal) => {
                self.timer.arm(now);
                self.phase = RiskPhase::Pending;
                info!(
                    "Spread threshold exceeded (buy {:.2}%, sell {:.2}%), warning deferred",
                    v.buy_pct, v.sell_pct
                );
            }
            (Some(_), RiskPhase::Pending) => self.timer.arm(now),
            (Some(_), RiskPhase::Shown | RiskPhase::Acknowledged) => {}
        }
    }

    /// Advance the debounce timer. Returns `true` when the warning was just
    /// shown.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.phase == RiskPhase::Pending && self.timer.fire_if_due(now) {
            self.phase = RiskPhase::Shown;
            info!("Spread warning shown");
            return true;
        }
        false
    }

    pub fn set_content_confirmed(&mut self, confirmed: bool) {
        self.checks.content_confirmed = confirmed;
    }

    pub fn set_remember_spread(&mut self, remember: bool) {
        self.checks.remember_spread = remember;
    }

    /// Reset both confirmations.
    pub fn clear_checks(&mut self) {
        self.checks = WarningChecks::default();
    }

    /// Dismiss the current violation.
    ///
    /// Accepted while a violation is pending or shown and the content has
    /// been confirmed. Returns whether the spread should be remembered,
    /// which holds when either `remember_spread` or the dialog's remember
    /// confirmation is set.
    pub fn acknowledge(&mut self, remember_spread: bool) -> Result<bool, GateError> {
        if !self.blocks_persistence() {
            return Err(GateError::NothingToAcknowledge);
        }
        if !self.checks.content_confirmed {
            return Err(GateError::ContentNotConfirmed);
        }
        let remember = remember_spread || self.checks.remember_spread;
        self.checks.remember_spread = remember;
        self.timer.cancel();
        self.phase = RiskPhase::Acknowledged;
        info!("Spread warning acknowledged (remember: {})", remember);
        Ok(remember)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(3000);

    fn violation() -> Option<SpreadViolation> {
        check_spreads(6.0, 1.0, 5.0)
    }

    #[test]
    fn test_check_spreads_threshold() {
        assert!(check_spreads(5.0, -5.0, 5.0).is_none());
        assert!(check_spreads(0.0, -5.01, 5.0).is_some());
        assert!(violation().is_some());
    }

    #[test]
    fn test_timer_single_deadline() {
        let clock = ManualClock::new();
        let mut timer = DebounceTimer::new(DEBOUNCE);
        timer.arm(clock.now());
        clock.advance(Duration::from_millis(2000));
        timer.arm(clock.now());
        clock.advance(Duration::from_millis(2000));
        assert!(!timer.fire_if_due(clock.now()));
        clock.advance(Duration::from_millis(1000));
        assert!(timer.fire_if_due(clock.now()));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_violation_shown_after_debounce() {
        let clock = ManualClock::new();
        let mut gate = RiskGate::new(DEBOUNCE);
        gate.observe(violation(), clock.now());
        assert_eq!(gate.phase(), RiskPhase::Pending);
        assert!(gate.blocks_persistence());
        clock.advance(Duration::from_millis(2999));
        assert!(!gate.poll(clock.now()));
        clock.advance(Duration::from_millis(1));
        assert!(gate.poll(clock.now()));
        assert!(gate.state().shown);
    }

    #[test]
    fn test_cleared_before_debounce_never_shows() {
        let clock = ManualClock::new();
        let mut gate = RiskGate::new(DEBOUNCE);
        gate.observe(violation(), clock.now());
        clock.advance(Duration::from_millis(1000));
        gate.observe(None, clock.now());
        clock.advance(Duration::from_millis(5000));
        assert!(!gate.poll(clock.now()));
        assert_eq!(gate.phase(), RiskPhase::Normal);
        assert!(!gate.blocks_persistence());
    }

    #[test]
    fn test_acknowledge_requires_confirmation() {
        let clock = ManualClock::new();
        let mut gate = RiskGate::new(DEBOUNCE);
        assert_eq!(gate.acknowledge(false), Err(GateError::NothingToAcknowledge));
        gate.observe(violation(), clock.now());
        assert_eq!(gate.acknowledge(true), Err(GateError::ContentNotConfirmed));
        gate.set_content_confirmed(true);
        assert_eq!(gate.acknowledge(true), Ok(true));
        assert!(gate.state().acknowledged);
        assert!(gate.checks().remember_spread);
        assert!(!gate.blocks_persistence());
    }

    #[test]
    fn test_remember_confirmation_counts() {
        let clock = ManualClock::new();
        let mut gate = RiskGate::new(DEBOUNCE);
        gate.observe(violation(), clock.now());
        gate.set_content_confirmed(true);
        gate.set_remember_spread(true);
        assert_eq!(gate.acknowledge(false), Ok(true));
        assert!(gate.checks().remember_spread);
    }

    #[test]
    fn test_resolution_clears_acknowledgment() {
        let clock = ManualClock::new();
        let mut gate = RiskGate::new(DEBOUNCE);
        gate.observe(violation(), clock.now());
        gate.set_content_confirmed(true);
        gate.acknowledge(false).unwrap();
        gate.observe(violation(), clock.now());
        assert_eq!(gate.phase(), RiskPhase::Acknowledged);
        gate.observe(None, clock.now());
        assert!(!gate.state().acknowledged);
        gate.observe(violation(), clock.now());
        assert_eq!(gate.phase(), RiskPhase::Pending);
    }

    #[test]
    fn test_rc_clock_shares_time() {
        let clock = Rc::new(ManualClock::new());
        let shared: Rc<ManualClock> = Rc::clone(&clock);
        let before = shared.now();
        clock.advance(Duration::from_secs(1));
        assert_eq!(shared.now() - before, Duration::from_secs(1));
    }
}
