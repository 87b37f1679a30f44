//! The conformité minigame: Locked -> Unlocked -> Activated -> Complete.

use crate::error::ActionError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sim_core::{
    reveal_hints, ConformiteState, GameState, CONFORMITE_GATE_ADMINISTRATION,
    CONFORMITE_HINT_TARGET,
};

pub const UNLOCK_TAMPONS: f64 = 1_000.0;
pub const UNLOCK_FORMULAIRES: f64 = 100.0;
pub const ACTIVATION_TAMPONS: f64 = 40_000.0;
pub const ACTIVATION_FORMULAIRES: f64 = 10_000.0;
pub const MAX_PERCENTAGE: u32 = 100;

/// Formulaires spent by a manual test.
pub const TEST_COST: f64 = 150.0;
/// Points granted by a manual test.
pub const TEST_GAIN: u32 = 3;
pub const TEST_DEBOUNCE_MS: i64 = 500;

pub fn watermarks_reached(c: &ConformiteState) -> bool {
    c.highest_ever_tampons >= UNLOCK_TAMPONS && c.highest_ever_formulaires >= UNLOCK_FORMULAIRES
}

/// Watermarks crossed and the gate administration unlocked.
pub fn should_unlock(state: &GameState) -> bool {
    watermarks_reached(&state.conformite) && state.is_unlocked(CONFORMITE_GATE_ADMINISTRATION)
}

pub fn is_complete(c: &ConformiteState) -> bool {
    c.percentage >= f64::from(MAX_PERCENTAGE)
}

/// Formulaires needed for the point after `percentage`:
/// `round(1000 * 1.1^floor(p/10))`.
pub fn cost_for_next_percent(percentage: u32) -> f64 {
    let bracket = percentage.min(MAX_PERCENTAGE) / 10;
    let mut cost = Decimal::from(1_000);
    let factor = Decimal::new(11, 1);
    for _ in 0..bracket {
        cost *= factor;
    }
    cost.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(f64::MAX)
}

/// Convert an accumulator into whole points. Returns the new percentage and
/// the leftover accumulator.
pub fn advance(percentage: f64, accumulated: f64) -> (f64, f64) {
    let mut p = percentage.clamp(0.0, f64::from(MAX_PERCENTAGE)).floor() as u32;
    let mut acc = accumulated.max(0.0);
    while p < MAX_PERCENTAGE {
        let cost = cost_for_next_percent(p);
        if acc < cost {
            break;
        }
        acc -= cost;
        p += 1;
    }
    (f64::from(p), acc)
}

/// Cumulative formulaires needed to go from 0 to `percentage`.
pub fn cumulative_cost(percentage: u32) -> f64 {
    (0..percentage.min(MAX_PERCENTAGE)).map(cost_for_next_percent).sum()
}

/// One-time activation. Debits both thresholds in full.
pub fn activate(state: &GameState) -> Result<GameState, ActionError> {
    let c = &state.conformite;
    if !c.is_unlocked {
        return Err(ActionError::ConformiteLocked);
    }
    if c.is_activated {
        return Err(ActionError::AlreadyActivated);
    }
    if state.resources.tampons < ACTIVATION_TAMPONS
        || state.resources.formulaires < ACTIVATION_FORMULAIRES
    {
        return Err(ActionError::Unaffordable);
    }
    let mut next = state.clone();
    next.resources.tampons -= ACTIVATION_TAMPONS;
    next.resources.formulaires -= ACTIVATION_FORMULAIRES;
    next.conformite.is_activated = true;
    next.conformite.percentage = 0.0;
    next.conformite.accumulated_formulaires = 0.0;
    reveal_hints(&mut next.journal, CONFORMITE_HINT_TARGET);
    Ok(next)
}

/// Manual test: spend formulaires for a few points, at most every 500 ms.
/// Available as soon as conformité is unlocked.
pub fn run_test(state: &GameState, now: DateTime<Utc>) -> Result<GameState, ActionError> {
    let c = &state.conformite;
    if !c.is_unlocked {
        return Err(ActionError::ConformiteLocked);
    }
    if is_complete(c) {
        return Err(ActionError::ConformiteComplete);
    }
    if let Some(last) = c.last_test_timestamp {
        if now - last < Duration::milliseconds(TEST_DEBOUNCE_MS) {
            return Err(ActionError::Debounced);
        }
    }
    if state.resources.formulaires < TEST_COST {
        return Err(ActionError::Unaffordable);
    }
    let mut next = state.clone();
    next.resources.formulaires -= TEST_COST;
    next.conformite.percentage = (c.percentage + f64::from(TEST_GAIN)).min(f64::from(MAX_PERCENTAGE));
    next.conformite.last_test_timestamp = Some(now);
    Ok(next)
}
