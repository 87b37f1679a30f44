//! Prestige reward math, the paperclip shop and the reset itself.

use crate::error::ActionError;
use serde::Serialize;
use sim_core::{
    initial_administrations, Catalog, ConformiteState, GameState, MessageSystemState,
    PrestigeEffect, ResourceSet, Tier,
};
use std::collections::BTreeSet;

/// `floor(sqrt(value / coefficient))`, zero for non-finite or negative input.
pub fn reward(lifetime_value: f64, tier: Tier) -> u64 {
    let ratio = lifetime_value / tier.coefficient();
    if !ratio.is_finite() || ratio <= 0.0 {
        return 0;
    }
    let r = ratio.sqrt().floor();
    if r >= u64::MAX as f64 {
        u64::MAX
    } else {
        r as u64
    }
}

/// Prestige preview for the UI.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrestigePotential {
    /// Paperclips a reset would grant now.
    pub gain: u64,
    pub current_value: f64,
    pub coefficient: f64,
    /// Lifetime value needed for the first paperclip.
    pub minimum_value: f64,
    pub is_eligible: bool,
}

pub fn potential(state: &GameState) -> PrestigePotential {
    let gain = reward(state.total_administrative_value, state.current_tier);
    PrestigePotential {
        gain,
        current_value: state.total_administrative_value,
        coefficient: state.current_tier.coefficient(),
        minimum_value: state.current_tier.coefficient(),
        is_eligible: gain >= 1,
    }
}

pub fn is_eligible(state: &GameState) -> bool {
    reward(state.total_administrative_value, state.current_tier) >= 1
}

/// Reward of a reset started now, or why none can start.
pub fn pending_reward(state: &GameState) -> Result<u64, ActionError> {
    if state.prestige_in_progress {
        return Err(ActionError::PrestigeInProgress);
    }
    match reward(state.total_administrative_value, state.current_tier) {
        0 => Err(ActionError::NotEligible),
        gain => Ok(gain),
    }
}

/// Product of the click multipliers of the active upgrades.
pub fn click_multiplier(catalog: &Catalog, active: &BTreeSet<String>) -> f64 {
    active
        .iter()
        .filter_map(|id| catalog.prestige_upgrade(id))
        .filter_map(|u| match u.effect {
            PrestigeEffect::ClickMultiplier { factor } => Some(factor),
            _ => None,
        })
        .product()
}

/// Product of `1 + percent/100` over the active storage capacity upgrades.
pub fn storage_multiplier(catalog: &Catalog, active: &BTreeSet<String>) -> f64 {
    active
        .iter()
        .filter_map(|id| catalog.prestige_upgrade(id))
        .filter_map(|u| match u.effect {
            PrestigeEffect::StorageCapacity { percent } => Some(1.0 + percent / 100.0),
            _ => None,
        })
        .product()
}

/// Spend paperclips on a temporary upgrade. Non-refundable.
pub fn buy_prestige_upgrade(
    catalog: &Catalog,
    state: &GameState,
    upgrade_id: &str,
) -> Result<GameState, ActionError> {
    let def = catalog
        .prestige_upgrade(upgrade_id)
        .ok_or_else(|| ActionError::UnknownUpgrade(upgrade_id.to_string()))?;
    if state.active_prestige_upgrades.contains(upgrade_id) {
        return Err(ActionError::AlreadyPurchased(upgrade_id.to_string()));
    }
    if state.paperclips < def.cost {
        return Err(ActionError::InsufficientPaperclips {
            needed: def.cost,
            held: state.paperclips,
        });
    }
    let mut next = state.clone();
    next.paperclips -= def.cost;
    next.active_prestige_upgrades.insert(def.id.clone());
    Ok(next)
}

/// Reset every run-scoped field. Paperclips, tier, the conformité unlock
/// watermarks and the message cooldowns survive; the flag is left as found.
pub fn reset_state(catalog: &Catalog, state: &GameState) -> GameState {
    let first = catalog.first_administration_id().to_string();
    GameState {
        version: state.version,
        resources: ResourceSet::ZERO,
        production: ResourceSet::ZERO,
        administrations: initial_administrations(catalog),
        active_administration_id: first,
        last_timestamp: state.last_timestamp,
        conformite: ConformiteState {
            is_unlocked: state.conformite.is_unlocked,
            lifetime_formulaires: state.conformite.lifetime_formulaires,
            highest_ever_tampons: state.conformite.highest_ever_tampons,
            highest_ever_formulaires: state.conformite.highest_ever_formulaires,
            ..ConformiteState::default()
        },
        message_system: MessageSystemState {
            sic_last_trigger_time: state.message_system.sic_last_trigger_time,
            non_conformity_last_trigger_time: state.message_system.non_conformity_last_trigger_time,
            last_production_milestone: ResourceSet::ZERO,
        },
        journal: Vec::new(),
        current_storage_cap: catalog.initial_storage_cap(),
        purchased_storage_upgrades: Vec::new(),
        paperclips: state.paperclips,
        total_administrative_value: 0.0,
        current_tier: state.current_tier,
        active_prestige_upgrades: BTreeSet::new(),
        prestige_in_progress: state.prestige_in_progress,
    }
}
