//! Formulaires storage ladder.

use crate::error::ActionError;
use crate::prestige::storage_multiplier;
use sim_core::{Catalog, GameState, StorageUpgradeDef};

/// Clamp `amount` to `cap`; `None` means unlimited.
pub fn apply_cap(amount: f64, cap: Option<f64>) -> f64 {
    match cap {
        Some(cap) => amount.min(cap),
        None => amount,
    }
}

pub fn is_blocked(stock: f64, cap: Option<f64>) -> bool {
    cap.is_some_and(|cap| stock >= cap)
}

/// Base cap raised by active prestige storage upgrades:
/// `floor(base * product(1 + p/100))`. The stored base cap is not changed.
pub fn effective_cap(catalog: &Catalog, state: &GameState) -> Option<f64> {
    let base = state.current_storage_cap?;
    let factor = storage_multiplier(catalog, &state.active_prestige_upgrades);
    if factor == 1.0 {
        Some(base)
    } else {
        Some((base * factor).floor())
    }
}

pub fn is_storage_blocked(catalog: &Catalog, state: &GameState) -> bool {
    is_blocked(state.resources.formulaires, effective_cap(catalog, state))
}

/// The next rung of the ladder: not yet bought, predecessor bought.
pub fn next_storage_upgrade<'c>(catalog: &'c Catalog, state: &GameState) -> Option<&'c StorageUpgradeDef> {
    catalog.storage_upgrades.iter().find(|u| {
        !state.has_storage_upgrade(&u.id)
            && u.required_upgrade_id
                .as_deref()
                .map_or(true, |req| state.has_storage_upgrade(req))
    })
}

/// Cap granted by the next upgrade. `Some(None)` means it lifts the cap.
pub fn next_storage_cap(catalog: &Catalog, state: &GameState) -> Option<Option<f64>> {
    next_storage_upgrade(catalog, state).map(|u| u.new_cap)
}

/// Upgrades offered to the player: only while the storage is full.
pub fn visible_storage_upgrades<'c>(catalog: &'c Catalog, state: &GameState) -> Vec<&'c StorageUpgradeDef> {
    if !is_storage_blocked(catalog, state) {
        return Vec::new();
    }
    next_storage_upgrade(catalog, state).into_iter().collect()
}

/// Buy a storage upgrade. The entire formulaires stock is consumed.
pub fn buy_storage_upgrade(
    catalog: &Catalog,
    state: &GameState,
    upgrade_id: &str,
) -> Result<GameState, ActionError> {
    let def = catalog
        .storage_upgrade(upgrade_id)
        .ok_or_else(|| ActionError::UnknownUpgrade(upgrade_id.to_string()))?;
    if state.has_storage_upgrade(upgrade_id) {
        return Err(ActionError::AlreadyPurchased(upgrade_id.to_string()));
    }
    if let Some(req) = def.required_upgrade_id.as_deref() {
        if !state.has_storage_upgrade(req) {
            return Err(ActionError::MissingPrerequisite(req.to_string()));
        }
    }
    if state.resources.formulaires < def.cost {
        return Err(ActionError::Unaffordable);
    }
    let mut next = state.clone();
    next.resources.formulaires = 0.0;
    next.current_storage_cap = def.new_cap;
    next.purchased_storage_upgrades.push(def.id.clone());
    Ok(next)
}
