//! Core domain models and invariants for the bureaucracy idle engine.
//!
//! This crate defines the serializable types shared by the simulation
//! (resources, static catalog, persisted state, journal, configuration) and
//! validation helpers that guard the invariants of a loaded save.

pub mod catalog;
pub mod config;
pub mod journal;
pub mod resources;
pub mod state;

pub use catalog::*;
pub use config::SimConfig;
pub use journal::*;
pub use resources::*;
pub use state::*;

use std::collections::BTreeSet;
use thiserror::Error;

/// Validation errors for state invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// State was written by another schema version.
    #[error("state version {found} does not match expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },
    /// Numeric field must be finite and non-negative.
    #[error("field {0} must be finite and >= 0")]
    NegativeOrNonFinite(&'static str),
    /// Conformité percentage outside [0, 100].
    #[error("conformité percentage {0} is out of range [0,100]")]
    PercentageOutOfRange(f64),
    /// Storage cap must be strictly positive when set.
    #[error("storage cap must be > 0")]
    NonPositiveCap,
    /// Administration id unknown to the catalog.
    #[error("unknown administration: {0}")]
    UnknownAdministration(String),
    /// Agent id unknown to its administration.
    #[error("unknown agent {agent} in administration {administration}")]
    UnknownAgent { administration: String, agent: String },
    /// The same administration appears twice.
    #[error("duplicate administration: {0}")]
    DuplicateAdministration(String),
    /// The starting administration must always be unlocked.
    #[error("first administration {0} is locked")]
    FirstAdministrationLocked(String),
    /// Upgrade id unknown to the catalog.
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),
}

fn non_negative(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NegativeOrNonFinite(field))
    }
}

/// Validate conformité numeric fields.
pub fn validate_conformite(c: &ConformiteState) -> Result<(), ValidationError> {
    if !(0.0..=100.0).contains(&c.percentage) {
        return Err(ValidationError::PercentageOutOfRange(c.percentage));
    }
    non_negative(c.accumulated_formulaires, "conformite.accumulatedFormulaires")?;
    non_negative(c.lifetime_formulaires, "conformite.lifetimeFormulaires")?;
    non_negative(c.highest_ever_tampons, "conformite.highestEverTampons")?;
    non_negative(c.highest_ever_formulaires, "conformite.highestEverFormulaires")?;
    Ok(())
}

/// Validate administrations against the catalog: known ids, no duplicates,
/// first administration unlocked.
pub fn validate_administrations(
    admins: &[AdministrationProgress],
    catalog: &Catalog,
) -> Result<(), ValidationError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for admin in admins {
        let def = catalog
            .administration(&admin.id)
            .ok_or_else(|| ValidationError::UnknownAdministration(admin.id.clone()))?;
        if !seen.insert(admin.id.as_str()) {
            return Err(ValidationError::DuplicateAdministration(admin.id.clone()));
        }
        for agent in &admin.agents {
            if def.agent(&agent.id).is_none() {
                return Err(ValidationError::UnknownAgent {
                    administration: admin.id.clone(),
                    agent: agent.id.clone(),
                });
            }
        }
    }
    let first = catalog.first_administration_id();
    if !admins.iter().any(|a| a.id == first && a.is_unlocked) {
        return Err(ValidationError::FirstAdministrationLocked(first.to_string()));
    }
    Ok(())
}

/// Validate a whole state, including cross-references into the catalog.
pub fn validate_state(state: &GameState, catalog: &Catalog) -> Result<(), ValidationError> {
    if state.version != CURRENT_STATE_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: CURRENT_STATE_VERSION,
            found: state.version,
        });
    }
    if !state.resources.is_valid_ledger() {
        return Err(ValidationError::NegativeOrNonFinite("resources"));
    }
    if !state.production.is_valid_ledger() {
        return Err(ValidationError::NegativeOrNonFinite("production"));
    }
    non_negative(state.total_administrative_value, "totalAdministrativeValue")?;
    if let Some(cap) = state.current_storage_cap {
        if !(cap.is_finite() && cap > 0.0) {
            return Err(ValidationError::NonPositiveCap);
        }
    }
    validate_conformite(&state.conformite)?;
    validate_administrations(&state.administrations, catalog)?;
    if catalog.administration(&state.active_administration_id).is_none() {
        return Err(ValidationError::UnknownAdministration(
            state.active_administration_id.clone(),
        ));
    }
    for id in &state.purchased_storage_upgrades {
        if catalog.storage_upgrade(id).is_none() {
            return Err(ValidationError::UnknownUpgrade(id.clone()));
        }
    }
    for id in &state.active_prestige_upgrades {
        if catalog.prestige_upgrade(id).is_none() {
            return Err(ValidationError::UnknownUpgrade(id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fresh_state_is_valid() {
        let catalog = Catalog::standard();
        validate_state(&GameState::new(&catalog), &catalog).unwrap();
    }

    #[test]
    fn world_snapshot_roundtrip() {
        let catalog = Catalog::standard();
        let mut state = GameState::new(&catalog);
        state.resources.dossiers = 1234.5;
        state.paperclips = 3;
        state.active_prestige_upgrades.insert("prestige_02".into());
        let s = serde_json::to_string_pretty(&state).unwrap();
        let back: GameState = serde_json::from_str(&s).unwrap();
        assert_eq!(back, state);
        validate_state(&back, &catalog).unwrap();
    }

    #[test]
    fn rejects_unknown_references() {
        let catalog = Catalog::standard();
        let mut state = GameState::new(&catalog);
        state.administrations[1].agents[0].id = "ghost".into();
        assert!(matches!(
            validate_state(&state, &catalog),
            Err(ValidationError::UnknownAgent { .. })
        ));

        let mut state = GameState::new(&catalog);
        state.purchased_storage_upgrades.push("storage_upgrade_9".into());
        assert_eq!(
            validate_state(&state, &catalog),
            Err(ValidationError::UnknownUpgrade("storage_upgrade_9".into()))
        );
    }

    #[test]
    fn rejects_locked_first_administration() {
        let catalog = Catalog::standard();
        let mut state = GameState::new(&catalog);
        state.administrations[0].is_unlocked = false;
        assert!(matches!(
            validate_state(&state, &catalog),
            Err(ValidationError::FirstAdministrationLocked(_))
        ));
    }

    #[test]
    fn rejects_bad_cap_and_version() {
        let catalog = Catalog::standard();
        let mut state = GameState::new(&catalog);
        state.current_storage_cap = Some(0.0);
        assert_eq!(validate_state(&state, &catalog), Err(ValidationError::NonPositiveCap));
        let mut state = GameState::new(&catalog);
        state.version = 5;
        assert!(matches!(
            validate_state(&state, &catalog),
            Err(ValidationError::VersionMismatch { found: 5, .. })
        ));
    }

    proptest! {
        #[test]
        fn percentage_range(p in -50.0f64..150.0) {
            let c = ConformiteState { percentage: p, ..ConformiteState::default() };
            prop_assert_eq!(validate_conformite(&c).is_ok(), (0.0..=100.0).contains(&p));
        }

        #[test]
        fn non_negative_ledgers_validate(d in 0.0f64..1e12, t in 0.0f64..1e12, f in 0.0f64..1e12) {
            let catalog = Catalog::standard();
            let mut state = GameState::new(&catalog);
            state.resources = ResourceSet { dossiers: d, tampons: t, formulaires: f };
            prop_assert!(validate_state(&state, &catalog).is_ok());
        }
    }
}
