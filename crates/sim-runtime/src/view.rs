use serde::Serialize;
use sim_core::{Catalog, GameState, ResourceSet};
use sim_econ::conformite::{self, ACTIVATION_FORMULAIRES, ACTIVATION_TAMPONS};
use sim_econ::economy::tap_amount;
use sim_econ::storage::{effective_cap, is_storage_blocked, next_storage_cap, visible_storage_upgrades};
use sim_econ::{potential, PrestigePotential};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformiteView {
    pub percentage: f64,
    pub is_unlocked: bool,
    pub is_activated: bool,
    pub is_complete: bool,
    pub can_activate: bool,
    /// Formulaires needed for the next point, `None` once complete.
    pub cost_for_next_percent: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageView {
    pub effective_cap: Option<f64>,
    pub is_blocked: bool,
    /// `Some(None)` when the next upgrade lifts the cap.
    pub next_cap: Option<Option<f64>>,
    pub visible_upgrades: Vec<String>,
}

/// Everything a UI frame needs, derived from one state.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub resources: ResourceSet,
    pub production: ResourceSet,
    pub active_administration_id: String,
    pub tap_amount: f64,
    pub storage: StorageView,
    pub conformite: ConformiteView,
    pub prestige: PrestigePotential,
    pub paperclips: u64,
    pub journal_len: usize,
}

impl EngineSnapshot {
    pub fn build(catalog: &Catalog, state: &GameState) -> Self {
        let c = &state.conformite;
        let complete = conformite::is_complete(c);
        EngineSnapshot {
            resources: state.resources,
            production: state.production,
            active_administration_id: state.active_administration_id.clone(),
            tap_amount: tap_amount(catalog, state),
            storage: StorageView {
                effective_cap: effective_cap(catalog, state),
                is_blocked: is_storage_blocked(catalog, state),
                next_cap: next_storage_cap(catalog, state),
                visible_upgrades: visible_storage_upgrades(catalog, state)
                    .into_iter()
                    .map(|u| u.id.clone())
                    .collect(),
            },
            conformite: ConformiteView {
                percentage: c.percentage,
                is_unlocked: c.is_unlocked,
                is_activated: c.is_activated,
                is_complete: complete,
                can_activate: c.is_unlocked
                    && !c.is_activated
                    && state.resources.tampons >= ACTIVATION_TAMPONS
                    && state.resources.formulaires >= ACTIVATION_FORMULAIRES,
                cost_for_next_percent: (!complete)
                    .then(|| conformite::cost_for_next_percent(c.percentage.floor() as u32)),
            },
            prestige: potential(state),
            paperclips: state.paperclips,
            journal_len: state.journal.len(),
        }
    }
}
