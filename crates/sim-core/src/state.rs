//! The persisted game state, at the current schema version.

use crate::catalog::Catalog;
use crate::journal::JournalEntry;
use crate::resources::ResourceSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Schema version written by this build.
pub const CURRENT_STATE_VERSION: u32 = 6;

/// Owned count for one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProgress {
    pub id: String,
    pub owned: u32,
}

/// Unlock flag and roster of one administration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrationProgress {
    pub id: String,
    pub is_unlocked: bool,
    pub agents: Vec<AgentProgress>,
}

impl AdministrationProgress {
    /// Owned count of `agent_id`, zero when the agent was never bought.
    pub fn owned(&self, agent_id: &str) -> u32 {
        self.agents
            .iter()
            .find(|a| a.id == agent_id)
            .map(|a| a.owned)
            .unwrap_or(0)
    }

    /// Mutable progress for `agent_id`, inserted at zero when missing.
    pub fn agent_mut(&mut self, agent_id: &str) -> &mut AgentProgress {
        if let Some(idx) = self.agents.iter().position(|a| a.id == agent_id) {
            return &mut self.agents[idx];
        }
        self.agents.push(AgentProgress {
            id: agent_id.to_string(),
            owned: 0,
        });
        let last = self.agents.len() - 1;
        &mut self.agents[last]
    }
}

/// Prestige difficulty tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Local,
    National,
    Global,
}

impl Tier {
    /// Divisor of the prestige reward formula.
    pub fn coefficient(self) -> f64 {
        match self {
            Tier::Local => 1_000.0,
            Tier::National => 5_000.0,
            Tier::Global => 25_000.0,
        }
    }
}

/// Conformité minigame progress.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformiteState {
    /// 0..=100, whole points.
    pub percentage: f64,
    pub is_unlocked: bool,
    pub is_activated: bool,
    /// Formulaires produced since activation and not yet converted into points.
    pub accumulated_formulaires: f64,
    /// Formulaires produced over the whole save.
    pub lifetime_formulaires: f64,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_test_timestamp: Option<DateTime<Utc>>,
    /// Highest tampons stock ever observed. Never decreases.
    pub highest_ever_tampons: f64,
    /// Highest formulaires stock ever observed. Never decreases.
    pub highest_ever_formulaires: f64,
}

/// Cooldown and milestone bookkeeping of the message triggers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSystemState {
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub sic_last_trigger_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub non_conformity_last_trigger_time: Option<DateTime<Utc>>,
    /// Stock observed at the last milestone check.
    pub last_production_milestone: ResourceSet,
}

/// Full game snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Schema version, see [`CURRENT_STATE_VERSION`].
    pub version: u32,
    pub resources: ResourceSet,
    /// Last computed production rate per second.
    pub production: ResourceSet,
    pub administrations: Vec<AdministrationProgress>,
    /// Administration shown by the UI. No economic effect.
    pub active_administration_id: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_timestamp: Option<DateTime<Utc>>,
    pub conformite: ConformiteState,
    pub message_system: MessageSystemState,
    pub journal: Vec<JournalEntry>,
    /// Base formulaires cap; `None` is unlimited.
    pub current_storage_cap: Option<f64>,
    /// Storage upgrade ids bought in this run.
    pub purchased_storage_upgrades: Vec<String>,
    /// Soft currency, kept across resets.
    pub paperclips: u64,
    /// Lifetime value produced since the last reset.
    pub total_administrative_value: f64,
    pub current_tier: Tier,
    /// Temporary prestige upgrades, cleared on reset.
    pub active_prestige_upgrades: BTreeSet<String>,
    /// Set while a prestige reset is being committed.
    pub prestige_in_progress: bool,
}

impl GameState {
    /// Fresh save for `catalog`: only the first administration unlocked.
    pub fn new(catalog: &Catalog) -> Self {
        let first = catalog.first_administration_id().to_string();
        GameState {
            version: CURRENT_STATE_VERSION,
            resources: ResourceSet::ZERO,
            production: ResourceSet::ZERO,
            administrations: initial_administrations(catalog),
            active_administration_id: first,
            last_timestamp: None,
            conformite: ConformiteState::default(),
            message_system: MessageSystemState::default(),
            journal: Vec::new(),
            current_storage_cap: catalog.initial_storage_cap(),
            purchased_storage_upgrades: Vec::new(),
            paperclips: 0,
            total_administrative_value: 0.0,
            current_tier: Tier::Local,
            active_prestige_upgrades: BTreeSet::new(),
            prestige_in_progress: false,
        }
    }

    pub fn administration(&self, id: &str) -> Option<&AdministrationProgress> {
        self.administrations.iter().find(|a| a.id == id)
    }

    pub fn administration_mut(&mut self, id: &str) -> Option<&mut AdministrationProgress> {
        self.administrations.iter_mut().find(|a| a.id == id)
    }

    pub fn is_unlocked(&self, administration_id: &str) -> bool {
        self.administration(administration_id)
            .is_some_and(|a| a.is_unlocked)
    }

    pub fn owned(&self, administration_id: &str, agent_id: &str) -> u32 {
        self.administration(administration_id)
            .map(|a| a.owned(agent_id))
            .unwrap_or(0)
    }

    pub fn has_storage_upgrade(&self, upgrade_id: &str) -> bool {
        self.purchased_storage_upgrades.iter().any(|id| id == upgrade_id)
    }

    /// Add progress records for catalog administrations and agents the save
    /// does not mention yet. Existing records are kept as they are.
    pub fn fill_missing(&mut self, catalog: &Catalog) {
        for def in &catalog.administrations {
            if self.administration(&def.id).is_none() {
                self.administrations.push(AdministrationProgress {
                    id: def.id.clone(),
                    is_unlocked: false,
                    agents: Vec::new(),
                });
            }
            if let Some(zone) = self.administration_mut(&def.id) {
                for agent in &def.agents {
                    zone.agent_mut(&agent.id);
                }
            }
        }
    }
}

/// Progress records for every catalog administration, all agents at zero.
pub fn initial_administrations(catalog: &Catalog) -> Vec<AdministrationProgress> {
    catalog
        .administrations
        .iter()
        .enumerate()
        .map(|(i, def)| AdministrationProgress {
            id: def.id.clone(),
            is_unlocked: i == 0,
            agents: def
                .agents
                .iter()
                .map(|a| AgentProgress {
                    id: a.id.clone(),
                    owned: 0,
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_unlocks_only_the_first_administration() {
        let catalog = Catalog::standard();
        let state = GameState::new(&catalog);
        assert_eq!(state.version, CURRENT_STATE_VERSION);
        assert_eq!(state.administrations.len(), catalog.administrations.len());
        assert!(state.administrations[0].is_unlocked);
        assert!(state.administrations[1..].iter().all(|a| !a.is_unlocked));
        assert_eq!(state.active_administration_id, "administration-centrale");
        assert_eq!(state.current_storage_cap, Some(983.0));
    }

    #[test]
    fn agent_mut_inserts_missing_agents() {
        let mut admin = AdministrationProgress {
            id: "x".into(),
            is_unlocked: true,
            agents: vec![],
        };
        admin.agent_mut("a").owned += 2;
        admin.agent_mut("a").owned += 1;
        assert_eq!(admin.owned("a"), 3);
        assert_eq!(admin.owned("b"), 0);
        assert_eq!(admin.agents.len(), 1);
    }

    #[test]
    fn fill_missing_keeps_progress() {
        let catalog = Catalog::standard();
        let mut state = GameState::new(&catalog);
        state.administrations.truncate(1);
        state.administrations[0].agents.truncate(1);
        state.administrations[0].agents[0].owned = 7;
        state.fill_missing(&catalog);
        assert_eq!(state.administrations.len(), catalog.administrations.len());
        assert_eq!(state.administrations[0].agents.len(), 5);
        assert_eq!(state.owned("administration-centrale", "stagiaire-administratif"), 7);
        assert_eq!(state, {
            let mut fresh = GameState::new(&catalog);
            fresh.administrations[0].agents[0].owned = 7;
            fresh
        });
    }

    #[test]
    fn tier_coefficients() {
        assert_eq!(Tier::Local.coefficient(), 1000.0);
        assert_eq!(Tier::National.coefficient(), 5000.0);
        assert_eq!(Tier::Global.coefficient(), 25000.0);
        assert_eq!(serde_json::to_string(&Tier::National).unwrap(), "\"national\"");
    }

    #[test]
    fn state_wire_is_camel_case() {
        let state = GameState::new(&Catalog::standard());
        let v = serde_json::to_value(&state).unwrap();
        assert_eq!(v["version"], 6);
        assert!(v.get("activeAdministrationId").is_some());
        assert!(v.get("currentStorageCap").is_some());
        assert!(v["conformite"].get("highestEverTampons").is_some());
        assert!(v["lastTimestamp"].is_null());
    }
}
