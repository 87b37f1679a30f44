//! Purchase transactions: agents, administration unlocks, manual taps.
//!
//! Every action takes the current state by reference and returns either a new
//! state or the reason it was refused. A refused action never touches the
//! input, so atomicity holds by construction.

use crate::error::ActionError;
use crate::prestige::click_multiplier;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{reveal_hints, Catalog, GameState, ResourceBundle, ResourceSet};

/// Owned units per escalation step.
pub const ESCALATION_STEP: u32 = 10;

/// Dossiers granted by one tap before multipliers.
pub const TAP_AMOUNT: f64 = 1.0;

fn escalation_factor() -> Decimal {
    Decimal::new(109, 2)
}

/// `ceil(base * 1.09^floor(owned / 10))`, evaluated in decimal arithmetic so
/// that exact products are not pushed over an integer by float error.
pub fn escalated_amount(base: f64, owned: u32) -> f64 {
    let steps = owned / ESCALATION_STEP;
    let float_fallback = || (base * 1.09f64.powi(steps as i32)).ceil();
    let Some(mut cost) = Decimal::from_f64(base) else {
        return float_fallback();
    };
    for _ in 0..steps {
        match cost.checked_mul(escalation_factor()) {
            Some(next) => cost = next,
            None => return float_fallback(),
        }
    }
    cost.ceil().to_f64().unwrap_or_else(float_fallback)
}

/// Escalated price of the next unit for every resource in `base`.
pub fn escalated_cost(base: &ResourceBundle, owned: u32) -> ResourceBundle {
    base.iter()
        .map(|(kind, amount)| (*kind, escalated_amount(*amount, owned)))
        .collect()
}

/// True when `ledger` holds every named amount in full.
pub fn can_afford(cost: &ResourceBundle, ledger: &ResourceSet) -> bool {
    cost.iter().all(|(kind, amount)| ledger.get(*kind) >= *amount)
}

/// Subtract `cost` from `ledger`. Callers check [`can_afford`] first.
pub fn debit(ledger: &ResourceSet, cost: &ResourceBundle) -> ResourceSet {
    let mut out = *ledger;
    for (kind, amount) in cost {
        let slot = out.get_mut(*kind);
        *slot = (*slot - amount).max(0.0);
    }
    out
}

/// Buy one unit of `agent_id` in `administration_id`.
pub fn purchase_agent(
    catalog: &Catalog,
    state: &GameState,
    administration_id: &str,
    agent_id: &str,
) -> Result<GameState, ActionError> {
    let def = catalog
        .administration(administration_id)
        .ok_or_else(|| ActionError::UnknownAdministration(administration_id.to_string()))?;
    let agent = def.agent(agent_id).ok_or_else(|| ActionError::UnknownAgent {
        administration: administration_id.to_string(),
        agent: agent_id.to_string(),
    })?;
    let zone = state
        .administration(administration_id)
        .filter(|z| z.is_unlocked)
        .ok_or_else(|| ActionError::AdministrationLocked(administration_id.to_string()))?;
    let owned = zone.owned(agent_id);
    if let Some(max) = agent.max_owned {
        if owned >= max {
            return Err(ActionError::MaxOwned {
                agent: agent_id.to_string(),
                max,
            });
        }
    }
    let cost = escalated_cost(&agent.cost, owned);
    if !can_afford(&cost, &state.resources) {
        return Err(ActionError::Unaffordable);
    }

    let mut next = state.clone();
    next.resources = debit(&state.resources, &cost);
    if let Some(zone) = next.administration_mut(administration_id) {
        zone.agent_mut(agent_id).owned = owned.saturating_add(1);
    }
    Ok(next)
}

/// Unlock an administration, make it the active one and reveal its hints.
pub fn unlock_administration(
    catalog: &Catalog,
    state: &GameState,
    administration_id: &str,
) -> Result<GameState, ActionError> {
    let def = catalog
        .administration(administration_id)
        .ok_or_else(|| ActionError::UnknownAdministration(administration_id.to_string()))?;
    if state.is_unlocked(administration_id) {
        return Err(ActionError::AlreadyUnlocked(administration_id.to_string()));
    }
    if !can_afford(&def.unlock_cost, &state.resources) {
        return Err(ActionError::Unaffordable);
    }

    let mut next = state.clone();
    next.resources = debit(&state.resources, &def.unlock_cost);
    match next.administration_mut(administration_id) {
        Some(zone) => zone.is_unlocked = true,
        None => next.administrations.push(sim_core::AdministrationProgress {
            id: def.id.clone(),
            is_unlocked: true,
            agents: Vec::new(),
        }),
    }
    next.active_administration_id = administration_id.to_string();
    reveal_hints(&mut next.journal, administration_id);
    Ok(next)
}

/// Switch the administration shown to the player.
pub fn set_active_administration(
    state: &GameState,
    administration_id: &str,
) -> Result<GameState, ActionError> {
    if !state.is_unlocked(administration_id) {
        return Err(ActionError::AdministrationLocked(administration_id.to_string()));
    }
    let mut next = state.clone();
    next.active_administration_id = administration_id.to_string();
    Ok(next)
}

/// Dossiers produced by one tap under the active prestige upgrades.
pub fn tap_amount(catalog: &Catalog, state: &GameState) -> f64 {
    TAP_AMOUNT * click_multiplier(catalog, &state.active_prestige_upgrades)
}

/// Manual increment. Tapped dossiers count towards the lifetime value.
pub fn tap(catalog: &Catalog, state: &GameState) -> GameState {
    let amount = tap_amount(catalog, state);
    let mut next = state.clone();
    next.resources.dossiers += amount;
    next.total_administrative_value += amount;
    next
}

/// An agent annotated for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub owned: u32,
    pub max_owned: Option<u32>,
    pub next_cost: ResourceBundle,
    pub can_afford: bool,
    pub is_maxed: bool,
}

/// An administration annotated for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrationView {
    pub id: String,
    pub name: String,
    pub is_unlocked: bool,
    pub is_active: bool,
    pub unlock_cost: ResourceBundle,
    pub can_unlock: bool,
    pub agents: Vec<AgentView>,
}

pub fn administration_views(catalog: &Catalog, state: &GameState) -> Vec<AdministrationView> {
    catalog
        .administrations
        .iter()
        .map(|def| {
            let is_unlocked = state.is_unlocked(&def.id);
            let agents = def
                .agents
                .iter()
                .map(|agent| {
                    let owned = state.owned(&def.id, &agent.id);
                    let next_cost = escalated_cost(&agent.cost, owned);
                    let is_maxed = agent.max_owned.is_some_and(|max| owned >= max);
                    AgentView {
                        id: agent.id.clone(),
                        name: agent.name.clone(),
                        owned,
                        max_owned: agent.max_owned,
                        can_afford: is_unlocked && !is_maxed && can_afford(&next_cost, &state.resources),
                        next_cost,
                        is_maxed,
                    }
                })
                .collect();
            AdministrationView {
                id: def.id.clone(),
                name: def.name.clone(),
                is_unlocked,
                is_active: state.active_administration_id == def.id,
                unlock_cost: def.unlock_cost.clone(),
                can_unlock: !is_unlocked && can_afford(&def.unlock_cost, &state.resources),
                agents,
            }
        })
        .collect()
}

/// Cheapest affordable agent purchase across unlocked administrations, by
/// total escalated cost. Used by the headless auto-buyer.
pub fn cheapest_affordable_agent(catalog: &Catalog, state: &GameState) -> Option<(String, String)> {
    administration_views(catalog, state)
        .into_iter()
        .filter(|z| z.is_unlocked)
        .flat_map(|z| {
            let zone_id = z.id;
            z.agents
                .into_iter()
                .filter(|a| a.can_afford)
                .map(move |a| (a.next_cost.values().sum::<f64>(), zone_id.clone(), a.id))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, zone, agent)| (zone, agent))
}

/// First locked administration the ledger can pay for.
pub fn next_affordable_unlock(catalog: &Catalog, state: &GameState) -> Option<String> {
    catalog
        .administrations
        .iter()
        .find(|def| !state.is_unlocked(&def.id) && can_afford(&def.unlock_cost, &state.resources))
        .map(|def| def.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{bundle, JournalEntry, ResourceKind};

    fn rich_state(catalog: &Catalog) -> GameState {
        let mut s = GameState::new(catalog);
        s.resources = ResourceSet::splat(1e9);
        s
    }

    #[test]
    fn escalation_holds_flat_within_each_decade() {
        for owned in 0..10 {
            assert_eq!(escalated_amount(50.0, owned), 50.0);
        }
        for owned in 10..20 {
            assert_eq!(escalated_amount(50.0, owned), 55.0);
        }
        for owned in 20..30 {
            assert_eq!(escalated_amount(50.0, owned), 60.0);
        }
    }

    #[test]
    fn exact_products_are_not_rounded_up() {
        // 100 * 1.09 is 109.00000000000001 in binary floating point
        assert_eq!(escalated_amount(100.0, 10), 109.0);
        assert_eq!(escalated_amount(0.0, 500), 0.0);
    }

    #[test]
    fn huge_owned_counts_fall_back_to_float() {
        let v = escalated_amount(1e20, 10_000);
        assert!(v.is_infinite() || v > 1e20);
    }

    #[test]
    fn can_afford_checks_each_named_resource() {
        let ledger = ResourceSet { dossiers: 10.0, tampons: 5.0, formulaires: 0.0 };
        assert!(can_afford(&bundle(&[(ResourceKind::Dossiers, 10.0)]), &ledger));
        assert!(!can_afford(
            &bundle(&[(ResourceKind::Dossiers, 1.0), (ResourceKind::Tampons, 6.0)]),
            &ledger
        ));
        assert!(can_afford(&ResourceBundle::new(), &ResourceSet::ZERO));
    }

    #[test]
    fn purchase_debits_pre_increment_cost() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s.administrations[0].agent_mut("stagiaire-administratif").owned = 10;
        s.resources.dossiers = 60.0;
        let next = purchase_agent(&c, &s, "administration-centrale", "stagiaire-administratif").unwrap();
        assert_eq!(next.resources.dossiers, 5.0);
        assert_eq!(next.owned("administration-centrale", "stagiaire-administratif"), 11);
    }

    #[test]
    fn purchase_in_locked_administration_fails() {
        let c = Catalog::standard();
        let s = rich_state(&c);
        assert_eq!(
            purchase_agent(&c, &s, "service-tampons", "tamponneur-debutant"),
            Err(ActionError::AdministrationLocked("service-tampons".into()))
        );
    }

    #[test]
    fn purchase_respects_max_owned() {
        let mut c = Catalog::standard();
        for agent in &mut c.administrations[0].agents {
            if agent.id == "superviseur-section" {
                agent.max_owned = Some(25);
            }
        }
        let mut s = rich_state(&c);
        s.administrations[0].agent_mut("superviseur-section").owned = 25;
        assert!(matches!(
            purchase_agent(&c, &s, "administration-centrale", "superviseur-section"),
            Err(ActionError::MaxOwned { max: 25, .. })
        ));
    }

    #[test]
    fn unlock_switches_active_and_reveals_hints() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s.resources.tampons = 600.0;
        s.journal.push(JournalEntry::hint(
            "narrative-hint-0-0",
            "service-tampons",
            "██",
            "full",
            chrono::Utc::now(),
        ));
        let next = unlock_administration(&c, &s, "service-tampons").unwrap();
        assert!(next.is_unlocked("service-tampons"));
        assert_eq!(next.active_administration_id, "service-tampons");
        assert_eq!(next.resources.tampons, 100.0);
        assert_eq!(next.journal[0].text, "full");
        assert_eq!(
            unlock_administration(&c, &next, "service-tampons"),
            Err(ActionError::AlreadyUnlocked("service-tampons".into()))
        );
    }

    #[test]
    fn unlock_cost_is_not_escalated() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s.resources.tampons = 499.0;
        assert_eq!(unlock_administration(&c, &s, "service-tampons"), Err(ActionError::Unaffordable));
    }

    #[test]
    fn active_pointer_requires_unlocked_zone() {
        let c = Catalog::standard();
        let s = GameState::new(&c);
        assert!(set_active_administration(&s, "service-tampons").is_err());
        assert!(set_active_administration(&s, "administration-centrale").is_ok());
    }

    #[test]
    fn tap_uses_click_multiplier() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s = tap(&c, &s);
        assert_eq!(s.resources.dossiers, 1.0);
        s.active_prestige_upgrades.insert("prestige_01".into());
        s = tap(&c, &s);
        assert_eq!(s.resources.dossiers, 3.0);
        assert_eq!(s.total_administrative_value, 3.0);
    }

    #[test]
    fn views_annotate_costs_and_affordability() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s.resources.dossiers = 60.0;
        let views = administration_views(&c, &s);
        assert_eq!(views.len(), 5);
        let first = &views[0];
        assert!(first.is_active && first.is_unlocked);
        assert!(first.agents[0].can_afford);
        assert!(!first.agents[1].can_afford);
        assert!(!views[1].agents[0].can_afford);
        assert_eq!(
            cheapest_affordable_agent(&c, &s),
            Some(("administration-centrale".into(), "stagiaire-administratif".into()))
        );
    }

    proptest! {
        #[test]
        fn failed_purchase_leaves_state_untouched(d in 0.0f64..49.99, owned in 0u32..9) {
            let c = Catalog::standard();
            let mut s = GameState::new(&c);
            s.resources.dossiers = d;
            s.administrations[0].agent_mut("stagiaire-administratif").owned = owned;
            let before = s.clone();
            prop_assert_eq!(
                purchase_agent(&c, &s, "administration-centrale", "stagiaire-administratif"),
                Err(ActionError::Unaffordable)
            );
            prop_assert_eq!(s, before);
        }

        #[test]
        fn successful_purchase_debits_exact_cost(extra in 0.0f64..1e6, owned in 0u32..300) {
            let c = Catalog::standard();
            let mut s = GameState::new(&c);
            let cost = escalated_amount(50.0, owned);
            s.resources.dossiers = cost + extra;
            s.administrations[0].agent_mut("stagiaire-administratif").owned = owned;
            let next = purchase_agent(&c, &s, "administration-centrale", "stagiaire-administratif").unwrap();
            prop_assert!((next.resources.dossiers - extra).abs() <= 1e-6 * (cost + extra).max(1.0));
            prop_assert_eq!(next.owned("administration-centrale", "stagiaire-administratif"), owned + 1);
        }

        #[test]
        fn escalation_is_monotone(base in 1u32..1_000_000, owned in 0u32..500) {
            let base = f64::from(base);
            prop_assert!(escalated_amount(base, owned + 1) >= escalated_amount(base, owned));
            prop_assert!(escalated_amount(base, owned) >= base);
        }
    }
}
