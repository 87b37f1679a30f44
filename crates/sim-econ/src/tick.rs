//! One game-loop step, computed as a delta and committed in a single assignment.

use crate::conformite;
use crate::messages::{crossed_milestones, evaluate_messages, Milestone};
use crate::storage::{apply_cap, effective_cap};
use chrono::{DateTime, Utc};
use rand::Rng;
use sim_core::{
    append_capped, Catalog, ConformiteState, GameState, JournalEntry, MessageSystemState,
    ResourceSet, CONFORMITE_GATE_ADMINISTRATION,
};
use tracing::info;

/// Everything a tick changes. Built from an immutable view of the state.
#[derive(Clone, Debug, PartialEq)]
pub struct TickDelta {
    /// Ledger after production and the storage cap.
    pub resources: ResourceSet,
    /// Rate used for this tick.
    pub production: ResourceSet,
    /// Amount produced this tick, before the cap.
    pub produced: ResourceSet,
    pub conformite: ConformiteState,
    pub message_system: MessageSystemState,
    pub total_administrative_value: f64,
    pub journal_entries: Vec<JournalEntry>,
    /// Milestones crossed this tick, for the notification hook.
    pub milestones: Vec<Milestone>,
    pub timestamp: DateTime<Utc>,
}

/// Advance `state` by `elapsed_secs` at `production` units per second.
pub fn compute_tick<R: Rng + ?Sized>(
    catalog: &Catalog,
    state: &GameState,
    production: ResourceSet,
    elapsed_secs: f64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> TickDelta {
    let dt = if elapsed_secs.is_finite() { elapsed_secs.max(0.0) } else { 0.0 };
    let produced = production.scaled(dt);

    let mut resources = state.resources + produced;
    resources.formulaires = apply_cap(resources.formulaires, effective_cap(catalog, state));

    let mut c = state.conformite.clone();
    c.lifetime_formulaires += produced.formulaires;
    c.highest_ever_tampons = c.highest_ever_tampons.max(resources.tampons);
    c.highest_ever_formulaires = c.highest_ever_formulaires.max(resources.formulaires);
    if !c.is_unlocked
        && conformite::watermarks_reached(&c)
        && state.is_unlocked(CONFORMITE_GATE_ADMINISTRATION)
    {
        c.is_unlocked = true;
        info!("conformité unlocked");
    }
    if c.is_activated && !conformite::is_complete(&c) {
        let before = c.percentage;
        let (percentage, leftover) =
            conformite::advance(c.percentage, c.accumulated_formulaires + produced.formulaires);
        c.percentage = percentage;
        c.accumulated_formulaires = leftover;
        if conformite::is_complete(&c) && before < percentage {
            info!("conformité complete");
        }
    }

    let milestones = crossed_milestones(&state.message_system.last_production_milestone, &resources);
    let outcome = evaluate_messages(catalog, state, &milestones, now, rng);
    let message_system = MessageSystemState {
        sic_last_trigger_time: if outcome.sic_triggered {
            Some(now)
        } else {
            state.message_system.sic_last_trigger_time
        },
        non_conformity_last_trigger_time: if outcome.non_conformity_triggered {
            Some(now)
        } else {
            state.message_system.non_conformity_last_trigger_time
        },
        last_production_milestone: resources,
    };

    TickDelta {
        resources,
        production,
        produced,
        conformite: c,
        message_system,
        total_administrative_value: state.total_administrative_value + produced.total(),
        journal_entries: outcome.entries,
        milestones,
        timestamp: now,
    }
}

impl TickDelta {
    /// Commit the delta. The only mutation performed by a tick.
    pub fn apply(self, state: &mut GameState) {
        state.resources = self.resources;
        state.production = self.production;
        state.conformite = self.conformite;
        state.message_system = self.message_system;
        state.total_administrative_value = self.total_administrative_value;
        state.last_timestamp = Some(self.timestamp);
        append_capped(&mut state.journal, self.journal_entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::purchase_agent;
    use crate::prestige::reset_state;
    use crate::production::compute_production;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn run(state: &mut GameState, catalog: &Catalog, secs: f64, rng: &mut ChaCha8Rng) -> TickDelta {
        let rate = compute_production(catalog, &state.administrations, &state.active_prestige_upgrades);
        let delta = compute_tick(catalog, state, rate, secs, Utc::now(), rng);
        delta.clone().apply(state);
        delta
    }

    #[test]
    fn production_accumulates_with_elapsed_time() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s.administrations[0].agent_mut("stagiaire-administratif").owned = 2;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let d = run(&mut s, &c, 10.0, &mut rng);
        assert_eq!(s.resources.dossiers, 10.0);
        assert_eq!(s.total_administrative_value, 10.0);
        assert_eq!(d.produced.dossiers, 10.0);
        assert!(s.last_timestamp.is_some());
    }

    #[test]
    fn negative_or_nan_elapsed_is_ignored() {
        let c = Catalog::standard();
        let s = GameState::new(&c);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rate = ResourceSet::splat(5.0);
        assert_eq!(compute_tick(&c, &s, rate, -3.0, Utc::now(), &mut rng).resources, ResourceSet::ZERO);
        assert_eq!(compute_tick(&c, &s, rate, f64::NAN, Utc::now(), &mut rng).resources, ResourceSet::ZERO);
    }

    #[test]
    fn formulaires_are_capped() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s.resources.formulaires = 980.0;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let d = compute_tick(&c, &s, ResourceSet::splat(10.0), 1.0, Utc::now(), &mut rng);
        assert_eq!(d.resources.formulaires, 983.0);
        assert_eq!(d.produced.formulaires, 10.0);
        assert_eq!(d.resources.tampons, 10.0);
    }

    #[test]
    fn conformite_unlocks_from_watermarks_and_progresses() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s.current_storage_cap = None;
        s.administration_mut(CONFORMITE_GATE_ADMINISTRATION).unwrap().is_unlocked = true;
        s.resources = ResourceSet { dossiers: 0.0, tampons: 999.0, formulaires: 99.0 };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let d = compute_tick(&c, &s, ResourceSet::splat(1.0), 1.0, Utc::now(), &mut rng);
        assert!(d.conformite.is_unlocked);
        d.apply(&mut s);

        s.conformite.is_activated = true;
        s.conformite.accumulated_formulaires = 900.0;
        let d = compute_tick(&c, &s, ResourceSet { formulaires: 250.0, ..ResourceSet::ZERO }, 1.0, Utc::now(), &mut rng);
        assert_eq!(d.conformite.percentage, 1.0);
        assert_eq!(d.conformite.accumulated_formulaires, 150.0);
    }

    #[test]
    fn milestones_reported_once_per_bucket() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let rate = ResourceSet { dossiers: 60.0, ..ResourceSet::ZERO };
        assert!(compute_tick(&c, &s, rate, 1.0, Utc::now(), &mut rng).milestones.is_empty());
        s.resources.dossiers = 60.0;
        s.message_system.last_production_milestone.dossiers = 60.0;
        let d = compute_tick(&c, &s, rate, 1.0, Utc::now(), &mut rng);
        assert_eq!(d.milestones.len(), 1);
        d.apply(&mut s);
        let d = compute_tick(&c, &s, ResourceSet::ZERO, 1.0, Utc::now(), &mut rng);
        assert!(d.milestones.is_empty());
    }

    proptest! {
        #[test]
        fn tick_invariants_hold(
            seed in any::<u64>(),
            steps in proptest::collection::vec((0.0f64..5.0, 0u32..40), 1..30),
        ) {
            let c = Catalog::standard();
            let mut s = GameState::new(&c);
            for admin in s.administrations.iter_mut() {
                admin.is_unlocked = true;
            }
            s.conformite.is_unlocked = true;
            s.conformite.is_activated = true;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for (secs, owned) in steps {
                s.administrations[0].agent_mut("chef-validation").owned += owned;
                s.administrations[3].agent_mut("inspecteur-normes").owned += owned;
                let before = s.clone();
                run(&mut s, &c, secs, &mut rng);
                prop_assert!(s.resources.formulaires <= effective_cap(&c, &s).unwrap_or(f64::INFINITY));
                prop_assert!(s.conformite.highest_ever_tampons >= before.conformite.highest_ever_tampons);
                prop_assert!(s.conformite.highest_ever_formulaires >= before.conformite.highest_ever_formulaires);
                prop_assert!(s.conformite.percentage >= before.conformite.percentage);
                prop_assert!(s.conformite.percentage <= 100.0);
                prop_assert!(s.resources.is_valid_ledger());
                prop_assert!(s.journal.len() <= sim_core::JOURNAL_CAPACITY);
            }
        }

        #[test]
        fn owned_counts_only_grow_until_reset(
            seed in any::<u64>(),
            ops in proptest::collection::vec((0u8..3, 0usize..64, 0.0f64..3.0), 1..60),
        ) {
            let c = Catalog::standard();
            let roster: Vec<(String, String)> = c
                .administrations
                .iter()
                .flat_map(|a| a.agents.iter().map(move |g| (a.id.clone(), g.id.clone())))
                .collect();
            let mut s = GameState::new(&c);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for (op, pick, secs) in ops {
                let before = s.clone();
                match op {
                    0 => {
                        let (zone, agent) = &roster[pick % roster.len()];
                        s.resources = ResourceSet::splat(1e12);
                        if let Some(z) = s.administration_mut(zone) {
                            z.is_unlocked = true;
                        }
                        if let Ok(next) = purchase_agent(&c, &s, zone, agent) {
                            s = next;
                        }
                    }
                    1 => {
                        run(&mut s, &c, secs, &mut rng);
                    }
                    _ => s = reset_state(&c, &s),
                }
                for (zone, agent) in &roster {
                    let now = s.owned(zone, agent);
                    if op == 2 {
                        prop_assert_eq!(now, 0);
                    } else {
                        prop_assert!(now >= before.owned(zone, agent));
                    }
                }
            }
        }
    }
}
