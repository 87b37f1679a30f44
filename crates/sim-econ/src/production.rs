//! Per-second production from owned agents and their bonuses.
//!
//! Each unlocked administration is evaluated on its own running totals: agents
//! are visited in catalog order, base output is added, and a local bonus
//! scales (or adds to) whatever the administration has accumulated so far.
//! Global bonuses are collected on the side and applied once to the sum of all
//! administrations. Active prestige multipliers come last.

use sim_core::{
    AdministrationProgress, BonusTarget, Catalog, PrestigeEffect, ResourceKind, ResourceSet,
};
use std::collections::BTreeSet;

/// Global multipliers accumulated across administrations.
#[derive(Clone, Copy, Debug, PartialEq)]
struct GlobalBonuses {
    per_resource: ResourceSet,
    all: f64,
    flat: ResourceSet,
}

impl Default for GlobalBonuses {
    fn default() -> Self {
        Self {
            per_resource: ResourceSet::splat(1.0),
            all: 1.0,
            flat: ResourceSet::ZERO,
        }
    }
}

/// Production rate before prestige multipliers.
pub fn base_production(catalog: &Catalog, zones: &[AdministrationProgress]) -> ResourceSet {
    let mut totals = ResourceSet::ZERO;
    let mut globals = GlobalBonuses::default();

    for zone in zones.iter().filter(|z| z.is_unlocked) {
        let Some(def) = catalog.administration(&zone.id) else {
            continue;
        };
        let mut local = ResourceSet::ZERO;
        for agent in &def.agents {
            let owned = zone.owned(&agent.id);
            if owned == 0 {
                continue;
            }
            let n = f64::from(owned);
            for (kind, amount) in &agent.base_production {
                *local.get_mut(*kind) += amount * n;
            }
            let Some(bonus) = agent.production_bonus else {
                continue;
            };
            if bonus.is_global {
                if bonus.is_percentage {
                    let step = bonus.value / 100.0 * n;
                    match bonus.target {
                        BonusTarget::All => globals.all += step,
                        target => {
                            for kind in target.kinds() {
                                *globals.per_resource.get_mut(*kind) += step;
                            }
                        }
                    }
                } else {
                    for kind in bonus.target.kinds() {
                        *globals.flat.get_mut(*kind) += bonus.value * n;
                    }
                }
            } else {
                for kind in bonus.target.kinds() {
                    let slot = local.get_mut(*kind);
                    if bonus.is_percentage {
                        *slot *= 1.0 + bonus.value / 100.0 * n;
                    } else {
                        *slot += bonus.value * n;
                    }
                }
            }
        }
        totals += local;
    }

    totals += globals.flat;
    for kind in ResourceKind::ALL {
        *totals.get_mut(kind) *= globals.per_resource.get(kind) * globals.all;
    }
    totals
}

/// Multiplier on passive production of `kind` from active prestige upgrades.
pub fn prestige_multiplier(catalog: &Catalog, active: &BTreeSet<String>, kind: ResourceKind) -> f64 {
    active
        .iter()
        .filter_map(|id| catalog.prestige_upgrade(id))
        .filter_map(|u| match u.effect {
            PrestigeEffect::ProductionMultiplier { target, percent }
                if target.kinds().contains(&kind) =>
            {
                Some(1.0 + percent / 100.0)
            }
            _ => None,
        })
        .product()
}

/// Final production rate per second.
pub fn compute_production(
    catalog: &Catalog,
    zones: &[AdministrationProgress],
    active_prestige_upgrades: &BTreeSet<String>,
) -> ResourceSet {
    let mut rate = base_production(catalog, zones);
    for kind in ResourceKind::ALL {
        *rate.get_mut(kind) *= prestige_multiplier(catalog, active_prestige_upgrades, kind);
    }
    rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{
        bundle, AdministrationDef, AgentDef, AgentProgress, GameState, ProductionBonus,
    };

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * b.abs().max(1.0)
    }

    fn plain(id: &str, kind: ResourceKind, rate: f64) -> AgentDef {
        AgentDef {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            cost: bundle(&[(ResourceKind::Dossiers, 1.0)]),
            base_production: bundle(&[(kind, rate)]),
            production_bonus: None,
            max_owned: None,
        }
    }

    fn booster(id: &str, target: BonusTarget, value: f64, is_global: bool) -> AgentDef {
        AgentDef {
            production_bonus: Some(ProductionBonus {
                target,
                value,
                is_percentage: true,
                is_global,
            }),
            base_production: Default::default(),
            ..plain(id, ResourceKind::Dossiers, 0.0)
        }
    }

    fn catalog_with(zones: Vec<(&str, Vec<AgentDef>)>) -> Catalog {
        let mut c = Catalog::standard();
        c.administrations = zones
            .into_iter()
            .map(|(id, agents)| AdministrationDef {
                id: id.into(),
                name: id.into(),
                unlock_cost: Default::default(),
                agents,
            })
            .collect();
        c
    }

    fn progress(id: &str, owned: &[(&str, u32)]) -> AdministrationProgress {
        AdministrationProgress {
            id: id.into(),
            is_unlocked: true,
            agents: owned
                .iter()
                .map(|(a, n)| AgentProgress { id: a.to_string(), owned: *n })
                .collect(),
        }
    }

    #[test]
    fn nothing_owned_produces_nothing() {
        let c = Catalog::standard();
        let s = GameState::new(&c);
        assert_eq!(compute_production(&c, &s.administrations, &BTreeSet::new()), ResourceSet::ZERO);
    }

    #[test]
    fn local_bonus_applies_before_global() {
        let c = catalog_with(vec![
            ("a", vec![plain("p", ResourceKind::Dossiers, 10.0), booster("l", BonusTarget::Dossiers, 10.0, false)]),
            ("b", vec![booster("g", BonusTarget::All, 5.0, true)]),
        ]);
        let zones = vec![progress("a", &[("p", 1), ("l", 1)]), progress("b", &[("g", 1)])];
        let rate = compute_production(&c, &zones, &BTreeSet::new());
        // (10 * 1.1) * 1.05
        assert!(approx(rate.dossiers, 11.0 * 1.05));
    }

    #[test]
    fn local_bonus_stays_in_its_administration() {
        let c = catalog_with(vec![
            ("a", vec![plain("p", ResourceKind::Tampons, 2.0), booster("l", BonusTarget::Tampons, 50.0, false)]),
            ("b", vec![plain("q", ResourceKind::Tampons, 4.0)]),
        ]);
        let zones = vec![progress("a", &[("p", 1), ("l", 2)]), progress("b", &[("q", 1)])];
        let rate = base_production(&c, &zones);
        assert!(approx(rate.tampons, 2.0 * 2.0 + 4.0));
    }

    #[test]
    fn local_bonus_only_scales_what_precedes_it() {
        let c = catalog_with(vec![(
            "a",
            vec![
                booster("l", BonusTarget::Dossiers, 100.0, false),
                plain("p", ResourceKind::Dossiers, 3.0),
            ],
        )]);
        let rate = base_production(&c, &[progress("a", &[("l", 1), ("p", 1)])]);
        assert!(approx(rate.dossiers, 3.0));
    }

    #[test]
    fn locked_administrations_are_ignored() {
        let c = catalog_with(vec![("a", vec![plain("p", ResourceKind::Dossiers, 1.0)])]);
        let mut zone = progress("a", &[("p", 5)]);
        zone.is_unlocked = false;
        assert_eq!(base_production(&c, &[zone]), ResourceSet::ZERO);
    }

    #[test]
    fn global_percentages_accumulate_additively() {
        let c = catalog_with(vec![(
            "a",
            vec![
                plain("p", ResourceKind::Formulaires, 1.0),
                booster("g1", BonusTarget::Formulaires, 10.0, true),
                booster("g2", BonusTarget::Formulaires, 20.0, true),
            ],
        )]);
        let rate = base_production(&c, &[progress("a", &[("p", 1), ("g1", 2), ("g2", 1)])]);
        assert!(approx(rate.formulaires, 1.4));
    }

    #[test]
    fn prestige_multipliers_stack_multiplicatively() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s.administrations[0].agent_mut("stagiaire-administratif").owned = 10;
        let active: BTreeSet<String> = ["prestige_02", "prestige_05"].iter().map(|s| s.to_string()).collect();
        let rate = compute_production(&c, &s.administrations, &active);
        assert!(approx(rate.dossiers, 5.0 * 1.1 * 1.1));
        assert!(approx(prestige_multiplier(&c, &active, ResourceKind::Tampons), 1.1));
    }

    #[test]
    fn standard_catalog_example() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        let admin = &mut s.administrations[0];
        admin.agent_mut("stagiaire-administratif").owned = 4;
        admin.agent_mut("superviseur-section").owned = 2;
        admin.agent_mut("directeur-pole").owned = 1;
        let rate = base_production(&c, &s.administrations);
        // 4 * 0.5 = 2, +20% local = 2.4, +5% local all = 2.52
        assert!(approx(rate.dossiers, 2.52));
    }

    proptest! {
        #[test]
        fn production_is_non_negative_and_monotone_in_owned(n in 0u32..200, extra in 1u32..20) {
            let c = Catalog::standard();
            let mut s = GameState::new(&c);
            for admin in s.administrations.iter_mut() {
                admin.is_unlocked = true;
                for a in admin.agents.iter_mut() { a.owned = n; }
            }
            let before = compute_production(&c, &s.administrations, &BTreeSet::new());
            prop_assert!(before.is_valid_ledger());
            s.administrations[0].agent_mut("stagiaire-administratif").owned += extra;
            let after = compute_production(&c, &s.administrations, &BTreeSet::new());
            prop_assert!(after.dossiers >= before.dossiers);
        }
    }
}
