//! Static game data: administrations and their agents, the storage upgrade
//! ladder, prestige upgrades, narrative hints and message pools.
//!
//! The catalog is read-only input to the engine. Persisted state refers to
//! catalog entries by id only.

use crate::resources::{bundle, ResourceBundle, ResourceKind};
use serde::{Deserialize, Serialize};

use ResourceKind::{Dossiers, Formulaires, Tampons};

/// Resource(s) a bonus or prestige effect applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusTarget {
    Dossiers,
    Tampons,
    Formulaires,
    /// Every resource.
    All,
}

impl BonusTarget {
    /// The resource kinds covered by this target.
    pub fn kinds(self) -> &'static [ResourceKind] {
        match self {
            BonusTarget::Dossiers => &[ResourceKind::Dossiers],
            BonusTarget::Tampons => &[ResourceKind::Tampons],
            BonusTarget::Formulaires => &[ResourceKind::Formulaires],
            BonusTarget::All => &ResourceKind::ALL,
        }
    }
}

/// A production bonus carried by an agent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionBonus {
    /// Resource(s) boosted.
    pub target: BonusTarget,
    /// Percentage points (when `is_percentage`) or flat units per second, per owned agent.
    pub value: f64,
    /// Percentage boost when true, flat addition otherwise.
    pub is_percentage: bool,
    /// Global bonuses apply to the final totals of every administration.
    pub is_global: bool,
}

/// A purchasable production unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDef {
    /// Stable identifier, e.g. "stagiaire-administratif".
    pub id: String,
    /// Display name.
    pub name: String,
    /// Flavour text.
    pub description: String,
    /// Base cost of the first unit, before escalation.
    pub cost: ResourceBundle,
    /// Output per second per owned unit.
    pub base_production: ResourceBundle,
    /// Optional production bonus per owned unit.
    pub production_bonus: Option<ProductionBonus>,
    /// Purchase cap; `None` means unlimited.
    pub max_owned: Option<u32>,
}

/// An unlockable administration (zone) holding agents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrationDef {
    /// Stable identifier, e.g. "service-tampons".
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-time unlock cost (never escalated).
    pub unlock_cost: ResourceBundle,
    /// Agents in display order. Production is evaluated in this order.
    pub agents: Vec<AgentDef>,
}

impl AdministrationDef {
    pub fn agent(&self, agent_id: &str) -> Option<&AgentDef> {
        self.agents.iter().find(|a| a.id == agent_id)
    }
}

/// One step of the formulaires storage ladder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUpgradeDef {
    pub id: String,
    pub name: String,
    /// Position in the ladder, starting at 1.
    pub sequence_index: u32,
    /// Formulaires that must be in stock. The whole stock is consumed.
    pub cost: f64,
    /// Cap after purchase; `None` removes the cap.
    pub new_cap: Option<f64>,
    /// Upgrade that must already be purchased.
    pub required_upgrade_id: Option<String>,
}

/// Effect of a temporary prestige upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrestigeEffect {
    /// Multiplies the output of each manual tap.
    ClickMultiplier { factor: f64 },
    /// Percentage boost to passive production.
    ProductionMultiplier { target: BonusTarget, percent: f64 },
    /// Percentage boost to the effective formulaires cap.
    StorageCapacity { percent: f64 },
}

/// A prestige shop entry, active until the next reset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrestigeUpgradeDef {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Price in paperclips.
    pub cost: u64,
    pub effect: PrestigeEffect,
}

/// A journal hint that stays redacted until its target is reached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeHintDef {
    /// Administration id, or [`CONFORMITE_HINT_TARGET`].
    pub target_id: String,
    pub redacted_text: String,
    pub full_text: String,
}

/// Hint target used for the conformité activation.
pub const CONFORMITE_HINT_TARGET: &str = "conformite";

/// Administration whose unlock gates the conformité system.
pub const CONFORMITE_GATE_ADMINISTRATION: &str = "agence-redondance";

/// The complete static catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Administrations in unlock order. The first one starts unlocked.
    pub administrations: Vec<AdministrationDef>,
    /// Storage ladder in sequence order.
    pub storage_upgrades: Vec<StorageUpgradeDef>,
    pub prestige_upgrades: Vec<PrestigeUpgradeDef>,
    pub narrative_hints: Vec<NarrativeHintDef>,
    /// S.I.C. message pool.
    pub sic_messages: Vec<String>,
    /// Non-conformity notice pool.
    pub non_conformity_messages: Vec<String>,
}

impl Catalog {
    pub fn administration(&self, id: &str) -> Option<&AdministrationDef> {
        self.administrations.iter().find(|a| a.id == id)
    }

    pub fn agent(&self, administration_id: &str, agent_id: &str) -> Option<&AgentDef> {
        self.administration(administration_id)?.agent(agent_id)
    }

    /// Id of the administration unlocked from game start.
    pub fn first_administration_id(&self) -> &str {
        self.administrations
            .first()
            .map(|a| a.id.as_str())
            .unwrap_or_default()
    }

    pub fn storage_upgrade(&self, id: &str) -> Option<&StorageUpgradeDef> {
        self.storage_upgrades.iter().find(|u| u.id == id)
    }

    pub fn prestige_upgrade(&self, id: &str) -> Option<&PrestigeUpgradeDef> {
        self.prestige_upgrades.iter().find(|u| u.id == id)
    }

    /// Cap in force before any storage upgrade.
    pub fn initial_storage_cap(&self) -> Option<f64> {
        self.storage_upgrades.first().map(|u| u.cost)
    }

    /// The shipped game data.
    pub fn standard() -> Self {
        Catalog {
            administrations: standard_administrations(),
            storage_upgrades: standard_storage_upgrades(),
            prestige_upgrades: standard_prestige_upgrades(),
            narrative_hints: standard_hints(),
            sic_messages: [
                "Ce dossier a été transféré au S.I.C. pour traitement ultérieur.",
                "Le S.I.C. a validé cette procédure conformément au protocole.",
                "Notification S.I.C. : Vérification de conformité en cours.",
                "Le Service Inconnu de Coordination requiert une inspection supplémentaire.",
                "S.I.C. - Classification du document : Niveau de routine.",
                "Autorisation S.I.C. obtenue. Procédure standard applicable.",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            non_conformity_messages: vec![
                "Tampon non conforme détecté. Veuillez recommencer la procédure.".to_string(),
            ],
        }
    }
}

fn agent(
    id: &str,
    name: &str,
    description: &str,
    cost: &[(ResourceKind, f64)],
    base_production: &[(ResourceKind, f64)],
) -> AgentDef {
    AgentDef {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        cost: bundle(cost),
        base_production: bundle(base_production),
        production_bonus: None,
        max_owned: None,
    }
}

fn bonus_agent(
    id: &str,
    name: &str,
    description: &str,
    cost: &[(ResourceKind, f64)],
    bonus: ProductionBonus,
) -> AgentDef {
    AgentDef {
        production_bonus: Some(bonus),
        ..agent(id, name, description, cost, &[])
    }
}

fn pct(target: BonusTarget, value: f64, is_global: bool) -> ProductionBonus {
    ProductionBonus {
        target,
        value,
        is_percentage: true,
        is_global,
    }
}

fn administration(
    id: &str,
    name: &str,
    unlock_cost: &[(ResourceKind, f64)],
    agents: Vec<AgentDef>,
) -> AdministrationDef {
    AdministrationDef {
        id: id.to_string(),
        name: name.to_string(),
        unlock_cost: bundle(unlock_cost),
        agents,
    }
}

fn standard_administrations() -> Vec<AdministrationDef> {
    vec![
        administration(
            "administration-centrale",
            "Bureau des Documents Obsolètes",
            &[],
            vec![
                agent(
                    "stagiaire-administratif",
                    "Stagiaire administratif",
                    "Jeune et enthousiaste, il classe les dossiers à la vitesse de l'éclair (ou presque).",
                    &[(Dossiers, 50.0)],
                    &[(Dossiers, 0.5)],
                ),
                agent(
                    "assistant-administratif",
                    "Assistant administratif",
                    "Pas très rapide, mais très méthodique avec les tampons.",
                    &[(Dossiers, 250.0)],
                    &[(Tampons, 0.2)],
                ),
                bonus_agent(
                    "superviseur-section",
                    "Superviseur de section",
                    "Motive les stagiaires à produire davantage de dossiers.",
                    &[(Tampons, 200.0)],
                    pct(BonusTarget::Dossiers, 10.0, false),
                ),
                agent(
                    "chef-validation",
                    "Chef de validation",
                    "Expert en formulaires administratifs complexes.",
                    &[(Tampons, 500.0)],
                    &[(Formulaires, 0.1)],
                ),
                bonus_agent(
                    "directeur-pole",
                    "Directeur de pôle",
                    "Améliore l'efficacité de tout le département.",
                    &[(Formulaires, 100.0)],
                    pct(BonusTarget::All, 5.0, false),
                ),
            ],
        ),
        administration(
            "service-tampons",
            "Service des Tampons Tamponnés",
            &[(Tampons, 500.0)],
            vec![
                agent(
                    "tamponneur-debutant",
                    "Tamponneur débutant",
                    "Fraîchement formé à l'art du tamponnage.",
                    &[(Dossiers, 300.0)],
                    &[(Tampons, 0.4)],
                ),
                agent(
                    "tamponneur-experimente",
                    "Tamponneur expérimenté",
                    "Un vétéran dont le poignet est parfaitement calibré pour tamponner.",
                    &[(Dossiers, 800.0)],
                    &[(Tampons, 1.0)],
                ),
                bonus_agent(
                    "chef-tamponnage",
                    "Chef de poste tamponnage",
                    "Augmente la production de tampons à chaque achat.",
                    &[(Tampons, 300.0)],
                    pct(BonusTarget::Tampons, 5.0, false),
                ),
                agent(
                    "controleur-conformite",
                    "Contrôleur de conformité",
                    "Vérifie que chaque tampon est correctement aligné sur les formulaires.",
                    &[(Tampons, 1500.0)],
                    &[(Formulaires, 0.3)],
                ),
                bonus_agent(
                    "coordinateur-tamponnage",
                    "Coordinateur tamponnage",
                    "Coordonne toutes les activités de tamponnage pour une efficacité maximale.",
                    &[(Formulaires, 200.0)],
                    pct(BonusTarget::All, 1.0, true),
                ),
            ],
        ),
        administration(
            "cellule-verification",
            "Cellule de Double Vérification",
            &[(Tampons, 1000.0)],
            vec![
                agent(
                    "verificateur-auxiliaire",
                    "Vérificateur auxiliaire",
                    "Vérifie les vérifications des vérificateurs. Oui, vraiment.",
                    &[(Dossiers, 200.0)],
                    &[(Tampons, 0.5)],
                ),
                agent(
                    "analyste-conformite",
                    "Analyste de conformité",
                    "Passe sa journée à vérifier que les tampons sont conformes aux normes ISO-TMN-2025.",
                    &[(Dossiers, 500.0)],
                    &[(Tampons, 0.6)],
                ),
                bonus_agent(
                    "controleur-chef",
                    "Contrôleur en chef",
                    "Augmente la production de tampons à chaque achat.",
                    &[(Tampons, 300.0)],
                    pct(BonusTarget::Tampons, 1.0, false),
                ),
                agent(
                    "archiviste-certifie",
                    "Archiviste certifié",
                    "A obtenu sa certification après 7 ans d'études en tamponnologie.",
                    &[(Tampons, 200.0)],
                    &[(Tampons, 1.0)],
                ),
                bonus_agent(
                    "coordinateur-qualite",
                    "Coordinateur qualité",
                    "Son mantra : \"La qualité avant la quantité... mais en grande quantité.\"",
                    &[(Formulaires, 300.0)],
                    pct(BonusTarget::All, 10.0, true),
                ),
            ],
        ),
        administration(
            "division-archivage",
            "Division de l'Archivage Physique",
            &[(Formulaires, 1000.0)],
            vec![
                agent(
                    "agent-rangement",
                    "Agent de rangement",
                    "Classe les formulaires par ordre alphabétique, chronologique et chromatique.",
                    &[(Tampons, 500.0)],
                    &[(Formulaires, 0.3)],
                ),
                agent(
                    "archiviste-methodique",
                    "Archiviste méthodique",
                    "A développé un système de classement si complexe que lui seul le comprend.",
                    &[(Tampons, 1000.0)],
                    &[(Formulaires, 0.5)],
                ),
                bonus_agent(
                    "responsable-etageres",
                    "Responsable des étagères",
                    "Optimise la production de formulaires à chaque achat.",
                    &[(Formulaires, 350.0)],
                    pct(BonusTarget::Formulaires, 15.0, false),
                ),
                agent(
                    "inspecteur-normes",
                    "Inspecteur des normes",
                    "Vérifie que chaque formulaire respecte les 217 points de la charte qualité.",
                    &[(Tampons, 500.0)],
                    &[(Formulaires, 1.0)],
                ),
                bonus_agent(
                    "chef-archivage",
                    "Chef de l'archivage",
                    "Son bureau est si bien rangé qu'il n'y a même pas un trombone qui dépasse.",
                    &[(Formulaires, 400.0)],
                    pct(BonusTarget::All, 20.0, true),
                ),
            ],
        ),
        administration(
            CONFORMITE_GATE_ADMINISTRATION,
            "Agence de Redondance Non Justifiée",
            &[(Formulaires, 5000.0)],
            vec![
                agent(
                    "assistant-duplication",
                    "Assistant à la duplication",
                    "Son travail consiste à dupliquer des documents déjà dupliqués.",
                    &[(Dossiers, 500.0)],
                    &[(Dossiers, 5.0)],
                ),
                agent(
                    "repetiteur-administratif",
                    "Répétiteur administratif",
                    "Il répète, répète et répète encore les mêmes tâches, comme un disque rayé.",
                    &[(Dossiers, 1200.0)],
                    &[(Dossiers, 8.0)],
                ),
                bonus_agent(
                    "chef-copie-colle",
                    "Chef de section copié-collé",
                    "A inventé 27 nouvelles techniques de copier-coller qui augmentent la production de tampons.",
                    &[(Tampons, 350.0)],
                    pct(BonusTarget::Tampons, 10.0, false),
                ),
                agent(
                    "responsable-survalidation",
                    "Responsable de la sur-validation",
                    "Ajoute systématiquement trois validations supplémentaires à chaque formulaire.",
                    &[(Formulaires, 250.0)],
                    &[(Formulaires, 1.0)],
                ),
                bonus_agent(
                    "redondant-supreme",
                    "Grand redondant suprême",
                    "Son titre complet fait 27 lignes et mentionne 14 fois le mot \"redondance\".",
                    &[(Formulaires, 500.0)],
                    pct(BonusTarget::All, 15.0, true),
                ),
            ],
        ),
    ]
}

fn standard_storage_upgrades() -> Vec<StorageUpgradeDef> {
    let ladder: [(f64, Option<f64>, &str); 4] = [
        (983.0, Some(1983.0), "Armoire supplémentaire"),
        (1983.0, Some(4583.0), "Salle d'archives annexe"),
        (4583.0, Some(11025.0), "Entrepôt départemental"),
        (11025.0, None, "Dématérialisation partielle"),
    ];
    ladder
        .iter()
        .enumerate()
        .map(|(i, (cost, new_cap, name))| StorageUpgradeDef {
            id: format!("storage_upgrade_{}", i + 1),
            name: name.to_string(),
            sequence_index: i as u32 + 1,
            cost: *cost,
            new_cap: *new_cap,
            required_upgrade_id: (i > 0).then(|| format!("storage_upgrade_{}", i)),
        })
        .collect()
}

fn standard_prestige_upgrades() -> Vec<PrestigeUpgradeDef> {
    let entry = |id: &str, name: &str, description: &str, cost: u64, effect| PrestigeUpgradeDef {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        cost,
        effect,
    };
    vec![
        entry(
            "prestige_01",
            "Tampon Double Flux",
            "Chaque coup de tampon compte double.",
            10,
            PrestigeEffect::ClickMultiplier { factor: 2.0 },
        ),
        entry(
            "prestige_02",
            "Optimisation des Flux",
            "+10 % de production de dossiers.",
            15,
            PrestigeEffect::ProductionMultiplier {
                target: BonusTarget::Dossiers,
                percent: 10.0,
            },
        ),
        entry(
            "prestige_03",
            "Formulaires Pré-remplis",
            "+10 % de production de formulaires.",
            15,
            PrestigeEffect::ProductionMultiplier {
                target: BonusTarget::Formulaires,
                percent: 10.0,
            },
        ),
        entry(
            "prestige_04",
            "Extension des Classeurs",
            "+20 % de capacité de stockage des formulaires.",
            20,
            PrestigeEffect::StorageCapacity { percent: 20.0 },
        ),
        entry(
            "prestige_05",
            "Synergie Administrative",
            "+10 % de production pour toutes les ressources.",
            30,
            PrestigeEffect::ProductionMultiplier {
                target: BonusTarget::All,
                percent: 10.0,
            },
        ),
    ]
}

fn standard_hints() -> Vec<NarrativeHintDef> {
    let hint = |target: &str, redacted: &str, full: &str| NarrativeHintDef {
        target_id: target.to_string(),
        redacted_text: redacted.to_string(),
        full_text: full.to_string(),
    };
    vec![
        hint(
            "service-tampons",
            "Le S.I.C. mentionne un ██████ au sous-sol.",
            "Le S.I.C. mentionne un service entier dédié aux tampons, au sous-sol.",
        ),
        hint(
            "cellule-verification",
            "Une note interne évoque une ████████ ██████.",
            "Une note interne évoque une double vérification systématique.",
        ),
        hint(
            "division-archivage",
            "Des cartons s'accumulent vers la ████████.",
            "Des cartons s'accumulent vers la division de l'archivage physique.",
        ),
        hint(
            CONFORMITE_GATE_ADMINISTRATION,
            "Un organigramme cite une agence ███████████.",
            "Un organigramme cite une agence de redondance non justifiée.",
        ),
        hint(
            CONFORMITE_HINT_TARGET,
            "La ██████████ aléatoire serait en cours d'évaluation.",
            "La conformité aléatoire est désormais évaluée en continu.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn ids_are_unique() {
        let c = Catalog::standard();
        let mut admins = BTreeSet::new();
        for a in &c.administrations {
            assert!(admins.insert(a.id.as_str()), "duplicate admin {}", a.id);
            let mut agents = BTreeSet::new();
            for ag in &a.agents {
                assert!(agents.insert(ag.id.as_str()), "duplicate agent {}", ag.id);
            }
        }
    }

    #[test]
    fn storage_ladder_is_chained() {
        let c = Catalog::standard();
        assert_eq!(c.initial_storage_cap(), Some(983.0));
        assert!(c.storage_upgrades[0].required_upgrade_id.is_none());
        for pair in c.storage_upgrades.windows(2) {
            assert_eq!(pair[1].required_upgrade_id.as_deref(), Some(pair[0].id.as_str()));
            assert_eq!(pair[0].new_cap, Some(pair[1].cost));
        }
        assert_eq!(c.storage_upgrades.last().unwrap().new_cap, None);
    }

    #[test]
    fn gate_administration_exists_and_first_starts_unlocked() {
        let c = Catalog::standard();
        assert!(c.administration(CONFORMITE_GATE_ADMINISTRATION).is_some());
        assert_eq!(c.first_administration_id(), "administration-centrale");
        assert!(c.administrations[0].unlock_cost.is_empty());
    }

    #[test]
    fn every_hint_targets_something_real() {
        let c = Catalog::standard();
        for h in &c.narrative_hints {
            assert!(
                h.target_id == CONFORMITE_HINT_TARGET || c.administration(&h.target_id).is_some(),
                "dangling hint target {}",
                h.target_id
            );
        }
    }

    #[test]
    fn prestige_effect_tagging() {
        let e = PrestigeEffect::StorageCapacity { percent: 20.0 };
        let s = serde_json::to_string(&e).unwrap();
        assert!(s.contains("\"type\":\"storage_capacity\""), "got {s}");
    }
}
