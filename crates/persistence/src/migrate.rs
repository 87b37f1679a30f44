// ---------------------------------------------------------------------------
// Save migration registry: per-version edges over the generic JSON record
// ---------------------------------------------------------------------------
//
// Each step transforms a save from version N to N+1 by back-filling what the
// newer schema added. Steps never overwrite fields that are already present,
// so re-running a step is harmless. The registry checks at construction that
// the chain is contiguous from v1 to the current version.

use serde_json::{json, Map, Value};
use sim_core::CURRENT_STATE_VERSION;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{info, warn};

/// Base cap written for saves that predate the storage ladder.
pub const LEGACY_STORAGE_CAP: f64 = 983.0;

#[derive(Debug, Error, PartialEq)]
pub enum MigrationError {
    #[error("save root is not a JSON object")]
    NotAnObject,
    #[error("invalid version field: {0}")]
    InvalidVersion(String),
    #[error("migration chain is broken at v{0}")]
    BrokenChain(u32),
    #[error("duplicate migration step for v{0}")]
    DuplicateStep(u32),
}

/// A single migration step: transforms a save from `from_version` to `from_version + 1`.
pub struct MigrationStep {
    pub from_version: u32,
    pub description: &'static str,
    pub migrate_fn: fn(&mut Map<String, Value>),
}

/// Result of running the migration chain on a save.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    /// The version the save was originally at.
    pub original_version: u32,
    /// The version the save is now at.
    pub final_version: u32,
    /// Descriptions of each step that was applied, in order.
    pub step_descriptions: Vec<&'static str>,
}

impl MigrationReport {
    pub fn steps_applied(&self) -> usize {
        self.step_descriptions.len()
    }
}

/// Ordered, validated chain of migration steps.
pub struct MigrationRegistry {
    steps: Vec<MigrationStep>,
    current_version: u32,
}

impl MigrationRegistry {
    /// Build a registry. Fails on duplicate steps or gaps between v1 and
    /// `current_version`.
    pub fn new(mut steps: Vec<MigrationStep>, current_version: u32) -> Result<Self, MigrationError> {
        let mut seen = BTreeSet::new();
        for step in &steps {
            if !seen.insert(step.from_version) {
                return Err(MigrationError::DuplicateStep(step.from_version));
            }
        }
        for v in 1..current_version {
            if !seen.contains(&v) {
                return Err(MigrationError::BrokenChain(v));
            }
        }
        steps.sort_by_key(|s| s.from_version);
        Ok(Self {
            steps,
            current_version,
        })
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Bring `save` up to the current version in place. Saves from a future
    /// or otherwise unknown version are left untouched.
    pub fn migrate(&self, save: &mut Value) -> Result<MigrationReport, MigrationError> {
        let original_version = stored_version(save)?;
        let root = save.as_object_mut().ok_or(MigrationError::NotAnObject)?;

        if original_version > self.current_version {
            warn!(version = original_version, "unknown save version, loading as-is");
            return Ok(MigrationReport {
                original_version,
                final_version: original_version,
                step_descriptions: Vec::new(),
            });
        }

        let mut version = original_version;
        let mut step_descriptions = Vec::new();
        for step in &self.steps {
            if version >= self.current_version {
                break;
            }
            if step.from_version == version {
                (step.migrate_fn)(root);
                version = step.from_version + 1;
                root.insert("version".into(), json!(version));
                info!(from = step.from_version, to = version, "{}", step.description);
                step_descriptions.push(step.description);
            }
        }

        Ok(MigrationReport {
            original_version,
            final_version: version,
            step_descriptions,
        })
    }
}

/// Schema version of a raw save. Missing, null or zero means v1 (unversioned).
pub fn stored_version(save: &Value) -> Result<u32, MigrationError> {
    let root = save.as_object().ok_or(MigrationError::NotAnObject)?;
    match root.get("version") {
        None | Some(Value::Null) => Ok(1),
        Some(v) => match v.as_u64() {
            Some(0) => Ok(1),
            Some(n) => Ok(u32::try_from(n).unwrap_or(u32::MAX)),
            None => Err(MigrationError::InvalidVersion(v.to_string())),
        },
    }
}

/// The chain shipped with this build.
pub fn build_migration_registry() -> Result<MigrationRegistry, MigrationError> {
    MigrationRegistry::new(
        vec![
            MigrationStep {
                from_version: 1,
                description: "add conformité and message system",
                migrate_fn: v1_add_conformite,
            },
            MigrationStep {
                from_version: 2,
                description: "add journal and conformité activation",
                migrate_fn: v2_add_journal,
            },
            MigrationStep {
                from_version: 3,
                description: "add storage cap ladder",
                migrate_fn: v3_add_storage,
            },
            MigrationStep {
                from_version: 4,
                description: "add prestige fields",
                migrate_fn: v4_add_prestige,
            },
            MigrationStep {
                from_version: 5,
                description: "reduce administrations to progress records",
                migrate_fn: v5_progress_records,
            },
        ],
        CURRENT_STATE_VERSION,
    )
}

/// Migrate a raw save through the shipped chain.
pub fn migrate_to_current(save: &mut Value) -> Result<MigrationReport, MigrationError> {
    build_migration_registry()?.migrate(save)
}

fn number_at(root: &Map<String, Value>, object: &str, field: &str) -> f64 {
    root.get(object)
        .and_then(|o| o.get(field))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn object_mut<'a>(root: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    root.get_mut(key).and_then(Value::as_object_mut)
}

fn v1_add_conformite(root: &mut Map<String, Value>) {
    let formulaires = number_at(root, "resources", "formulaires");
    let tampons = number_at(root, "resources", "tampons");
    // watermarks start at the stock held when the save is upgraded
    root.entry("conformite").or_insert_with(|| {
        json!({
            "percentage": 0,
            "isUnlocked": false,
            "lifetimeFormulaires": formulaires,
            "lastTestTimestamp": null,
            "highestEverTampons": tampons,
            "highestEverFormulaires": formulaires,
        })
    });
    root.entry("messageSystem").or_insert_with(|| {
        json!({
            "sicLastTriggerTime": null,
            "nonConformityLastTriggerTime": null,
            "lastProductionMilestone": { "dossiers": 0, "tampons": 0, "formulaires": 0 },
        })
    });
}

fn v2_add_journal(root: &mut Map<String, Value>) {
    root.entry("journal").or_insert_with(|| json!([]));
    if let Some(c) = object_mut(root, "conformite") {
        c.entry("isActivated").or_insert(json!(false));
        c.entry("accumulatedFormulaires").or_insert(json!(0));
        if let Some(p) = c.get("percentage").and_then(Value::as_f64) {
            c.insert("percentage".into(), json!(p.floor().clamp(0.0, 100.0)));
        }
    }
}

fn v3_add_storage(root: &mut Map<String, Value>) {
    root.entry("currentStorageCap").or_insert(json!(LEGACY_STORAGE_CAP));
    root.entry("purchasedStorageUpgrades").or_insert_with(|| json!([]));
}

fn v4_add_prestige(root: &mut Map<String, Value>) {
    root.entry("paperclips").or_insert(json!(0));
    root.entry("totalAdministrativeValue").or_insert(json!(0));
    root.entry("currentTier").or_insert(json!("local"));
    root.entry("prestigeUpgrades").or_insert_with(|| json!({}));
    root.entry("prestigeInProgress").or_insert(json!(false));
}

fn is_active_flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Object(o) => o.get("isActive").and_then(Value::as_bool).unwrap_or(false),
        _ => false,
    }
}

fn v5_progress_records(root: &mut Map<String, Value>) {
    if let Some(Value::Array(admins)) = root.get_mut("administrations") {
        for admin in admins.iter_mut() {
            let Some(obj) = admin.as_object() else {
                continue;
            };
            let agents: Vec<Value> = obj
                .get("agents")
                .and_then(Value::as_array)
                .map(|agents| {
                    agents
                        .iter()
                        .map(|a| {
                            let owned = a
                                .get("owned")
                                .and_then(Value::as_f64)
                                .map(|n| n.max(0.0).floor() as u64)
                                .unwrap_or(0);
                            json!({ "id": a.get("id").cloned().unwrap_or(Value::Null), "owned": owned })
                        })
                        .collect()
                })
                .unwrap_or_default();
            *admin = json!({
                "id": obj.get("id").cloned().unwrap_or(Value::Null),
                "isUnlocked": obj.get("isUnlocked").cloned().unwrap_or(json!(false)),
                "agents": agents,
            });
        }
    }

    if !root.contains_key("activePrestigeUpgrades") {
        let active: Vec<Value> = match root.remove("prestigeUpgrades") {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter(|(_, v)| is_active_flag(v))
                .map(|(id, _)| Value::String(id))
                .collect(),
            _ => Vec::new(),
        };
        root.insert("activePrestigeUpgrades".into(), Value::Array(active));
    } else {
        root.remove("prestigeUpgrades");
    }
}
