//! Structural checks on a raw save, per version tier. Runs after migration
//! and before the record is decoded into a [`sim_core::GameState`].

use serde_json::{Map, Value};
use sim_core::CURRENT_STATE_VERSION;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("save root is not a JSON object")]
    NotAnObject,
    #[error("unsupported save version {0}")]
    UnsupportedVersion(u64),
    #[error("missing field {0}")]
    MissingField(String),
    #[error("field {field} must be {expected}")]
    WrongType { field: String, expected: &'static str },
    #[error("field {field} has unexpected value {value}")]
    InvalidEnum { field: String, value: String },
}

const TIERS: [&str; 3] = ["local", "national", "global"];
const RESOURCE_FIELDS: [&str; 3] = ["dossiers", "tampons", "formulaires"];

fn field<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Value, SchemaError> {
    obj.get(key)
        .ok_or_else(|| SchemaError::MissingField(format!("{path}{key}")))
}

fn expect<'a, T>(
    obj: &'a Map<String, Value>,
    path: &str,
    key: &str,
    expected: &'static str,
    cast: impl Fn(&'a Value) -> Option<T>,
) -> Result<T, SchemaError> {
    cast(field(obj, path, key)?).ok_or_else(|| SchemaError::WrongType {
        field: format!("{path}{key}"),
        expected,
    })
}

fn object<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    expect(obj, path, key, "an object", Value::as_object)
}

fn number(obj: &Map<String, Value>, path: &str, key: &str) -> Result<f64, SchemaError> {
    expect(obj, path, key, "a number", Value::as_f64)
}

fn boolean(obj: &Map<String, Value>, path: &str, key: &str) -> Result<bool, SchemaError> {
    expect(obj, path, key, "a boolean", Value::as_bool)
}

fn array<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Vec<Value>, SchemaError> {
    expect(obj, path, key, "an array", Value::as_array)
}

fn resource_set(obj: &Map<String, Value>, key: &str) -> Result<(), SchemaError> {
    let set = object(obj, "", key)?;
    let path = format!("{key}.");
    for name in RESOURCE_FIELDS {
        number(set, &path, name)?;
    }
    Ok(())
}

fn nullable_number(obj: &Map<String, Value>, path: &str, key: &str) -> Result<(), SchemaError> {
    match field(obj, path, key)? {
        Value::Null | Value::Number(_) => Ok(()),
        _ => Err(SchemaError::WrongType {
            field: format!("{path}{key}"),
            expected: "a number or null",
        }),
    }
}

/// Check that `save` is well-formed for the version it declares.
pub fn validate_structure(save: &Value) -> Result<(), SchemaError> {
    let root = save.as_object().ok_or(SchemaError::NotAnObject)?;
    let version = expect(root, "", "version", "an integer", Value::as_u64)?;
    if version == 0 || version > u64::from(CURRENT_STATE_VERSION) {
        return Err(SchemaError::UnsupportedVersion(version));
    }

    resource_set(root, "resources")?;
    resource_set(root, "production")?;
    expect(root, "", "activeAdministrationId", "a string", Value::as_str)?;
    for (i, admin) in array(root, "", "administrations")?.iter().enumerate() {
        let path = format!("administrations[{i}].");
        let admin = admin.as_object().ok_or_else(|| SchemaError::WrongType {
            field: format!("administrations[{i}]"),
            expected: "an object",
        })?;
        expect(admin, &path, "id", "a string", Value::as_str)?;
        boolean(admin, &path, "isUnlocked")?;
        for (j, agent) in array(admin, &path, "agents")?.iter().enumerate() {
            let agent_path = format!("{path}agents[{j}].");
            let agent = agent.as_object().ok_or_else(|| SchemaError::WrongType {
                field: format!("{path}agents[{j}]"),
                expected: "an object",
            })?;
            expect(agent, &agent_path, "id", "a string", Value::as_str)?;
            expect(agent, &agent_path, "owned", "a non-negative integer", Value::as_u64)?;
        }
    }

    if version >= 2 {
        let c = object(root, "", "conformite")?;
        number(c, "conformite.", "percentage")?;
        boolean(c, "conformite.", "isUnlocked")?;
        number(c, "conformite.", "highestEverTampons")?;
        number(c, "conformite.", "highestEverFormulaires")?;
        let m = object(root, "", "messageSystem")?;
        resource_set(m, "lastProductionMilestone")?;
    }
    if version >= 3 {
        array(root, "", "journal")?;
        let c = object(root, "", "conformite")?;
        boolean(c, "conformite.", "isActivated")?;
        number(c, "conformite.", "accumulatedFormulaires")?;
    }
    if version >= 4 {
        nullable_number(root, "", "currentStorageCap")?;
        array(root, "", "purchasedStorageUpgrades")?;
    }
    if version >= 5 {
        expect(root, "", "paperclips", "a non-negative integer", Value::as_u64)?;
        number(root, "", "totalAdministrativeValue")?;
        boolean(root, "", "prestigeInProgress")?;
        let tier = expect(root, "", "currentTier", "a string", Value::as_str)?;
        if !TIERS.contains(&tier) {
            return Err(SchemaError::InvalidEnum {
                field: "currentTier".into(),
                value: tier.to_string(),
            });
        }
    }
    if version == 5 {
        object(root, "", "prestigeUpgrades")?;
    }
    if version >= 6 {
        array(root, "", "activePrestigeUpgrades")?;
    }
    Ok(())
}
