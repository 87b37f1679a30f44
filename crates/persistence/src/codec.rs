//! Encoding of the game state blob and the load pipeline:
//! parse -> migrate -> structural check -> decode -> invariant check.

use crate::migrate::{migrate_to_current, MigrationError, MigrationReport};
use crate::schema::{validate_structure, SchemaError};
use crate::store::{KeyValueStore, StoreError};
use serde_json::Value;
use sim_core::{validate_state, Catalog, GameState, ValidationError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("parse error: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] MigrationError),
    #[error("malformed save: {0}")]
    Schema(#[from] SchemaError),
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid state: {0}")]
    Invalid(#[from] ValidationError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// How a load ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing stored yet.
    Fresh,
    /// Decoded, possibly after migration.
    Loaded(MigrationReport),
    /// The stored blob was rejected; a fresh state was used instead.
    FellBack(String),
}

pub fn encode_state(state: &GameState) -> Result<String, serde_json::Error> {
    serde_json::to_string(state)
}

/// Decode a stored blob of any supported version.
pub fn decode_state(raw: &str, catalog: &Catalog) -> Result<(GameState, MigrationReport), LoadError> {
    let mut value: Value = serde_json::from_str(raw).map_err(LoadError::Parse)?;
    let report = migrate_to_current(&mut value)?;
    validate_structure(&value)?;
    let mut state: GameState = serde_json::from_value(value).map_err(LoadError::Decode)?;
    validate_state(&state, catalog)?;
    state.fill_missing(catalog);
    Ok((state, report))
}

/// Decode `raw`, falling back to a fresh state on any failure.
pub fn decode_or_default(raw: Option<&str>, catalog: &Catalog) -> (GameState, LoadOutcome) {
    let Some(raw) = raw else {
        return (GameState::new(catalog), LoadOutcome::Fresh);
    };
    match decode_state(raw, catalog) {
        Ok((state, report)) => {
            if report.steps_applied() > 0 {
                info!(
                    from = report.original_version,
                    to = report.final_version,
                    "save migrated"
                );
            }
            (state, LoadOutcome::Loaded(report))
        }
        Err(err) => {
            warn!(error = %err, "stored state rejected, starting fresh");
            (GameState::new(catalog), LoadOutcome::FellBack(err.to_string()))
        }
    }
}

/// Read and decode the blob under `key`. Store errors also fall back.
pub async fn load_state<S: KeyValueStore>(store: &S, key: &str, catalog: &Catalog) -> (GameState, LoadOutcome) {
    match store.get(key).await {
        Ok(raw) => decode_or_default(raw.as_deref(), catalog),
        Err(err) => {
            warn!(error = %err, key, "state read failed, starting fresh");
            (GameState::new(catalog), LoadOutcome::FellBack(err.to_string()))
        }
    }
}

pub async fn save_state<S: KeyValueStore>(store: &S, key: &str, state: &GameState) -> Result<(), StoreError> {
    let raw = encode_state(state)?;
    store.set(key, &raw).await
}
