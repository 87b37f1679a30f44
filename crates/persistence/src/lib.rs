//! Persistence layer: key-value stores, the save codec, the version
//! migration chain and the prestige transaction record.

pub mod codec;
pub mod migrate;
pub mod schema;
pub mod sqlite;
pub mod store;
pub mod transaction;

pub use codec::{decode_or_default, decode_state, encode_state, load_state, save_state, LoadError, LoadOutcome};
pub use migrate::{build_migration_registry, migrate_to_current, MigrationError, MigrationReport};
pub use schema::{validate_structure, SchemaError};
pub use sqlite::{default_sqlite_url, SqliteStore};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use transaction::{plan_recovery, PrestigeTransactionRecord, RecoveryPlan, TransactionPhase};
