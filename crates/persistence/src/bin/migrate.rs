use persistence::{default_sqlite_url, migrate_to_current, validate_structure, KeyValueStore, SqliteStore};
use sim_core::SimConfig;

/// Upgrade the stored save in place to the current schema version.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    let key = SimConfig::default().state_key;
    let store = SqliteStore::connect(&url).await?;

    let Some(raw) = store.get(&key).await? else {
        println!("No save under {key} at {url}");
        return Ok(());
    };
    let mut value: serde_json::Value = serde_json::from_str(&raw)?;
    let report = migrate_to_current(&mut value)?;
    validate_structure(&value)?;
    if report.step_descriptions.is_empty() {
        println!("Save already at v{}", report.final_version);
    } else {
        store.set(&key, &value.to_string()).await?;
        println!(
            "Save migrated v{} -> v{}: {}",
            report.original_version,
            report.final_version,
            report.step_descriptions.join(", ")
        );
    }
    store.close().await;
    Ok(())
}
