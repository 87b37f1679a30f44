//! Headless driver: fast-forwards a save in SQLite and prints a KPI line.
//! `--auto-buy` spends the ledger each tick, `--tap` taps once per tick.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use persistence::{default_sqlite_url, SqliteStore};
use sim_core::{Catalog, SimConfig};
use sim_econ::economy::{cheapest_affordable_agent, next_affordable_unlock};
use sim_runtime::{Clock, Engine, ManualClock};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    db: Option<String>,
    config: Option<String>,
    seconds: u64,
    auto_buy: bool,
    tap: bool,
    prestige: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--db" => args.db = it.next(),
            "--config" => args.config = it.next(),
            "--seconds" => args.seconds = it.next().and_then(|s| s.parse().ok()).unwrap_or(0),
            "--auto-buy" => args.auto_buy = true,
            "--tap" => args.tap = true,
            "--prestige" => args.prestige = true,
            _ => {}
        }
    }
    args
}

fn load_config(path: Option<&str>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {path}"))
}

/// Spend everything the ledger allows: unlocks first, then the cheapest agents.
fn auto_buy<C: Clock>(engine: &mut Engine<SqliteStore, C>) -> usize {
    let mut bought = 0;
    while let Some(id) = next_affordable_unlock(engine.catalog(), engine.state()) {
        if !engine.unlock_administration(&id) {
            break;
        }
        bought += 1;
    }
    for upgrade in engine.snapshot().storage.visible_upgrades {
        if engine.buy_storage_upgrade(&upgrade) {
            bought += 1;
        }
    }
    if engine.snapshot().conformite.can_activate && engine.activate_conformite() {
        bought += 1;
    }
    while let Some((zone, agent)) = cheapest_affordable_agent(engine.catalog(), engine.state()) {
        if !engine.buy_agent(&zone, &agent) {
            break;
        }
        bought += 1;
    }
    bought
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(?args, "starting CLI");
    let config = load_config(args.config.as_deref())?;
    let url = args.db.clone().unwrap_or_else(|| default_sqlite_url().to_string());
    let store = SqliteStore::connect(&url)
        .await
        .with_context(|| format!("opening {url}"))?;

    let clock = ManualClock::new(Utc::now());
    let step = Duration::milliseconds(i64::try_from(config.tick_interval_ms.max(1)).unwrap_or(100));
    let steps = args.seconds.saturating_mul(1_000) / config.tick_interval_ms.max(1);
    let mut engine = Engine::load(Arc::new(Catalog::standard()), config, store.clone(), clock.clone()).await;

    let mut purchases = 0;
    let mut milestones = 0;
    for _ in 0..steps {
        clock.advance(step);
        if args.tap {
            engine.tap();
        }
        milestones += engine.tick().milestones.len();
        if args.auto_buy {
            purchases += auto_buy(&mut engine);
        }
    }
    let prestiged = args.prestige && engine.perform_prestige().await;
    engine.save_now().await.context("saving state")?;

    let snap = engine.snapshot();
    let owned: u32 = engine
        .state()
        .administrations
        .iter()
        .flat_map(|z| z.agents.iter().map(|a| a.owned))
        .sum();
    println!(
        "KPI | seconds: {} | dossiers: {:.0} | tampons: {:.0} | formulaires: {:.0} | rate: {:.2}/{:.2}/{:.2} | agents: {} | bought: {} | milestones: {} | conformité: {:.0}% | value: {:.0} | paperclips: {}{}",
        args.seconds,
        snap.resources.dossiers,
        snap.resources.tampons,
        snap.resources.formulaires,
        snap.production.dossiers,
        snap.production.tampons,
        snap.production.formulaires,
        owned,
        purchases,
        milestones,
        snap.conformite.percentage,
        snap.prestige.current_value,
        snap.paperclips,
        if prestiged { " | prestiged" } else { "" },
    );
    store.close().await;
    Ok(())
}
