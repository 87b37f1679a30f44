use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use persistence::MemoryStore;
use sim_core::{Catalog, GameState, SimConfig};
use sim_runtime::{Engine, ManualClock};
use std::sync::Arc;

fn bench_ticks(c: &mut Criterion) {
    let catalog = Arc::new(Catalog::standard());
    let mut state = GameState::new(&catalog);
    for zone in &mut state.administrations {
        zone.is_unlocked = true;
    }
    for def in &catalog.administrations {
        for agent in &def.agents {
            if let Some(zone) = state.administration_mut(&def.id) {
                zone.agent_mut(&agent.id).owned = agent.max_owned.unwrap_or(40);
            }
        }
    }
    let clock = ManualClock::new(Utc::now());
    let config = SimConfig {
        rng_seed: Some(42),
        ..SimConfig::default()
    };
    let mut engine = Engine::new(catalog, config, MemoryStore::new(), clock.clone(), state);

    c.bench_function("engine_tick_100ms", |b| {
        b.iter(|| {
            clock.advance(Duration::milliseconds(100));
            engine.tick()
        })
    });
    c.bench_function("engine_buy_and_tick", |b| {
        b.iter(|| {
            engine.tap();
            let first = engine.catalog().first_administration_id().to_string();
            engine.buy_agent(&first, "stagiaire-administratif");
            clock.advance(Duration::milliseconds(100));
            engine.tick()
        })
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
