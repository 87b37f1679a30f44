//! State-owning engine: loads and recovers the save, runs ticks, applies
//! player actions and drives the prestige transaction.

use crate::clock::Clock;
use crate::hook::{LogHook, NotificationHook};
use crate::view::EngineSnapshot;
use chrono::{DateTime, Duration, Utc};
use persistence::transaction::{clear_record, read_record, write_record};
use persistence::{
    encode_state, load_state, plan_recovery, save_state, KeyValueStore, LoadOutcome,
    PrestigeTransactionRecord, RecoveryPlan, StoreError, TransactionPhase,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_core::{Catalog, GameState, JournalEntry, ResourceSet, SimConfig};
use sim_econ::economy::tap;
use sim_econ::{
    administration_views, buy_prestige_upgrade, buy_storage_upgrade, compute_production,
    compute_tick, pending_reward, purchase_agent, reset_state, set_active_administration,
    unlock_administration, ActionError, AdministrationView, Milestone,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one game-loop step.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub elapsed_secs: f64,
    pub produced: ResourceSet,
    pub milestones: Vec<Milestone>,
    pub journal_added: usize,
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

pub struct Engine<S, C> {
    catalog: Arc<Catalog>,
    config: SimConfig,
    store: S,
    clock: C,
    state: GameState,
    /// Cleared whenever the roster or the active prestige upgrades change.
    production: Option<ResourceSet>,
    rng: ChaCha8Rng,
    hook: Box<dyn NotificationHook>,
    last_tick: DateTime<Utc>,
    last_save: Option<DateTime<Utc>>,
    phase: TransactionPhase,
}

impl<S: KeyValueStore, C: Clock> Engine<S, C> {
    /// Wrap an already loaded state. No recovery is performed.
    pub fn new(catalog: Arc<Catalog>, config: SimConfig, store: S, clock: C, mut state: GameState) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let now = clock.now();
        state.last_timestamp = Some(now);
        Engine {
            catalog,
            config,
            store,
            clock,
            state,
            production: None,
            rng,
            hook: Box::new(LogHook),
            last_tick: now,
            last_save: None,
            phase: TransactionPhase::Idle,
        }
    }

    /// Load the save, resolve an interrupted prestige and start the clock.
    /// Time spent offline is not simulated.
    pub async fn load(catalog: Arc<Catalog>, config: SimConfig, store: S, clock: C) -> Self {
        let (state, outcome) = load_state(&store, &config.state_key, &catalog).await;
        match &outcome {
            LoadOutcome::Fresh => info!("no save found, starting fresh"),
            LoadOutcome::Loaded(report) => info!(version = report.final_version, "save loaded"),
            LoadOutcome::FellBack(reason) => warn!(reason = %reason, "save discarded"),
        }
        let mut engine = Engine::new(catalog, config, store, clock, state);
        engine.recover().await;
        engine
    }

    async fn recover(&mut self) {
        let record = match read_record(&self.store, &self.config.transaction_key).await {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "transaction record unreadable, skipping recovery");
                return;
            }
        };
        let timeout = millis(self.config.transaction_timeout_secs.saturating_mul(1_000));
        let plan = plan_recovery(record, self.state.prestige_in_progress, self.clock.now(), timeout);
        match plan {
            RecoveryPlan::Nothing => return,
            RecoveryPlan::Complete(record) => {
                let mut next = reset_state(&self.catalog, &self.state);
                next.paperclips = record.credited_balance();
                next.prestige_in_progress = false;
                self.state = next;
                self.production = None;
                info!(reward = record.reward, paperclips = self.state.paperclips, "interrupted prestige completed");
            }
            RecoveryPlan::DiscardStale => {
                self.state.prestige_in_progress = false;
                warn!("stale prestige transaction discarded");
            }
            RecoveryPlan::DiscardOrphan => {
                info!("orphan prestige transaction discarded");
            }
            RecoveryPlan::ClearFlag => {
                self.state.prestige_in_progress = false;
                info!("prestige flag cleared");
            }
        }
        // State first: once it is durable the record has nothing left to say.
        if let Err(err) = self.save_now().await {
            warn!(error = %err, "state save after recovery failed, keeping record");
            return;
        }
        if let Err(err) = clear_record(&self.store, &self.config.transaction_key).await {
            warn!(error = %err, "transaction record removal failed");
        }
    }

    pub fn set_hook(&mut self, hook: impl NotificationHook + 'static) {
        self.hook = Box::new(hook);
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    pub fn production(&mut self) -> ResourceSet {
        let (catalog, state) = (&self.catalog, &self.state);
        *self
            .production
            .get_or_insert_with(|| compute_production(catalog, &state.administrations, &state.active_prestige_upgrades))
    }

    /// Advance by the wall time elapsed since the previous tick.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let elapsed_secs = (now - self.last_tick).num_milliseconds() as f64 / 1_000.0;
        let production = self.production();
        let delta = compute_tick(&self.catalog, &self.state, production, elapsed_secs, now, &mut self.rng);
        if !delta.milestones.is_empty() {
            self.hook.on_milestones(&delta.milestones);
        }
        let report = TickReport {
            elapsed_secs,
            produced: delta.produced,
            milestones: delta.milestones.clone(),
            journal_added: delta.journal_entries.len(),
        };
        delta.apply(&mut self.state);
        self.last_tick = now;
        report
    }

    fn commit(&mut self, action: &'static str, result: Result<GameState, ActionError>, roster: bool) -> bool {
        match result {
            Ok(next) => {
                self.state = next;
                if roster {
                    self.production = None;
                }
                true
            }
            Err(err) => {
                debug!(action, reason = %err, "action rejected");
                false
            }
        }
    }

    pub fn buy_agent(&mut self, administration_id: &str, agent_id: &str) -> bool {
        let result = purchase_agent(&self.catalog, &self.state, administration_id, agent_id);
        self.commit("buy_agent", result, true)
    }

    pub fn unlock_administration(&mut self, administration_id: &str) -> bool {
        let result = unlock_administration(&self.catalog, &self.state, administration_id);
        let ok = self.commit("unlock_administration", result, true);
        if ok {
            info!(administration = administration_id, "administration unlocked");
        }
        ok
    }

    pub fn set_active_administration(&mut self, administration_id: &str) -> bool {
        let result = set_active_administration(&self.state, administration_id);
        self.commit("set_active_administration", result, false)
    }

    pub fn buy_storage_upgrade(&mut self, upgrade_id: &str) -> bool {
        let result = buy_storage_upgrade(&self.catalog, &self.state, upgrade_id);
        self.commit("buy_storage_upgrade", result, false)
    }

    pub fn activate_conformite(&mut self) -> bool {
        let result = sim_econ::conformite::activate(&self.state);
        let ok = self.commit("activate_conformite", result, false);
        if ok {
            info!("conformité activated");
        }
        ok
    }

    pub fn run_conformite_test(&mut self) -> bool {
        let result = sim_econ::conformite::run_test(&self.state, self.clock.now());
        self.commit("run_conformite_test", result, false)
    }

    pub fn buy_prestige_upgrade(&mut self, upgrade_id: &str) -> bool {
        let result = buy_prestige_upgrade(&self.catalog, &self.state, upgrade_id);
        self.commit("buy_prestige_upgrade", result, true)
    }

    pub fn tap(&mut self) {
        self.state = tap(&self.catalog, &self.state);
    }

    /// Reset the run for paperclips. The record is written before the state
    /// is touched and removed only once the reset state is durable. If the
    /// reset state cannot be saved the run is restored and `false` returned.
    pub async fn perform_prestige(&mut self) -> bool {
        let reward = match pending_reward(&self.state) {
            Ok(reward) => reward,
            Err(err) => {
                debug!(action = "perform_prestige", reason = %err, "action rejected");
                return false;
            }
        };
        let record = PrestigeTransactionRecord {
            timestamp: self.clock.now(),
            reward,
            paperclips_before: self.state.paperclips,
            total_administrative_value_before: self.state.total_administrative_value,
            tier: self.state.current_tier,
        };
        if let Err(err) = write_record(&self.store, &self.config.transaction_key, &record).await {
            warn!(error = %err, "prestige aborted, record not written");
            return false;
        }
        self.phase = self.phase.advance();
        info!(reward, phase = ?self.phase, "prestige started");

        let mut next = reset_state(&self.catalog, &self.state);
        next.paperclips = record.credited_balance();
        next.prestige_in_progress = true;
        let before = std::mem::replace(&mut self.state, next);
        self.production = None;
        if let Err(err) = self.save_now().await {
            warn!(error = %err, "reset state not saved, prestige rolled back");
            self.state = before;
            self.phase = TransactionPhase::Idle;
            // A record left behind without the flag is dropped at next load.
            if let Err(err) = clear_record(&self.store, &self.config.transaction_key).await {
                warn!(error = %err, "transaction record removal failed");
            }
            return false;
        }
        self.phase = self.phase.advance();
        info!(phase = ?self.phase, "prestige state saved");

        if let Err(err) = clear_record(&self.store, &self.config.transaction_key).await {
            warn!(error = %err, "transaction record removal failed");
        }
        self.phase = self.phase.advance();
        self.state.prestige_in_progress = false;
        if let Err(err) = self.save_now().await {
            warn!(error = %err, "prestige flag not persisted");
        }
        info!(paperclips = self.state.paperclips, "prestige committed");
        self.phase = self.phase.advance();
        true
    }

    /// Write the state now, ignoring the save window.
    pub async fn save_now(&mut self) -> Result<(), StoreError> {
        save_state(&self.store, &self.config.state_key, &self.state).await?;
        self.last_save = Some(self.clock.now());
        Ok(())
    }

    /// Encoded state, at most once per `save_debounce_ms` window. Writes are
    /// throttled, not delayed until activity stops.
    pub fn take_save_payload(&mut self) -> Option<String> {
        let now = self.clock.now();
        let window = millis(self.config.save_debounce_ms);
        if self.last_save.is_some_and(|last| now - last < window) {
            return None;
        }
        match encode_state(&self.state) {
            Ok(payload) => {
                self.last_save = Some(now);
                Some(payload)
            }
            Err(err) => {
                warn!(error = %err, "state encoding failed");
                None
            }
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::build(&self.catalog, &self.state)
    }

    pub fn administrations(&self) -> Vec<AdministrationView> {
        administration_views(&self.catalog, &self.state)
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.state.journal
    }
}
