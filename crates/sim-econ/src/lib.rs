//! Game economy: production math and player actions for the bureaucracy idle engine.
//!
//! This crate provides pure functions over [`sim_core::GameState`]:
//! - Production rates with local-then-global bonus ordering
//! - Escalated purchase costs and atomic purchase transactions
//! - The storage cap ladder and the conformité state machine
//! - Prestige reward math, the paperclip shop and the reset
//! - Per-tick deltas, milestones and random journal messages

pub mod conformite;
pub mod economy;
pub mod error;
pub mod messages;
pub mod prestige;
pub mod production;
pub mod storage;
pub mod tick;

pub use economy::{
    administration_views, can_afford, escalated_amount, escalated_cost, purchase_agent,
    set_active_administration, tap, unlock_administration, AdministrationView, AgentView,
};
pub use error::ActionError;
pub use messages::Milestone;
pub use prestige::{
    buy_prestige_upgrade, pending_reward, potential, reset_state, reward, PrestigePotential,
};
pub use production::compute_production;
pub use storage::{apply_cap, buy_storage_upgrade, effective_cap, is_blocked};
pub use tick::{compute_tick, TickDelta};
