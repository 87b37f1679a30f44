//! Production milestones and the random S.I.C. / non-conformity messages.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use sim_core::{
    Catalog, GameState, JournalEntry, JournalEntryType, NarrativeHintDef, ResourceKind,
    ResourceSet, CONFORMITE_HINT_TARGET,
};

/// Stock step between two milestones of each resource.
pub fn milestone_threshold(kind: ResourceKind) -> f64 {
    match kind {
        ResourceKind::Dossiers => 100.0,
        ResourceKind::Tampons => 50.0,
        ResourceKind::Formulaires => 25.0,
    }
}

const SIC_BASE_PROBABILITY: f64 = 0.125;
const SIC_BOOSTED_PROBABILITY: f64 = 0.20;
const SIC_COOLDOWN_SECS: i64 = 120;
const SIC_BOOST_AFTER_SECS: i64 = 1_800;
const NON_CONFORMITY_PROBABILITY: f64 = 0.002;
const NON_CONFORMITY_RATE_LIMIT_SECS: i64 = 600;

/// A resource stock entering a new milestone bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub kind: ResourceKind,
    /// Lower bound of the bucket just reached.
    pub reached: f64,
}

pub fn has_crossed_milestone(current: f64, last: f64, threshold: f64) -> bool {
    (current / threshold).floor() > (last / threshold).floor()
}

/// Milestones crossed between two observations of the stock.
pub fn crossed_milestones(last: &ResourceSet, current: &ResourceSet) -> Vec<Milestone> {
    ResourceKind::ALL
        .iter()
        .filter_map(|&kind| {
            let threshold = milestone_threshold(kind);
            has_crossed_milestone(current.get(kind), last.get(kind), threshold).then(|| Milestone {
                kind,
                reached: (current.get(kind) / threshold).floor() * threshold,
            })
        })
        .collect()
}

/// Chance that a milestone produces a S.I.C. message.
pub fn sic_probability(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(last) = last else {
        return SIC_BASE_PROBABILITY;
    };
    let since = now - last;
    if since < Duration::seconds(SIC_COOLDOWN_SECS) {
        0.0
    } else if since > Duration::seconds(SIC_BOOST_AFTER_SECS) {
        SIC_BOOSTED_PROBABILITY
    } else {
        SIC_BASE_PROBABILITY
    }
}

pub fn roll_sic<R: Rng + ?Sized>(rng: &mut R, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let p = sic_probability(last, now);
    p > 0.0 && rng.gen::<f64>() < p
}

pub fn roll_non_conformity<R: Rng + ?Sized>(
    rng: &mut R,
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if last.is_some_and(|last| now - last < Duration::seconds(NON_CONFORMITY_RATE_LIMIT_SECS)) {
        return false;
    }
    rng.gen::<f64>() < NON_CONFORMITY_PROBABILITY
}

fn hint_target_reached(state: &GameState, target_id: &str) -> bool {
    if target_id == CONFORMITE_HINT_TARGET {
        state.conformite.is_activated
    } else {
        state.is_unlocked(target_id)
    }
}

/// First catalog hint whose target is still out of reach and that the
/// journal does not already hold.
pub fn pending_hint<'c>(catalog: &'c Catalog, state: &GameState) -> Option<&'c NarrativeHintDef> {
    catalog.narrative_hints.iter().find(|def| {
        !hint_target_reached(state, &def.target_id)
            && !state
                .journal
                .iter()
                .any(|e| e.hint.as_ref().is_some_and(|h| h.target_id == def.target_id))
    })
}

/// Journal additions and cooldown updates produced by one evaluation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageOutcome {
    pub entries: Vec<JournalEntry>,
    pub sic_triggered: bool,
    pub non_conformity_triggered: bool,
}

fn entry_id(entry_type: JournalEntryType, now: DateTime<Utc>, index: usize) -> String {
    let tag = match entry_type {
        JournalEntryType::Sic => "sic",
        JournalEntryType::NonConformity => "non-conformity",
        JournalEntryType::NarrativeHint => "narrative-hint",
        JournalEntryType::System => "system",
    };
    format!("{tag}-{}-{index}", now.timestamp_millis())
}

/// Roll the message triggers for a tick that crossed `milestones`.
pub fn evaluate_messages<R: Rng + ?Sized>(
    catalog: &Catalog,
    state: &GameState,
    milestones: &[Milestone],
    now: DateTime<Utc>,
    rng: &mut R,
) -> MessageOutcome {
    let mut out = MessageOutcome::default();
    if milestones.is_empty() {
        return out;
    }
    let base_index = state.journal.len();

    if roll_sic(rng, state.message_system.sic_last_trigger_time, now) {
        if let Some(text) = catalog.sic_messages.choose(rng) {
            out.entries.push(JournalEntry::message(
                entry_id(JournalEntryType::Sic, now, base_index + out.entries.len()),
                JournalEntryType::Sic,
                text.clone(),
                now,
            ));
            out.sic_triggered = true;
        }
        if let Some(def) = pending_hint(catalog, state) {
            out.entries.push(JournalEntry::hint(
                entry_id(JournalEntryType::NarrativeHint, now, base_index + out.entries.len()),
                def.target_id.clone(),
                def.redacted_text.clone(),
                def.full_text.clone(),
                now,
            ));
        }
    }

    if roll_non_conformity(rng, state.message_system.non_conformity_last_trigger_time, now) {
        if let Some(text) = catalog.non_conformity_messages.choose(rng) {
            out.entries.push(JournalEntry::message(
                entry_id(JournalEntryType::NonConformity, now, base_index + out.entries.len()),
                JournalEntryType::NonConformity,
                text.clone(),
                now,
            ));
            out.non_conformity_triggered = true;
        }
    }
    out
}
