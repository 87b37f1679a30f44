//! Prestige transaction record and its recovery decision.
//!
//! A prestige reset writes this record under its own key before touching the
//! main state, and deletes it once the reset state is durable. Whatever is
//! found at startup tells how far an interrupted reset got.

use crate::store::{KeyValueStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sim_core::Tier;
use tracing::warn;

/// Durable log written before a prestige reset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrestigeTransactionRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Paperclips granted by this reset.
    pub reward: u64,
    /// Balance before the credit. Recovery sets `paperclips_before + reward`.
    pub paperclips_before: u64,
    pub total_administrative_value_before: f64,
    pub tier: Tier,
}

impl PrestigeTransactionRecord {
    pub fn credited_balance(&self) -> u64 {
        self.paperclips_before.saturating_add(self.reward)
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

/// Progress of a prestige reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionPhase {
    Idle,
    /// Record durable, main state untouched.
    LogWritten,
    /// Reset state durable, record still present.
    StateReset,
    /// Record deleted.
    Committed,
}

impl TransactionPhase {
    /// Next phase; `Committed` returns to `Idle`.
    pub fn advance(self) -> Self {
        match self {
            TransactionPhase::Idle => TransactionPhase::LogWritten,
            TransactionPhase::LogWritten => TransactionPhase::StateReset,
            TransactionPhase::StateReset => TransactionPhase::Committed,
            TransactionPhase::Committed => TransactionPhase::Idle,
        }
    }
}

/// What to do at startup with an interrupted reset.
#[derive(Clone, Debug, PartialEq)]
pub enum RecoveryPlan {
    /// No record, no flag.
    Nothing,
    /// Fresh record with the flag set: credit once, re-apply the reset.
    Complete(PrestigeTransactionRecord),
    /// Record older than the timeout: drop it, clear the flag, keep the state.
    DiscardStale,
    /// Record without the flag: the reset never reached the main state.
    DiscardOrphan,
    /// Flag without a record: the reset committed but the flag was not cleared.
    ClearFlag,
}

pub fn plan_recovery(
    record: Option<PrestigeTransactionRecord>,
    in_progress: bool,
    now: DateTime<Utc>,
    timeout: Duration,
) -> RecoveryPlan {
    match (record, in_progress) {
        (None, false) => RecoveryPlan::Nothing,
        (None, true) => RecoveryPlan::ClearFlag,
        (Some(_), false) => RecoveryPlan::DiscardOrphan,
        (Some(record), true) if record.age(now) <= timeout => RecoveryPlan::Complete(record),
        (Some(_), true) => RecoveryPlan::DiscardStale,
    }
}

pub async fn write_record<S: KeyValueStore>(
    store: &S,
    key: &str,
    record: &PrestigeTransactionRecord,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(record)?;
    store.set(key, &raw).await
}

/// Read the record. An unreadable record is treated as absent.
pub async fn read_record<S: KeyValueStore>(
    store: &S,
    key: &str,
) -> Result<Option<PrestigeTransactionRecord>, StoreError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(record) => Ok(Some(record)),
        Err(err) => {
            warn!(error = %err, "unreadable prestige transaction record");
            Ok(None)
        }
    }
}

pub async fn clear_record<S: KeyValueStore>(store: &S, key: &str) -> Result<(), StoreError> {
    store.remove(key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(at: DateTime<Utc>) -> PrestigeTransactionRecord {
        PrestigeTransactionRecord {
            timestamp: at,
            reward: 15,
            paperclips_before: 4,
            total_administrative_value_before: 250_000.0,
            tier: Tier::Local,
        }
    }

    #[test]
    fn recovery_matrix() {
        let now = Utc::now();
        let timeout = Duration::seconds(30);
        let fresh = record(now - Duration::seconds(5));
        let stale = record(now - Duration::seconds(31));
        assert_eq!(plan_recovery(None, false, now, timeout), RecoveryPlan::Nothing);
        assert_eq!(plan_recovery(None, true, now, timeout), RecoveryPlan::ClearFlag);
        assert_eq!(plan_recovery(Some(fresh.clone()), false, now, timeout), RecoveryPlan::DiscardOrphan);
        assert_eq!(plan_recovery(Some(fresh.clone()), true, now, timeout), RecoveryPlan::Complete(fresh));
        assert_eq!(plan_recovery(Some(stale), true, now, timeout), RecoveryPlan::DiscardStale);
    }

    #[test]
    fn phases_cycle() {
        let mut p = TransactionPhase::Idle;
        for expected in [
            TransactionPhase::LogWritten,
            TransactionPhase::StateReset,
            TransactionPhase::Committed,
            TransactionPhase::Idle,
        ] {
            p = p.advance();
            assert_eq!(p, expected);
        }
    }

    #[tokio::test]
    async fn record_persists_and_clears() {
        let store = MemoryStore::new();
        let r = record(Utc::now());
        write_record(&store, "tx", &r).await.unwrap();
        let back = read_record(&store, "tx").await.unwrap().unwrap();
        assert_eq!(back.reward, 15);
        assert_eq!(back.credited_balance(), 19);
        assert_eq!(back.timestamp.timestamp_millis(), r.timestamp.timestamp_millis());
        clear_record(&store, "tx").await.unwrap();
        assert_eq!(read_record(&store, "tx").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_absent() {
        let store = MemoryStore::new();
        store.set("tx", "{oops").await.unwrap();
        assert_eq!(read_record(&store, "tx").await.unwrap(), None);
    }
}
