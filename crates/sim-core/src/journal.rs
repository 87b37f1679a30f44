//! Append-only S.I.C. journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of retained entries; older ones are evicted first.
pub const JOURNAL_CAPACITY: usize = 500;

/// Category of a journal entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JournalEntryType {
    Sic,
    NonConformity,
    NarrativeHint,
    System,
}

/// Extra payload of a narrative hint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeHint {
    pub is_revealed: bool,
    pub redacted_text: String,
    pub full_text: String,
    /// Administration id (or "conformite") whose unlock reveals the hint.
    pub target_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: JournalEntryType,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<NarrativeHint>,
}

impl JournalEntry {
    /// A plain (non-hint) entry.
    pub fn message(
        id: impl Into<String>,
        entry_type: JournalEntryType,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            entry_type,
            text: text.into(),
            timestamp,
            hint: None,
        }
    }

    /// A redacted narrative hint.
    pub fn hint(
        id: impl Into<String>,
        target_id: impl Into<String>,
        redacted_text: impl Into<String>,
        full_text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let redacted_text = redacted_text.into();
        Self {
            id: id.into(),
            entry_type: JournalEntryType::NarrativeHint,
            text: redacted_text.clone(),
            timestamp,
            hint: Some(NarrativeHint {
                is_revealed: false,
                redacted_text,
                full_text: full_text.into(),
                target_id: target_id.into(),
            }),
        }
    }

    /// Flip a redacted hint to its full text. Returns true when something changed.
    pub fn reveal(&mut self) -> bool {
        match self.hint.as_mut() {
            Some(h) if !h.is_revealed => {
                h.is_revealed = true;
                self.text = h.full_text.clone();
                true
            }
            _ => false,
        }
    }
}

/// Append entries, evicting the oldest beyond [`JOURNAL_CAPACITY`].
pub fn append_capped(journal: &mut Vec<JournalEntry>, entries: impl IntoIterator<Item = JournalEntry>) {
    journal.extend(entries);
    if journal.len() > JOURNAL_CAPACITY {
        let excess = journal.len() - JOURNAL_CAPACITY;
        journal.drain(..excess);
    }
}

/// Reveal every hint tied to `target_id`. Returns the number revealed.
pub fn reveal_hints(journal: &mut [JournalEntry], target_id: &str) -> usize {
    journal
        .iter_mut()
        .filter(|e| e.hint.as_ref().is_some_and(|h| h.target_id == target_id))
        .map(|e| e.reveal())
        .filter(|changed| *changed)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn fifo_eviction_keeps_newest() {
        let mut journal = Vec::new();
        let entries = (0..JOURNAL_CAPACITY + 7)
            .map(|i| JournalEntry::message(format!("e{i}"), JournalEntryType::Sic, "x", at(i as i64)));
        append_capped(&mut journal, entries);
        assert_eq!(journal.len(), JOURNAL_CAPACITY);
        assert_eq!(journal[0].id, "e7");
        assert_eq!(journal.last().unwrap().id, format!("e{}", JOURNAL_CAPACITY + 6));
    }

    #[test]
    fn reveal_is_one_way_and_targeted() {
        let mut journal = vec![
            JournalEntry::hint("h1", "service-tampons", "██", "full one", at(1)),
            JournalEntry::hint("h2", "conformite", "██", "full two", at(2)),
        ];
        assert_eq!(reveal_hints(&mut journal, "service-tampons"), 1);
        assert_eq!(journal[0].text, "full one");
        assert!(journal[0].hint.as_ref().unwrap().is_revealed);
        assert_eq!(journal[1].text, "██");
        assert_eq!(reveal_hints(&mut journal, "service-tampons"), 0);
    }

    #[test]
    fn wire_shape_matches_saved_journals() {
        let e = JournalEntry::message("a", JournalEntryType::NonConformity, "t", at(1_700_000_000_000));
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "non-conformity");
        assert_eq!(v["timestamp"], 1_700_000_000_000i64);
        assert!(v.get("hint").is_none());
    }
}
