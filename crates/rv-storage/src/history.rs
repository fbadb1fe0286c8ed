//! Snapshot history: the last sources the host rendered.

use crate::store::KeyValueStore;
use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;
use rv_core::PreviewError;
use rv_core::PreviewResult;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

pub const SNAPSHOT_LIMIT: usize = 10;
pub const HISTORY_KEY: &str = "html-snapshots";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Milliseconds since the Unix epoch at capture time.
    pub id: i64,
    pub content: String,
    /// ISO-8601, UTC, millisecond precision.
    pub timestamp: String,
}

impl Snapshot {
    pub fn capture(content: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: now.timestamp_millis(),
            content: content.to_owned(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Most-recent-first ring of at most [`SNAPSHOT_LIMIT`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotHistory {
    entries: Vec<Snapshot>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the persisted history. Unreadable or malformed data yields an
    /// empty history.
    pub fn load(store: &KeyValueStore) -> Self {
        let raw = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(error) => {
                warn!(%error, "snapshot history unreadable");
                return Self::new();
            }
        };
        match serde_json::from_str::<Vec<Snapshot>>(&raw) {
            Ok(mut entries) => {
                entries.truncate(SNAPSHOT_LIMIT);
                Self { entries }
            }
            Err(error) => {
                warn!(%error, "snapshot history malformed, starting over");
                Self::new()
            }
        }
    }

    /// Adds `content` at the front. Blank content and repeats of the newest
    /// entry are ignored. Returns whether an entry was added.
    pub fn record(&mut self, content: &str, now: DateTime<Utc>) -> bool {
        if content.trim().is_empty() {
            return false;
        }
        if self
            .entries
            .first()
            .is_some_and(|head| head.content == content)
        {
            return false;
        }
        self.entries.insert(0, Snapshot::capture(content, now));
        self.entries.truncate(SNAPSHOT_LIMIT);
        true
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Byte size of the persisted form.
    pub fn size_bytes(&self) -> usize {
        serde_json::to_string(&self.entries)
            .map(|json| json.len())
            .unwrap_or_default()
    }

    /// Writes the history. When the store is over quota the oldest entries
    /// are dropped until it fits; returns how many were dropped.
    pub fn persist(&mut self, store: &KeyValueStore) -> PreviewResult<usize> {
        let original = self.entries.len();
        loop {
            let json = serde_json::to_string(&self.entries).map_err(|error| {
                PreviewError::new("storage.history_encode", error.to_string())
            })?;
            match store.set(HISTORY_KEY, &json) {
                Ok(()) => break,
                Err(error) if error.code == "storage.quota_exceeded" && !self.entries.is_empty() => {
                    self.entries.pop();
                }
                Err(error) => return Err(error),
            }
        }

        let dropped = original - self.entries.len();
        if dropped > 0 {
            warn!(dropped, "snapshot history trimmed to fit storage quota");
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::HISTORY_KEY;
    use super::SNAPSHOT_LIMIT;
    use super::SnapshotHistory;
    use crate::store::KeyValueStore;
    use crate::test_support::temp_config;
    use chrono::DateTime;
    use chrono::TimeZone;
    use chrono::Utc;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn skips_blank_and_repeated_content() {
        let mut history = SnapshotHistory::new();
        assert!(!history.record("  \n", at(0)));
        assert!(history.record("<p>a</p>", at(1)));
        assert!(!history.record("<p>a</p>", at(2)));
        assert!(history.record("<p>b</p>", at(3)));
        assert!(history.record("<p>a</p>", at(4)));
        let contents: Vec<&str> = history
            .entries()
            .iter()
            .map(|entry| entry.content.as_str())
            .collect();
        assert_eq!(contents, vec!["<p>a</p>", "<p>b</p>", "<p>a</p>"]);
    }

    #[test]
    fn keeps_only_the_newest_entries() {
        let mut history = SnapshotHistory::new();
        for index in 0..15 {
            history.record(&format!("<p>{index}</p>"), at(index));
        }
        assert_eq!(history.len(), SNAPSHOT_LIMIT);
        assert_eq!(history.get(0).map(|entry| entry.content.as_str()), Some("<p>14</p>"));
        assert_eq!(history.get(9).map(|entry| entry.content.as_str()), Some("<p>5</p>"));
    }

    #[test]
    fn timestamps_are_iso_8601_with_millis() {
        let mut history = SnapshotHistory::new();
        history.record("<p>x</p>", at(0));
        let Some(entry) = history.get(0) else {
            panic!("missing entry");
        };
        assert_eq!(entry.timestamp, "2023-11-14T22:13:20.000Z");
        assert_eq!(entry.id, 1_700_000_000_000);
    }

    #[test]
    fn persists_and_reloads() {
        let config = temp_config();
        let store = KeyValueStore::open(&config);
        let mut history = SnapshotHistory::new();
        history.record("<p>one</p>", at(0));
        history.record("<p>two</p>", at(1));
        assert_eq!(history.persist(&store), Ok(0));

        let loaded = SnapshotHistory::load(&store);
        assert_eq!(loaded, history);

        let _ = std::fs::remove_dir_all(&config.root);
    }

    #[test]
    fn over_quota_drops_the_oldest_entries() {
        let config = temp_config().with_quota(400);
        let store = KeyValueStore::open(&config);
        let mut history = SnapshotHistory::new();
        for index in 0..5 {
            history.record(&format!("<p>{}</p>", "x".repeat(60 + index as usize)), at(index));
        }
        let dropped = history.persist(&store).unwrap_or_default();
        assert!(dropped > 0);
        assert!(history.len() < 5);
        assert!(history.size_bytes() + HISTORY_KEY.len() <= 400);
        assert_eq!(SnapshotHistory::load(&store), history);
        assert_eq!(
            history.get(0).map(|entry| entry.content.len()),
            Some("<p></p>".len() + 64)
        );

        let _ = std::fs::remove_dir_all(&config.root);
    }

    #[test]
    fn malformed_history_loads_empty() {
        let config = temp_config();
        let store = KeyValueStore::open(&config);
        assert!(store.set(HISTORY_KEY, "{not json").is_ok());
        assert!(SnapshotHistory::load(&store).is_empty());

        let _ = std::fs::remove_dir_all(&config.root);
    }
}
