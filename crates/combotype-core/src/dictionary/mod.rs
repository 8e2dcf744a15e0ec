// Combotype Trigger Dictionary
// Read-mostly keyword set, swapped atomically on rebuild

pub mod entry;
pub mod snapshot;

pub use entry::{is_word_boundary, ComboId, MatchMode, MatchResult, TriggerEntry};
pub use snapshot::{DictionarySnapshot, MAX_KEYWORD_CHARS};

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;

/// Errors rejecting a rebuild. The previous snapshot stays active.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DictionaryError {
    #[error("Empty keyword for combo {combo}")]
    EmptyKeyword { combo: ComboId },

    #[error("Keyword {keyword:?} contains control character U+{code:04X}")]
    ControlCharacter { keyword: String, code: u32 },

    #[error("Keyword {keyword:?} is longer than {max} characters")]
    KeywordTooLong { keyword: String, max: usize },
}

/// Trigger keywords shared between the hook thread and configuration.
///
/// Readers load the current [`DictionarySnapshot`] without waiting; a
/// rebuild builds a complete new snapshot and swaps it in, so no reader
/// ever sees a partially replaced entry set.
pub struct TriggerDictionary {
    snap: ArcSwap<DictionarySnapshot>,
    /// Serializes rebuilds and holds the last published generation
    writer: Mutex<u64>,
}

impl TriggerDictionary {
    pub fn new() -> Self {
        Self {
            snap: ArcSwap::from_pointee(DictionarySnapshot::empty()),
            writer: Mutex::new(0),
        }
    }

    pub fn with_entries<I>(entries: I) -> Result<Self, DictionaryError>
    where
        I: IntoIterator<Item = TriggerEntry>,
    {
        let dictionary = Self::new();
        dictionary.rebuild(entries)?;
        Ok(dictionary)
    }

    /// Replace the whole entry set. Returns the number of entries now active.
    pub fn rebuild<I>(&self, entries: I) -> Result<usize, DictionaryError>
    where
        I: IntoIterator<Item = TriggerEntry>,
    {
        let mut generation = self.writer.lock();
        let next = DictionarySnapshot::build(entries, *generation + 1)?;
        let count = next.len();

        *generation = next.generation();
        self.snap.store(Arc::new(next));
        log::info!(
            "Trigger dictionary rebuilt: {} entries (generation {})",
            count,
            *generation
        );
        Ok(count)
    }

    /// Current snapshot, for one short read
    #[inline]
    pub fn load(&self) -> Guard<Arc<DictionarySnapshot>> {
        self.snap.load()
    }

    /// Current snapshot, owned
    pub fn snapshot(&self) -> Arc<DictionarySnapshot> {
        self.snap.load_full()
    }

    /// Rolling buffer bound of the current snapshot, boundary slots included.
    /// See [`DictionarySnapshot::longest_keyword_len`].
    pub fn longest_keyword_len(&self) -> usize {
        self.snap.load().longest_keyword_len()
    }

    pub fn match_suffix(&self, text: &[char], head_truncated: bool) -> Option<MatchResult> {
        self.snap.load().match_suffix(text, head_truncated)
    }

    pub fn live_prefix(&self, text: &[char], head_truncated: bool) -> Option<MatchResult> {
        self.snap.load().live_prefix(text, head_truncated)
    }

    pub fn len(&self) -> usize {
        self.snap.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snap.load().is_empty()
    }
}

impl Default for TriggerDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TriggerDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snap = self.snap.load();
        f.debug_struct("TriggerDictionary")
            .field("generation", &snap.generation())
            .field("entries", &snap.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_keyword_len_counts_boundary_slots() {
        let dictionary =
            TriggerDictionary::with_entries(vec![TriggerEntry::new("sig", "signature")]).unwrap();
        assert_eq!(dictionary.longest_keyword_len(), 3);

        dictionary
            .rebuild(vec![TriggerEntry::new("sig", "signature").with_mode(MatchMode::word())])
            .unwrap();
        assert_eq!(dictionary.longest_keyword_len(), 4);

        dictionary
            .rebuild(vec![TriggerEntry::new("sig", "signature")
                .with_mode(MatchMode::word().with_boundary_after(true))])
            .unwrap();
        assert_eq!(dictionary.longest_keyword_len(), 5);
    }

    #[test]
    fn test_rebuild_replaces_everything() {
        let dictionary = TriggerDictionary::with_entries(vec![
            TriggerEntry::new("btw", "by-the-way"),
            TriggerEntry::new("omw", "on-my-way"),
        ])
        .unwrap();
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary.longest_keyword_len(), 3);

        assert_eq!(dictionary.rebuild(vec![TriggerEntry::new("wxyz", "w")]), Ok(1));
        assert_eq!(dictionary.longest_keyword_len(), 4);
        let text: Vec<char> = "btw".chars().collect();
        assert!(dictionary.match_suffix(&text, false).is_none());
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_snapshot() {
        let dictionary =
            TriggerDictionary::with_entries(vec![TriggerEntry::new("btw", "by-the-way")]).unwrap();
        let before = dictionary.snapshot();

        let result = dictionary.rebuild(vec![
            TriggerEntry::new("ok", "fine"),
            TriggerEntry::new("", "broken"),
        ]);
        assert!(matches!(result, Err(DictionaryError::EmptyKeyword { .. })));

        let after = dictionary.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.generation(), 1);
    }

    #[test]
    fn test_held_snapshot_outlives_rebuild() {
        let dictionary =
            TriggerDictionary::with_entries(vec![TriggerEntry::new("btw", "by-the-way")]).unwrap();
        let held = dictionary.snapshot();

        dictionary.rebuild(Vec::new()).unwrap();
        assert!(dictionary.is_empty());

        let text: Vec<char> = "btw".chars().collect();
        assert!(held.match_suffix(&text, false).is_some());
        assert_eq!(held.generation() + 1, dictionary.load().generation());
    }

    #[test]
    fn test_error_messages() {
        let err = DictionaryError::ControlCharacter {
            keyword: "a\u{1b}".to_string(),
            code: 0x1b,
        };
        assert_eq!(
            err.to_string(),
            "Keyword \"a\\u{1b}\" contains control character U+001B"
        );
    }
}
