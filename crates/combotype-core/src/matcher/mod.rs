// Combotype Incremental Matcher
// Rolling buffer of typed text, checked against the dictionary after every fragment

pub mod buffer;

pub use buffer::RollingBuffer;

use std::sync::Arc;

use strum_macros::{Display, EnumString};

use crate::decode::TextFragment;
use crate::dictionary::{DictionarySnapshot, MatchResult, TriggerDictionary};

/// Why the typed-text context was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum InvalidationReason {
    /// Keyboard focus moved to another window or control
    FocusChange,
    /// Caret movement or leaving the field (arrows, Enter, Escape, Tab)
    Navigation,
    /// Keystroke with Control, Alt or a logo key held
    Shortcut,
    MouseClick,
    MouseWheel,
    /// Backspace when erasing is disabled
    Backspace,
    /// Explicit request, or recovery after a dropped event
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherState {
    /// Buffer empty
    Idle,
    /// Buffer holds text that may still complete a keyword
    Accumulating,
}

/// Matches the tail of the typed text against the trigger dictionary.
///
/// Each fragment is appended, the buffer is trimmed to the longest keyword
/// window of the current snapshot and the snapshot is queried once. A fired
/// match clears the buffer. Reads trim too, so a rebuild that shrinks the
/// dictionary is honoured before the next keystroke.
pub struct IncrementalMatcher {
    dictionary: Arc<TriggerDictionary>,
    buffer: RollingBuffer,
    state: MatcherState,
}

impl IncrementalMatcher {
    pub fn new(dictionary: Arc<TriggerDictionary>) -> Self {
        Self {
            dictionary,
            buffer: RollingBuffer::new(),
            state: MatcherState::Idle,
        }
    }

    pub fn dictionary(&self) -> &Arc<TriggerDictionary> {
        &self.dictionary
    }

    /// Buffered text, trimmed to the current dictionary
    pub fn buffer(&mut self) -> &RollingBuffer {
        let snapshot = self.dictionary.load();
        self.fit(&snapshot);
        &self.buffer
    }

    pub fn state(&self) -> MatcherState {
        self.state
    }

    /// Append a fragment and report a completed keyword, if any
    pub fn feed(&mut self, fragment: &TextFragment) -> Option<MatchResult> {
        if fragment.is_empty() {
            return None;
        }

        // One snapshot for bound and lookup alike
        let snapshot = self.dictionary.load();
        self.buffer
            .append(fragment.chars(), snapshot.longest_keyword_len());
        self.state = if self.buffer.is_empty() {
            MatcherState::Idle
        } else {
            MatcherState::Accumulating
        };

        let found = snapshot.match_suffix(self.buffer.as_slice(), self.buffer.is_truncated())?;
        log::debug!(
            "Matched {} over {:?} (generation {})",
            found.entry,
            found.span,
            snapshot.generation()
        );
        self.buffer.clear();
        self.state = MatcherState::Idle;
        Some(found)
    }

    /// Discard the buffered text
    pub fn invalidate(&mut self, reason: InvalidationReason) {
        if !self.buffer.is_empty() {
            log::trace!("Buffer invalidated ({}): {:?}", reason, self.buffer.to_string());
        }
        self.buffer.clear();
        self.state = MatcherState::Idle;
    }

    /// Remove the last typed character (Backspace)
    pub fn erase_last(&mut self) {
        let snapshot = self.dictionary.load();
        self.fit(&snapshot);
        self.buffer.pop();
        if self.buffer.is_empty() {
            self.state = MatcherState::Idle;
        }
    }

    pub fn reset(&mut self) {
        self.invalidate(InvalidationReason::Reset);
    }

    /// Keyword currently being typed, if the buffer ends with a prefix of one
    pub fn live_prefix(&mut self) -> Option<MatchResult> {
        let snapshot = self.dictionary.load();
        self.fit(&snapshot);
        snapshot.live_prefix(self.buffer.as_slice(), self.buffer.is_truncated())
    }

    /// Drop the head characters a smaller dictionary no longer needs
    fn fit(&mut self, snapshot: &DictionarySnapshot) {
        let dropped = self.buffer.truncate_head(snapshot.longest_keyword_len());
        if dropped > 0 {
            log::trace!(
                "Trimmed {} buffered char(s) for generation {}",
                dropped,
                snapshot.generation()
            );
        }
        if self.buffer.is_empty() {
            self.state = MatcherState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{MatchMode, TriggerEntry};
    use std::str::FromStr;

    fn matcher(entries: Vec<TriggerEntry>) -> IncrementalMatcher {
        let dictionary = TriggerDictionary::with_entries(entries).unwrap();
        IncrementalMatcher::new(Arc::new(dictionary))
    }

    fn type_text(matcher: &mut IncrementalMatcher, text: &str) -> Vec<MatchResult> {
        text.chars()
            .filter_map(|ch| matcher.feed(&TextFragment::from(ch)))
            .collect()
    }

    #[test]
    fn test_btw_fires_once_after_third_fragment() {
        let mut matcher = matcher(vec![TriggerEntry::new("btw", "by-the-way")]);

        assert!(matcher.feed(&"b".into()).is_none());
        assert_eq!(matcher.state(), MatcherState::Accumulating);
        assert!(matcher.feed(&"t".into()).is_none());

        let fired = matcher.feed(&"w".into()).unwrap();
        assert_eq!(fired.combo().as_str(), "by-the-way");
        assert_eq!(fired.span, 0..3);
        assert!(matcher.buffer().is_empty());
        assert_eq!(matcher.state(), MatcherState::Idle);
    }

    #[test]
    fn test_empty_fragment_changes_nothing() {
        let mut matcher = matcher(vec![TriggerEntry::new("btw", "x")]);
        assert!(matcher.feed(&TextFragment::new()).is_none());
        assert_eq!(matcher.state(), MatcherState::Idle);
    }

    #[test]
    fn test_invalidation_splits_keywords() {
        let mut matcher = matcher(vec![TriggerEntry::new("btw", "x")]);
        type_text(&mut matcher, "bt");
        matcher.invalidate(InvalidationReason::MouseClick);
        assert_eq!(matcher.state(), MatcherState::Idle);
        assert!(matcher.buffer().is_empty());

        assert!(type_text(&mut matcher, "w").is_empty());
        assert_eq!(type_text(&mut matcher, "btw").len(), 1);
    }

    #[test]
    fn test_buffer_never_exceeds_longest_keyword() {
        let mut matcher = matcher(vec![
            TriggerEntry::new("btw", "x"),
            TriggerEntry::new("sig", "y").with_mode(MatchMode::word().with_boundary_after(true)),
        ]);
        let bound = matcher.dictionary().longest_keyword_len();
        assert_eq!(bound, 5);

        for ch in "the quick brown fox jumps over the lazy dog".chars() {
            matcher.feed(&TextFragment::from(ch));
            assert!(matcher.buffer().len() <= bound);
        }
    }

    #[test]
    fn test_word_boundary_survives_truncation() {
        let mut matcher = matcher(vec![TriggerEntry::new("idea", "idea").with_mode(MatchMode::word())]);
        assert!(type_text(&mut matcher, "videa").is_empty());
        assert!(matcher.buffer().len() <= 5);

        // The full buffer still holds the space before the keyword
        assert_eq!(type_text(&mut matcher, " idea").len(), 1);
    }

    #[test]
    fn test_match_start_after_fire_is_boundary() {
        let mut matcher = matcher(vec![
            TriggerEntry::new("btw", "x"),
            TriggerEntry::new("id", "id").with_mode(MatchMode::word()),
        ]);
        assert_eq!(type_text(&mut matcher, "btw").len(), 1);
        assert_eq!(type_text(&mut matcher, "id").len(), 1);
    }

    #[test]
    fn test_rebuild_mid_accumulation() {
        let mut matcher = matcher(vec![TriggerEntry::new("btw", "x")]);
        type_text(&mut matcher, "bt");

        matcher
            .dictionary()
            .rebuild(vec![TriggerEntry::new("wxyz", "w")])
            .unwrap();

        assert!(matcher.feed(&"w".into()).is_none());
        assert_eq!(matcher.buffer().to_string(), "btw");
    }

    #[test]
    fn test_shrinking_rebuild_trims_buffer_on_read() {
        let mut matcher = matcher(vec![TriggerEntry::new("abcdef", "long")]);
        assert!(type_text(&mut matcher, "abcde").is_empty());
        assert_eq!(matcher.buffer().len(), 5);

        matcher
            .dictionary()
            .rebuild(vec![TriggerEntry::new("ab", "short")])
            .unwrap();
        let bound = matcher.dictionary().longest_keyword_len();
        assert_eq!(bound, 2);

        // No keystroke since the rebuild
        assert!(matcher.live_prefix().is_none());
        assert_eq!(matcher.buffer().to_string(), "de");
        assert!(matcher.buffer().is_truncated());

        matcher.erase_last();
        assert_eq!(matcher.buffer().to_string(), "d");

        matcher.dictionary().rebuild(Vec::new()).unwrap();
        assert!(matcher.buffer().is_empty());
        assert_eq!(matcher.state(), MatcherState::Idle);
    }

    #[test]
    fn test_erase_last() {
        let mut matcher = matcher(vec![TriggerEntry::new("btw", "x")]);
        type_text(&mut matcher, "btx");
        matcher.erase_last();
        assert_eq!(matcher.buffer().to_string(), "bt");
        assert_eq!(type_text(&mut matcher, "w").len(), 1);

        matcher.erase_last();
        assert_eq!(matcher.state(), MatcherState::Idle);
    }

    #[test]
    fn test_live_prefix_tracks_buffer() {
        let mut matcher = matcher(vec![TriggerEntry::new("btw", "x")]);
        assert!(matcher.live_prefix().is_none());
        type_text(&mut matcher, "b");
        let live = matcher.live_prefix().unwrap();
        assert!(!live.complete);
        assert_eq!(live.span, 0..1);
    }

    #[test]
    fn test_reason_names() {
        assert_eq!(InvalidationReason::FocusChange.to_string(), "focus-change");
        assert_eq!(
            InvalidationReason::from_str("mouse-wheel").unwrap(),
            InvalidationReason::MouseWheel
        );
    }
}
