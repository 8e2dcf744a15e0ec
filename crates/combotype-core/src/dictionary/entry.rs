// Combotype Trigger Entries
// Keywords, their matching modes and the combos they refer to

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Opaque reference to a combo, resolved by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComboId(Arc<str>);

impl ComboId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComboId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ComboId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ComboId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a keyword must appear in the typed text to match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchMode {
    /// The character before the keyword must be a word boundary
    pub boundary_before: bool,
    /// The keyword only fires once followed by a word boundary character
    pub boundary_after: bool,
    pub case_sensitive: bool,
}

impl MatchMode {
    /// Match anywhere, case-sensitive
    pub const fn anywhere() -> Self {
        Self {
            boundary_before: false,
            boundary_after: false,
            case_sensitive: true,
        }
    }

    /// Match only at the start of a word
    pub const fn word() -> Self {
        Self {
            boundary_before: true,
            ..Self::anywhere()
        }
    }

    pub const fn with_boundary_before(self, boundary_before: bool) -> Self {
        Self {
            boundary_before,
            ..self
        }
    }

    pub const fn with_boundary_after(self, boundary_after: bool) -> Self {
        Self {
            boundary_after,
            ..self
        }
    }

    pub const fn with_case_sensitive(self, case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            ..self
        }
    }
}

impl Default for MatchMode {
    fn default() -> Self {
        Self::anywhere()
    }
}

/// A keyword that fires a combo
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerEntry {
    keyword: Arc<str>,
    mode: MatchMode,
    combo: ComboId,
}

impl TriggerEntry {
    pub fn new(keyword: impl Into<Arc<str>>, combo: impl Into<ComboId>) -> Self {
        Self {
            keyword: keyword.into(),
            mode: MatchMode::default(),
            combo: combo.into(),
        }
    }

    pub fn with_mode(self, mode: MatchMode) -> Self {
        Self { mode, ..self }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn combo(&self) -> &ComboId {
        &self.combo
    }

    /// Keyword length in characters
    pub fn keyword_len(&self) -> usize {
        self.keyword.chars().count()
    }

    /// Buffer characters a complete match occupies, terminator included
    pub fn span_len(&self) -> usize {
        self.keyword_len() + usize::from(self.mode.boundary_after)
    }

    /// Typed characters needed to decide a match: the span plus the
    /// preceding character when a word boundary is required there
    pub fn window_len(&self) -> usize {
        self.span_len() + usize::from(self.mode.boundary_before)
    }
}

impl fmt::Display for TriggerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {}", self.keyword, self.combo)
    }
}

/// A keyword found at the end of the typed text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub entry: TriggerEntry,
    /// Character range of the buffer the match covers
    pub span: Range<usize>,
    /// Boundary character that completed a terminated trigger
    pub terminator: Option<char>,
    /// `false` for a live prefix still being typed
    pub complete: bool,
}

impl MatchResult {
    pub fn combo(&self) -> &ComboId {
        self.entry.combo()
    }

    /// Characters the dispatcher has to erase to replace the match
    pub fn erase_len(&self) -> usize {
        self.span.len()
    }
}

/// Whether a character separates words
pub fn is_word_boundary(ch: char) -> bool {
    !ch.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_len_counts_terminator() {
        let plain = TriggerEntry::new("btw", "by-the-way");
        assert_eq!(plain.keyword_len(), 3);
        assert_eq!(plain.span_len(), 3);

        let terminated = TriggerEntry::new("café", "coffee")
            .with_mode(MatchMode::word().with_boundary_after(true));
        assert_eq!(terminated.keyword_len(), 4);
        assert_eq!(terminated.span_len(), 5);
        assert_eq!(terminated.window_len(), 6);
        assert_eq!(plain.window_len(), 3);
    }

    #[test]
    fn test_word_boundaries() {
        assert!(is_word_boundary(' '));
        assert!(is_word_boundary('.'));
        assert!(is_word_boundary('\n'));
        assert!(!is_word_boundary('a'));
        assert!(!is_word_boundary('é'));
        assert!(!is_word_boundary('7'));
    }

    #[test]
    fn test_default_mode() {
        let mode = MatchMode::default();
        assert!(!mode.boundary_before);
        assert!(!mode.boundary_after);
        assert!(mode.case_sensitive);
    }
}
