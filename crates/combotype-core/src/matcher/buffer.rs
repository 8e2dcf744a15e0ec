use std::fmt;

use smallvec::SmallVec;

/// Most recently typed characters, oldest first.
///
/// Only appended to at the tail and trimmed at the head. Once the head has
/// been trimmed the buffer no longer knows what preceded its first
/// character, which matters for word-boundary matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollingBuffer {
    chars: SmallVec<[char; 32]>,
    truncated: bool,
}

impl RollingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_slice(&self) -> &[char] {
        &self.chars
    }

    /// Whether characters were dropped from the head since the last clear
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Append characters, then keep at most `bound` of them.
    ///
    /// Returns the number of characters dropped from the head.
    pub fn append<I>(&mut self, chars: I, bound: usize) -> usize
    where
        I: IntoIterator<Item = char>,
    {
        self.chars.extend(chars);
        self.truncate_head(bound)
    }

    /// Drop the oldest characters until at most `bound` remain
    pub fn truncate_head(&mut self, bound: usize) -> usize {
        let excess = self.chars.len().saturating_sub(bound);
        if excess > 0 {
            self.chars.drain(..excess);
            self.truncated = true;
        }
        excess
    }

    /// Remove the newest character
    pub fn pop(&mut self) -> Option<char> {
        self.chars.pop()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.truncated = false;
    }
}

impl fmt::Display for RollingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in &self.chars {
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_truncates_head() {
        let mut buffer = RollingBuffer::new();
        assert_eq!(buffer.append("abc".chars(), 4), 0);
        assert!(!buffer.is_truncated());

        assert_eq!(buffer.append("de".chars(), 4), 1);
        assert_eq!(buffer.to_string(), "bcde");
        assert!(buffer.is_truncated());

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_truncated());
    }

    #[test]
    fn test_zero_bound_keeps_nothing() {
        let mut buffer = RollingBuffer::new();
        assert_eq!(buffer.append("ab".chars(), 0), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_pop_removes_newest() {
        let mut buffer = RollingBuffer::new();
        buffer.append("xy".chars(), 8);
        assert_eq!(buffer.pop(), Some('y'));
        assert_eq!(buffer.to_string(), "x");
    }
}
