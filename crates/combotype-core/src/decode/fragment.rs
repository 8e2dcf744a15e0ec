use std::fmt;

use smallvec::SmallVec;

/// Characters produced by decoding a single key stroke.
///
/// Almost always zero or one character, so the storage stays inline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TextFragment {
    chars: SmallVec<[char; 4]>,
}

impl TextFragment {
    /// Create an empty fragment
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

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }

    /// Keep at most `max` characters
    pub fn truncate(&mut self, max: usize) {
        self.chars.truncate(max);
    }

    /// The fragment without control characters (CR, TAB, BS, ESC...)
    pub fn printable(&self) -> TextFragment {
        self.chars().filter(|c| !c.is_control()).collect()
    }
}

impl From<char> for TextFragment {
    fn from(ch: char) -> Self {
        let mut chars = SmallVec::new();
        chars.push(ch);
        Self { chars }
    }
}

impl From<&str> for TextFragment {
    fn from(text: &str) -> Self {
        text.chars().collect()
    }
}

impl FromIterator<char> for TextFragment {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self {
            chars: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for TextFragment {
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
    fn test_printable_drops_control_characters() {
        let fragment = TextFragment::from("a\r\u{8}b");
        assert_eq!(fragment.printable(), TextFragment::from("ab"));
        assert!(TextFragment::from('\r').printable().is_empty());
    }

    #[test]
    fn test_truncate_and_display() {
        let mut fragment = TextFragment::from("héllo");
        fragment.truncate(2);
        assert_eq!(fragment.len(), 2);
        assert_eq!(fragment.to_string(), "hé");
    }
}
