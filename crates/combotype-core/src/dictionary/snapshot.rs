// Combotype Dictionary Snapshot
// Immutable, indexed trigger set queried by the matcher

use std::collections::HashMap;

use smallvec::SmallVec;

use super::entry::{is_word_boundary, MatchResult, TriggerEntry};
use super::DictionaryError;

/// Keywords longer than this are rejected at rebuild time
pub const MAX_KEYWORD_CHARS: usize = 128;

#[derive(Debug, Clone)]
struct Indexed {
    entry: TriggerEntry,
    /// Keyword characters, case-folded for case-insensitive entries
    chars: Box<[char]>,
    /// Registration order; later entries win ties
    order: usize,
}

impl Indexed {
    fn rank(&self) -> (usize, usize) {
        (self.chars.len(), self.order)
    }

    fn same_text(&self, keyword: &[char], typed: &[char]) -> bool {
        keyword.len() == typed.len()
            && if self.entry.mode().case_sensitive {
                keyword == typed
            } else {
                keyword.iter().zip(typed).all(|(k, t)| *k == fold(*t))
            }
    }

    /// Whether the keyword ends at `end` and its start satisfies the mode
    fn ends_at(&self, text: &[char], end: usize, head_truncated: bool) -> bool {
        let len = self.chars.len();
        if end < len {
            return false;
        }
        let start = end - len;
        self.same_text(&self.chars, &text[start..end])
            && self.start_allowed(text, start, head_truncated)
    }

    fn start_allowed(&self, text: &[char], start: usize, head_truncated: bool) -> bool {
        if !self.entry.mode().boundary_before {
            return true;
        }
        match start {
            // Characters before a truncated head are unknown
            0 => !head_truncated,
            _ => is_word_boundary(text[start - 1]),
        }
    }
}

/// Single-character lowercase mapping; characters whose lowercase form
/// expands are left as they are.
fn fold(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => ch,
    }
}

/// One consistent trigger set.
///
/// Built once per rebuild and never mutated, so a reader holding it sees
/// the same entries for as long as it keeps it.
#[derive(Debug, Clone, Default)]
pub struct DictionarySnapshot {
    generation: u64,
    entries: Vec<Indexed>,
    /// Folded last keyword character -> entries, longest then newest first
    by_last: HashMap<char, Vec<usize>>,
    /// Folded proper prefix -> entries, newest first
    prefixes: HashMap<Box<[char]>, Vec<usize>>,
    longest: usize,
}

impl DictionarySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and index entries in registration order
    pub fn build<I>(entries: I, generation: u64) -> Result<Self, DictionaryError>
    where
        I: IntoIterator<Item = TriggerEntry>,
    {
        let mut snapshot = Self {
            generation,
            ..Self::default()
        };

        for (order, entry) in entries.into_iter().enumerate() {
            validate(&entry)?;

            let chars: Box<[char]> = if entry.mode().case_sensitive {
                entry.keyword().chars().collect()
            } else {
                entry.keyword().chars().map(fold).collect()
            };
            snapshot.longest = snapshot.longest.max(entry.window_len());

            let index = snapshot.entries.len();
            if let Some(&last) = chars.last() {
                snapshot.by_last.entry(fold(last)).or_default().push(index);
            }

            // A terminated keyword is still a prefix of its match until the
            // terminator arrives.
            let prefix_end = if entry.mode().boundary_after {
                chars.len()
            } else {
                chars.len() - 1
            };
            for len in 1..=prefix_end {
                let key: Box<[char]> = chars[..len].iter().copied().map(fold).collect();
                snapshot.prefixes.entry(key).or_default().push(index);
            }

            snapshot.entries.push(Indexed {
                entry,
                chars,
                order,
            });
        }

        let entries = &snapshot.entries;
        for list in snapshot.by_last.values_mut() {
            list.sort_by(|a, b| entries[*b].rank().cmp(&entries[*a].rank()));
        }
        for list in snapshot.prefixes.values_mut() {
            list.sort_by(|a, b| entries[*b].order.cmp(&entries[*a].order));
        }

        Ok(snapshot)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order
    pub fn entries(&self) -> impl Iterator<Item = &TriggerEntry> {
        self.entries.iter().map(|indexed| &indexed.entry)
    }

    /// Longest window any entry needs, in characters.
    ///
    /// This is the keyword length plus one slot for a required preceding
    /// boundary and one for a terminator, so it can exceed the longest
    /// keyword itself. The rolling buffer never needs to hold more.
    pub fn longest_keyword_len(&self) -> usize {
        self.longest
    }

    /// Best complete match ending at the end of `text`.
    ///
    /// The longest keyword wins; equal lengths go to the most recently
    /// registered entry. `head_truncated` tells whether characters were
    /// dropped from the front of `text`, in which case its start is not a
    /// word boundary.
    pub fn match_suffix(&self, text: &[char], head_truncated: bool) -> Option<MatchResult> {
        let (&last, _) = text.split_last()?;
        let end = text.len();

        let plain = self.by_last.get(&fold(last)).and_then(|list| {
            list.iter()
                .map(|&i| &self.entries[i])
                .filter(|ix| !ix.entry.mode().boundary_after)
                .find(|ix| ix.ends_at(text, end, head_truncated))
        });

        let terminated = if is_word_boundary(last) && end >= 2 {
            self.by_last.get(&fold(text[end - 2])).and_then(|list| {
                list.iter()
                    .map(|&i| &self.entries[i])
                    .filter(|ix| ix.entry.mode().boundary_after)
                    .find(|ix| ix.ends_at(text, end - 1, head_truncated))
            })
        } else {
            None
        };

        let best = match (plain, terminated) {
            (Some(p), Some(t)) if t.rank() > p.rank() => t,
            (Some(p), _) => p,
            (None, Some(t)) => t,
            (None, None) => return None,
        };

        let terminator = best.entry.mode().boundary_after.then_some(last);
        Some(MatchResult {
            entry: best.entry.clone(),
            span: end - best.entry.span_len()..end,
            terminator,
            complete: true,
        })
    }

    /// Longest suffix of `text` that is a proper prefix of some keyword.
    ///
    /// Returns a non-complete result; nothing fires from it.
    pub fn live_prefix(&self, text: &[char], head_truncated: bool) -> Option<MatchResult> {
        let end = text.len();
        for len in (1..=end.min(self.longest)).rev() {
            let start = end - len;
            let typed = &text[start..];
            let key: SmallVec<[char; 32]> = typed.iter().copied().map(fold).collect();

            let Some(list) = self.prefixes.get(&key[..]) else {
                continue;
            };
            let hit = list.iter().map(|&i| &self.entries[i]).find(|ix| {
                ix.same_text(&ix.chars[..len], typed)
                    && ix.start_allowed(text, start, head_truncated)
            });
            if let Some(ix) = hit {
                return Some(MatchResult {
                    entry: ix.entry.clone(),
                    span: start..end,
                    terminator: None,
                    complete: false,
                });
            }
        }
        None
    }
}

fn validate(entry: &TriggerEntry) -> Result<(), DictionaryError> {
    let keyword = entry.keyword();
    if keyword.is_empty() {
        return Err(DictionaryError::EmptyKeyword {
            combo: entry.combo().clone(),
        });
    }
    if let Some(ch) = keyword.chars().find(|c| c.is_control()) {
        return Err(DictionaryError::ControlCharacter {
            keyword: keyword.to_string(),
            code: u32::from(ch),
        });
    }
    if entry.keyword_len() > MAX_KEYWORD_CHARS {
        return Err(DictionaryError::KeywordTooLong {
            keyword: keyword.to_string(),
            max: MAX_KEYWORD_CHARS,
        });
    }
    Ok(())
}
