use crate::KeyStroke;

/// The dead key awaiting its base character, if any.
///
/// At most one stroke is ever pending; recording a new dead key replaces
/// the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeadKeyState {
    pending: Option<KeyStroke>,
}

impl DeadKeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending dead key stroke
    pub fn pending(&self) -> Option<&KeyStroke> {
        self.pending.as_ref()
    }

    /// Record a dead key stroke, replacing any earlier one
    pub fn record(&mut self, stroke: KeyStroke) {
        self.pending = Some(stroke);
    }

    /// Remove and return the pending stroke
    pub fn take(&mut self) -> Option<KeyStroke> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
