use super::{DeadKeyState, TextFragment};
use crate::layout::{KeyRole, LayoutResolver, Resolution, MAX_FRAGMENT_CHARS};
use crate::KeyStroke;

/// Turns key strokes into the text the focused application will receive.
///
/// The layout's composition state is shared with every application on the
/// system. Resolving a stroke can consume a stored dead key, so the decoder
/// re-issues resolutions to leave that state exactly as it found it. Actual
/// composition happens downstream; the decoder only reports text.
pub struct KeyDecoder<R> {
    layout: R,
    dead_key: DeadKeyState,
}

impl<R: LayoutResolver> KeyDecoder<R> {
    pub fn new(layout: R) -> Self {
        Self {
            layout,
            dead_key: DeadKeyState::new(),
        }
    }

    pub fn layout(&self) -> &R {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut R {
        &mut self.layout
    }

    /// Pending dead key, if a composition is in progress
    pub fn dead_key(&self) -> &DeadKeyState {
        &self.dead_key
    }

    /// How the layout classifies a stroke
    pub fn role(&self, stroke: &KeyStroke) -> KeyRole {
        self.layout.role(stroke)
    }

    /// Decode one stroke.
    ///
    /// Returns an empty fragment for modifiers, dead keys and unexpected
    /// layout results. Never fails.
    pub fn decode(&mut self, stroke: &KeyStroke) -> TextFragment {
        let fragment = match self.layout.resolve(stroke) {
            Resolution::DeadKey => {
                // Resolving consumed the dead key from the layout state.
                // The identical call puts it back.
                let _ = self.layout.resolve(stroke);
                self.dead_key.record(*stroke);
                TextFragment::new()
            }
            Resolution::Text(mut text) if !text.is_empty() => {
                if let Some(pending) = self.dead_key.take() {
                    // Our resolution composed with the stored dead key;
                    // store it again so the application composes too.
                    let _ = self.layout.resolve(&pending);
                }
                text.truncate(MAX_FRAGMENT_CHARS);
                text
            }
            Resolution::Text(_) | Resolution::NoText => TextFragment::new(),
            Resolution::Unexpected(size) => {
                log::debug!("layout returned unexpected size {} for {}", size, stroke);
                TextFragment::new()
            }
        };

        self.layout.deliver(stroke);
        fragment
    }

    /// Forget any pending composition after strokes were missed.
    ///
    /// Never resolves anything, so the shared layout state is untouched;
    /// a stale pending stroke would otherwise be re-injected into it.
    pub fn resync(&mut self) {
        self.dead_key.clear();
        self.layout.resync();
    }
}
