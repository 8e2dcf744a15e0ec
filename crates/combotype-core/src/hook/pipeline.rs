// Combotype Pipeline
// Decoder, matcher and sink wired together for one hook

use std::sync::Arc;

use serde::Deserialize;

use super::sink::MatchSink;
use crate::decode::{KeyDecoder, TextFragment};
use crate::dictionary::{MatchResult, TriggerDictionary};
use crate::layout::{KeyRole, LayoutResolver};
use crate::matcher::{IncrementalMatcher, InvalidationReason};
use crate::{KeyStroke, MouseEvent};

/// Which events discard the typed-text context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InvalidationPolicy {
    /// A mouse button press may move the caret
    pub invalidate_on_click: bool,
    /// Scrolling rarely moves the caret
    pub invalidate_on_wheel: bool,
    pub invalidate_on_shortcut: bool,
    /// Backspace removes the last buffered character instead of invalidating
    pub erase_on_backspace: bool,
}

impl Default for InvalidationPolicy {
    fn default() -> Self {
        Self {
            invalidate_on_click: true,
            invalidate_on_wheel: false,
            invalidate_on_shortcut: true,
            erase_on_backspace: true,
        }
    }
}

/// Layout resolver owned by a pipeline
pub type BoxedLayout = Box<dyn LayoutResolver + Send>;

/// Everything that runs for one intercepted event.
///
/// Strictly synchronous: decode, update the buffer, query one dictionary
/// snapshot and hand any match to the sink.
pub struct Pipeline {
    decoder: KeyDecoder<BoxedLayout>,
    matcher: IncrementalMatcher,
    policy: InvalidationPolicy,
    sink: Arc<dyn MatchSink>,
}

impl Pipeline {
    pub fn new<R>(layout: R, dictionary: Arc<TriggerDictionary>, sink: Arc<dyn MatchSink>) -> Self
    where
        R: LayoutResolver + Send + 'static,
    {
        Self {
            decoder: KeyDecoder::new(Box::new(layout)),
            matcher: IncrementalMatcher::new(dictionary),
            policy: InvalidationPolicy::default(),
            sink,
        }
    }

    pub fn with_policy(mut self, policy: InvalidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> InvalidationPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: InvalidationPolicy) {
        self.policy = policy;
    }

    pub fn decoder(&self) -> &KeyDecoder<BoxedLayout> {
        &self.decoder
    }

    pub fn matcher(&mut self) -> &mut IncrementalMatcher {
        &mut self.matcher
    }

    /// Process one key-down event. The match, if any, has already been
    /// handed to the sink when this returns.
    pub fn handle_key(&mut self, stroke: &KeyStroke) -> Option<MatchResult> {
        let role = self.decoder.role(stroke);
        let fragment = self.decoder.decode(stroke);

        log::debug!(
            target: "combotype::keys",
            "vk=0x{:02x} scan={} size={} text={:?}",
            stroke.virtual_key(),
            stroke.scan_code(),
            fragment.len(),
            fragment.to_string()
        );

        match role {
            KeyRole::Text => {
                let found = self.matcher.feed(&fragment.printable())?;
                self.sink.on_match(&found);
                return Some(found);
            }
            // Enter and Tab end the word before leaving it
            KeyRole::Navigation if is_whitespace(&fragment) => {
                let found = self.matcher.feed(&fragment);
                self.matcher.invalidate(InvalidationReason::Navigation);
                let found = found?;
                self.sink.on_match(&found);
                return Some(found);
            }
            KeyRole::Erase if self.policy.erase_on_backspace => self.matcher.erase_last(),
            KeyRole::Erase => self.matcher.invalidate(InvalidationReason::Backspace),
            KeyRole::Navigation => self.matcher.invalidate(InvalidationReason::Navigation),
            KeyRole::Shortcut if self.policy.invalidate_on_shortcut => {
                self.matcher.invalidate(InvalidationReason::Shortcut)
            }
            KeyRole::Shortcut | KeyRole::Modifier => {}
        }
        None
    }

    /// Mouse activity only ever invalidates
    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event {
            MouseEvent::Button(_) if self.policy.invalidate_on_click => {
                self.matcher.invalidate(InvalidationReason::MouseClick)
            }
            MouseEvent::Wheel if self.policy.invalidate_on_wheel => {
                self.matcher.invalidate(InvalidationReason::MouseWheel)
            }
            MouseEvent::Button(_) | MouseEvent::Wheel => {}
        }
    }

    pub fn invalidate(&mut self, reason: InvalidationReason) {
        self.matcher.invalidate(reason);
    }

    /// Start over after missed events: clear the buffer and forget any
    /// pending composition.
    pub fn resync(&mut self) {
        self.matcher.reset();
        self.decoder.resync();
    }

    /// Forget any pending composition but keep the buffered text
    pub fn reset_decoder(&mut self) {
        self.decoder.resync();
    }
}

fn is_whitespace(fragment: &TextFragment) -> bool {
    !fragment.is_empty() && fragment.chars().all(char::is_whitespace)
}
