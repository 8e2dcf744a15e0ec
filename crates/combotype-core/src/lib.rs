// Combotype Core Library
// Keyboard hook, dead-key-safe decoding and incremental trigger matching

pub mod config;
pub mod decode;
pub mod dictionary;
pub mod event;
pub mod hook;
pub mod input;
pub mod key;
pub mod layout;
pub mod matcher;
pub mod modifier;
pub mod stroke;

pub use config::{Config, ConfigError};
pub use decode::{DeadKeyState, KeyDecoder, TextFragment};
pub use dictionary::{
    ComboId, DictionaryError, DictionarySnapshot, MatchMode, MatchResult, TriggerDictionary,
    TriggerEntry,
};
pub use event::{ManualSource, SourceError};
pub use hook::{
    ChannelSink, EventSource, HookDecision, HookError, HookHandle, HookStatus, InputHook,
    InvalidationPolicy, MatchSink, NullSink, Pipeline,
};
pub use key::Key;
pub use layout::{KeyRole, LayoutKind, LayoutResolver, Resolution, SoftLayout};
pub use matcher::{IncrementalMatcher, InvalidationReason, MatcherState, RollingBuffer};
pub use modifier::{ModifierTracker, Modifiers};
pub use stroke::{KeyStroke, MouseButton, MouseEvent};
