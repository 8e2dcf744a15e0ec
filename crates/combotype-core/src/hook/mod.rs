// Combotype Input Hook
// Process-wide interception: platform sources feed events into the pipeline

pub mod pipeline;
pub mod sink;

pub use pipeline::{BoxedLayout, InvalidationPolicy, Pipeline};
pub use sink::{ChannelSink, MatchSink, NullSink};

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::dictionary::MatchResult;
use crate::event::SourceError;
use crate::matcher::InvalidationReason;
use crate::{KeyStroke, MouseEvent};

/// Longest an event callback waits for the pipeline before skipping
pub const LOCK_BUDGET: Duration = Duration::from_micros(500);

/// Longest an external invalidation waits for the pipeline
pub const HANDLE_BUDGET: Duration = Duration::from_millis(50);

/// What the platform should do with an intercepted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    PassThrough,
    Suppress,
}

/// Callback for key-down events
pub type KeyHandler = Arc<dyn Fn(KeyStroke) -> HookDecision + Send + Sync>;

/// Callback for mouse events
pub type MouseHandler = Arc<dyn Fn(MouseEvent) -> HookDecision + Send + Sync>;

/// Platform interception point.
///
/// An installed handler is invoked once per event, in order, on whatever
/// thread the platform delivers events on. Uninstalling must not return
/// while a callback is still running, or the callback must only touch
/// state that outlives the hook.
pub trait EventSource: Send {
    fn install_keyboard(&mut self, handler: KeyHandler) -> Result<(), SourceError>;

    fn install_mouse(&mut self, handler: MouseHandler) -> Result<(), SourceError>;

    fn uninstall_keyboard(&mut self);

    fn uninstall_mouse(&mut self);
}

/// Errors from [`InputHook::start`]
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Keyboard hook install failed: {0}")]
    KeyboardInstall(#[source] SourceError),

    #[error("Hook is already running")]
    AlreadyRunning,
}

/// Outcome of a successful start
#[derive(Debug)]
pub struct HookStatus {
    /// Why the mouse hook is missing, if it is
    pub mouse_error: Option<SourceError>,
}

impl HookStatus {
    pub fn mouse_installed(&self) -> bool {
        self.mouse_error.is_none()
    }
}

/// State shared by the callbacks and every [`HookHandle`]
struct HookShared {
    pipeline: Mutex<Pipeline>,
    active: AtomicBool,
    /// Set when an event was skipped; the next callback resyncs first
    needs_resync: AtomicBool,
    skipped: AtomicU64,
}

impl HookShared {
    fn on_key(&self, stroke: KeyStroke) -> HookDecision {
        self.run(|pipeline| {
            pipeline.handle_key(&stroke);
        });
        HookDecision::PassThrough
    }

    fn on_mouse(&self, event: MouseEvent) -> HookDecision {
        self.run(|pipeline| pipeline.handle_mouse(event));
        HookDecision::PassThrough
    }

    /// Run pipeline work within the lock budget. Never panics, never blocks
    /// for longer than [`LOCK_BUDGET`].
    fn run<F>(&self, work: F)
    where
        F: FnOnce(&mut Pipeline),
    {
        if !self.active.load(Ordering::Acquire) {
            return;
        }

        let Some(mut pipeline) = self.pipeline.try_lock_for(LOCK_BUDGET) else {
            self.needs_resync.store(true, Ordering::Release);
            let skipped = self.skipped.fetch_add(1, Ordering::Relaxed) + 1;
            log::warn!("Pipeline busy, event skipped ({} so far)", skipped);
            return;
        };

        if self.needs_resync.swap(false, Ordering::AcqRel) {
            pipeline.resync();
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&mut pipeline)));
        // A failed keystroke yields no text; the buffered text stays
        if outcome.is_err() {
            log::error!("Recovered from panic in event callback; decoder state reset");
            pipeline.reset_decoder();
        }
    }
}

/// Owns a platform source and the pipeline it feeds.
///
/// Every event is passed through to the focused application; the hook only
/// observes. Dropping the hook stops it.
pub struct InputHook<S: EventSource> {
    source: S,
    shared: Arc<HookShared>,
    keyboard: bool,
    mouse: bool,
}

impl<S: EventSource> InputHook<S> {
    pub fn new(source: S, pipeline: Pipeline) -> Self {
        Self {
            source,
            shared: Arc::new(HookShared {
                pipeline: Mutex::new(pipeline),
                active: AtomicBool::new(false),
                needs_resync: AtomicBool::new(false),
                skipped: AtomicU64::new(0),
            }),
            keyboard: false,
            mouse: false,
        }
    }

    /// Install the keyboard hook, then the mouse hook.
    ///
    /// A keyboard failure is fatal and leaves nothing installed; a mouse
    /// failure is reported in the returned status.
    pub fn start(&mut self) -> Result<HookStatus, HookError> {
        if self.keyboard {
            return Err(HookError::AlreadyRunning);
        }

        self.shared.active.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let on_key: KeyHandler = Arc::new(move |stroke: KeyStroke| shared.on_key(stroke));
        if let Err(err) = self.source.install_keyboard(on_key) {
            self.shared.active.store(false, Ordering::Release);
            return Err(HookError::KeyboardInstall(err));
        }
        self.keyboard = true;
        log::info!("Keyboard hook installed");

        let shared = Arc::clone(&self.shared);
        let on_mouse: MouseHandler = Arc::new(move |event: MouseEvent| shared.on_mouse(event));
        let mouse_error = match self.source.install_mouse(on_mouse) {
            Ok(()) => {
                self.mouse = true;
                log::info!("Mouse hook installed");
                None
            }
            Err(err) => {
                log::warn!("Mouse hook unavailable, clicks will not reset typed text: {}", err);
                Some(err)
            }
        };

        Ok(HookStatus { mouse_error })
    }

    /// Uninstall whatever is installed. Safe to call repeatedly, and before
    /// or after a failed start.
    pub fn stop(&mut self) {
        self.shared.active.store(false, Ordering::Release);

        if self.mouse {
            self.source.uninstall_mouse();
            self.mouse = false;
            log::info!("Mouse hook removed");
        }
        if self.keyboard {
            self.source.uninstall_keyboard();
            self.keyboard = false;
            log::info!("Keyboard hook removed");
        }
    }

    pub fn is_running(&self) -> bool {
        self.keyboard
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Cloneable handle for other threads
    pub fn handle(&self) -> HookHandle {
        HookHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: EventSource> Drop for InputHook<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Thread-safe access to a running hook's pipeline.
///
/// Every operation waits at most [`HANDLE_BUDGET`] for the pipeline; when
/// it cannot get it, the next event callback resyncs instead.
#[derive(Clone)]
pub struct HookHandle {
    shared: Arc<HookShared>,
}

impl HookHandle {
    /// Discard the typed-text context (focus change, dispatcher retyped text).
    ///
    /// Returns `false` when the invalidation was deferred to the next event.
    pub fn invalidate(&self, reason: InvalidationReason) -> bool {
        match self.shared.pipeline.try_lock_for(HANDLE_BUDGET) {
            Some(mut pipeline) => {
                pipeline.invalidate(reason);
                true
            }
            None => {
                self.shared.needs_resync.store(true, Ordering::Release);
                false
            }
        }
    }

    /// Clear the buffer and any pending composition
    pub fn reset(&self) -> bool {
        match self.shared.pipeline.try_lock_for(HANDLE_BUDGET) {
            Some(mut pipeline) => {
                pipeline.resync();
                true
            }
            None => {
                self.shared.needs_resync.store(true, Ordering::Release);
                false
            }
        }
    }

    /// Currently buffered text
    pub fn buffer_text(&self) -> Option<String> {
        self.shared
            .pipeline
            .try_lock_for(HANDLE_BUDGET)
            .map(|mut pipeline| pipeline.matcher().buffer().to_string())
    }

    /// Keyword currently being typed
    pub fn live_prefix(&self) -> Option<MatchResult> {
        self.shared
            .pipeline
            .try_lock_for(HANDLE_BUDGET)
            .and_then(|mut pipeline| pipeline.matcher().live_prefix())
    }

    pub fn set_policy(&self, policy: InvalidationPolicy) -> bool {
        match self.shared.pipeline.try_lock_for(HANDLE_BUDGET) {
            Some(mut pipeline) => {
                pipeline.set_policy(policy);
                true
            }
            None => false,
        }
    }

    /// Whether the hook is installed and processing events
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Events skipped because the pipeline was busy
    pub fn skipped_events(&self) -> u64 {
        self.shared.skipped.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookHandle")
            .field("active", &self.is_active())
            .field("skipped", &self.skipped_events())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{TriggerDictionary, TriggerEntry};
    use crate::event::ManualSource;
    use crate::layout::{KeyRole, LayoutResolver, Resolution, SoftLayout};
    use crate::{Key, MouseButton};

    fn dictionary() -> Arc<TriggerDictionary> {
        Arc::new(TriggerDictionary::with_entries(vec![TriggerEntry::new("btw", "by-the-way")]).unwrap())
    }

    fn hook_with(source: ManualSource) -> (InputHook<ManualSource>, std::sync::mpsc::Receiver<MatchResult>) {
        let (sink, rx) = ChannelSink::bounded(8);
        let pipeline = Pipeline::new(SoftLayout::us(), dictionary(), Arc::new(sink));
        (InputHook::new(source, pipeline), rx)
    }

    fn type_keys(source: &ManualSource, keys: &[Key]) {
        for key in keys {
            assert_eq!(source.key(KeyStroke::from(*key)), Some(HookDecision::PassThrough));
        }
    }

    #[test]
    fn test_start_feeds_pipeline() {
        let source = ManualSource::new();
        let (mut hook, rx) = hook_with(source.clone());
        let status = hook.start().unwrap();
        assert!(status.mouse_installed());

        type_keys(&source, &[Key::B, Key::T, Key::W]);
        assert_eq!(rx.try_recv().unwrap().combo().as_str(), "by-the-way");
    }

    #[test]
    fn test_keyboard_failure_is_fatal() {
        let source = ManualSource::new();
        source.fail_keyboard(true);
        let (mut hook, _rx) = hook_with(source.clone());

        assert!(matches!(hook.start(), Err(HookError::KeyboardInstall(_))));
        assert!(!hook.is_running());
        assert!(!source.mouse_installed());
        hook.stop();
    }

    #[test]
    fn test_mouse_failure_is_degraded() {
        let source = ManualSource::new();
        source.fail_mouse(true);
        let (mut hook, rx) = hook_with(source.clone());

        let status = hook.start().unwrap();
        assert!(!status.mouse_installed());
        assert_eq!(source.mouse(MouseEvent::Button(MouseButton::Left)), None);

        type_keys(&source, &[Key::B, Key::T, Key::W]);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let source = ManualSource::new();
        let (mut hook, _rx) = hook_with(source.clone());
        hook.stop();
        hook.start().unwrap();
        assert!(matches!(hook.start(), Err(HookError::AlreadyRunning)));

        hook.stop();
        hook.stop();
        assert!(!source.keyboard_installed());
        assert!(!hook.handle().is_active());
        assert_eq!(source.key(Key::B.into()), None);
    }

    #[test]
    fn test_drop_uninstalls() {
        let source = ManualSource::new();
        let (mut hook, _rx) = hook_with(source.clone());
        hook.start().unwrap();
        drop(hook);
        assert!(!source.keyboard_installed());
        assert!(!source.mouse_installed());
    }

    #[test]
    fn test_handle_invalidates_from_other_thread() {
        let source = ManualSource::new();
        let (mut hook, rx) = hook_with(source.clone());
        hook.start().unwrap();
        let handle = hook.handle();

        type_keys(&source, &[Key::B, Key::T]);
        assert_eq!(handle.buffer_text().as_deref(), Some("bt"));

        std::thread::spawn(move || assert!(handle.invalidate(InvalidationReason::FocusChange)))
            .join()
            .unwrap();

        type_keys(&source, &[Key::W]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_busy_pipeline_skips_and_resyncs() {
        let source = ManualSource::new();
        let (mut hook, rx) = hook_with(source.clone());
        hook.start().unwrap();
        let handle = hook.handle();

        type_keys(&source, &[Key::B, Key::T]);
        {
            let _held = hook.shared.pipeline.lock();
            // Returns within the budget and still passes the event on
            type_keys(&source, &[Key::W]);
        }
        assert_eq!(handle.skipped_events(), 1);

        // The skipped keystroke never completes "btw"
        type_keys(&source, &[Key::W]);
        assert!(rx.try_recv().is_err());
        assert_eq!(handle.buffer_text().as_deref(), Some("w"));
    }

    struct PanickingLayout;

    impl LayoutResolver for PanickingLayout {
        fn resolve(&mut self, stroke: &KeyStroke) -> Resolution {
            if stroke.virtual_key() == u32::from(Key::Z.code()) {
                panic!("layout failure");
            }
            SoftLayout::us().resolve(stroke)
        }

        fn role(&self, _stroke: &KeyStroke) -> KeyRole {
            KeyRole::Text
        }
    }

    #[test]
    fn test_panic_is_contained() {
        let source = ManualSource::new();
        let (sink, rx) = ChannelSink::bounded(8);
        let pipeline = Pipeline::new(PanickingLayout, dictionary(), Arc::new(sink));
        let mut hook = InputHook::new(source.clone(), pipeline);
        hook.start().unwrap();

        let handle = hook.handle();

        type_keys(&source, &[Key::B, Key::T, Key::Z]);
        assert_eq!(handle.buffer_text().as_deref(), Some("bt"));

        type_keys(&source, &[Key::W]);
        assert_eq!(rx.try_recv().unwrap().combo().as_str(), "by-the-way");

        type_keys(&source, &[Key::B, Key::T, Key::W]);
        assert!(rx.try_recv().is_ok());
    }
}
