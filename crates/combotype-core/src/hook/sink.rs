// Combotype Match Sinks
// Hand-off of match events from the hook thread to the dispatcher

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use crate::dictionary::MatchResult;

/// Receives match events synchronously on the hook thread.
///
/// Implementations must return quickly; anything slow belongs on another
/// thread (see [`ChannelSink`]).
pub trait MatchSink: Send + Sync {
    fn on_match(&self, found: &MatchResult);
}

impl<F> MatchSink for F
where
    F: Fn(&MatchResult) + Send + Sync,
{
    fn on_match(&self, found: &MatchResult) {
        self(found)
    }
}

/// Discards every match
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MatchSink for NullSink {
    fn on_match(&self, _found: &MatchResult) {}
}

/// Forwards matches over a bounded channel without ever blocking.
///
/// When the receiver falls behind the match is dropped and counted.
#[derive(Debug)]
pub struct ChannelSink {
    tx: SyncSender<MatchResult>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink and the receiving end, holding up to `capacity` matches
    pub fn bounded(capacity: usize) -> (Self, Receiver<MatchResult>) {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Matches lost because the queue was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl MatchSink for ChannelSink {
    fn on_match(&self, found: &MatchResult) {
        match self.tx.try_send(found.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(lost)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("Dispatch queue full, dropping match for {}", lost.entry);
            }
            Err(TrySendError::Disconnected(lost)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Dispatcher gone, dropping match for {}", lost.entry);
            }
        }
    }
}
