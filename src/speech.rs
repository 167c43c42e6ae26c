//! Speech handles for in-flight synthesized utterances
//!
//! A handle is owned by the playback subsystem. The session only keeps a
//! reference to the active one so it can cancel it and learn when it ends.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Opaque identity of one utterance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpeechId(Uuid);

impl SpeechId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpeechId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpeechId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-shot callback run when an utterance finishes
pub type DoneCallback = Box<dyn FnOnce(SpeechId) + Send + 'static>;

/// Handle to one utterance being synthesized or played
pub trait SpeechHandle: Send + Sync {
    /// Identity used to match completions against the active handle
    fn id(&self) -> SpeechId;

    /// Whether the utterance has been interrupted. Never goes back to false.
    fn interrupted(&self) -> bool;

    /// Cancel synthesis and playback. Fire-and-forget.
    ///
    /// `interrupted()` must return true as soon as this returns, even if the
    /// playback subsystem confirms the cancellation later. The registry reads
    /// the flag to avoid cancelling the same utterance twice.
    fn interrupt(&self);

    /// Register a callback run once when the utterance finishes
    ///
    /// Registering after completion runs the callback right away.
    fn add_done_callback(&self, callback: DoneCallback);
}

/// Shared reference to a speech handle
pub type SharedSpeech = Arc<dyn SpeechHandle>;

#[derive(Default)]
struct DoneState {
    finished: bool,
    callbacks: Vec<DoneCallback>,
}

struct Inner {
    id: SpeechId,
    interrupted: AtomicBool,
    interrupt_calls: AtomicUsize,
    done: Mutex<DoneState>,
}

/// In-process speech handle
///
/// Stands in for the playback subsystem's handle when replaying scenarios
/// and in tests. Counts every `interrupt()` call so duplicate cancellations
/// are observable.
#[derive(Clone)]
pub struct PlaybackSpeech {
    inner: Arc<Inner>,
}

impl PlaybackSpeech {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: SpeechId::new(),
                interrupted: AtomicBool::new(false),
                interrupt_calls: AtomicUsize::new(0),
                done: Mutex::new(DoneState::default()),
            }),
        }
    }

    /// Wrap in a shared trait object for the session
    pub fn shared(&self) -> SharedSpeech {
        Arc::new(self.clone())
    }

    /// Number of times `interrupt()` was invoked
    pub fn interrupt_calls(&self) -> usize {
        self.inner.interrupt_calls.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.done.lock().finished
    }

    /// Mark the utterance as finished and run its done callbacks
    ///
    /// Returns false if it had already finished; callbacks run at most once.
    pub fn finish(&self) -> bool {
        let callbacks = {
            let mut done = self.inner.done.lock();
            if done.finished {
                return false;
            }
            done.finished = true;
            std::mem::take(&mut done.callbacks)
        };

        debug!("Speech {} finished, running {} callbacks", self.inner.id, callbacks.len());
        for callback in callbacks {
            callback(self.inner.id);
        }
        true
    }
}

impl Default for PlaybackSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PlaybackSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSpeech")
            .field("id", &self.inner.id)
            .field("interrupted", &self.interrupted())
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl SpeechHandle for PlaybackSpeech {
    fn id(&self) -> SpeechId {
        self.inner.id
    }

    fn interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    fn interrupt(&self) {
        self.inner.interrupt_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.interrupted.store(true, Ordering::SeqCst);
    }

    fn add_done_callback(&self, callback: DoneCallback) {
        let mut done = self.inner.done.lock();
        if done.finished {
            drop(done);
            callback(self.inner.id);
        } else {
            done.callbacks.push(callback);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_ids_are_unique() {
        let a = PlaybackSpeech::new();
        let b = PlaybackSpeech::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }

    #[test]
    fn test_interrupt_is_monotonic() {
        let speech = PlaybackSpeech::new();
        assert!(!speech.interrupted());

        speech.interrupt();
        speech.interrupt();
        assert!(speech.interrupted());
        assert_eq!(speech.interrupt_calls(), 2);
    }

    #[test]
    fn test_interrupt_sets_flag_before_returning() {
        let speech = PlaybackSpeech::new();
        let shared = speech.shared();
        shared.interrupt();
        assert!(shared.interrupted());
        assert_eq!(speech.interrupt_calls(), 1);
    }

    #[test]
    fn test_done_callbacks_run_once() {
        let speech = PlaybackSpeech::new();
        let (tx, rx) = unbounded();
        speech.add_done_callback(Box::new(move |id: SpeechId| {
            tx.send(id).unwrap();
        }));

        assert!(speech.finish());
        assert!(!speech.finish());

        assert_eq!(rx.try_recv().unwrap(), speech.id());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_callback_after_finish_runs_immediately() {
        let speech = PlaybackSpeech::new();
        speech.finish();

        let (tx, rx) = unbounded();
        speech.add_done_callback(Box::new(move |id: SpeechId| {
            tx.send(id).unwrap();
        }));
        assert_eq!(rx.try_recv().unwrap(), speech.id());
    }

    #[test]
    fn test_shared_handle_sees_same_state() {
        let speech = PlaybackSpeech::new();
        let shared = speech.shared();
        shared.interrupt();
        assert!(speech.interrupted());
        assert_eq!(shared.id(), speech.id());
    }
}
