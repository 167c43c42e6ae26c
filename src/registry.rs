//! Registry of the currently active utterance
//!
//! At most one utterance is active. The newest one always wins, and a
//! completion only clears the reference if it belongs to the handle still
//! held, so a late completion from a superseded utterance cannot drop a
//! newer one.

use crate::speech::{DoneCallback, SharedSpeech, SpeechId};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
pub struct UtteranceRegistry {
    active: Option<SharedSpeech>,
}

impl UtteranceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a newly created utterance as the active one
    ///
    /// Any previous reference is overwritten. `on_done` is registered on the
    /// handle and must route the completion back through the same ordered
    /// event stream that drives this registry.
    pub fn on_created(&mut self, handle: SharedSpeech, on_done: DoneCallback) {
        let id = handle.id();
        if let Some(previous) = self.active.replace(Arc::clone(&handle)) {
            debug!("Speech {} superseded by {}", previous.id(), id);
        } else {
            debug!("Speech {} is now active", id);
        }
        handle.add_done_callback(on_done);
    }

    /// Handle an utterance completion
    ///
    /// Returns true if the active reference was cleared.
    pub fn on_done(&mut self, id: SpeechId) -> bool {
        if self.active_id() == Some(id) {
            self.active = None;
            debug!("Speech {} completed, registry cleared", id);
            true
        } else {
            debug!("Ignoring stale completion for speech {}", id);
            false
        }
    }

    pub fn active(&self) -> Option<&SharedSpeech> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<SpeechId> {
        self.active.as_ref().map(|h| h.id())
    }

    /// Interrupt the active utterance if it has not been interrupted yet
    ///
    /// Returns true if `interrupt()` was invoked on a handle. Missing or
    /// already interrupted handles are silently skipped.
    pub fn interrupt_active(&self) -> bool {
        match &self.active {
            Some(handle) if !handle.interrupted() => {
                info!("Interrupting speech {}", handle.id());
                handle.interrupt();
                true
            }
            Some(handle) => {
                debug!("Speech {} already interrupted", handle.id());
                false
            }
            None => {
                debug!("No active speech to interrupt");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{PlaybackSpeech, SpeechHandle};
    use crossbeam_channel::{unbounded, Sender};

    fn forward(tx: &Sender<SpeechId>) -> DoneCallback {
        let tx = tx.clone();
        Box::new(move |id: SpeechId| {
            let _ = tx.send(id);
        })
    }

    #[test]
    fn test_created_becomes_active() {
        let (tx, _rx) = unbounded();
        let mut registry = UtteranceRegistry::new();
        assert!(registry.active().is_none());

        let speech = PlaybackSpeech::new();
        registry.on_created(speech.shared(), forward(&tx));
        assert_eq!(registry.active_id(), Some(speech.id()));
    }

    #[test]
    fn test_completion_clears_matching_handle() {
        let (tx, rx) = unbounded();
        let mut registry = UtteranceRegistry::new();
        let speech = PlaybackSpeech::new();
        registry.on_created(speech.shared(), forward(&tx));

        speech.finish();
        let id = rx.try_recv().unwrap();
        assert!(registry.on_done(id));
        assert!(registry.active().is_none());
    }

    #[test]
    fn test_stale_completion_keeps_newer_handle() {
        let (tx, rx) = unbounded();
        let mut registry = UtteranceRegistry::new();
        let a = PlaybackSpeech::new();
        let b = PlaybackSpeech::new();

        registry.on_created(a.shared(), forward(&tx));
        registry.on_created(b.shared(), forward(&tx));

        a.finish();
        let id = rx.try_recv().unwrap();
        assert_eq!(id, a.id());
        assert!(!registry.on_done(id));
        assert_eq!(registry.active_id(), Some(b.id()));
    }

    #[test]
    fn test_interrupt_active_is_idempotent() {
        let (tx, _rx) = unbounded();
        let mut registry = UtteranceRegistry::new();
        let speech = PlaybackSpeech::new();
        registry.on_created(speech.shared(), forward(&tx));

        assert!(registry.interrupt_active());
        assert!(!registry.interrupt_active());
        assert_eq!(speech.interrupt_calls(), 1);
        assert!(speech.interrupted());
    }

    #[test]
    fn test_interrupt_without_handle_is_noop() {
        let registry = UtteranceRegistry::new();
        assert!(!registry.interrupt_active());
    }

    #[test]
    fn test_interrupted_handle_stays_active_until_done() {
        let (tx, rx) = unbounded();
        let mut registry = UtteranceRegistry::new();
        let speech = PlaybackSpeech::new();
        registry.on_created(speech.shared(), forward(&tx));

        registry.interrupt_active();
        assert_eq!(registry.active_id(), Some(speech.id()));

        speech.finish();
        assert!(registry.on_done(rx.try_recv().unwrap()));
        assert!(registry.active().is_none());
    }
}
