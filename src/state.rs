//! Observable session state
//!
//! Written only by the session worker after each event, read by anyone
//! (host UI, tests, the scenario runner) without going through the queue.

use crate::arbiter::{Decision, IgnoreReason};
use crate::speech::SpeechId;
use parking_lot::RwLock;
use std::sync::Arc;

/// Counters and latest values describing the session
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    /// Whether the agent is currently speaking
    pub agent_speaking: bool,
    /// Identity of the active utterance, if any
    pub active_speech: Option<SpeechId>,
    /// Transcript events received, partial or final
    pub transcripts_seen: u64,
    /// Partial transcripts dropped without arbitration
    pub partials_dropped: u64,
    /// Final transcripts ignored as pure filler
    pub fillers_ignored: u64,
    /// Interrupts actually delivered to a handle
    pub interrupts_issued: u64,
    /// Text of the last final transcript
    pub last_transcript: Option<String>,
    /// Last decision the arbiter made
    pub last_decision: Option<Decision>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a decision into the counters
    pub fn record_decision(&mut self, decision: &Decision) {
        match decision {
            Decision::Ignored(IgnoreReason::Partial) => self.partials_dropped += 1,
            Decision::Ignored(IgnoreReason::Filler) => self.fillers_ignored += 1,
            Decision::Interrupt {
                delivered: true, ..
            } => self.interrupts_issued += 1,
            _ => {}
        }
        self.last_decision = Some(decision.clone());
    }
}

/// Thread-safe shared session state
#[derive(Clone, Default)]
pub struct SharedSessionState {
    inner: Arc<RwLock<SessionState>>,
}

impl SharedSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, SessionState> {
        self.inner.read()
    }

    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, SessionState> {
        self.inner.write()
    }

    /// Copy of the current state (no lock held after return)
    pub fn snapshot(&self) -> SessionState {
        self.inner.read().clone()
    }

    pub fn is_agent_speaking(&self) -> bool {
        self.inner.read().agent_speaking
    }

    pub fn active_speech(&self) -> Option<SpeechId> {
        self.inner.read().active_speech
    }

    pub fn interrupts_issued(&self) -> u64 {
        self.inner.read().interrupts_issued
    }

    pub fn fillers_ignored(&self) -> u64 {
        self.inner.read().fillers_ignored
    }

    pub fn last_decision(&self) -> Option<Decision> {
        self.inner.read().last_decision.clone()
    }
}
