//! Interject - interruption arbitration for voice agents
//!
//! Decides whether the agent's current utterance keeps playing or gets cut
//! off, based on agent playback state transitions and final user
//! transcripts. Filler acknowledgments ("yeah", "um") are ignored, interrupt
//! keywords ("stop", "wait", "no") and any other substantive speech cancel
//! the active utterance.

pub mod arbiter;
pub mod config;
pub mod error;
pub mod playback;
pub mod registry;
pub mod scenario;
pub mod session;
pub mod speech;
pub mod state;
pub mod tokens;

// Re-export error types
pub use error::{InterjectError, Result};

pub use arbiter::{Decision, IgnoreReason, InterruptCause, InterruptionArbiter, TranscriptEvent};
pub use config::{KeywordSets, ResumeConfig, SessionConfig};
pub use playback::{AgentState, PlaybackState, PlaybackTracker};
pub use registry::UtteranceRegistry;
pub use session::{SessionCore, SessionEvent, SessionHandle, SessionNotice, SessionWorker};
pub use speech::{DoneCallback, PlaybackSpeech, SharedSpeech, SpeechHandle, SpeechId};
pub use state::{SessionState, SharedSessionState};
pub use tokens::classify;
