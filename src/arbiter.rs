//! Interruption arbitration
//!
//! Decides, for each final transcript heard while the agent speaks, whether
//! the active utterance keeps going or gets cut off:
//! - any interrupt keyword anywhere cancels the speech
//! - a transcript made only of filler words is ignored
//! - anything else is treated as a real overlapping utterance and cancels
//!
//! The arbiter holds no state between calls. Speaking state and the active
//! handle live in [`PlaybackTracker`] and [`UtteranceRegistry`].

use crate::config::KeywordSets;
use crate::playback::PlaybackTracker;
use crate::registry::UtteranceRegistry;
use crate::tokens::classify;
use tracing::{debug, info};

/// A transcription event from the STT engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
}

impl TranscriptEvent {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// Why a transcript caused an interruption
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterruptCause {
    /// An interrupt keyword was heard (first one in the transcript)
    Keyword(String),
    /// Substantive speech that is not pure filler
    Overlap,
}

/// Why a transcript was ignored
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Interim transcript, not acted on
    Partial,
    /// The agent was not speaking
    NotSpeaking,
    /// No word tokens in the transcript
    Empty,
    /// Only acknowledgment words
    Filler,
}

/// Outcome of arbitrating one transcript
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Ignored(IgnoreReason),
    /// `delivered` is false when there was no active handle or it had
    /// already been interrupted
    Interrupt {
        cause: InterruptCause,
        delivered: bool,
    },
}

impl Decision {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Decision::Interrupt { .. })
    }

    /// Short snake_case name of the outcome
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Ignored(IgnoreReason::Partial) => "partial",
            Decision::Ignored(IgnoreReason::NotSpeaking) => "not_speaking",
            Decision::Ignored(IgnoreReason::Empty) => "empty",
            Decision::Ignored(IgnoreReason::Filler) => "filler",
            Decision::Interrupt {
                cause: InterruptCause::Keyword(_),
                ..
            } => "keyword",
            Decision::Interrupt {
                cause: InterruptCause::Overlap,
                ..
            } => "overlap",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Ignored(_) => write!(f, "ignored ({})", self.label()),
            Decision::Interrupt {
                cause: InterruptCause::Keyword(word),
                delivered,
            } => write!(f, "interrupt on '{}' (delivered: {})", word, delivered),
            Decision::Interrupt {
                cause: InterruptCause::Overlap,
                delivered,
            } => write!(f, "interrupt on overlap (delivered: {})", delivered),
        }
    }
}

/// Classification of a token sequence against the keyword sets
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Empty,
    Filler,
    Interrupt(InterruptCause),
}

/// Stateless decision policy over tracker and registry state
#[derive(Clone, Debug)]
pub struct InterruptionArbiter {
    keywords: KeywordSets,
}

impl InterruptionArbiter {
    pub fn new(keywords: KeywordSets) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &KeywordSets {
        &self.keywords
    }

    /// Apply the keyword policy to already classified tokens
    ///
    /// One interrupt keyword is enough; filler must be unanimous.
    pub fn judge(&self, tokens: &[String]) -> Verdict {
        if tokens.is_empty() {
            return Verdict::Empty;
        }
        if let Some(word) = tokens.iter().find(|t| self.keywords.is_interrupt(t)) {
            return Verdict::Interrupt(InterruptCause::Keyword(word.clone()));
        }
        if tokens.iter().all(|t| self.keywords.is_filler(t)) {
            return Verdict::Filler;
        }
        Verdict::Interrupt(InterruptCause::Overlap)
    }

    /// Arbitrate any transcript event, dropping partial ones first
    pub fn on_transcript(
        &self,
        event: &TranscriptEvent,
        playback: &PlaybackTracker,
        registry: &UtteranceRegistry,
    ) -> Decision {
        if !event.is_final {
            debug!("Dropping partial transcript: '{}'", event.text);
            return Decision::Ignored(IgnoreReason::Partial);
        }
        self.on_final_transcript(&event.text, playback, registry)
    }

    /// Arbitrate a final transcript
    pub fn on_final_transcript(
        &self,
        text: &str,
        playback: &PlaybackTracker,
        registry: &UtteranceRegistry,
    ) -> Decision {
        if !playback.is_speaking() {
            debug!("Agent not speaking, ignoring transcript: '{}'", text);
            return Decision::Ignored(IgnoreReason::NotSpeaking);
        }

        let tokens = classify(text);
        match self.judge(&tokens) {
            Verdict::Empty => {
                debug!("Transcript has no words, ignoring: '{}'", text);
                Decision::Ignored(IgnoreReason::Empty)
            }
            Verdict::Filler => {
                info!("User said a filler word, continuing speech");
                Decision::Ignored(IgnoreReason::Filler)
            }
            Verdict::Interrupt(cause) => {
                match &cause {
                    InterruptCause::Keyword(word) => {
                        info!("User interruption detected ('{}'), stopping speech", word)
                    }
                    InterruptCause::Overlap => {
                        info!("Overlapping user input detected, stopping speech")
                    }
                }
                let delivered = registry.interrupt_active();
                Decision::Interrupt { cause, delivered }
            }
        }
    }
}

impl Default for InterruptionArbiter {
    fn default() -> Self {
        Self::new(KeywordSets::default())
    }
}
