//! Scripted event scenarios
//!
//! A scenario is a TOML file listing host events in delivery order, with
//! optional assertions checked after each step. Scenarios are replayed
//! through a [`SessionCore`](crate::session::SessionCore) by the
//! [`ScenarioRunner`].

mod runner;

pub use runner::{AssertionResult, ScenarioReport, ScenarioRunner};

use crate::playback::AgentState;
use crate::{InterjectError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Scenarios shipped with the crate, as (file name, TOML text)
pub const BUILTIN_SCENARIOS: &[(&str, &str)] = &[
    (
        "filler_ignored.toml",
        include_str!("../../scenarios/filler_ignored.toml"),
    ),
    (
        "keyword_interrupt.toml",
        include_str!("../../scenarios/keyword_interrupt.toml"),
    ),
    (
        "overlap_interrupt.toml",
        include_str!("../../scenarios/overlap_interrupt.toml"),
    ),
    (
        "idle_guard.toml",
        include_str!("../../scenarios/idle_guard.toml"),
    ),
    (
        "stale_completion.toml",
        include_str!("../../scenarios/stale_completion.toml"),
    ),
];

/// A scenario loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub scenario: ScenarioMetadata,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One host event plus the assertions checked after it
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioStep {
    pub action: StepAction,
    #[serde(default, rename = "assert")]
    pub asserts: Vec<Assertion>,
}

/// Host events a scenario can replay
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    /// Agent state transition
    Playback { old: AgentState, new: AgentState },
    /// New utterance, referred to by `speech` in later steps
    SpeechCreated { speech: String },
    /// The named utterance finishes and reports completion
    SpeechDone { speech: String },
    /// User transcript
    Transcript {
        text: String,
        #[serde(default = "default_final")]
        is_final: bool,
    },
    /// Log a message, no event
    Log { message: String },
}

fn default_final() -> bool {
    true
}

/// Checks against session and handle state
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    IsSpeaking,
    IsIdle,
    ActiveSpeech { speech: String },
    NoActiveSpeech,
    Interrupted { speech: String },
    NotInterrupted { speech: String },
    /// Exact number of `interrupt()` calls the handle received
    InterruptCount { speech: String, count: usize },
    /// Label of the last decision, e.g. "filler" or "keyword"
    Decision { label: String },
}

impl Assertion {
    fn speech_label(&self) -> Option<&str> {
        match self {
            Assertion::ActiveSpeech { speech }
            | Assertion::Interrupted { speech }
            | Assertion::NotInterrupted { speech }
            | Assertion::InterruptCount { speech, .. } => Some(speech.as_str()),
            _ => None,
        }
    }
}

impl Scenario {
    /// Load a scenario from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            InterjectError::IOError(format!(
                "Failed to read scenario '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content).map_err(|e| match e {
            InterjectError::ScenarioError(msg) => {
                InterjectError::ScenarioError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse and validate a scenario from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)
            .map_err(|e| InterjectError::ScenarioError(format!("Failed to parse: {}", e)))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Validate the scenario
    ///
    /// There must be at least one step, speech labels must be unique, and a
    /// label must be created before any step refers to it.
    fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(InterjectError::ScenarioError(
                "Scenario must have at least one step".to_string(),
            ));
        }

        let mut known: HashSet<&str> = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            match &step.action {
                StepAction::SpeechCreated { speech } => {
                    if !known.insert(speech.as_str()) {
                        return Err(InterjectError::ScenarioError(format!(
                            "Step {}: speech '{}' created twice",
                            index + 1,
                            speech
                        )));
                    }
                }
                StepAction::SpeechDone { speech } if !known.contains(speech.as_str()) => {
                    return Err(unknown_speech(index, speech));
                }
                _ => {}
            }

            for assertion in &step.asserts {
                if let Some(speech) = assertion.speech_label() {
                    if !known.contains(speech) {
                        return Err(unknown_speech(index, speech));
                    }
                }
            }
        }

        Ok(())
    }
}

fn unknown_speech(index: usize, speech: &str) -> InterjectError {
    InterjectError::ScenarioError(format!(
        "Step {}: speech '{}' used before it was created",
        index + 1,
        speech
    ))
}
