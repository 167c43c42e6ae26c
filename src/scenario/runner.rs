//! Scenario runner
//!
//! Replays scenario steps through a session core using in-process speech
//! handles, checking assertions after each step.

use super::{Assertion, Scenario, StepAction};
use crate::arbiter::TranscriptEvent;
use crate::config::SessionConfig;
use crate::session::{SessionCore, SessionEvent};
use crate::speech::{PlaybackSpeech, SpeechHandle};
use crate::Result;
use std::collections::HashMap;
use tracing::{debug, error, info};

/// Result of an assertion check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionResult {
    Passed,
    Failed(String),
}

/// Outcome of one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub failures: Vec<String>,
}

impl ScenarioReport {
    pub fn summary(&self) -> String {
        let status = if self.passed { "PASSED" } else { "FAILED" };
        format!(
            "Scenario '{}' {}: {} steps, {} failed assertions",
            self.name,
            status,
            self.steps_run,
            self.failures.len()
        )
    }
}

/// Replays one scenario
pub struct ScenarioRunner {
    scenario: Scenario,
    core: SessionCore,
    speeches: HashMap<String, PlaybackSpeech>,
}

impl ScenarioRunner {
    /// Create a runner; fails if the configuration is invalid
    pub fn new(scenario: Scenario, config: SessionConfig) -> Result<Self> {
        info!("Loaded scenario: {}", scenario.scenario.name);
        if !scenario.scenario.description.is_empty() {
            debug!("Description: {}", scenario.scenario.description);
        }
        let core = SessionCore::new(config)?;

        Ok(Self {
            scenario,
            core,
            speeches: HashMap::new(),
        })
    }

    /// Run every step and collect assertion failures
    pub fn run(mut self) -> ScenarioReport {
        let steps = std::mem::take(&mut self.scenario.steps);
        let mut failures = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            debug!("Step {}: {:?}", index + 1, step.action);
            self.execute(&step.action);

            for assertion in &step.asserts {
                if let AssertionResult::Failed(reason) = self.check_assertion(assertion) {
                    error!("Step {} FAIL: {:?} - {}", index + 1, assertion, reason);
                    failures.push(format!("step {}: {}", index + 1, reason));
                }
            }
        }

        let report = ScenarioReport {
            name: self.scenario.scenario.name.clone(),
            passed: failures.is_empty(),
            steps_run: steps.len(),
            failures,
        };
        info!("{}", report.summary());
        report
    }

    fn execute(&mut self, action: &StepAction) {
        match action {
            StepAction::Playback { old, new } => {
                self.core.apply(SessionEvent::PlaybackChanged {
                    old: *old,
                    new: *new,
                });
            }
            StepAction::SpeechCreated { speech } => {
                let handle = PlaybackSpeech::new();
                self.core
                    .apply(SessionEvent::SpeechCreated(handle.shared()));
                self.speeches.insert(speech.clone(), handle);
            }
            StepAction::SpeechDone { speech } => {
                if let Some(handle) = self.speeches.get(speech) {
                    handle.finish();
                }
                // the handle reports through the completion channel
                self.core.pump_completions();
            }
            StepAction::Transcript { text, is_final } => {
                self.core.apply(SessionEvent::Transcript(TranscriptEvent {
                    text: text.clone(),
                    is_final: *is_final,
                }));
            }
            StepAction::Log { message } => {
                info!("Scenario log: {}", message);
            }
        }
    }

    fn speech(&self, label: &str) -> Option<&PlaybackSpeech> {
        self.speeches.get(label)
    }

    /// Check an assertion against the current session and handle state
    pub fn check_assertion(&self, assertion: &Assertion) -> AssertionResult {
        let state = self.core.state().snapshot();

        let check = |ok: bool, reason: String| {
            if ok {
                AssertionResult::Passed
            } else {
                AssertionResult::Failed(reason)
            }
        };

        match assertion {
            Assertion::IsSpeaking => check(
                state.agent_speaking,
                "Expected agent to be speaking".to_string(),
            ),
            Assertion::IsIdle => check(
                !state.agent_speaking,
                "Expected agent not to be speaking".to_string(),
            ),
            Assertion::NoActiveSpeech => check(
                state.active_speech.is_none(),
                "Expected no active speech".to_string(),
            ),
            Assertion::ActiveSpeech { speech } => {
                let expected = self.speech(speech).map(|h| h.id());
                check(
                    expected.is_some() && state.active_speech == expected,
                    format!("Expected '{}' to be the active speech", speech),
                )
            }
            Assertion::Interrupted { speech } => check(
                self.speech(speech).is_some_and(|h| h.interrupted()),
                format!("Expected '{}' to be interrupted", speech),
            ),
            Assertion::NotInterrupted { speech } => check(
                self.speech(speech).is_some_and(|h| !h.interrupted()),
                format!("Expected '{}' not to be interrupted", speech),
            ),
            Assertion::InterruptCount { speech, count } => {
                let actual = self.speech(speech).map(|h| h.interrupt_calls());
                check(
                    actual == Some(*count),
                    format!(
                        "Expected '{}' to receive {} interrupt calls, got {:?}",
                        speech, count, actual
                    ),
                )
            }
            Assertion::Decision { label } => {
                let actual = state.last_decision.as_ref().map(|d| d.label());
                check(
                    actual == Some(label.as_str()),
                    format!("Expected last decision '{}', got {:?}", label, actual),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::BUILTIN_SCENARIOS;

    fn run(toml_str: &str) -> ScenarioReport {
        let scenario = Scenario::parse(toml_str).unwrap();
        ScenarioRunner::new(scenario, SessionConfig::default())
            .unwrap()
            .run()
    }

    #[test]
    fn test_builtin_scenarios_pass() {
        for (name, content) in BUILTIN_SCENARIOS {
            let report = run(content);
            assert!(report.passed, "{}: {:?}", name, report.failures);
        }
    }

    #[test]
    fn test_failed_assertion_reported() {
        let report = run(r#"
            [scenario]
            name = "Wrong expectation"

            [[steps]]
            action = { type = "transcript", text = "stop" }
            assert = [{ type = "is_speaking" }]
        "#);

        assert!(!report.passed);
        assert_eq!(report.failures.len(), 1);
        assert!(report.summary().contains("FAILED"));
    }

    #[test]
    fn test_repeated_keywords_interrupt_once() {
        let report = run(r#"
            [scenario]
            name = "Idempotent interrupt"

            [[steps]]
            action = { type = "playback", old = "listening", new = "speaking" }

            [[steps]]
            action = { type = "speech_created", speech = "h" }

            [[steps]]
            action = { type = "transcript", text = "stop" }

            [[steps]]
            action = { type = "transcript", text = "Stop!" }
            assert = [
                { type = "interrupt_count", speech = "h", count = 1 },
                { type = "decision", label = "keyword" },
            ]
        "#);
        assert!(report.passed, "{:?}", report.failures);
        assert_eq!(report.steps_run, 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let scenario = Scenario::parse(BUILTIN_SCENARIOS[0].1).unwrap();
        let config = SessionConfig::new().with_channel_buffer_size(0);
        assert!(ScenarioRunner::new(scenario, config).is_err());
    }
}
