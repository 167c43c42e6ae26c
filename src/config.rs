//! Configuration for the interruption session
//!
//! Keyword sets decide how final transcripts are classified while the agent
//! speaks. Resume settings are carried for the host's false-interruption
//! mechanism, which pauses audio instead of cancelling it; this crate only
//! validates and exposes them.

use crate::tokens::classify;
use crate::{InterjectError, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Acknowledgment words that never derail the agent on their own
pub const DEFAULT_FILLER_WORDS: &[&str] = &["yeah", "ok", "okay", "hmm", "uh", "um"];

/// Words that stop the agent wherever they appear in a transcript
pub const DEFAULT_INTERRUPT_WORDS: &[&str] = &["stop", "wait", "no"];

/// Filler and interrupt keyword sets
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeywordSets {
    pub filler: BTreeSet<String>,
    pub interrupt: BTreeSet<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            filler: DEFAULT_FILLER_WORDS.iter().map(|w| w.to_string()).collect(),
            interrupt: DEFAULT_INTERRUPT_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl KeywordSets {
    /// Replace the filler set
    pub fn with_filler<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filler = normalize(words);
        self
    }

    /// Replace the interrupt set
    pub fn with_interrupt<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.interrupt = normalize(words);
        self
    }

    /// Lowercase and trim every keyword
    pub fn normalized(self) -> Self {
        Self {
            filler: normalize(self.filler),
            interrupt: normalize(self.interrupt),
        }
    }

    pub fn is_filler(&self, token: &str) -> bool {
        self.filler.contains(token)
    }

    pub fn is_interrupt(&self, token: &str) -> bool {
        self.interrupt.contains(token)
    }

    /// Validate the keyword sets
    ///
    /// Both sets must be non-empty and disjoint, and every keyword must
    /// survive tokenization as exactly itself, otherwise it could never
    /// match a classified transcript.
    pub fn validate(&self) -> Result<()> {
        if self.filler.is_empty() {
            return Err(InterjectError::ConfigError(
                "Filler keyword set must not be empty".to_string(),
            ));
        }
        if self.interrupt.is_empty() {
            return Err(InterjectError::ConfigError(
                "Interrupt keyword set must not be empty".to_string(),
            ));
        }

        let overlap: Vec<&str> = self
            .filler
            .intersection(&self.interrupt)
            .map(String::as_str)
            .collect();
        if !overlap.is_empty() {
            return Err(InterjectError::ConfigError(format!(
                "Filler and interrupt keywords overlap: {}",
                overlap.join(", ")
            )));
        }

        for word in self.filler.iter().chain(self.interrupt.iter()) {
            let tokens = classify(word);
            if tokens.len() != 1 || tokens[0] != *word {
                return Err(InterjectError::ConfigError(format!(
                    "Keyword '{}' is not a single word token",
                    word
                )));
            }
        }

        Ok(())
    }
}

fn normalize<I, S>(words: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .collect()
}

/// Settings for the host's pause-and-resume handling of false interruptions
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResumeConfig {
    /// Seconds the host keeps audio paused before resuming the same speech
    pub false_interruption_timeout_secs: f64,
    /// Whether the host resumes speech after a false interruption
    pub resume_false_interruption: bool,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            false_interruption_timeout_secs: 1.0,
            resume_false_interruption: true,
        }
    }
}

impl ResumeConfig {
    pub fn validate(&self) -> Result<()> {
        let timeout = self.false_interruption_timeout_secs;
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(InterjectError::ConfigError(format!(
                "False interruption timeout must be a positive number of seconds, got {}",
                timeout
            )));
        }
        Ok(())
    }
}

/// Configuration for an interruption session
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Keyword sets used to classify final transcripts
    pub keywords: KeywordSets,
    /// Host pause-and-resume settings
    pub resume: ResumeConfig,
    /// Event queue capacity for the session worker
    pub channel_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keywords: KeywordSets::default(),
            resume: ResumeConfig::default(),
            channel_buffer_size: 100,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    ///
    /// Missing tables and fields fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            InterjectError::IOError(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            InterjectError::ConfigError(msg) => {
                InterjectError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        Ok(config)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: SessionConfig = toml::from_str(content)
            .map_err(|e| InterjectError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.keywords = config.keywords.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Set the keyword sets
    pub fn with_keywords(mut self, keywords: KeywordSets) -> Self {
        self.keywords = keywords;
        self
    }

    /// Set the resume settings
    pub fn with_resume(mut self, resume: ResumeConfig) -> Self {
        self.resume = resume;
        self
    }

    /// Set the false interruption timeout in seconds
    pub fn with_false_interruption_timeout(mut self, secs: f64) -> Self {
        self.resume.false_interruption_timeout_secs = secs;
        self
    }

    /// Disable resuming after false interruptions
    pub fn without_resume(mut self) -> Self {
        self.resume.resume_false_interruption = false;
        self
    }

    /// Set the channel buffer size
    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.keywords.validate()?;
        self.resume.validate()?;
        if self.channel_buffer_size == 0 {
            return Err(InterjectError::ConfigError(
                "Channel buffer size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.keywords.is_filler("okay"));
        assert!(config.keywords.is_interrupt("wait"));
        assert!(!config.keywords.is_interrupt("okay"));
        assert_eq!(config.resume.false_interruption_timeout_secs, 1.0);
        assert!(config.resume.resume_false_interruption);
        assert_eq!(config.channel_buffer_size, 100);
    }

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::new()
            .with_false_interruption_timeout(2.5)
            .without_resume()
            .with_channel_buffer_size(8);

        assert_eq!(config.resume.false_interruption_timeout_secs, 2.5);
        assert!(!config.resume.resume_false_interruption);
        assert_eq!(config.channel_buffer_size, 8);
    }

    #[test]
    fn test_overlapping_keywords_rejected() {
        let keywords = KeywordSets::default().with_interrupt(["stop", "okay"]);
        let err = keywords.validate().unwrap_err();
        assert!(matches!(err, InterjectError::ConfigError(_)));
        assert!(err.to_string().contains("okay"));
    }

    #[test]
    fn test_empty_sets_rejected() {
        let no_filler = KeywordSets::default().with_filler(Vec::<String>::new());
        assert!(no_filler.validate().is_err());

        let no_interrupt = KeywordSets::default().with_interrupt(Vec::<String>::new());
        assert!(no_interrupt.validate().is_err());
    }

    #[test]
    fn test_multi_word_keyword_rejected() {
        let keywords = KeywordSets::default().with_interrupt(["hold on"]);
        assert!(keywords.validate().is_err());

        let keywords = KeywordSets::default().with_interrupt(["stop!"]);
        assert!(keywords.validate().is_err());
    }

    #[test]
    fn test_builders_lowercase_keywords() {
        let keywords = KeywordSets::default().with_interrupt([" STOP ", "Enough"]);
        assert!(keywords.is_interrupt("stop"));
        assert!(keywords.is_interrupt("enough"));
        assert!(keywords.validate().is_ok());
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        assert!(SessionConfig::new()
            .with_false_interruption_timeout(0.0)
            .validate()
            .is_err());
        assert!(SessionConfig::new()
            .with_false_interruption_timeout(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        assert!(SessionConfig::new()
            .with_channel_buffer_size(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml_str = r#"
            [keywords]
            interrupt = ["Stop", "wait", "hold"]

            [resume]
            false_interruption_timeout_secs = 0.5
        "#;

        let config = SessionConfig::from_toml(toml_str).unwrap();
        assert!(config.keywords.is_interrupt("stop"));
        assert!(config.keywords.is_interrupt("hold"));
        assert!(!config.keywords.is_interrupt("no"));
        // filler falls back to the defaults
        assert!(config.keywords.is_filler("um"));
        assert_eq!(config.resume.false_interruption_timeout_secs, 0.5);
        assert!(config.resume.resume_false_interruption);
    }

    #[test]
    fn test_from_toml_rejects_overlap() {
        let toml_str = r#"
            [keywords]
            filler = ["yeah", "no"]
        "#;
        assert!(SessionConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SessionConfig::load("/nonexistent/interject.toml").unwrap_err();
        assert!(matches!(err, InterjectError::IOError(_)));
    }
}
