//! Interruption session: the single ordering authority for all events
//!
//! Playback transitions, utterance creation and completion, and transcripts
//! all pass through one queue and are applied one at a time by a single
//! worker thread. The tracker, registry and arbiter are not thread-safe on
//! their own and rely on this serialization.
//!
//! Hosts that already deliver events sequentially can drive a
//! [`SessionCore`] directly instead of starting a worker.

use crate::arbiter::{Decision, InterruptionArbiter, TranscriptEvent};
use crate::config::{ResumeConfig, SessionConfig};
use crate::playback::{AgentState, PlaybackTracker};
use crate::registry::UtteranceRegistry;
use crate::speech::{SharedSpeech, SpeechId};
use crate::state::SharedSessionState;
use crate::{InterjectError, Result};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender, TrySendError};
use std::fmt;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Events delivered by the host session
pub enum SessionEvent {
    /// Agent state changed
    PlaybackChanged { old: AgentState, new: AgentState },
    /// A new utterance started being produced
    SpeechCreated(SharedSpeech),
    /// An utterance finished (normally reported by the handle itself)
    SpeechDone(SpeechId),
    /// Partial or final user transcript
    Transcript(TranscriptEvent),
    /// Stop the worker
    Shutdown,
}

impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::PlaybackChanged { old, new } => f
                .debug_struct("PlaybackChanged")
                .field("old", old)
                .field("new", new)
                .finish(),
            SessionEvent::SpeechCreated(handle) => {
                f.debug_tuple("SpeechCreated").field(&handle.id()).finish()
            }
            SessionEvent::SpeechDone(id) => f.debug_tuple("SpeechDone").field(id).finish(),
            SessionEvent::Transcript(event) => f.debug_tuple("Transcript").field(event).finish(),
            SessionEvent::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Notifications emitted by the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionNotice {
    /// The speaking flag flipped
    SpeakingChanged(bool),
    /// A transcript was arbitrated
    Decision(Decision),
    /// The worker has stopped
    Shutdown,
}

/// Tracker, registry and arbiter applied in event order
///
/// Completions reported by handles land on an internal channel and are
/// applied before the next event passed to [`SessionCore::apply`], or
/// explicitly with [`SessionCore::pump_completions`].
pub struct SessionCore {
    config: SessionConfig,
    playback: PlaybackTracker,
    registry: UtteranceRegistry,
    arbiter: InterruptionArbiter,
    state: SharedSessionState,
    completion_tx: Sender<SpeechId>,
    completion_rx: Receiver<SpeechId>,
}

impl SessionCore {
    /// Create a core after validating the configuration
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_state(config, SharedSessionState::new())
    }

    /// Create a core that publishes into an existing shared state
    pub fn with_state(config: SessionConfig, state: SharedSessionState) -> Result<Self> {
        config.validate()?;
        let (completion_tx, completion_rx) = unbounded();
        let arbiter = InterruptionArbiter::new(config.keywords.clone());

        Ok(Self {
            config,
            playback: PlaybackTracker::new(),
            registry: UtteranceRegistry::new(),
            arbiter,
            state,
            completion_tx,
            completion_rx,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn resume_config(&self) -> &ResumeConfig {
        &self.config.resume
    }

    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    pub fn is_speaking(&self) -> bool {
        self.playback.is_speaking()
    }

    pub fn active_speech(&self) -> Option<SpeechId> {
        self.registry.active_id()
    }

    /// Receiver for completions reported by registered handles
    pub fn completion_receiver(&self) -> Receiver<SpeechId> {
        self.completion_rx.clone()
    }

    /// Apply one event, after any completions that are already pending
    ///
    /// `Shutdown` is a worker concern and is ignored here.
    pub fn apply(&mut self, event: SessionEvent) -> Option<SessionNotice> {
        self.pump_completions();
        match event {
            SessionEvent::PlaybackChanged { old, new } => self
                .on_playback_changed(old, new)
                .map(SessionNotice::SpeakingChanged),
            SessionEvent::SpeechCreated(handle) => {
                self.on_speech_created(handle);
                None
            }
            SessionEvent::SpeechDone(id) => {
                self.on_speech_done(id);
                None
            }
            SessionEvent::Transcript(event) => {
                Some(SessionNotice::Decision(self.on_transcript(event)))
            }
            SessionEvent::Shutdown => None,
        }
    }

    /// Apply every completion currently queued
    pub fn pump_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(id) = self.completion_rx.try_recv() {
            self.on_speech_done(id);
            applied += 1;
        }
        applied
    }

    /// Returns the new speaking flag if it changed
    pub fn on_playback_changed(&mut self, old: AgentState, new: AgentState) -> Option<bool> {
        let was_speaking = self.playback.is_speaking();
        self.playback.on_transition(old, new);
        let speaking = self.playback.is_speaking();

        self.state.write().agent_speaking = speaking;
        (speaking != was_speaking).then_some(speaking)
    }

    pub fn on_speech_created(&mut self, handle: SharedSpeech) {
        let completion_tx = self.completion_tx.clone();
        let id = handle.id();
        self.registry.on_created(
            handle,
            Box::new(move |done_id| {
                if completion_tx.send(done_id).is_err() {
                    debug!("Session gone, dropping completion for speech {}", done_id);
                }
            }),
        );
        // The callback may already have fired for a handle that was done
        // before it reached us; it is applied on the next pump.
        self.state.write().active_speech = Some(id);
    }

    /// Returns true if the active utterance was cleared
    pub fn on_speech_done(&mut self, id: SpeechId) -> bool {
        let cleared = self.registry.on_done(id);
        if cleared {
            self.state.write().active_speech = None;
        }
        cleared
    }

    pub fn on_transcript(&mut self, event: TranscriptEvent) -> Decision {
        let decision = self
            .arbiter
            .on_transcript(&event, &self.playback, &self.registry);

        let mut state = self.state.write();
        state.transcripts_seen += 1;
        if event.is_final {
            state.last_transcript = Some(event.text);
        }
        state.record_decision(&decision);
        decision
    }
}

/// Handle for feeding events to a running session and observing it
pub struct SessionHandle {
    event_tx: Sender<SessionEvent>,
    notice_rx: Receiver<SessionNotice>,
    state: SharedSessionState,
    resume: ResumeConfig,
}

impl SessionHandle {
    /// Create a session
    ///
    /// Returns both the handle (for sending events and receiving notices)
    /// and the worker (to be started in a separate thread). Fails if the
    /// configuration is invalid.
    pub fn new(config: SessionConfig) -> Result<(Self, SessionWorker)> {
        let buffer_size = config.channel_buffer_size;
        let state = SharedSessionState::new();
        let resume = config.resume.clone();
        let core = SessionCore::with_state(config, state.clone())?;

        let (event_tx, event_rx) = bounded(buffer_size);
        let (notice_tx, notice_rx) = bounded(buffer_size);

        let handle = Self {
            event_tx,
            notice_rx,
            state,
            resume,
        };

        let worker = SessionWorker {
            core,
            event_rx,
            notice_tx,
        };

        Ok((handle, worker))
    }

    /// Send an event to the session
    pub fn send_event(&self, event: SessionEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| InterjectError::ChannelError(format!("Failed to send event: {}", e)))
    }

    /// Report an agent state transition
    pub fn playback_changed(&self, old: AgentState, new: AgentState) -> Result<()> {
        self.send_event(SessionEvent::PlaybackChanged { old, new })
    }

    /// Report a newly created utterance
    pub fn speech_created(&self, handle: SharedSpeech) -> Result<()> {
        self.send_event(SessionEvent::SpeechCreated(handle))
    }

    /// Report an utterance completion on behalf of its handle
    pub fn speech_done(&self, id: SpeechId) -> Result<()> {
        self.send_event(SessionEvent::SpeechDone(id))
    }

    /// Report a user transcript
    pub fn transcript(&self, text: impl Into<String>, is_final: bool) -> Result<()> {
        self.send_event(SessionEvent::Transcript(TranscriptEvent {
            text: text.into(),
            is_final,
        }))
    }

    /// Request shutdown
    pub fn shutdown(&self) -> Result<()> {
        self.send_event(SessionEvent::Shutdown)
    }

    /// Get a sender for events from other threads
    pub fn event_sender(&self) -> Sender<SessionEvent> {
        self.event_tx.clone()
    }

    /// Try to receive a notice (non-blocking)
    pub fn try_recv_notice(&self) -> Option<SessionNotice> {
        self.notice_rx.try_recv().ok()
    }

    /// Receive a notice (blocking)
    pub fn recv_notice(&self) -> Result<SessionNotice> {
        self.notice_rx
            .recv()
            .map_err(|e| InterjectError::ChannelError(format!("Failed to receive notice: {}", e)))
    }

    /// Receive a notice, giving up after `timeout`
    pub fn recv_notice_timeout(&self, timeout: Duration) -> Result<SessionNotice> {
        self.notice_rx
            .recv_timeout(timeout)
            .map_err(|e| InterjectError::ChannelError(format!("Failed to receive notice: {}", e)))
    }

    /// Get the shared session state
    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    /// Resume settings for the host's false-interruption handling
    pub fn resume_config(&self) -> &ResumeConfig {
        &self.resume
    }
}

/// Worker that applies session events on a dedicated thread
pub struct SessionWorker {
    core: SessionCore,
    event_rx: Receiver<SessionEvent>,
    notice_tx: Sender<SessionNotice>,
}

impl SessionWorker {
    /// Start the worker thread
    pub fn start(self) -> JoinHandle<()> {
        thread::spawn(move || {
            if let Err(e) = self.run() {
                error!("Session worker error: {}", e);
            }
        })
    }

    fn run(mut self) -> Result<()> {
        info!("Session worker starting");
        let completion_rx = self.core.completion_receiver();

        loop {
            select! {
                recv(self.event_rx) -> event => {
                    match event {
                        Ok(SessionEvent::Shutdown) => {
                            info!("Session worker received shutdown");
                            self.emit(SessionNotice::Shutdown);
                            break;
                        }
                        Ok(event) => {
                            debug!("Applying {:?}", event);
                            if let Some(notice) = self.core.apply(event) {
                                self.emit(notice);
                            }
                        }
                        Err(_) => {
                            warn!("Session event channel disconnected");
                            break;
                        }
                    }
                }

                recv(completion_rx) -> done => {
                    if let Ok(id) = done {
                        self.core.on_speech_done(id);
                    }
                }
            }
        }

        info!("Session worker stopped");
        Ok(())
    }

    /// Emit a notice without ever blocking the decision path
    fn emit(&self, notice: SessionNotice) {
        match self.notice_tx.try_send(notice) {
            Ok(()) => {}
            Err(TrySendError::Full(notice)) => {
                warn!("Notice queue full, dropping {:?}", notice);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("No notice listener");
            }
        }
    }
}
