//! Voice command capture
//!
//! Speech-to-text is an external collaborator exposed through [`SpeechInput`].
//! When listening stops, a [`SettleTimer`] waits for the final transcript to
//! land; the parser then runs exactly once on it and a recognised command is
//! staged in the [`ConfirmationController`].

mod settle;

use std::{sync::Arc, time::Duration, time::Instant};

use serde::{Deserialize, Serialize};

pub use settle::{PendingSlot, SettleTimer};

use crate::{
    confirmation::{CommandPreview, ConfirmationController, ConfirmationError},
    parser::CommandParser,
    store::EntityStore,
};

/// Speech-to-text engine as seen by the pipeline
pub trait SpeechInput: Send {
    fn is_supported(&self) -> bool;
    fn is_listening(&self) -> bool;
    /// Transcript accumulated since the last reset
    fn transcript(&self) -> String;
    fn start_listening(&mut self);
    fn stop_listening(&mut self);
    fn reset_transcript(&mut self);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceConfig {
    /// Wait after listening stops before the transcript is parsed
    pub settle_delay_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 600,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Speech recognition is not supported on this device")]
    Unsupported,

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
}

/// Result of polling the session
#[derive(Debug, Clone, PartialEq)]
pub enum VoicePoll {
    /// Listening, settling, or nothing captured
    Waiting,
    /// The transcript held no actionable command
    NoCommand { transcript: String },
    /// A command is now awaiting confirmation
    Staged(CommandPreview),
}

pub struct VoiceCommandSession<S: SpeechInput> {
    speech: S,
    store: Arc<dyn EntityStore>,
    parser: CommandParser,
    controller: ConfirmationController,
    timer: SettleTimer,
    transcript: PendingSlot<String>,
    was_listening: bool,
}

impl<S: SpeechInput> VoiceCommandSession<S> {
    pub fn new(
        speech: S,
        store: Arc<dyn EntityStore>,
        parser: CommandParser,
        config: &VoiceConfig,
    ) -> Self {
        let controller = ConfirmationController::new(store.clone());
        Self {
            speech,
            store,
            parser,
            controller,
            timer: SettleTimer::new(Duration::from_millis(config.settle_delay_ms)),
            transcript: PendingSlot::new(),
            was_listening: false,
        }
    }

    pub fn speech(&self) -> &S {
        &self.speech
    }

    pub fn speech_mut(&mut self) -> &mut S {
        &mut self.speech
    }

    pub fn controller(&self) -> &ConfirmationController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ConfirmationController {
        &mut self.controller
    }

    pub fn is_settling(&self) -> bool {
        self.timer.is_armed()
    }

    /// Begin a new capture. A command still awaiting confirmation is discarded
    /// first, as is any transcript that has not been parsed yet.
    pub fn start_listening(&mut self) -> Result<(), VoiceError> {
        if !self.speech.is_supported() {
            return Err(VoiceError::Unsupported);
        }
        self.controller.cancel();
        self.reset_capture();
        self.speech.reset_transcript();
        self.speech.start_listening();
        self.was_listening = true;
        tracing::info!("[VOICE] Listening");
        Ok(())
    }

    pub fn stop_listening(&mut self, now: Instant) {
        self.speech.stop_listening();
        self.observe(now);
    }

    /// Sample the engine. Must be called whenever its listening flag or
    /// transcript may have changed.
    pub fn observe(&mut self, now: Instant) {
        let listening = self.speech.is_listening();

        if listening && !self.was_listening {
            // listening restarted outside start_listening
            self.controller.cancel();
            self.reset_capture();
        } else if !listening && self.was_listening {
            tracing::debug!("[VOICE] Listening stopped, settling for {:?}", self.timer.delay());
            self.transcript.put(self.speech.transcript());
            self.timer.arm(now);
        } else if !listening && self.timer.is_armed() {
            // late transcript updates while settling
            self.transcript.put(self.speech.transcript());
        }

        self.was_listening = listening;
    }

    /// Parse the captured transcript once the settle delay has elapsed
    pub async fn poll(&mut self, now: Instant) -> Result<VoicePoll, VoiceError> {
        self.observe(now);
        if !self.timer.fire_if_due(now) {
            return Ok(VoicePoll::Waiting);
        }
        let Some(transcript) = self.transcript.take() else {
            return Ok(VoicePoll::Waiting);
        };
        if transcript.trim().is_empty() {
            return Ok(VoicePoll::Waiting);
        }

        let tasks = self
            .store
            .list_tasks()
            .await
            .map_err(ConfirmationError::from)?;
        let Some(command) = self.parser.parse(&transcript, &tasks) else {
            tracing::info!("[VOICE] No command in '{}'", transcript);
            return Ok(VoicePoll::NoCommand { transcript });
        };

        let preview = self.controller.propose(command).await?.clone();
        Ok(VoicePoll::Staged(preview))
    }

    fn reset_capture(&mut self) {
        self.timer.cancel();
        self.transcript.clear();
    }
}
