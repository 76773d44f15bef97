//! Microphone state control.
//!
//! Three modes with distinct transport behavior:
//!
//! - **Normal** — capture on, replies generated per configuration.
//! - **Paused** — capture on and transcription still running, but the
//!   model's automatic replies are suppressed via `session.update`.
//! - **Muted** — capture hardware-disabled locally; nothing is sent to
//!   the model, so muting is instant and costs no round-trip.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use aria_core::events::{ClientEvent, SessionConfig, TranscriptionConfig, TurnDetection};

use crate::emitter::{EventEmitter, SessionEvent};
use crate::errors::{Result, SessionError};

/// Microphone operating mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MicrophoneMode {
    /// Capturing; replies follow the session configuration.
    Normal,
    /// Capturing and transcribing, automatic replies suppressed.
    Paused,
    /// Capture disabled at the track level.
    Muted,
}

impl MicrophoneMode {
    /// Stable name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Paused => "paused",
            Self::Muted => "muted",
        }
    }
}

/// Handle to the local capture track.
///
/// The embedder supplies the real audio stack; the controller only ever
/// flips enablement.
pub trait AudioTrack: Send + Sync {
    /// Enable or disable capture.
    fn set_enabled(&self, enabled: bool);
}

struct MicState {
    mode: MicrophoneMode,
    /// Mode to restore when unmuting.
    prior: MicrophoneMode,
    /// Set once `pause_replies` has turned off remote auto-reply; from
    /// then on the client triggers responses explicitly.
    remote_auto_reply_disabled: bool,
}

/// Drives microphone mode transitions and their side effects.
pub struct MicrophoneStateController {
    inner: Mutex<MicState>,
    track: Arc<dyn AudioTrack>,
    outbound: mpsc::Sender<ClientEvent>,
    emitter: Arc<EventEmitter>,
    transcription_model: String,
}

impl MicrophoneStateController {
    /// Create a controller over the given capture track.
    pub fn new(
        track: Arc<dyn AudioTrack>,
        outbound: mpsc::Sender<ClientEvent>,
        emitter: Arc<EventEmitter>,
        transcription_model: impl Into<String>,
    ) -> Self {
        Self {
            inner: Mutex::new(MicState {
                mode: MicrophoneMode::Normal,
                prior: MicrophoneMode::Normal,
                remote_auto_reply_disabled: false,
            }),
            track,
            outbound,
            emitter,
            transcription_model: transcription_model.into(),
        }
    }

    /// Current mode.
    pub fn mode(&self) -> MicrophoneMode {
        self.inner.lock().mode
    }

    /// Toggle mute.
    ///
    /// Entirely local — no wire traffic, so it works even while the data
    /// channel is down. Unmuting restores whichever mode was active
    /// before the mute.
    pub fn toggle_mute(&self) -> MicrophoneMode {
        let mode = {
            let mut state = self.inner.lock();
            if state.mode == MicrophoneMode::Muted {
                state.mode = state.prior;
                self.track.set_enabled(true);
            } else {
                state.prior = state.mode;
                state.mode = MicrophoneMode::Muted;
                self.track.set_enabled(false);
            }
            state.mode
        };
        info!(mode = mode.as_str(), "mute toggled");
        let _ = self.emitter.emit(SessionEvent::MicrophoneChanged { mode });
        mode
    }

    /// Suppress the model's automatic replies while keeping capture and
    /// transcription running.
    pub async fn pause_replies(&self) -> Result<()> {
        {
            let mut state = self.inner.lock();
            if state.mode == MicrophoneMode::Muted {
                // Paused still listens; leaving mute is implied.
                self.track.set_enabled(true);
            }
            state.mode = MicrophoneMode::Paused;
            state.prior = MicrophoneMode::Paused;
            state.remote_auto_reply_disabled = true;
        }

        let session = SessionConfig {
            turn_detection: Some(TurnDetection::server_vad(false)),
            input_audio_transcription: Some(TranscriptionConfig {
                model: self.transcription_model.clone(),
            }),
            input_audio_noise_reduction: None,
        };
        self.outbound
            .send(ClientEvent::SessionUpdate { session })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;

        info!("replies paused");
        let _ = self.emitter.emit(SessionEvent::MicrophoneChanged {
            mode: MicrophoneMode::Paused,
        });
        Ok(())
    }

    /// Resume normal operation after a pause.
    ///
    /// Remote auto-reply stays disabled for the rest of the session;
    /// responses are triggered explicitly when transcripts finalize, so
    /// no `session.update` round-trip is needed here.
    pub fn resume_replies(&self) {
        {
            let mut state = self.inner.lock();
            if state.mode == MicrophoneMode::Muted {
                self.track.set_enabled(true);
            }
            state.mode = MicrophoneMode::Normal;
            state.prior = MicrophoneMode::Normal;
        }
        info!("replies resumed");
        let _ = self.emitter.emit(SessionEvent::MicrophoneChanged {
            mode: MicrophoneMode::Normal,
        });
    }

    /// Explicitly request a model response.
    pub async fn trigger_response(&self) -> Result<()> {
        debug!("triggering response");
        self.outbound
            .send(ClientEvent::response_create())
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Whether a finalized transcript should trigger a response.
    ///
    /// True only in normal mode once remote auto-reply has been turned
    /// off — before the first pause the model replies on its own, and in
    /// paused mode transcripts accumulate silently.
    pub fn should_trigger_on_transcription(&self) -> bool {
        let state = self.inner.lock();
        state.mode == MicrophoneMode::Normal && state.remote_auto_reply_disabled
    }

    /// Return to the initial state for a fresh session.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.mode = MicrophoneMode::Normal;
        state.prior = MicrophoneMode::Normal;
        state.remote_auto_reply_disabled = false;
        self.track.set_enabled(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeTrack {
        enabled: AtomicBool,
        calls: AtomicUsize,
    }

    impl FakeTrack {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                enabled: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
            })
        }

        fn enabled(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AudioTrack for FakeTrack {
        fn set_enabled(&self, enabled: bool) {
            self.enabled.store(enabled, Ordering::SeqCst);
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn controller(
        track: Arc<FakeTrack>,
    ) -> (MicrophoneStateController, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (
            MicrophoneStateController::new(track, tx, Arc::new(EventEmitter::new()), "whisper-1"),
            rx,
        )
    }

    #[tokio::test]
    async fn mute_is_local_only() {
        let track = FakeTrack::new();
        let (c, mut rx) = controller(Arc::clone(&track));

        assert_eq!(c.toggle_mute(), MicrophoneMode::Muted);
        assert!(!track.enabled());
        assert!(rx.try_recv().is_err(), "mute must not touch the wire");

        assert_eq!(c.toggle_mute(), MicrophoneMode::Normal);
        assert!(track.enabled());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unmute_restores_paused_mode() {
        let track = FakeTrack::new();
        let (c, mut rx) = controller(Arc::clone(&track));

        c.pause_replies().await.unwrap();
        let _ = rx.try_recv();

        assert_eq!(c.toggle_mute(), MicrophoneMode::Muted);
        assert_eq!(c.toggle_mute(), MicrophoneMode::Paused);
    }

    #[tokio::test]
    async fn pause_sends_session_update_disabling_replies() {
        let track = FakeTrack::new();
        let (c, mut rx) = controller(track);

        c.pause_replies().await.unwrap();
        assert_eq!(c.mode(), MicrophoneMode::Paused);

        match rx.try_recv().unwrap() {
            ClientEvent::SessionUpdate { session } => {
                let td = session.turn_detection.unwrap();
                assert_eq!(td.kind, "server_vad");
                assert!(!td.create_response);
                assert_eq!(
                    session.input_audio_transcription.unwrap().model,
                    "whisper-1"
                );
            }
            other => panic!("expected session.update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pause_while_muted_reenables_capture() {
        let track = FakeTrack::new();
        let (c, _rx) = controller(Arc::clone(&track));

        let _ = c.toggle_mute();
        assert!(!track.enabled());

        c.pause_replies().await.unwrap();
        assert!(track.enabled(), "paused mode keeps listening");
        assert_eq!(c.mode(), MicrophoneMode::Paused);
    }

    #[tokio::test]
    async fn resume_is_silent_on_the_wire() {
        let track = FakeTrack::new();
        let (c, mut rx) = controller(track);

        c.pause_replies().await.unwrap();
        let _ = rx.try_recv();

        c.resume_replies();
        assert_eq!(c.mode(), MicrophoneMode::Normal);
        assert!(rx.try_recv().is_err(), "resume needs no session.update");
    }

    #[tokio::test]
    async fn manual_trigger_flows_after_pause_resume_cycle() {
        let track = FakeTrack::new();
        let (c, mut rx) = controller(track);

        assert!(!c.should_trigger_on_transcription(), "auto replies at start");

        c.pause_replies().await.unwrap();
        assert!(!c.should_trigger_on_transcription(), "paused stays silent");

        c.resume_replies();
        assert!(c.should_trigger_on_transcription());

        let _ = rx.try_recv();
        let _ = rx.try_recv();
        c.trigger_response().await.unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            ClientEvent::ResponseCreate { .. }
        ));
    }

    #[tokio::test]
    async fn reset_restores_initial_state() {
        let track = FakeTrack::new();
        let (c, _rx) = controller(Arc::clone(&track));

        c.pause_replies().await.unwrap();
        let _ = c.toggle_mute();
        c.reset();

        assert_eq!(c.mode(), MicrophoneMode::Normal);
        assert!(track.enabled());
        assert!(!c.should_trigger_on_transcription());
        // set_enabled seen for: mute, reset (pause left the track alone)
        assert_eq!(track.calls(), 2);
    }
}
