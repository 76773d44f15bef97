//! Session orchestration.
//!
//! [`SessionOrchestrator`] owns the five state machines and the single
//! outbound sender. Inbound [`ServerEvent`]s are fanned out here; the
//! components never talk to each other directly, so every cross-cutting
//! rule (debounce before triggering, record before dispatching) lives in
//! one place.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument, warn};

use aria_core::connection::DisconnectReason;
use aria_core::events::{
    ClientEvent, NoiseReduction, ServerEvent, SessionConfig, TranscriptionConfig, TurnDetection,
};
use aria_core::tools::{
    CANCEL_TOOL, PAUSE_REPLIES_TOOL, RESUME_REPLIES_TOOL, ToolDefinition, ToolOutcome, cancel_tool,
    is_local_tool, voice_control_tools,
};
use aria_settings::AriaSettings;

use crate::broker::{CancelTransport, ToolBroker};
use crate::cancel::CancellationCoordinator;
use crate::debounce::VoiceCommandDebouncer;
use crate::emitter::{EventEmitter, SessionEvent};
use crate::errors::Result;
use crate::health::ConnectionHealthMonitor;
use crate::microphone::{AudioTrack, MicrophoneStateController};
use crate::reconnect::ReconnectionStrategy;
use crate::response::ResponseLifecycleCoordinator;

/// Top-level session coordinator.
pub struct SessionOrchestrator {
    settings: AriaSettings,
    emitter: Arc<EventEmitter>,
    health: Arc<ConnectionHealthMonitor>,
    reconnect: Arc<ReconnectionStrategy>,
    response: Arc<ResponseLifecycleCoordinator>,
    microphone: Arc<MicrophoneStateController>,
    cancel: Arc<CancellationCoordinator>,
    broker: Arc<dyn ToolBroker>,
    debouncer: Mutex<VoiceCommandDebouncer>,
    outbound: mpsc::Sender<ClientEvent>,
}

impl SessionOrchestrator {
    /// Wire up the orchestration layer.
    ///
    /// `outbound` is the channel to the data-channel writer; `track` is
    /// the local capture track; `broker` and `cancel_transport` reach
    /// the execution backend.
    pub fn new(
        settings: AriaSettings,
        broker: Arc<dyn ToolBroker>,
        cancel_transport: Arc<dyn CancelTransport>,
        track: Arc<dyn AudioTrack>,
        outbound: mpsc::Sender<ClientEvent>,
    ) -> Arc<Self> {
        let emitter = Arc::new(EventEmitter::new());
        let health = Arc::new(ConnectionHealthMonitor::new(
            settings.health.clone(),
            Arc::clone(&emitter),
        ));
        let reconnect = Arc::new(ReconnectionStrategy::new(
            settings.reconnect.clone(),
            settings.health.session_limit(),
            Arc::clone(&emitter),
        ));
        let response = Arc::new(ResponseLifecycleCoordinator::new(
            outbound.clone(),
            Duration::from_millis(settings.response.grace_delay_ms),
        ));
        let microphone = Arc::new(MicrophoneStateController::new(
            track,
            outbound.clone(),
            Arc::clone(&emitter),
            settings.voice.transcription_model.clone(),
        ));
        let cancel = Arc::new(CancellationCoordinator::new(
            cancel_transport,
            Arc::clone(&emitter),
        ));
        let debouncer = Mutex::new(VoiceCommandDebouncer::new(
            Duration::from_millis(settings.voice_command.dedupe_window_ms),
            settings.voice_command.min_overlap,
        ));

        Arc::new(Self {
            settings,
            emitter,
            health,
            reconnect,
            response,
            microphone,
            cancel,
            broker,
            debouncer,
            outbound,
        })
    }

    /// Subscribe to orchestration events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.emitter.subscribe()
    }

    /// Health monitor handle, for status queries.
    pub fn health(&self) -> &Arc<ConnectionHealthMonitor> {
        &self.health
    }

    /// Microphone controller handle, for UI-driven mode changes.
    pub fn microphone(&self) -> &Arc<MicrophoneStateController> {
        &self.microphone
    }

    /// Cancellation coordinator handle.
    pub fn cancel(&self) -> &Arc<CancellationCoordinator> {
        &self.cancel
    }

    /// Function schemas to advertise when establishing the model session:
    /// the voice-control tools plus the cancellation tool. Backend tools
    /// are advertised by the embedder on top of these.
    pub fn local_tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut tools = voice_control_tools();
        tools.push(cancel_tool());
        tools
    }

    /// A fresh data channel is up: start timing, arm policy timers, and
    /// push the initial session configuration.
    pub async fn start_session(&self) -> Result<()> {
        self.health.start_session();
        self.reconnect.on_session_started(self.health.reconnect_count());
        self.health.spawn_checks();

        let session = SessionConfig {
            turn_detection: Some(TurnDetection::server_vad(true)),
            input_audio_transcription: Some(TranscriptionConfig {
                model: self.settings.voice.transcription_model.clone(),
            }),
            input_audio_noise_reduction: Some(NoiseReduction {
                kind: "near_field".to_string(),
            }),
        };
        self.outbound
            .send(ClientEvent::SessionUpdate { session })
            .await
            .map_err(|_| crate::errors::SessionError::ChannelClosed)
    }

    /// The data channel went down.
    ///
    /// Classifies nothing itself — callers pass the reason, typically
    /// from [`ConnectionHealthMonitor::analyze_disconnect_reason`].
    pub fn end_session(&self, reason: DisconnectReason) {
        self.health.end_session(reason);
        self.health.stop_checks();
        // Call ids and dedupe history are session-scoped.
        self.response.reset();
        self.cancel.reset();
        self.debouncer.lock().clear();

        if reason == DisconnectReason::UserInitiated {
            self.reconnect.on_user_disconnect();
        } else {
            self.reconnect
                .handle_disconnect(reason, self.health.reconnect_count());
        }
    }

    /// Fan one inbound model event out to the components.
    pub async fn handle_event(self: &Arc<Self>, event: ServerEvent) -> Result<()> {
        self.health.record_event(event.event_type());

        match event {
            ServerEvent::ResponseCreated { response_id } => {
                debug!(?response_id, "response created");
                self.response.on_response_created();
            }
            ServerEvent::ResponseDone { response_id } => {
                debug!(?response_id, "response done");
                self.response.on_response_done();
            }
            ServerEvent::TranscriptionCompleted {
                transcript,
                audio_duration_ms,
                ..
            } => {
                self.health.record_activity();
                if self.debouncer.lock().is_duplicate(&transcript) {
                    return Ok(());
                }
                info!(transcript = %transcript, "transcript finalized");
                let _ = self.emitter.emit(SessionEvent::TranscriptFinal {
                    text: transcript,
                    audio_duration_ms,
                });
                if self.microphone.should_trigger_on_transcription() {
                    self.microphone.trigger_response().await?;
                }
            }
            ServerEvent::FunctionCallDelta { call_id, delta } => {
                debug!(call_id, len = delta.len(), "function call arguments delta");
            }
            ServerEvent::FunctionCallDone {
                call_id,
                name,
                arguments,
            } => {
                self.dispatch_tool(call_id, name, arguments).await?;
            }
            ServerEvent::Error { message } => {
                warn!(message = %message, "channel error from model");
                let _ = self.emitter.emit(SessionEvent::ChannelError { message });
            }
        }
        Ok(())
    }

    /// Backend debug-stream events carry child-session lifecycle.
    pub fn handle_debug_event(&self, event: &Value) {
        let Some(kind) = event.get("type").and_then(Value::as_str) else {
            return;
        };
        self.health.record_event(kind);
        match kind {
            "session_fork" => self.cancel.child_spawned(),
            "session_join" => self.cancel.child_ended(),
            _ => {}
        }
    }

    /// Cancel all pending timers and checks.
    pub fn shutdown(&self) {
        self.health.stop_checks();
        self.reconnect.shutdown();
    }

    #[instrument(skip_all, fields(call_id = %call_id, tool = %name))]
    async fn dispatch_tool(
        self: &Arc<Self>,
        call_id: String,
        name: String,
        arguments: String,
    ) -> Result<()> {
        let args: Value = if arguments.trim().is_empty() {
            json!({})
        } else {
            match serde_json::from_str(&arguments) {
                Ok(value) => value,
                Err(err) => {
                    warn!(error = %err, "malformed tool arguments");
                    let outcome = ToolOutcome::err(format!("invalid tool arguments: {err}"));
                    return self
                        .response
                        .handle_tool_result(&call_id, &name, &outcome)
                        .await;
                }
            }
        };

        if is_local_tool(&name) {
            return self.run_local_tool(&call_id, &name, &args).await;
        }

        self.cancel.operation_started(&call_id, &name);
        let _ = self.emitter.emit(SessionEvent::ToolStarted {
            call_id: call_id.clone(),
            name: name.clone(),
        });

        let this = Arc::clone(self);
        let _ = tokio::spawn(async move {
            let outcome = match this.broker.execute(&call_id, &name, args).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(call_id = %call_id, tool = %name, error = %err, "tool broker failed");
                    ToolOutcome::err(err.to_string())
                }
            };
            let success = outcome.success;
            if let Err(err) = this
                .response
                .handle_tool_result(&call_id, &name, &outcome)
                .await
            {
                warn!(call_id = %call_id, error = %err, "failed to deliver tool result");
            }
            this.cancel.operation_completed(&call_id);
            let _ = this.emitter.emit(SessionEvent::ToolCompleted {
                call_id,
                name,
                success,
            });
        });
        Ok(())
    }

    /// Voice-control and cancellation tools run in the client itself;
    /// nothing goes to the broker.
    async fn run_local_tool(&self, call_id: &str, name: &str, args: &Value) -> Result<()> {
        match name {
            PAUSE_REPLIES_TOOL => {
                self.microphone.pause_replies().await?;
                let outcome = ToolOutcome::ok(json!({
                    "message": "Automatic replies paused; still listening."
                }));
                // Announcing this one would defeat the pause.
                self.response.deliver_result_silently(call_id, &outcome).await
            }
            RESUME_REPLIES_TOOL => {
                self.microphone.resume_replies();
                let outcome = ToolOutcome::ok(json!({
                    "message": "Automatic replies resumed."
                }));
                self.response.handle_tool_result(call_id, name, &outcome).await
            }
            CANCEL_TOOL => {
                let immediate = args
                    .get("immediate")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let reason = args
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("user requested cancellation");
                let outcome = match self.cancel.request_cancel(immediate, reason).await {
                    Ok(ack) => ToolOutcome::ok(json!({
                        "cancelled": ack.cancelled,
                        "running_tools": ack.running_tools,
                        "was_already_cancelled": ack.was_already_cancelled,
                    })),
                    Err(err) => ToolOutcome::err(err.to_string()),
                };
                self.response.handle_tool_result(call_id, name, &outcome).await
            }
            other => {
                // is_local_tool and this match must stay in sync
                warn!(tool = other, "unhandled local tool");
                Ok(())
            }
        }
    }
}
