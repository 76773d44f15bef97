//! Connection health monitoring.
//!
//! [`ConnectionHealthMonitor`] owns the session record exclusively — every
//! other component sees session state only through accessors or emitted
//! [`SessionEvent`]s, never by mutating it.
//!
//! Health is always derived: [`ConnectionHealthMonitor::health_status`] is
//! a pure function of the latest timestamps and the configured thresholds,
//! recomputed on every mutation and every check tick. It is never stored as
//! independent mutable state, so it cannot diverge.

use std::collections::VecDeque;
use std::sync::Arc;

use metrics::counter;
use parking_lot::Mutex;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use aria_core::connection::{ConnectionState, DisconnectReason, HealthStatus};
use aria_settings::HealthSettings;

use crate::emitter::{EventEmitter, SessionEvent};

/// Bounded inbound-event log capacity.
const EVENT_LOG_CAP: usize = 50;
/// Bounded connection-state history capacity.
const STATE_HISTORY_CAP: usize = 100;

/// One logical conversation's timing record.
///
/// `last_activity` and `last_event` are seeded at session start: the start
/// itself is the first observed signal. Timestamps that were never
/// observed stay `None` and contribute no signal to health computation.
struct SessionRecord {
    active: bool,
    started_at: Option<Instant>,
    last_activity: Option<Instant>,
    last_event: Option<Instant>,
    disconnected_at: Option<Instant>,
    reconnect_count: u32,
    last_disconnect_reason: Option<DisconnectReason>,
    connection_states: VecDeque<(Instant, ConnectionState)>,
    event_log: VecDeque<(Instant, String)>,
    prior_session_ended: bool,
    last_reported: Option<HealthStatus>,
}

impl SessionRecord {
    fn empty() -> Self {
        Self {
            active: false,
            started_at: None,
            last_activity: None,
            last_event: None,
            disconnected_at: None,
            reconnect_count: 0,
            last_disconnect_reason: None,
            connection_states: VecDeque::new(),
            event_log: VecDeque::new(),
            prior_session_ended: false,
            last_reported: None,
        }
    }
}

/// Tracks session timestamps, classifies disconnects, derives health.
pub struct ConnectionHealthMonitor {
    settings: HealthSettings,
    emitter: Arc<EventEmitter>,
    inner: Mutex<SessionRecord>,
    checks: Mutex<Option<CancellationToken>>,
}

impl ConnectionHealthMonitor {
    /// Create a monitor with the given thresholds and event sink.
    pub fn new(settings: HealthSettings, emitter: Arc<EventEmitter>) -> Self {
        Self {
            settings,
            emitter,
            inner: Mutex::new(SessionRecord::empty()),
            checks: Mutex::new(None),
        }
    }

    /// Begin (or resume) session timing.
    ///
    /// Increments the reconnect counter only when a prior session on this
    /// record had ended — never on the first start.
    pub fn start_session(&self) {
        let now = Instant::now();
        let event = {
            let mut record = self.inner.lock();
            if record.prior_session_ended {
                record.reconnect_count += 1;
                record.prior_session_ended = false;
                counter!("aria_session_reconnects_total").increment(1);
            }
            record.active = true;
            record.started_at = Some(now);
            record.last_activity = Some(now);
            record.last_event = Some(now);
            record.disconnected_at = None;
            info!(reconnect_count = record.reconnect_count, "session started");
            self.refresh_status_locked(&mut record, now)
        };
        self.emit_all(event.into_iter().collect());
    }

    /// Freeze timing and record the classified disconnect reason.
    pub fn end_session(&self, reason: DisconnectReason) {
        let now = Instant::now();
        let mut events = Vec::new();
        {
            let mut record = self.inner.lock();
            record.active = false;
            record.disconnected_at = Some(now);
            record.last_disconnect_reason = Some(reason);
            record.prior_session_ended = true;
            info!(reason = %reason, "session ended");
            if let Some(event) = self.refresh_status_locked(&mut record, now) {
                events.push(event);
            }
        }
        events.push(SessionEvent::DisconnectDetected { reason });
        self.emit_all(events);
    }

    /// Mark user speech.
    pub fn record_activity(&self) {
        let now = Instant::now();
        let event = {
            let mut record = self.inner.lock();
            record.last_activity = Some(now);
            self.refresh_status_locked(&mut record, now)
        };
        self.emit_all(event.into_iter().collect());
    }

    /// Mark any inbound message and append it to the bounded event log.
    pub fn record_event(&self, kind: impl Into<String>) {
        let now = Instant::now();
        let event = {
            let mut record = self.inner.lock();
            record.last_event = Some(now);
            if record.event_log.len() == EVENT_LOG_CAP {
                let _ = record.event_log.pop_front();
            }
            record.event_log.push_back((now, kind.into()));
            self.refresh_status_locked(&mut record, now)
        };
        self.emit_all(event.into_iter().collect());
    }

    /// Append a transport state transition to the bounded history.
    pub fn record_connection_state(&self, state: ConnectionState) {
        let now = Instant::now();
        let event = {
            let mut record = self.inner.lock();
            if record.connection_states.len() == STATE_HISTORY_CAP {
                let _ = record.connection_states.pop_front();
            }
            record.connection_states.push_back((now, state));
            debug!(state = %state, "connection state recorded");
            self.refresh_status_locked(&mut record, now)
        };
        self.emit_all(event.into_iter().collect());
    }

    /// Classify why the current session dropped (or is about to).
    ///
    /// Priority order matters: a session that is both old and stale must
    /// report the hard limit, not mere staleness — the two demand
    /// different recovery actions.
    pub fn analyze_disconnect_reason(&self) -> DisconnectReason {
        let now = Instant::now();
        let record = self.inner.lock();

        let age = record.started_at.map(|t| now - t);
        let since_event = record.last_event.map(|t| now - t);
        let idle = record.last_activity.map(|t| now - t);

        if age.is_some_and(|a| a >= self.settings.limit_warning_start()) {
            return DisconnectReason::SessionLimit;
        }
        if since_event.is_some_and(|d| d >= self.settings.stale_after()) {
            return DisconnectReason::StaleConnection;
        }
        let mature = age.is_some_and(|a| a >= self.settings.min_session_age());
        if mature && idle.is_some_and(|d| d >= self.settings.idle_timeout()) {
            return DisconnectReason::IdleTimeout;
        }
        DisconnectReason::Unknown
    }

    /// Current derived health status.
    pub fn health_status(&self) -> HealthStatus {
        let record = self.inner.lock();
        Self::compute_status(&record, &self.settings, Instant::now())
    }

    /// Reconnect attempts so far on this record.
    pub fn reconnect_count(&self) -> u32 {
        self.inner.lock().reconnect_count
    }

    /// Reason of the most recent disconnect, if any.
    pub fn last_disconnect_reason(&self) -> Option<DisconnectReason> {
        self.inner.lock().last_disconnect_reason
    }

    /// Whether a session is currently active.
    pub fn is_active(&self) -> bool {
        self.inner.lock().active
    }

    /// Entries currently in the bounded event log.
    pub fn event_log_len(&self) -> usize {
        self.inner.lock().event_log.len()
    }

    /// Entries currently in the bounded connection-state history.
    pub fn state_history_len(&self) -> usize {
        self.inner.lock().connection_states.len()
    }

    /// Clear the record entirely and stop the periodic checks.
    ///
    /// Used when the embedder discards the conversation; a later
    /// `start_session` begins a fresh record with reconnect count 0.
    pub fn reset(&self) {
        self.stop_checks();
        *self.inner.lock() = SessionRecord::empty();
    }

    /// Start the periodic threshold checks.
    ///
    /// Replaces any previous check task so a reset session never has a
    /// stale timer firing against it.
    pub fn spawn_checks(self: &Arc<Self>) {
        let token = CancellationToken::new();
        {
            let mut guard = self.checks.lock();
            if let Some(old) = guard.take() {
                old.cancel();
            }
            *guard = Some(token.clone());
        }
        let monitor = Arc::clone(self);
        let _ = tokio::spawn(async move {
            let mut interval = time::interval(monitor.settings.check_interval());
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => monitor.run_check(),
                }
            }
        });
    }

    /// Cancel the periodic check task, if running.
    pub fn stop_checks(&self) {
        if let Some(token) = self.checks.lock().take() {
            token.cancel();
        }
    }

    /// One periodic evaluation: edge-triggered status refresh plus
    /// level-triggered threshold warnings.
    fn run_check(&self) {
        let now = Instant::now();
        let mut events = Vec::new();
        {
            let mut record = self.inner.lock();
            if let Some(event) = self.refresh_status_locked(&mut record, now) {
                events.push(event);
            }
            if !record.active {
                drop(record);
                self.emit_all(events);
                return;
            }

            if let Some(idle) = record.last_activity.map(|t| now - t)
                && idle >= self.settings.idle_timeout()
            {
                events.push(SessionEvent::IdleWarning { idle });
            }
            if let Some(age) = record.started_at.map(|t| now - t)
                && age >= self.settings.limit_warning_start()
            {
                events.push(SessionEvent::SessionAgeWarning { age });
            }
            if let Some(since) = record.last_event.map(|t| now - t)
                && since >= self.settings.stale_after()
            {
                events.push(SessionEvent::StaleWarning {
                    since_last_event: since,
                });
            }
        }
        self.emit_all(events);
    }

    /// Recompute status; returns an event only on change (edge-triggered).
    fn refresh_status_locked(
        &self,
        record: &mut SessionRecord,
        now: Instant,
    ) -> Option<SessionEvent> {
        let status = Self::compute_status(record, &self.settings, now);
        if record.last_reported == Some(status) {
            return None;
        }
        record.last_reported = Some(status);
        Some(SessionEvent::HealthChanged { status })
    }

    /// Pure status derivation. Never fails; missing timestamps are "not
    /// yet observed" and contribute no signal.
    fn compute_status(record: &SessionRecord, settings: &HealthSettings, now: Instant) -> HealthStatus {
        if !record.active {
            return HealthStatus::Disconnected;
        }

        let age = record.started_at.map(|t| now - t);
        let since_event = record.last_event.map(|t| now - t);
        let idle = record.last_activity.map(|t| now - t);

        let stale = since_event.is_some_and(|d| d >= settings.stale_after());
        let in_limit_band = age.is_some_and(|a| a >= settings.limit_warning_start());
        if stale || in_limit_band {
            return HealthStatus::Critical;
        }

        let idling = idle.is_some_and(|d| d >= settings.idle_timeout());
        let long_running = age.is_some_and(|a| a >= settings.long_running());
        if idling || long_running {
            return HealthStatus::Warning;
        }

        HealthStatus::Healthy
    }

    fn emit_all(&self, events: Vec<SessionEvent>) {
        for event in events {
            let _ = self.emitter.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::advance;

    fn test_settings() -> HealthSettings {
        HealthSettings {
            idle_timeout_secs: 10,
            stale_after_secs: 60,
            session_limit_secs: 3_600,
            limit_warning_secs: 300,
            min_session_age_secs: 20,
            long_running_secs: 1_800,
            check_interval_secs: 5,
        }
    }

    fn monitor() -> Arc<ConnectionHealthMonitor> {
        Arc::new(ConnectionHealthMonitor::new(
            test_settings(),
            Arc::new(EventEmitter::new()),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_without_session() {
        let m = monitor();
        assert_eq!(m.health_status(), HealthStatus::Disconnected);
        assert!(!m.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_right_after_start() {
        let m = monitor();
        m.start_session();
        assert_eq!(m.health_status(), HealthStatus::Healthy);
        assert!(m.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_degrades_to_warning() {
        let m = monitor();
        m.start_session();
        // Keep events flowing so the session never goes stale
        for _ in 0..4 {
            advance(Duration::from_secs(5)).await;
            m.record_event("response.done");
        }
        assert_eq!(m.health_status(), HealthStatus::Warning);

        // User speech recovers it
        m.record_activity();
        assert_eq!(m.health_status(), HealthStatus::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_is_critical() {
        let m = monitor();
        m.start_session();
        advance(Duration::from_secs(61)).await;
        assert_eq!(m.health_status(), HealthStatus::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn limit_band_is_critical_even_when_fresh() {
        let m = monitor();
        m.start_session();
        advance(Duration::from_secs(3_350)).await;
        m.record_event("response.done");
        m.record_activity();
        assert_eq!(m.health_status(), HealthStatus::Critical);
    }

    // --- Disconnect classification ---

    #[tokio::test(start_paused = true)]
    async fn session_limit_beats_stale() {
        let m = monitor();
        m.start_session();
        // 61 minutes old, last event 2s ago: both limit-band and (nearly)
        // stale conditions in play — classification must pick the limit.
        advance(Duration::from_secs(3_658)).await;
        m.record_event("response.done");
        advance(Duration::from_secs(2)).await;
        assert_eq!(m.analyze_disconnect_reason(), DisconnectReason::SessionLimit);
    }

    #[tokio::test(start_paused = true)]
    async fn session_limit_beats_stale_when_both_exceeded() {
        let m = monitor();
        m.start_session();
        advance(Duration::from_secs(3_700)).await;
        // 61+ minutes without events: stale AND past the band
        assert_eq!(m.analyze_disconnect_reason(), DisconnectReason::SessionLimit);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_beats_idle() {
        let m = monitor();
        m.start_session();
        advance(Duration::from_secs(90)).await;
        assert_eq!(
            m.analyze_disconnect_reason(),
            DisconnectReason::StaleConnection
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_requires_maturity() {
        let m = monitor();
        m.start_session();
        // 15s old: past the 10s idle threshold but younger than the 20s
        // maturity window — must not classify as idle.
        advance(Duration::from_secs(15)).await;
        m.record_event("response.done");
        assert_eq!(m.analyze_disconnect_reason(), DisconnectReason::Unknown);

        // 25s old with fresh events but silent user: now idle.
        advance(Duration::from_secs(10)).await;
        m.record_event("response.done");
        assert_eq!(m.analyze_disconnect_reason(), DisconnectReason::IdleTimeout);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_session_is_unknown() {
        let m = monitor();
        m.start_session();
        advance(Duration::from_secs(2)).await;
        assert_eq!(m.analyze_disconnect_reason(), DisconnectReason::Unknown);
    }

    // --- Reconnect counting ---

    #[tokio::test(start_paused = true)]
    async fn reconnect_count_increments_only_after_end() {
        let m = monitor();
        m.start_session();
        assert_eq!(m.reconnect_count(), 0);

        // start again without an end: still no increment
        m.start_session();
        assert_eq!(m.reconnect_count(), 0);

        m.end_session(DisconnectReason::NetworkError);
        m.start_session();
        assert_eq!(m.reconnect_count(), 1);

        m.end_session(DisconnectReason::StaleConnection);
        m.start_session();
        assert_eq!(m.reconnect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_reconnect_count() {
        let m = monitor();
        m.start_session();
        m.end_session(DisconnectReason::NetworkError);
        m.start_session();
        assert_eq!(m.reconnect_count(), 1);

        m.reset();
        assert_eq!(m.reconnect_count(), 0);
        assert_eq!(m.health_status(), HealthStatus::Disconnected);
    }

    // --- Bounded histories ---

    #[tokio::test(start_paused = true)]
    async fn event_log_is_bounded() {
        let m = monitor();
        m.start_session();
        for i in 0..(EVENT_LOG_CAP + 10) {
            m.record_event(format!("event_{i}"));
        }
        assert_eq!(m.event_log_len(), EVENT_LOG_CAP);
    }

    #[tokio::test(start_paused = true)]
    async fn state_history_is_bounded() {
        let m = monitor();
        for _ in 0..(STATE_HISTORY_CAP + 5) {
            m.record_connection_state(ConnectionState::Connected);
        }
        assert_eq!(m.state_history_len(), STATE_HISTORY_CAP);
    }

    // --- Event emission ---

    #[tokio::test(start_paused = true)]
    async fn status_change_is_edge_triggered() {
        let emitter = Arc::new(EventEmitter::new());
        let m = Arc::new(ConnectionHealthMonitor::new(test_settings(), Arc::clone(&emitter)));
        let mut rx = emitter.subscribe();

        m.start_session();
        // Disconnected -> Healthy edge
        assert_eq!(rx.try_recv().unwrap().event_type(), "health_changed");

        // Repeated mutations with unchanged status emit nothing
        m.record_event("a");
        m.record_event("b");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn end_session_emits_disconnect_detected() {
        let emitter = Arc::new(EventEmitter::new());
        let m = Arc::new(ConnectionHealthMonitor::new(test_settings(), Arc::clone(&emitter)));
        let mut rx = emitter.subscribe();

        m.start_session();
        let _ = rx.try_recv();
        m.end_session(DisconnectReason::UserInitiated);

        // Disconnected edge, then the classified reason
        assert_eq!(rx.try_recv().unwrap().event_type(), "health_changed");
        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            SessionEvent::DisconnectDetected {
                reason: DisconnectReason::UserInitiated
            }
        ));
        assert_eq!(
            m.last_disconnect_reason(),
            Some(DisconnectReason::UserInitiated)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_check_fires_level_triggered_warnings() {
        let emitter = Arc::new(EventEmitter::new());
        let m = Arc::new(ConnectionHealthMonitor::new(test_settings(), Arc::clone(&emitter)));
        m.start_session();
        m.spawn_checks();

        let mut rx = emitter.subscribe();
        // 90s without events or speech: idle AND stale warnings repeat
        for _ in 0..18 {
            advance(Duration::from_secs(5)).await;
            tokio::task::yield_now().await;
        }

        let mut idle = 0;
        let mut stale = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                SessionEvent::IdleWarning { .. } => idle += 1,
                SessionEvent::StaleWarning { .. } => stale += 1,
                _ => {}
            }
        }
        assert!(idle > 1, "idle warning should repeat, got {idle}");
        assert!(stale >= 1, "stale warning expected, got {stale}");

        m.stop_checks();
    }
}
