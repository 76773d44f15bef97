//! Reconnection policy.
//!
//! [`ReconnectionStrategy`] turns a classified disconnect into a single
//! decision: reconnect now, reconnect after a delay, or leave the session
//! down. It never reconnects by itself — it emits
//! [`SessionEvent::ReconnectDue`] and the embedder performs the actual
//! transport setup.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use aria_core::connection::DisconnectReason;
use aria_settings::{ReconnectPolicyKind, ReconnectSettings};

use crate::emitter::{EventEmitter, SessionEvent};

/// What to do about a disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Stay down; the user must reconnect manually.
    None,
    /// Reconnect right away.
    Immediate,
    /// Reconnect after the given delay.
    After(Duration),
}

/// Maps disconnect reasons to reconnect decisions and owns the pending
/// reconnect timer.
///
/// At most one timer is live at a time; scheduling a new one cancels the
/// previous, and user-initiated disconnects cancel without rescheduling.
pub struct ReconnectionStrategy {
    settings: ReconnectSettings,
    session_limit: Duration,
    emitter: Arc<EventEmitter>,
    timer: Mutex<Option<CancellationToken>>,
}

impl ReconnectionStrategy {
    /// Create a strategy.
    ///
    /// `session_limit` is the provider's hard session duration; the
    /// proactive policy schedules ahead of it by the configured margin.
    pub fn new(
        settings: ReconnectSettings,
        session_limit: Duration,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            settings,
            session_limit,
            emitter,
            timer: Mutex::new(None),
        }
    }

    /// Pure decision function.
    ///
    /// User-initiated disconnects and exhausted attempt budgets always
    /// decide [`ReconnectDecision::None`], regardless of policy.
    pub fn decide(&self, reason: DisconnectReason, reconnect_count: u32) -> ReconnectDecision {
        if reason == DisconnectReason::UserInitiated {
            return ReconnectDecision::None;
        }
        if reconnect_count >= self.settings.max_attempts {
            return ReconnectDecision::None;
        }
        match self.settings.policy {
            ReconnectPolicyKind::Manual => ReconnectDecision::None,
            ReconnectPolicyKind::AutoImmediate => ReconnectDecision::Immediate,
            ReconnectPolicyKind::AutoDelayed => ReconnectDecision::After(self.settings.delay()),
            ReconnectPolicyKind::Proactive => {
                // The whole point of the proactive policy is a seamless
                // handover at the session limit.
                if reason == DisconnectReason::SessionLimit {
                    ReconnectDecision::Immediate
                } else {
                    ReconnectDecision::After(self.settings.delay())
                }
            }
        }
    }

    /// React to a disconnect: decide, then emit `ReconnectDue` now or
    /// after the decided delay.
    pub fn handle_disconnect(&self, reason: DisconnectReason, reconnect_count: u32) {
        let attempt = reconnect_count + 1;
        match self.decide(reason, reconnect_count) {
            ReconnectDecision::None => {
                info!(reason = %reason, reconnect_count, "staying disconnected");
            }
            ReconnectDecision::Immediate => {
                info!(reason = %reason, attempt, "reconnect due immediately");
                let _ = self.emitter.emit(SessionEvent::ReconnectDue { reason, attempt });
            }
            ReconnectDecision::After(delay) => {
                info!(reason = %reason, attempt, ?delay, "reconnect scheduled");
                self.schedule(delay, reason, attempt);
            }
        }
    }

    /// Arm the proactive handover timer for a freshly started session.
    ///
    /// No-op under other policies. Replaces any timer left over from the
    /// previous session.
    pub fn on_session_started(&self, reconnect_count: u32) {
        if self.settings.policy != ReconnectPolicyKind::Proactive {
            return;
        }
        let lead = self
            .session_limit
            .saturating_sub(self.settings.proactive_margin());
        debug!(lead_secs = lead.as_secs(), "proactive handover armed");
        self.schedule(lead, DisconnectReason::SessionLimit, reconnect_count + 1);
    }

    /// The user hung up on purpose; drop any pending reconnect.
    pub fn on_user_disconnect(&self) {
        self.cancel_timer();
    }

    /// Cancel the pending timer, if any.
    pub fn shutdown(&self) {
        self.cancel_timer();
    }

    fn schedule(&self, delay: Duration, reason: DisconnectReason, attempt: u32) {
        let token = CancellationToken::new();
        {
            let mut guard = self.timer.lock();
            if let Some(old) = guard.take() {
                old.cancel();
            }
            *guard = Some(token.clone());
        }
        let emitter = Arc::clone(&self.emitter);
        let _ = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = sleep(delay) => {
                    let _ = emitter.emit(SessionEvent::ReconnectDue { reason, attempt });
                }
            }
        });
    }

    fn cancel_timer(&self) {
        if let Some(token) = self.timer.lock().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn strategy(policy: ReconnectPolicyKind) -> (ReconnectionStrategy, Arc<EventEmitter>) {
        let emitter = Arc::new(EventEmitter::new());
        let settings = ReconnectSettings {
            policy,
            delay_ms: 2_000,
            proactive_margin_secs: 120,
            max_attempts: 5,
        };
        (
            ReconnectionStrategy::new(settings, Duration::from_secs(3_600), Arc::clone(&emitter)),
            emitter,
        )
    }

    // --- Decision table ---

    #[tokio::test]
    async fn user_initiated_never_reconnects() {
        for policy in [
            ReconnectPolicyKind::Manual,
            ReconnectPolicyKind::AutoImmediate,
            ReconnectPolicyKind::AutoDelayed,
            ReconnectPolicyKind::Proactive,
        ] {
            let (s, _) = strategy(policy);
            assert_eq!(
                s.decide(DisconnectReason::UserInitiated, 0),
                ReconnectDecision::None,
                "policy {policy:?}"
            );
        }
    }

    #[tokio::test]
    async fn manual_policy_never_reconnects() {
        let (s, _) = strategy(ReconnectPolicyKind::Manual);
        assert_eq!(
            s.decide(DisconnectReason::NetworkError, 0),
            ReconnectDecision::None
        );
    }

    #[tokio::test]
    async fn auto_immediate_reconnects_now() {
        let (s, _) = strategy(ReconnectPolicyKind::AutoImmediate);
        assert_eq!(
            s.decide(DisconnectReason::StaleConnection, 0),
            ReconnectDecision::Immediate
        );
    }

    #[tokio::test]
    async fn auto_delayed_waits() {
        let (s, _) = strategy(ReconnectPolicyKind::AutoDelayed);
        assert_eq!(
            s.decide(DisconnectReason::NetworkError, 2),
            ReconnectDecision::After(Duration::from_millis(2_000))
        );
    }

    #[tokio::test]
    async fn proactive_is_immediate_only_at_the_limit() {
        let (s, _) = strategy(ReconnectPolicyKind::Proactive);
        assert_eq!(
            s.decide(DisconnectReason::SessionLimit, 0),
            ReconnectDecision::Immediate
        );
        assert_eq!(
            s.decide(DisconnectReason::NetworkError, 0),
            ReconnectDecision::After(Duration::from_millis(2_000))
        );
    }

    #[tokio::test]
    async fn attempt_budget_exhausts() {
        let (s, _) = strategy(ReconnectPolicyKind::AutoImmediate);
        assert_eq!(
            s.decide(DisconnectReason::NetworkError, 4),
            ReconnectDecision::Immediate
        );
        assert_eq!(
            s.decide(DisconnectReason::NetworkError, 5),
            ReconnectDecision::None
        );
    }

    // --- Timer behavior ---

    #[tokio::test(start_paused = true)]
    async fn delayed_reconnect_emits_after_delay() {
        let (s, emitter) = strategy(ReconnectPolicyKind::AutoDelayed);
        let mut rx = emitter.subscribe();

        s.handle_disconnect(DisconnectReason::NetworkError, 1);
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "nothing before the delay");

        advance(Duration::from_millis(2_000)).await;
        tokio::task::yield_now().await;
        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            SessionEvent::ReconnectDue {
                reason: DisconnectReason::NetworkError,
                attempt: 2
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn user_disconnect_cancels_pending_timer() {
        let (s, emitter) = strategy(ReconnectPolicyKind::AutoDelayed);
        let mut rx = emitter.subscribe();

        s.handle_disconnect(DisconnectReason::NetworkError, 0);
        tokio::task::yield_now().await;
        s.on_user_disconnect();

        advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn proactive_timer_fires_before_the_limit() {
        let (s, emitter) = strategy(ReconnectPolicyKind::Proactive);
        let mut rx = emitter.subscribe();

        s.on_session_started(0);
        tokio::task::yield_now().await;

        // limit 3600s, margin 120s: fires at 3480s
        advance(Duration::from_secs(3_479)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            SessionEvent::ReconnectDue {
                reason: DisconnectReason::SessionLimit,
                attempt: 1
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_proactive_timer() {
        let (s, emitter) = strategy(ReconnectPolicyKind::Proactive);
        let mut rx = emitter.subscribe();

        s.on_session_started(0);
        tokio::task::yield_now().await;
        advance(Duration::from_secs(1_000)).await;
        tokio::task::yield_now().await;

        // A fresh session rearms from zero; the old timer must not fire
        // at the old deadline.
        s.on_session_started(1);
        tokio::task::yield_now().await;
        advance(Duration::from_secs(2_480)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        advance(Duration::from_secs(1_000)).await;
        tokio::task::yield_now().await;
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::ReconnectDue { attempt: 2, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn non_proactive_policies_never_arm_the_handover() {
        let (s, emitter) = strategy(ReconnectPolicyKind::AutoDelayed);
        let mut rx = emitter.subscribe();

        s.on_session_started(0);
        advance(Duration::from_secs(4_000)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
