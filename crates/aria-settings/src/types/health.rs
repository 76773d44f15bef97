//! Connection health thresholds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds consulted by the connection health monitor.
///
/// All durations are seconds in JSON; accessor methods return [`Duration`]
/// so call sites never multiply by hand.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthSettings {
    /// No user speech for this long counts as idle.
    pub idle_timeout_secs: u64,
    /// No inbound event of any kind for this long counts as stale.
    pub stale_after_secs: u64,
    /// Hard session duration limit imposed by the model provider.
    pub session_limit_secs: u64,
    /// Width of the warning band before the hard limit. A session older
    /// than `session_limit - limit_warning` is in the band.
    pub limit_warning_secs: u64,
    /// Sessions younger than this never classify as idle-timeout —
    /// avoids false positives right after connecting.
    pub min_session_age_secs: u64,
    /// Session age beyond which status degrades to warning.
    pub long_running_secs: u64,
    /// Periodic health check interval.
    pub check_interval_secs: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            stale_after_secs: 30,
            session_limit_secs: 3_600,
            limit_warning_secs: 300,
            min_session_age_secs: 60,
            long_running_secs: 1_800,
            check_interval_secs: 5,
        }
    }
}

impl HealthSettings {
    /// Idle threshold as a duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Stale threshold as a duration.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Hard session limit as a duration.
    pub fn session_limit(&self) -> Duration {
        Duration::from_secs(self.session_limit_secs)
    }

    /// Session age at which the limit warning band begins.
    pub fn limit_warning_start(&self) -> Duration {
        Duration::from_secs(self.session_limit_secs.saturating_sub(self.limit_warning_secs))
    }

    /// Minimum session age for idle classification.
    pub fn min_session_age(&self) -> Duration {
        Duration::from_secs(self.min_session_age_secs)
    }

    /// Long-running warning threshold as a duration.
    pub fn long_running(&self) -> Duration {
        Duration::from_secs(self.long_running_secs)
    }

    /// Periodic check interval as a duration.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_band_starts_before_limit() {
        let health = HealthSettings::default();
        assert!(health.limit_warning_start() < health.session_limit());
        assert_eq!(health.limit_warning_start(), Duration::from_secs(3_300));
    }

    #[test]
    fn band_wider_than_limit_saturates_to_zero() {
        let health = HealthSettings {
            session_limit_secs: 100,
            limit_warning_secs: 500,
            ..HealthSettings::default()
        };
        assert_eq!(health.limit_warning_start(), Duration::ZERO);
    }
}
