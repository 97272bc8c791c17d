use std::time::Duration;

use crate::retry::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub delay: Duration,
    pub reason: RetryReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The failed response carried a delay hint.
    RetryAfterHeader,
    /// The action's own `retryAfter`.
    Declared,
    /// Neither was present.
    Default,
}

/// Picks the wait before a retry.
///
/// - `hint`: delay parsed from the failed attempt's response headers.
/// - `declared`: the RETRY action's `retryAfter`.
///
/// The result never exceeds `cfg.max_delay`.
pub fn decide_retry(
    cfg: &RetryConfig,
    hint: Option<Duration>,
    declared: Option<Duration>,
) -> RetryDecision {
    let (delay, reason) = match (hint.filter(|_| cfg.honor_retry_after), declared) {
        (Some(h), _) => (h, RetryReason::RetryAfterHeader),
        (None, Some(d)) => (d, RetryReason::Declared),
        (None, None) => (cfg.default_retry_after, RetryReason::Default),
    };
    RetryDecision {
        delay: delay.min(cfg.max_delay),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_overrides_declared_delay() {
        let cfg = RetryConfig::default();
        let d = decide_retry(&cfg, Some(Duration::from_secs(7)), Some(Duration::from_secs(2)));
        assert_eq!(d.delay, Duration::from_secs(7));
        assert_eq!(d.reason, RetryReason::RetryAfterHeader);
    }

    #[test]
    fn hint_ignored_when_disabled() {
        let cfg = RetryConfig {
            honor_retry_after: false,
            ..RetryConfig::default()
        };
        let d = decide_retry(&cfg, Some(Duration::from_secs(7)), Some(Duration::from_secs(2)));
        assert_eq!(d.delay, Duration::from_secs(2));
        assert_eq!(d.reason, RetryReason::Declared);
    }

    #[test]
    fn falls_back_to_default_and_clamps() {
        let cfg = RetryConfig {
            default_retry_after: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            ..RetryConfig::default()
        };
        assert_eq!(decide_retry(&cfg, None, None).delay, Duration::from_millis(250));
        assert_eq!(
            decide_retry(&cfg, Some(Duration::from_secs(3600)), None).delay,
            Duration::from_secs(10)
        );
    }
}
