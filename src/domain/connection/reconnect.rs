//! Reconnect delay policy.

use std::time::Duration;

/// How the Connection Manager spaces out reconnect attempts.
///
/// Attempts are numbered from 1 (the first retry after a drop). A policy
/// returns `None` once the attempt budget is spent, which is the signal to
/// stop retrying and publish `connection-failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay every time. `max_attempts: None` retries forever.
    Fixed {
        interval: Duration,
        max_attempts: Option<u32>,
    },

    /// `base * 2^(attempt - 1)`, capped at `max_delay`.
    Exponential {
        base: Duration,
        max_delay: Duration,
        max_attempts: u32,
    },
}

impl ReconnectPolicy {
    /// Fixed interval with no attempt cap.
    pub fn fixed(interval: Duration) -> Self {
        ReconnectPolicy::Fixed {
            interval,
            max_attempts: None,
        }
    }

    /// Exponential backoff.
    pub fn exponential(base: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        ReconnectPolicy::Exponential {
            base,
            max_delay,
            max_attempts,
        }
    }

    /// Delay before the given 1-based attempt, or `None` if the budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return Some(Duration::ZERO);
        }
        match *self {
            ReconnectPolicy::Fixed {
                interval,
                max_attempts,
            } => match max_attempts {
                Some(max) if attempt > max => None,
                _ => Some(interval),
            },
            ReconnectPolicy::Exponential {
                base,
                max_delay,
                max_attempts,
            } => {
                if attempt > max_attempts {
                    return None;
                }
                let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
                Some(base.saturating_mul(factor).min(max_delay))
            }
        }
    }

    /// Maximum number of attempts, if bounded.
    pub fn max_attempts(&self) -> Option<u32> {
        match *self {
            ReconnectPolicy::Fixed { max_attempts, .. } => max_attempts,
            ReconnectPolicy::Exponential { max_attempts, .. } => Some(max_attempts),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::exponential(Duration::from_secs(1), Duration::from_secs(30), 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fixed_policy_never_gives_up_without_cap() {
        let policy = ReconnectPolicy::fixed(Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_for(1_000), Some(Duration::from_secs(5)));
    }

    #[test]
    fn fixed_policy_respects_cap() {
        let policy = ReconnectPolicy::Fixed {
            interval: Duration::from_secs(3),
            max_attempts: Some(2),
        };
        assert!(policy.delay_for(2).is_some());
        assert_eq!(policy.delay_for(3), None);
    }

    #[test]
    fn exponential_doubles_until_cap() {
        let policy =
            ReconnectPolicy::exponential(Duration::from_secs(1), Duration::from_secs(30), 10);
        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_for(5), Some(Duration::from_secs(16)));
        assert_eq!(policy.delay_for(6), Some(Duration::from_secs(30)));
    }

    #[test]
    fn exponential_stops_after_max_attempts() {
        let policy = ReconnectPolicy::default();
        assert!(policy.delay_for(5).is_some());
        assert_eq!(policy.delay_for(6), None);
    }

    proptest! {
        #[test]
        fn exponential_delay_is_monotonic_and_capped(
            base_ms in 1u64..5_000,
            cap_ms in 1u64..120_000,
            attempt in 1u32..64,
        ) {
            let policy = ReconnectPolicy::exponential(
                Duration::from_millis(base_ms),
                Duration::from_millis(cap_ms),
                64,
            );
            let this = policy.delay_for(attempt).unwrap();
            let next = policy.delay_for(attempt + 1).unwrap();
            prop_assert!(this <= Duration::from_millis(cap_ms));
            prop_assert!(next >= this);
        }
    }
}
