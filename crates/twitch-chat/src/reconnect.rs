use std::time::Duration;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How the connection task retries after losing the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Retry forever with a constant delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Delay before reconnect attempt number `attempt` (starting at 1), or
    /// `None` when the policy gives up.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt > max => None,
            _ => Some(self.delay),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_never_gives_up() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.next_delay(1), Some(DEFAULT_RECONNECT_DELAY));
        assert_eq!(policy.next_delay(10_000), Some(DEFAULT_RECONNECT_DELAY));
    }

    #[test]
    fn bounded_policy_stops_after_max_attempts() {
        let policy = ReconnectPolicy {
            delay: Duration::from_millis(10),
            max_attempts: Some(2),
        };
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(10)));
        assert_eq!(policy.next_delay(3), None);
    }
}
