use std::time::Duration;

use autopush_api_client::{GitDataApi, RateLimitStatus};
use tracing::{info, warn};

use crate::error::PushError;

/// Longest rate-limit reset a push waits for unless configured otherwise.
pub const DEFAULT_MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// What the orchestrator should do before making any other remote call.
#[derive(Debug)]
pub enum RateDecision {
    Proceed,
    /// Quota is exhausted but resets within the tolerable wait.
    Wait(Duration),
    /// Quota is exhausted for longer than the tolerable wait.
    Abort(PushError),
}

/// Consulted exactly once per push; never retries.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitGuard {
    max_wait: Duration,
}

impl RateLimitGuard {
    pub fn new(max_wait: Duration) -> Self {
        Self { max_wait }
    }

    /// Read the quota and decide. A failed read fails open.
    pub async fn check<A: GitDataApi>(&self, api: &A) -> RateDecision {
        match api.rate_limit().await {
            Ok(status) => self.decide(&status),
            Err(e) => {
                warn!("Could not read rate limit, proceeding: {e}");
                RateDecision::Proceed
            }
        }
    }

    pub fn decide(&self, status: &RateLimitStatus) -> RateDecision {
        if !status.is_exhausted() {
            return RateDecision::Proceed;
        }
        let wait = Duration::from_secs(status.reset_in_secs);
        if wait > self.max_wait {
            return RateDecision::Abort(PushError::RateLimit {
                wait_secs: status.reset_in_secs,
            });
        }
        if wait.is_zero() {
            return RateDecision::Proceed;
        }
        info!(
            wait_secs = status.reset_in_secs,
            "Rate limit exhausted, waiting for reset"
        );
        RateDecision::Wait(wait)
    }
}

impl Default for RateLimitGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RATE_LIMIT_WAIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGitData;

    fn status(remaining: u64, reset_in_secs: u64) -> RateLimitStatus {
        RateLimitStatus {
            remaining,
            reset_in_secs,
        }
    }

    #[test]
    fn remaining_quota_proceeds() {
        let guard = RateLimitGuard::default();
        assert!(matches!(guard.decide(&status(1, 3_000)), RateDecision::Proceed));
    }

    #[test]
    fn short_reset_waits() {
        let guard = RateLimitGuard::default();
        match guard.decide(&status(0, 30)) {
            RateDecision::Wait(d) => assert_eq!(d, Duration::from_secs(30)),
            other => panic!("expected wait, got {other:?}"),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let guard = RateLimitGuard::default();
        assert!(matches!(guard.decide(&status(0, 60)), RateDecision::Wait(_)));
        assert!(matches!(guard.decide(&status(0, 61)), RateDecision::Abort(_)));
    }

    #[test]
    fn long_reset_aborts_with_minutes() {
        let guard = RateLimitGuard::default();
        let RateDecision::Abort(err) = guard.decide(&status(0, 120)) else {
            panic!("expected abort");
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Please wait 2 minutes before trying again."
        );
    }

    #[test]
    fn already_reset_proceeds() {
        let guard = RateLimitGuard::default();
        assert!(matches!(guard.decide(&status(0, 0)), RateDecision::Proceed));
    }

    #[tokio::test]
    async fn unreadable_quota_fails_open() {
        let fake = FakeGitData::with_branch("master");
        fake.fail_rate_limit(503);
        let decision = RateLimitGuard::default().check(&fake).await;
        assert!(matches!(decision, RateDecision::Proceed));
    }
}
