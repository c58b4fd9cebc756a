//! Transport timeout policy
//!
//! Master/worker round trips wait indefinitely unless a bound is configured
//! (`cluster.timeout_ms`). The bound applies to each round trip on its own,
//! never to plugin execution on the local process.

use std::future::Future;
use std::time::Duration;

/// Longest accepted bound (24h).
pub const MAX_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(86_400);

/// Bound on a single transport round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutPolicy {
    transport: Option<Duration>,
}

impl TimeoutPolicy {
    /// Wait forever.
    pub fn unbounded() -> Self {
        Self { transport: None }
    }

    /// Give up on a round trip after `limit`.
    pub fn bounded(limit: Duration) -> Self {
        Self {
            transport: Some(limit),
        }
    }

    /// Policy from an optional millisecond setting.
    pub fn from_millis(ms: Option<u64>) -> Self {
        Self {
            transport: ms.map(Duration::from_millis),
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.transport
    }

    /// Check the bound lies in (0, 24h].
    pub fn validate(&self) -> Result<(), TimeoutValidationError> {
        match self.transport {
            Some(limit) if limit.is_zero() || limit > MAX_TRANSPORT_TIMEOUT => {
                Err(TimeoutValidationError::TransportOutOfBounds {
                    value_ms: limit.as_millis() as u64,
                })
            }
            _ => Ok(()),
        }
    }

    /// Await `fut`, failing with the configured limit once it elapses.
    pub async fn bound<F: Future>(&self, fut: F) -> Result<F::Output, Duration> {
        match self.transport {
            None => Ok(fut.await),
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| limit),
        }
    }
}

/// Timeout validation errors
#[derive(Debug, thiserror::Error)]
pub enum TimeoutValidationError {
    #[error("transport timeout must be in (0, 86400000] ms, got {value_ms}")]
    TransportOutOfBounds { value_ms: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        assert_eq!(TimeoutPolicy::default(), TimeoutPolicy::unbounded());
        assert_eq!(TimeoutPolicy::from_millis(None).limit(), None);
        assert!(TimeoutPolicy::unbounded().validate().is_ok());
    }

    #[test]
    fn test_validate_bounds() {
        assert!(TimeoutPolicy::from_millis(Some(0)).validate().is_err());
        assert!(TimeoutPolicy::bounded(Duration::from_secs(86_401)).validate().is_err());
        assert!(TimeoutPolicy::from_millis(Some(250)).validate().is_ok());
    }

    #[tokio::test]
    async fn test_bound_passes_fast_futures() {
        let policy = TimeoutPolicy::bounded(Duration::from_secs(5));
        assert_eq!(policy.bound(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_bound_expires() {
        let policy = TimeoutPolicy::bounded(Duration::from_millis(10));
        let result = policy.bound(std::future::pending::<()>()).await;
        assert_eq!(result, Err(Duration::from_millis(10)));
    }
}
