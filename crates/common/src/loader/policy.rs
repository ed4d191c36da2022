use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{FetchError, LoadError};

/// Substrings that mark an error message as gateway-specific. Error text
///  varies between platforms, so this list is only consulted for errors
///  the typed checks leave undecided: HTTP statuses below 500 other than
///  429, and local read failures.
pub const DEFAULT_FAILOVER_MARKERS: &[&str] = &[
    "cors",
    "cross-origin",
    "network",
    "timeout",
    "timed out",
    "connection",
    "unexpected token",
    "malformed",
];

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(750);

pub type FailurePredicate = Arc<dyn Fn(&LoadError) -> bool + Send + Sync>;

/// How a loader reacts to failed attempts.
///
/// Gateway failures (as judged by the predicate) move to the next gateway
/// immediately; any other failure waits `retry_delay` first. Both count
/// against `max_retries`, which defaults to one attempt per remaining gateway.
#[derive(Clone)]
pub struct FailoverPolicy {
    pub max_retries: Option<usize>,
    pub retry_delay: Duration,
    /// HEAD-check each gateway URL before fetching the body
    pub precheck: bool,
    is_gateway_failure: FailurePredicate,
}

impl fmt::Debug for FailoverPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverPolicy")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("precheck", &self.precheck)
            .finish_non_exhaustive()
    }
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            max_retries: None,
            retry_delay: DEFAULT_RETRY_DELAY,
            precheck: false,
            is_gateway_failure: marker_predicate(DEFAULT_FAILOVER_MARKERS),
        }
    }
}

impl FailoverPolicy {
    pub fn with_max_retries(mut self, max_retries: Option<usize>) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_precheck(mut self, precheck: bool) -> Self {
        self.precheck = precheck;
        self
    }

    /// Replace the message markers used by the default predicate.
    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.is_gateway_failure = marker_predicate(markers);
        self
    }

    /// Replace the gateway-failure predicate entirely.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&LoadError) -> bool + Send + Sync + 'static,
    {
        self.is_gateway_failure = Arc::new(predicate);
        self
    }

    pub fn is_gateway_failure(&self, error: &LoadError) -> bool {
        (self.is_gateway_failure)(error)
    }

    /// Retry budget for a registry of `gateway_count` entries.
    pub fn max_retries_for(&self, gateway_count: usize) -> usize {
        self.max_retries
            .unwrap_or_else(|| gateway_count.saturating_sub(1))
    }
}

fn marker_predicate<I, S>(markers: I) -> FailurePredicate
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let markers: Vec<String> = markers
        .into_iter()
        .map(|m| m.as_ref().trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect();

    Arc::new(move |error: &LoadError| match error {
        LoadError::Fetch(FetchError::Timeout(_) | FetchError::Transport(_)) => true,
        LoadError::Fetch(FetchError::Status(status)) if *status >= 500 || *status == 429 => true,
        LoadError::Malformed { .. } => true,
        other => {
            let message = other.to_string().to_lowercase();
            markers.iter().any(|marker| message.contains(marker))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_transport_errors_fail_over_immediately() {
        let policy = FailoverPolicy::default().with_markers(Vec::<String>::new());
        assert!(policy.is_gateway_failure(&FetchError::Timeout(Duration::from_secs(5)).into()));
        assert!(policy.is_gateway_failure(&FetchError::Transport("reset".into()).into()));
        assert!(policy.is_gateway_failure(&FetchError::Status(502).into()));
        assert!(policy.is_gateway_failure(&LoadError::malformed(
            crate::gateway::MediaKind::Model,
            "not a glTF asset"
        )));
    }

    #[test]
    fn test_not_found_waits_for_retry_delay() {
        let policy = FailoverPolicy::default();
        assert!(!policy.is_gateway_failure(&FetchError::Status(404).into()));
    }

    #[test]
    fn test_markers_match_undecided_messages() {
        let policy = FailoverPolicy::default();
        assert!(policy.is_gateway_failure(
            &FetchError::Io("/mnt/ipfs/QmA: Network is unreachable".into()).into()
        ));
        assert!(!policy.is_gateway_failure(
            &FetchError::Io("/mnt/ipfs/QmA: No such file".into()).into()
        ));
        assert!(!policy.is_gateway_failure(&FetchError::Status(403).into()));

        let custom = FailoverPolicy::default().with_markers(["status 403"]);
        assert!(custom.is_gateway_failure(&FetchError::Status(403).into()));
        assert!(!custom.is_gateway_failure(&FetchError::Status(404).into()));
    }

    #[test]
    fn test_custom_predicate() {
        let policy = FailoverPolicy::default().with_predicate(|_| false);
        assert!(!policy.is_gateway_failure(&FetchError::Transport("reset".into()).into()));
    }

    #[test]
    fn test_max_retries_defaults_to_remaining_gateways() {
        assert_eq!(FailoverPolicy::default().max_retries_for(4), 3);
        assert_eq!(FailoverPolicy::default().max_retries_for(1), 0);
        assert_eq!(
            FailoverPolicy::default()
                .with_max_retries(Some(7))
                .max_retries_for(4),
            7
        );
    }
}
