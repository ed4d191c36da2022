use std::fmt;

use super::{FailoverPolicy, LoadError};
use crate::gateway::{ContentReference, GatewayRegistry};

/// Identifies one load session. Increases monotonically per
///  [`ResolutionState`], so a stale completion can always be told
///  apart from the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl LoadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadStatus::Success | LoadStatus::Error)
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStatus::Idle => "idle",
            LoadStatus::Loading => "loading",
            LoadStatus::Success => "success",
            LoadStatus::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// What the owner of a [`ResolutionState`] should do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Try again at `gateway_index`, right away or after the retry delay
    Retry { gateway_index: usize, immediate: bool },
    /// No fallback left; the state is now `Error`
    Exhausted,
    /// The failure belongs to an abandoned session and was ignored
    Stale,
}

/// Gateway rotation and retry bookkeeping for one loader.
///
/// Owned by exactly one loader. Every transition that reports on an attempt
/// takes the [`SessionId`] the attempt was started under and ignores it when
/// a newer session has begun.
#[derive(Debug, Clone)]
pub struct ResolutionState {
    session: SessionId,
    reference: Option<ContentReference>,
    current_gateway_index: usize,
    retry_count: usize,
    max_retries: usize,
    gateway_count: usize,
    status: LoadStatus,
    last_error: Option<LoadError>,
}

impl ResolutionState {
    pub fn new(registry: &GatewayRegistry, policy: &FailoverPolicy) -> Self {
        Self {
            session: SessionId::default(),
            reference: None,
            current_gateway_index: 0,
            retry_count: 0,
            max_retries: policy.max_retries_for(registry.count()),
            gateway_count: registry.count(),
            status: LoadStatus::Idle,
            last_error: None,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn reference(&self) -> Option<&ContentReference> {
        self.reference.as_ref()
    }

    pub fn current_gateway_index(&self) -> usize {
        self.current_gateway_index
    }

    pub fn retry_count(&self) -> usize {
        self.retry_count
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        self.last_error.as_ref()
    }

    /// URL for the current attempt, if a reference is loaded.
    pub fn current_url(&self, registry: &GatewayRegistry) -> Option<String> {
        self.reference
            .as_ref()
            .map(|reference| registry.resolve(reference, self.current_gateway_index))
    }

    /// Whether an attempt started under `session` may still report back.
    pub fn accepts(&self, session: SessionId) -> bool {
        self.session == session && self.status == LoadStatus::Loading
    }

    /// Begin a fresh session for `reference`. Everything is reset.
    pub fn start(&mut self, reference: ContentReference) -> SessionId {
        self.reference = Some(reference);
        self.current_gateway_index = 0;
        self.retry_count = 0;
        self.last_error = None;
        self.session = SessionId(self.session.0 + 1);
        self.status = LoadStatus::Loading;
        self.session
    }

    /// Abandon the current session and go back to `Idle`.
    pub fn cancel(&mut self) -> SessionId {
        self.session = SessionId(self.session.0 + 1);
        self.status = LoadStatus::Idle;
        self.session
    }

    pub fn on_success(&mut self, session: SessionId) -> bool {
        if !self.accepts(session) {
            return false;
        }
        self.status = LoadStatus::Success;
        self.last_error = None;
        true
    }

    pub fn on_failure(
        &mut self,
        session: SessionId,
        error: LoadError,
        policy: &FailoverPolicy,
    ) -> FailureOutcome {
        if !self.accepts(session) {
            return FailureOutcome::Stale;
        }

        let immediate = policy.is_gateway_failure(&error);
        self.last_error = Some(error);

        match self.try_next_gateway() {
            Some(gateway_index) => FailureOutcome::Retry {
                gateway_index,
                immediate,
            },
            None => {
                self.status = LoadStatus::Error;
                FailureOutcome::Exhausted
            }
        }
    }

    /// Advance to the next gateway if the reference is IPFS, the last load
    ///  did not succeed and the retry budget allows it.
    pub fn try_next_gateway(&mut self) -> Option<usize> {
        let is_ipfs = self.reference.as_ref().is_some_and(|r| r.is_ipfs());
        if !is_ipfs || self.status == LoadStatus::Success || self.retry_count >= self.max_retries
        {
            return None;
        }

        self.retry_count += 1;
        self.current_gateway_index = (self.current_gateway_index + 1) % self.gateway_count;
        Some(self.current_gateway_index)
    }

    /// Manual retry: restart the current reference from the first gateway.
    pub fn retry(&mut self) -> Option<SessionId> {
        let reference = self.reference.clone()?;
        Some(self.start(reference))
    }
}
