use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{
    AssetCache, FailoverPolicy, FailureOutcome, Fetcher, LoadError, LoadStatus, LoadedAsset,
    ResolutionState, SessionId,
};
use crate::gateway::{ContentReference, GatewayRegistry, MediaKind};

/// Point-in-time view of a loader, published on every transition.
#[derive(Debug, Clone, Default)]
pub struct LoadSnapshot {
    pub session: SessionId,
    pub status: LoadStatus,
    pub reference: Option<ContentReference>,
    pub current_gateway_index: usize,
    pub retry_count: usize,
    pub url: Option<String>,
    pub last_error: Option<LoadError>,
    pub asset: Option<Arc<LoadedAsset>>,
}

struct Session {
    state: ResolutionState,
    asset: Option<Arc<LoadedAsset>>,
    /// Cache key this loader currently holds
    held: Option<String>,
    /// Hold from the previous session, kept until the current one settles
    stale_hold: Option<String>,
}

/// Everything a session task needs, cloned out of the loader.
struct SessionTask<F: Fetcher> {
    registry: Arc<GatewayRegistry>,
    fetcher: Arc<F>,
    policy: FailoverPolicy,
    cache: AssetCache,
    kind: MediaKind,
    inner: Arc<Mutex<Session>>,
    updates: Arc<watch::Sender<LoadSnapshot>>,
}

impl<F: Fetcher> Clone for SessionTask<F> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            fetcher: self.fetcher.clone(),
            policy: self.policy.clone(),
            cache: self.cache.clone(),
            kind: self.kind,
            inner: self.inner.clone(),
            updates: self.updates.clone(),
        }
    }
}

enum Step {
    Done,
    Retry { delay: Option<std::time::Duration> },
}

/// Loads one piece of media at a time, failing over between gateways.
///
/// Each call to [`MediaLoader::load`] starts a new session on a spawned
/// task. Attempts within a session are strictly sequential. Loading a new
/// reference, cancelling, or dropping the loader aborts the running task,
/// and every state mutation first checks that its session is still current.
///
/// Must be used from within a tokio runtime.
pub struct MediaLoader<F: Fetcher> {
    task: SessionTask<F>,
    handle: Option<JoinHandle<()>>,
}

impl<F: Fetcher> MediaLoader<F> {
    pub fn new(registry: Arc<GatewayRegistry>, fetcher: Arc<F>, kind: MediaKind) -> Self {
        let policy = FailoverPolicy::default();
        let state = ResolutionState::new(&registry, &policy);
        let (updates, _) = watch::channel(LoadSnapshot::default());

        Self {
            task: SessionTask {
                registry,
                fetcher,
                policy,
                cache: AssetCache::new(),
                kind,
                inner: Arc::new(Mutex::new(Session {
                    state,
                    asset: None,
                    held: None,
                    stale_hold: None,
                })),
                updates: Arc::new(updates),
            },
            handle: None,
        }
    }

    /// Replace the failover policy. Only affects sessions started afterwards.
    pub fn with_policy(mut self, policy: FailoverPolicy) -> Self {
        self.task.inner.lock().state = ResolutionState::new(&self.task.registry, &policy);
        self.task.policy = policy;
        self
    }

    /// Share an asset cache with other loaders.
    pub fn with_cache(mut self, cache: AssetCache) -> Self {
        self.task.cache = cache;
        self
    }

    pub fn kind(&self) -> MediaKind {
        self.task.kind
    }

    /// Classify `raw` and start loading it from the first gateway.
    pub fn load(&mut self, raw: &str) -> SessionId {
        let reference = self.task.registry.classify_as(raw, self.task.kind);
        self.load_reference(reference)
    }

    pub fn load_reference(&mut self, reference: ContentReference) -> SessionId {
        self.abort();
        let session = {
            let mut inner = self.task.inner.lock();
            self.task.retire_hold(&mut inner);
            let session = inner.state.start(reference);
            self.task.publish(&inner);
            session
        };
        tracing::debug!(%session, kind = %self.task.kind, "starting load session");
        self.spawn(session);
        session
    }

    /// Manual retry after exhaustion: restart from the first gateway.
    pub fn retry(&mut self) -> Option<SessionId> {
        self.abort();
        let session = {
            let mut inner = self.task.inner.lock();
            let session = inner.state.retry()?;
            self.task.retire_hold(&mut inner);
            self.task.publish(&inner);
            session
        };
        self.spawn(session);
        Some(session)
    }

    /// Abort any in-flight attempt and return to `Idle`.
    pub fn cancel(&mut self) {
        self.abort();
        let mut inner = self.task.inner.lock();
        inner.state.cancel();
        self.task.release_hold(&mut inner);
        self.task.publish(&inner);
    }

    pub fn snapshot(&self) -> LoadSnapshot {
        self.task.updates.borrow().clone()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LoadSnapshot> {
        self.task.updates.subscribe()
    }

    /// Wait until the current session succeeds or fails for good.
    pub async fn finished(&self) -> LoadSnapshot {
        let (session, status) = {
            let inner = self.task.inner.lock();
            (inner.state.session(), inner.state.status())
        };
        if status == LoadStatus::Idle {
            return self.snapshot();
        }

        let mut updates = self.subscribe();
        let waited = updates
            .wait_for(|snapshot| snapshot.session != session || snapshot.status.is_terminal())
            .await
            .map(|snapshot| snapshot.clone());

        waited.unwrap_or_else(|_| self.snapshot())
    }

    fn spawn(&mut self, session: SessionId) {
        let task = self.task.clone();
        self.handle = Some(tokio::spawn(async move { task.run(session).await }));
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl<F: Fetcher> Drop for MediaLoader<F> {
    fn drop(&mut self) {
        self.abort();
        let mut inner = self.task.inner.lock();
        inner.state.cancel();
        self.task.release_hold(&mut inner);
    }
}

impl<F: Fetcher> SessionTask<F> {
    fn publish(&self, inner: &Session) {
        let state = &inner.state;
        self.updates.send_replace(LoadSnapshot {
            session: state.session(),
            status: state.status(),
            reference: state.reference().cloned(),
            current_gateway_index: state.current_gateway_index(),
            retry_count: state.retry_count(),
            url: state.current_url(&self.registry),
            last_error: state.last_error().cloned(),
            asset: inner.asset.clone(),
        });
    }

    fn release_hold(&self, inner: &mut Session) {
        inner.asset = None;
        if let Some(url) = inner.held.take() {
            self.cache.release(&url);
        }
        self.release_stale_hold(inner);
    }

    /// Move the current hold aside so a reload of the same URL can still
    ///  hit the cache. Released by [`Self::release_stale_hold`].
    fn retire_hold(&self, inner: &mut Session) {
        inner.asset = None;
        if let Some(url) = inner.held.take() {
            if let Some(older) = inner.stale_hold.replace(url) {
                self.cache.release(&older);
            }
        }
    }

    fn release_stale_hold(&self, inner: &mut Session) {
        if let Some(url) = inner.stale_hold.take() {
            self.cache.release(&url);
        }
    }

    async fn run(self, session: SessionId) {
        loop {
            let url = {
                let inner = self.inner.lock();
                if !inner.state.accepts(session) {
                    return;
                }
                match inner.state.current_url(&self.registry) {
                    Some(url) => url,
                    None => return,
                }
            };

            let result = self.attempt(&url).await;
            match self.settle(session, &url, result) {
                Step::Done => return,
                Step::Retry { delay: Some(delay) } => tokio::time::sleep(delay).await,
                Step::Retry { delay: None } => {}
            }
        }
    }

    /// One attempt against one URL. The bool is true when the asset came
    ///  from the cache with a hold already taken.
    async fn attempt(&self, url: &str) -> Result<(Arc<LoadedAsset>, bool), LoadError> {
        if self.kind == MediaKind::Model {
            if let Some(asset) = self.cache.acquire(url) {
                tracing::debug!(url, "asset cache hit");
                return Ok((asset, true));
            }
        }

        if self.policy.precheck {
            self.fetcher.probe(url).await?;
        }

        let bytes = self.fetcher.fetch(url).await?;
        let asset = LoadedAsset::decode(url, self.kind, bytes)?;
        Ok((Arc::new(asset), false))
    }

    fn settle(
        &self,
        session: SessionId,
        url: &str,
        result: Result<(Arc<LoadedAsset>, bool), LoadError>,
    ) -> Step {
        let mut inner = self.inner.lock();

        match result {
            Ok((asset, from_cache)) => {
                if !inner.state.on_success(session) {
                    if from_cache {
                        self.cache.release(url);
                    }
                    return Step::Done;
                }

                let asset = match (from_cache, self.kind) {
                    (false, MediaKind::Model) => {
                        inner.held = Some(url.to_string());
                        self.cache.insert(asset)
                    }
                    (true, _) => {
                        inner.held = Some(url.to_string());
                        asset
                    }
                    (false, MediaKind::Image) => asset,
                };
                inner.asset = Some(asset);
                self.release_stale_hold(&mut inner);

                tracing::debug!(
                    %session,
                    url,
                    gateway_index = inner.state.current_gateway_index(),
                    "load succeeded"
                );
                self.publish(&inner);
                Step::Done
            }
            Err(error) => match inner.state.on_failure(session, error.clone(), &self.policy) {
                FailureOutcome::Stale => Step::Done,
                FailureOutcome::Exhausted => {
                    tracing::warn!(
                        %session,
                        url,
                        retries = inner.state.retry_count(),
                        error = %error,
                        "load failed with no gateway left to try"
                    );
                    self.release_stale_hold(&mut inner);
                    self.publish(&inner);
                    Step::Done
                }
                FailureOutcome::Retry {
                    gateway_index,
                    immediate,
                } => {
                    tracing::warn!(
                        %session,
                        url,
                        gateway_index,
                        immediate,
                        error = %error,
                        "load failed, failing over"
                    );
                    self.publish(&inner);
                    Step::Retry {
                        delay: (!immediate).then_some(self.policy.retry_delay),
                    }
                }
            },
        }
    }
}
