//! Media loading with gateway failover
//!
//! - **[`ResolutionState`]**: per-loader state machine (`idle → loading →
//!   success | error`) tracking the gateway index and retry count
//! - **[`FailoverPolicy`]**: retry budget, delay and the predicate deciding
//!   which failures are gateway-specific
//! - **[`Fetcher`]**: transport seam; [`HttpFetcher`] is the reqwest implementation
//! - **[`MediaLoader`]**: drives sessions on tokio tasks and publishes
//!   [`LoadSnapshot`]s through a watch channel
//! - **[`AssetCache`]**: decoded models shared between loaders by resolved URL
//!
//! # Failover
//!
//! ```text
//! start(ref) ──> attempt(gateway i) ──ok──> Success
//!                     │ err
//!                     ├─ ipfs && retries < max ──> i = next(i), retries += 1 ──> attempt
//!                     └─ otherwise ─────────────> Error (manual retry resets to gateway 0)
//! ```

mod asset;
mod cache;
mod error;
mod fetcher;
mod media_loader;
mod policy;
mod state;

pub use asset::{parse_model, AssetContent, LoadedAsset, ModelContainer, SceneGraph};
pub use cache::AssetCache;
pub use error::{FetchError, LoadError};
pub use fetcher::{Fetcher, HttpFetcher, DEFAULT_PROBE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
pub use media_loader::{LoadSnapshot, MediaLoader};
pub use policy::{FailoverPolicy, FailurePredicate, DEFAULT_FAILOVER_MARKERS, DEFAULT_RETRY_DELAY};
pub use state::{FailureOutcome, LoadStatus, ResolutionState, SessionId};
