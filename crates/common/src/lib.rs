/**
 * IPFS gateway registry, reference classification
 *  and gateway URL resolution.
 */
pub mod gateway;
/**
 * Media loading with automatic gateway failover.
 *  State machine, fetch transport, decoded asset
 *  cache and the async loader driving them.
 */
pub mod loader;
/**
 * Ballot metadata carried as base64 JSON data URIs.
 */
pub mod metadata;
/**
 * Adapter from the backend upload response to
 *  a content reference.
 */
pub mod upload;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::gateway::{ContentReference, GatewayRegistry, MediaKind, Scheme};
    pub use crate::loader::{
        AssetCache, FailoverPolicy, Fetcher, HttpFetcher, LoadError, LoadSnapshot, LoadStatus,
        LoadedAsset, MediaLoader,
    };
    pub use crate::metadata::{DecodedMetadata, MetadataDecoder};
    pub use crate::upload::UploadResponse;
    pub use crate::version::BuildInfo;
}
