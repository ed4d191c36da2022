//! IPFS gateway registry and content reference handling
//!
//! - **[`GatewayRegistry`]**: ordered, read-only list of HTTP gateways; the first
//!   entry is the preferred (dedicated) gateway
//! - **[`ContentReference`]**: a classified and normalized reference string
//!
//! A raw reference is classified against the registry, then resolved into a
//! fetchable URL at a gateway index:
//! ```text
//! "ipfs://QmAbc.glb.glb" --classify--> Ipfs { cid: "QmAbc", path_suffix: ".glb" }
//!                        --resolve(1)--> "https://ipfs.io/ipfs/QmAbc.glb"
//! ```
//! Resolved gateway URLs classify back to the same reference, so a caller can
//! re-resolve a URL against another gateway without keeping the original input.

mod reference;
mod registry;

pub use reference::{ContentReference, MediaKind, Scheme, IPFS_SCHEME};
pub use registry::{GatewayRegistry, RegistryError, DEFAULT_GATEWAYS};
