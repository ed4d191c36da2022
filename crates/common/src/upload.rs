use serde::{Deserialize, Serialize};

use crate::gateway::{ContentReference, GatewayRegistry, MediaKind, IPFS_SCHEME};

/// Response body of the backend's `multipart/form-data` upload endpoint.
///  Only the content locators are consumed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default, alias = "IpfsHash")]
    pub ipfs_hash: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_info: Option<serde_json::Value>,
}

impl UploadResponse {
    /// Reference to the uploaded content: `cid`, then `ipfsHash`, then
    ///  `imageUrl` / `url`. `None` for failed uploads.
    pub fn content_reference(
        &self,
        registry: &GatewayRegistry,
        kind: MediaKind,
    ) -> Option<ContentReference> {
        if !self.success {
            return None;
        }

        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let hash = non_empty(&self.cid).or_else(|| non_empty(&self.ipfs_hash));
        if let Some(hash) = hash {
            let raw = if hash.starts_with(IPFS_SCHEME) {
                hash
            } else {
                format!("{}{}", IPFS_SCHEME, hash)
            };
            return Some(registry.classify_as(&raw, kind));
        }

        non_empty(&self.image_url)
            .or_else(|| non_empty(&self.url))
            .map(|raw| registry.classify_as(&raw, kind))
    }
}
