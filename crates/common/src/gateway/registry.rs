use url::Url;

use super::ContentReference;

/// Gateways used when no list is configured, most dedicated first.
///  Fresh resolutions always start at index 0, so the early entries
///  see the most traffic.
pub const DEFAULT_GATEWAYS: &[&str] = &[
    "https://gateway.pinata.cloud/ipfs/",
    "https://ipfs.io/ipfs/",
    "https://cloudflare-ipfs.com/ipfs/",
    "https://dweb.link/ipfs/",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("gateway registry must contain at least one gateway")]
    Empty,
    #[error("invalid gateway url '{0}': {1}")]
    InvalidUrl(String, String),
}

/// Ordered, immutable list of IPFS HTTP gateway base URLs.
///
/// Every entry ends with `/` so that `base + cid` is a valid URL.
/// Shared read-only between loaders, usually behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRegistry {
    gateways: Vec<String>,
}

impl Default for GatewayRegistry {
    fn default() -> Self {
        Self {
            gateways: DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
        }
    }
}

impl GatewayRegistry {
    /// Build a registry from base URLs, in preference order.
    pub fn new<I, S>(gateways: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for gateway in gateways {
            let gateway = gateway.as_ref().trim();
            let parsed = Url::parse(gateway)
                .map_err(|e| RegistryError::InvalidUrl(gateway.to_string(), e.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(RegistryError::InvalidUrl(
                    gateway.to_string(),
                    "scheme must be http or https".to_string(),
                ));
            }

            let mut base = gateway.to_string();
            if !base.ends_with('/') {
                base.push('/');
            }
            normalized.push(base);
        }

        if normalized.is_empty() {
            return Err(RegistryError::Empty);
        }

        Ok(Self {
            gateways: normalized,
        })
    }

    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    pub fn count(&self) -> usize {
        self.gateways.len()
    }

    /// Gateway base at `index`, wrapping around the end of the list.
    pub fn get(&self, index: usize) -> &str {
        &self.gateways[index % self.gateways.len()]
    }

    /// Round-robin successor of `current`. There is no terminal index;
    ///  exhaustion is tracked by the caller as a retry count.
    pub fn next_index(&self, current: usize) -> usize {
        (current + 1) % self.gateways.len()
    }

    /// Turn a reference into a fetchable URL at the given gateway.
    ///  Non-IPFS references are returned unchanged.
    pub fn resolve(&self, reference: &ContentReference, gateway_index: usize) -> String {
        match reference {
            ContentReference::Ipfs { cid, path_suffix } => {
                format!("{}{}{}", self.get(gateway_index), cid, path_suffix)
            }
            ContentReference::Http(raw)
            | ContentReference::Local(raw)
            | ContentReference::Unknown(raw) => raw.clone(),
        }
    }

    /// Strip the longest registered gateway prefix from `url`.
    pub(crate) fn strip_gateway<'a>(&self, url: &'a str) -> Option<&'a str> {
        self.gateways
            .iter()
            .filter(|gateway| url.starts_with(gateway.as_str()))
            .max_by_key(|gateway| gateway.len())
            .map(|gateway| &url[gateway.len()..])
    }
}
