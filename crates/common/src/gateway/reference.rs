use std::fmt;

use serde::{Deserialize, Serialize};

use super::GatewayRegistry;

pub const IPFS_SCHEME: &str = "ipfs://";

/// Extensions that viewers branch on when picking a 3D loader.
const MODEL_EXTENSIONS: [&str; 2] = [".glb", ".gltf"];
const DEFAULT_MODEL_EXTENSION: &str = ".glb";

/// What the caller intends to display, used as a normalization hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Image,
    Model,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Model => write!(f, "model"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Ipfs,
    Http,
    Local,
    Unknown,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scheme::Ipfs => "ipfs",
            Scheme::Http => "http",
            Scheme::Local => "local",
            Scheme::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A classified reference to displayable content.
///
/// Only `Ipfs` references are routed through gateways; the other variants
/// carry the original input and are passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentReference {
    Ipfs { cid: String, path_suffix: String },
    Http(String),
    Local(String),
    Unknown(String),
}

impl ContentReference {
    pub fn scheme(&self) -> Scheme {
        match self {
            ContentReference::Ipfs { .. } => Scheme::Ipfs,
            ContentReference::Http(_) => Scheme::Http,
            ContentReference::Local(_) => Scheme::Local,
            ContentReference::Unknown(_) => Scheme::Unknown,
        }
    }

    pub fn is_ipfs(&self) -> bool {
        matches!(self, ContentReference::Ipfs { .. })
    }

    pub fn cid(&self) -> Option<&str> {
        match self {
            ContentReference::Ipfs { cid, .. } => Some(cid),
            _ => None,
        }
    }

    pub fn path_suffix(&self) -> &str {
        match self {
            ContentReference::Ipfs { path_suffix, .. } => path_suffix,
            _ => "",
        }
    }

    /// Canonical `ipfs://` form of an IPFS reference.
    pub fn to_ipfs_uri(&self) -> Option<String> {
        match self {
            ContentReference::Ipfs { cid, path_suffix } => {
                Some(format!("{}{}{}", IPFS_SCHEME, cid, path_suffix))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ContentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentReference::Ipfs { cid, path_suffix } => {
                write!(f, "{}{}{}", IPFS_SCHEME, cid, path_suffix)
            }
            ContentReference::Http(raw)
            | ContentReference::Local(raw)
            | ContentReference::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

impl GatewayRegistry {
    /// Classify a raw reference string. Never fails: anything
    ///  unrecognized becomes [`ContentReference::Unknown`].
    pub fn classify(&self, raw: &str) -> ContentReference {
        self.classify_as(raw, MediaKind::Image)
    }

    /// Classify with a hint about the media being displayed. A `Model`
    ///  hint makes extension-less IPFS paths default to `.glb`.
    pub fn classify_as(&self, raw: &str, kind: MediaKind) -> ContentReference {
        let raw = raw.trim();
        if raw.is_empty() {
            return ContentReference::Unknown(String::new());
        }

        if let Some(path) = raw.strip_prefix(IPFS_SCHEME) {
            return ipfs_reference(path, kind)
                .unwrap_or_else(|| ContentReference::Unknown(raw.to_string()));
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            return self
                .strip_gateway(raw)
                .and_then(|path| ipfs_reference(path, kind))
                .unwrap_or_else(|| ContentReference::Http(raw.to_string()));
        }

        if raw.starts_with('/') || raw.starts_with("./") {
            return ContentReference::Local(raw.to_string());
        }

        ContentReference::Unknown(raw.to_string())
    }
}

/// Split an IPFS path into cid and normalized suffix.
///  `None` when the path does not start with a CID-shaped token.
fn ipfs_reference(path: &str, kind: MediaKind) -> Option<ContentReference> {
    let mut path = path;
    while let Some(rest) = path.strip_prefix("ipfs/") {
        path = rest;
    }

    let cid_len = path
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if cid_len == 0 {
        return None;
    }

    let (cid, path_suffix) = path.split_at(cid_len);
    Some(ContentReference::Ipfs {
        cid: cid.to_string(),
        path_suffix: normalize_suffix(path_suffix, kind),
    })
}

/// Only the part after the cid is inspected, so a cid that happens to
///  contain `glb` is left alone.
fn normalize_suffix(path_suffix: &str, kind: MediaKind) -> String {
    let mut suffix = collapse_duplicate_extension(path_suffix).to_string();

    let lower = suffix.to_ascii_lowercase();
    let has_model_extension = MODEL_EXTENSIONS.iter().any(|ext| lower.ends_with(ext));
    let mentions_model = lower.contains("glb") || lower.contains("gltf");
    if (mentions_model || kind == MediaKind::Model) && !has_model_extension {
        suffix.push_str(DEFAULT_MODEL_EXTENSION);
    }

    suffix
}

/// `abc.glb.glb` -> `abc.glb`, case-insensitively, repeated until stable.
fn collapse_duplicate_extension(path: &str) -> &str {
    let mut path = path;
    'outer: loop {
        let lower = path.to_ascii_lowercase();
        for ext in MODEL_EXTENSIONS {
            if lower.ends_with(&ext.repeat(2)) {
                path = &path[..path.len() - ext.len()];
                continue 'outer;
            }
        }
        return path;
    }
}
