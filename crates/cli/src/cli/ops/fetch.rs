use std::path::PathBuf;

use clap::Args;

use common::gateway::{MediaKind, Scheme};
use common::loader::{AssetContent, LoadStatus, LoadedAsset, MediaLoader};

#[derive(Args, Debug, Clone)]
pub struct Fetch {
    /// Media reference: ipfs://<cid>, a gateway URL, an http(s) URL or a local path
    pub reference: String,

    /// Load as a 3D model instead of an image
    #[arg(long)]
    pub model: bool,

    /// Write the fetched bytes to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the configured automatic failover budget
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// HEAD-check each gateway before fetching
    #[arg(long)]
    pub precheck: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("unrecognized media reference: {0}")]
    Unrecognized(String),
    #[error("load failed after {retries} failover(s) at {url}: {reason}")]
    Exhausted {
        url: String,
        retries: usize,
        reason: String,
    },
    #[error("load was cancelled")]
    Cancelled,
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

fn describe(asset: &LoadedAsset) -> String {
    match &asset.content {
        AssetContent::Image {
            format,
            width,
            height,
        } => format!("image   {} {}x{}", format, width, height),
        AssetContent::Model(scene) => format!(
            "model   glTF {} {:?}, {} scene(s), {} node(s), {} mesh(es), {} material(s), {} animation(s)",
            scene.version,
            scene.container,
            scene.scenes,
            scene.nodes,
            scene.meshes,
            scene.materials,
            scene.animations
        ),
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Fetch {
    type Error = FetchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let kind = if self.model {
            MediaKind::Model
        } else {
            MediaKind::Image
        };
        let reference = ctx.registry.classify_as(&self.reference, kind);
        if reference.scheme() == Scheme::Unknown {
            return Err(FetchError::Unrecognized(self.reference.clone()));
        }

        let mut policy = ctx.state.config.policy();
        if self.max_retries.is_some() {
            policy = policy.with_max_retries(self.max_retries);
        }
        if self.precheck {
            policy = policy.with_precheck(true);
        }

        let mut loader = MediaLoader::new(ctx.registry.clone(), ctx.fetcher.clone(), kind)
            .with_policy(policy);
        loader.load_reference(reference);
        let snapshot = loader.finished().await;

        let asset = match (snapshot.status, snapshot.asset) {
            (LoadStatus::Success, Some(asset)) => asset,
            (LoadStatus::Error, _) => {
                return Err(FetchError::Exhausted {
                    url: snapshot.url.unwrap_or_default(),
                    retries: snapshot.retry_count,
                    reason: snapshot
                        .last_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown error".to_string()),
                })
            }
            _ => return Err(FetchError::Cancelled),
        };

        let mime = mime_guess::from_path(&asset.url).first_or_octet_stream();
        let mut lines = vec![
            format!("url:     {}", asset.url),
            format!("gateway: {}", snapshot.current_gateway_index),
            format!("retries: {}", snapshot.retry_count),
            format!("type:    {}", mime),
            format!("size:    {} bytes", asset.bytes.len()),
            format!("content: {}", describe(&asset)),
        ];

        if let Some(path) = &self.output {
            tokio::fs::write(path, &asset.bytes).await?;
            tracing::info!(path = %path.display(), "wrote fetched media");
            lines.push(format!("saved:   {}", path.display()));
        }

        Ok(lines.join("\n"))
    }
}
