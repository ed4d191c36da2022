use std::path::PathBuf;

use clap::Args;

use common::gateway::{ContentReference, MediaKind};
use common::upload::UploadResponse;

#[derive(Args, Debug, Clone)]
pub struct Resolve {
    /// Media reference: ipfs://<cid>, a gateway URL, an http(s) URL or a local path
    #[arg(required_unless_present = "upload_response")]
    pub reference: Option<String>,

    /// Treat the reference as a 3D model (appends .glb where needed)
    #[arg(long)]
    pub model: bool,

    /// Only print the URL for this gateway index
    #[arg(long)]
    pub gateway: Option<usize>,

    /// Read the reference from an upload service JSON response instead
    #[arg(long, conflicts_with = "reference")]
    pub upload_response: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to read upload response: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse upload response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("upload response carries no content reference: {0}")]
    NoReference(String),
}

impl Resolve {
    fn kind(&self) -> MediaKind {
        if self.model {
            MediaKind::Model
        } else {
            MediaKind::Image
        }
    }

    async fn reference(
        &self,
        ctx: &crate::cli::op::OpContext,
    ) -> Result<ContentReference, ResolveError> {
        if let Some(path) = &self.upload_response {
            let body = tokio::fs::read(path).await?;
            let response: UploadResponse = serde_json::from_slice(&body)?;
            return response
                .content_reference(&ctx.registry, self.kind())
                .ok_or_else(|| {
                    ResolveError::NoReference(
                        response
                            .message
                            .clone()
                            .unwrap_or_else(|| "upload was not successful".to_string()),
                    )
                });
        }

        let raw = self.reference.as_deref().unwrap_or_default();
        Ok(ctx.registry.classify_as(raw, self.kind()))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Resolve {
    type Error = ResolveError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let reference = self.reference(ctx).await?;

        if let Some(index) = self.gateway {
            return Ok(ctx.registry.resolve(&reference, index));
        }

        let mut lines = vec![format!("scheme:  {}", reference.scheme())];
        if let ContentReference::Ipfs { cid, path_suffix } = &reference {
            lines.push(format!("cid:     {}", cid));
            if !path_suffix.is_empty() {
                lines.push(format!("path:    {}", path_suffix));
            }
            if let Some(uri) = reference.to_ipfs_uri() {
                lines.push(format!("uri:     {}", uri));
            }
            lines.push("urls:".to_string());
            for index in 0..ctx.registry.count() {
                lines.push(format!(
                    "  {:>2}  {}",
                    index,
                    ctx.registry.resolve(&reference, index)
                ));
            }
        } else {
            lines.push(format!("url:     {}", ctx.registry.resolve(&reference, 0)));
        }

        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::op::{Op, OpContext};

    fn context(temp: &tempfile::TempDir) -> OpContext {
        crate::state::AppState::init(
            Some(temp.path().to_path_buf()),
            Some(crate::state::AppConfig {
                gateways: vec![
                    "https://one.example/ipfs/".to_string(),
                    "https://two.example/ipfs/".to_string(),
                ],
                ..Default::default()
            }),
        )
        .unwrap();
        OpContext::new(Some(temp.path().to_path_buf())).unwrap()
    }

    fn resolve(reference: &str) -> Resolve {
        Resolve {
            reference: Some(reference.to_string()),
            model: false,
            gateway: None,
            upload_response: None,
        }
    }

    #[tokio::test]
    async fn test_single_gateway_url() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = context(&temp);
        let op = Resolve {
            model: true,
            gateway: Some(1),
            ..resolve("https://one.example/ipfs/QmModel")
        };
        assert_eq!(
            op.execute(&ctx).await.unwrap(),
            "https://two.example/ipfs/QmModel.glb"
        );
    }

    #[tokio::test]
    async fn test_lists_every_gateway() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = context(&temp);
        let output = resolve("ipfs://QmPic/front.png").execute(&ctx).await.unwrap();
        assert!(output.contains("cid:     QmPic"));
        assert!(output.contains("https://one.example/ipfs/QmPic/front.png"));
        assert!(output.contains("https://two.example/ipfs/QmPic/front.png"));
    }

    #[tokio::test]
    async fn test_reads_upload_response() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = context(&temp);
        let path = temp.path().join("upload.json");
        std::fs::write(&path, r#"{"success":true,"IpfsHash":"QmUploaded"}"#).unwrap();

        let op = Resolve {
            reference: None,
            model: false,
            gateway: Some(0),
            upload_response: Some(path.clone()),
        };
        assert_eq!(
            op.execute(&ctx).await.unwrap(),
            "https://one.example/ipfs/QmUploaded"
        );

        std::fs::write(&path, r#"{"success":false,"message":"quota exceeded"}"#).unwrap();
        assert!(matches!(
            op.execute(&ctx).await,
            Err(ResolveError::NoReference(message)) if message == "quota exceeded"
        ));
    }
}
