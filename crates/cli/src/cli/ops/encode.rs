use clap::Args;

use common::metadata::{self, Attribute, DecodedMetadata};

#[derive(Args, Debug, Clone)]
pub struct Encode {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Image reference, usually ipfs://<cid>
    #[arg(long, default_value = "")]
    pub image: String,

    /// Attribute as trait=value, repeatable
    #[arg(long = "attribute", value_parser = parse_attribute)]
    pub attributes: Vec<Attribute>,

    #[arg(long)]
    pub background_color: Option<String>,

    #[arg(long)]
    pub external_url: Option<String>,

    #[arg(long)]
    pub animation_url: Option<String>,
}

fn parse_attribute(raw: &str) -> Result<Attribute, String> {
    let (trait_type, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected trait=value, got '{}'", raw))?;
    Ok(Attribute {
        trait_type: trait_type.trim().to_string(),
        value: value.trim().to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to encode metadata: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Encode {
    type Error = EncodeError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let record = DecodedMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            attributes: self.attributes.clone(),
            background_color: self
                .background_color
                .as_ref()
                .map(|c| c.trim_start_matches('#').to_string()),
            external_url: self.external_url.clone(),
            animation_url: self.animation_url.clone(),
        };

        Ok(metadata::encode(&record)?)
    }
}
