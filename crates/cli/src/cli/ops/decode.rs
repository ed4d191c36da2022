use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct Decode {
    /// Metadata URI (data URI, host-wrapped data URI, bare base64 or ipfs://)
    pub uri: String,

    /// Name to use when synthesizing metadata for a bare IPFS reference
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("no metadata could be decoded from the given uri")]
    Undecodable,
    #[error("failed to render metadata: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Decode {
    type Error = DecodeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let decoder = ctx.state.config.decoder();
        let metadata = match &self.name {
            Some(name) => decoder.decode_with_name(&self.uri, name),
            None => decoder.decode(&self.uri),
        }
        .ok_or(DecodeError::Undecodable)?;

        Ok(serde_json::to_string_pretty(&metadata)?)
    }
}
