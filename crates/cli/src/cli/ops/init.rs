use clap::Args;

use crate::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Gateway base URLs in priority order (comma separated, defaults to the built-in list)
    #[arg(long, value_delimiter = ',')]
    pub gateways: Vec<String>,

    /// Automatic failovers per load (defaults to one per remaining gateway)
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// HEAD-check each gateway before fetching
    #[arg(long)]
    pub precheck: bool,

    /// Backend URL prefixes that may wrap metadata data URIs (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub metadata_hosts: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig {
            max_retries: self.max_retries,
            precheck: self.precheck,
            metadata_hosts: self.metadata_hosts.clone(),
            ..Default::default()
        };
        if !self.gateways.is_empty() {
            config.gateways = self.gateways.clone();
        }

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let mut output = format!(
            "Initialized ballot config at: {}\n",
            state.config_path.display()
        );
        output.push_str(&format!("  Gateways: {}\n", state.config.gateways.len()));
        for gateway in &state.config.gateways {
            output.push_str(&format!("    {}\n", gateway));
        }
        output.push_str(&format!("  Precheck: {}", state.config.precheck));

        Ok(output)
    }
}
