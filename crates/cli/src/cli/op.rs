use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use common::gateway::{GatewayRegistry, RegistryError};
use common::loader::{FetchError, HttpFetcher};

use crate::state::{AppState, StateError};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("invalid gateway list: {0}")]
    Registry(#[from] RegistryError),
    #[error("failed to build http client: {0}")]
    Fetcher(#[from] FetchError),
}

#[derive(Clone)]
pub struct OpContext {
    /// Loaded config, or defaults when `ballot init` was never run
    pub state: AppState,
    pub registry: Arc<GatewayRegistry>,
    pub fetcher: Arc<HttpFetcher>,
    /// Optional custom config path (defaults to ~/.ballot)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ContextError> {
        let state = AppState::load_or_default(config_path.clone())?;
        let registry = Arc::new(state.config.registry()?);
        let fetcher = Arc::new(state.config.fetcher()?);

        Ok(Self {
            state,
            registry,
            fetcher,
            config_path,
        })
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_falls_back_to_default_gateways() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = OpContext::new(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(
            ctx.registry.count(),
            common::gateway::DEFAULT_GATEWAYS.len()
        );
    }

    #[test]
    fn test_context_rejects_broken_config() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "gateways = 7").unwrap();
        assert!(matches!(
            OpContext::new(Some(temp.path().to_path_buf())),
            Err(ContextError::State(StateError::TomlDe(_)))
        ));
    }
}
