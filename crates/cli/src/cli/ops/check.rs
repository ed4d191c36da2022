use clap::Args;
use futures::future::join_all;
use tokio::time::Instant;

use common::gateway::MediaKind;
use common::loader::Fetcher;

#[derive(Args, Debug, Clone)]
pub struct Check {
    /// Media reference to probe on every configured gateway
    pub reference: String,

    /// Treat the reference as a 3D model (appends .glb where needed)
    #[arg(long)]
    pub model: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("no gateway could serve {0}")]
    Unreachable(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Check {
    type Error = CheckError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let kind = if self.model {
            MediaKind::Model
        } else {
            MediaKind::Image
        };
        let reference = ctx.registry.classify_as(&self.reference, kind);

        // non-IPFS references resolve to the same URL on every gateway
        let urls: Vec<String> = if reference.is_ipfs() {
            (0..ctx.registry.count())
                .map(|index| ctx.registry.resolve(&reference, index))
                .collect()
        } else {
            vec![ctx.registry.resolve(&reference, 0)]
        };

        let probes = urls.iter().map(|url| async move {
            let started = Instant::now();
            let result = ctx.fetcher.probe(url).await;
            (url, result, started.elapsed())
        });
        let results = join_all(probes).await;

        let mut reachable = 0;
        let mut lines = Vec::with_capacity(results.len());
        for (url, result, elapsed) in results {
            match result {
                Ok(()) => {
                    reachable += 1;
                    lines.push(format!("OK    {:>5}ms  {}", elapsed.as_millis(), url));
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "gateway probe failed");
                    lines.push(format!("FAIL  {:>5}ms  {}  ({})", elapsed.as_millis(), url, e));
                }
            }
        }

        if reachable == 0 {
            return Err(CheckError::Unreachable(reference.to_string()));
        }

        lines.push(format!("{}/{} reachable", reachable, urls.len()));
        Ok(lines.join("\n"))
    }
}
