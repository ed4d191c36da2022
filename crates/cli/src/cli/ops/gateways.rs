use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct Gateways;

#[derive(Debug, thiserror::Error)]
pub enum GatewaysError {
    #[error("listing gateways failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Gateways {
    type Error = GatewaysError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let lines: Vec<String> = ctx
            .registry
            .gateways()
            .iter()
            .enumerate()
            .map(|(index, gateway)| format!("{:>2}  {}", index, gateway))
            .collect();

        Ok(lines.join("\n"))
    }
}
