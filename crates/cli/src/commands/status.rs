//! Status command handler.

use clap::Args;
use helpdesk_core::{config::AppConfig, AppError, AppResult};

/// Show component health
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    /// Execute the status command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Checking component health");

        let orchestrator = super::build_orchestrator(config).await?;
        let status = orchestrator.status().await;

        if self.json {
            let json = serde_json::to_string_pretty(&status)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            for (component, health) in &status {
                println!("{}: {}", component, health);
            }
        }

        Ok(())
    }
}
