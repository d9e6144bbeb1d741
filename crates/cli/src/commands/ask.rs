//! Ask command handler.
//!
//! One-shot question answering over the chat orchestrator.

use clap::Args;
use helpdesk_chat::ClassificationMode;
use helpdesk_core::{config::AppConfig, AppError, AppResult};

/// Ask a single question and exit
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<std::path::PathBuf>,

    /// Session identifier (reuse to carry history across invocations)
    #[arg(long, default_value = "default")]
    pub session: String,

    /// Use model-assisted intent classification
    #[arg(long)]
    pub model_classification: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let question = self
            .get_question()
            .ok_or_else(|| AppError::Config("No question provided".to_string()))?;

        let orchestrator = super::build_orchestrator(config).await?;

        let mode = if self.model_classification {
            ClassificationMode::ModelAssisted
        } else {
            ClassificationMode::Keyword
        };

        let result = orchestrator.handle(&question, mode, &self.session).await;

        if self.json {
            let output = serde_json::json!({
                "query": question,
                "intent": result.intent.label(),
                "answer": result.answer,
                "sourceContext": result.source_context,
                "diagnostics": result.diagnostics,
            });

            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", result.answer);

            for diagnostic in &result.diagnostics {
                tracing::debug!("Diagnostic: {}", diagnostic);
            }
        }

        Ok(())
    }

    /// Get the question text from the positional argument or a file.
    fn get_question(&self) -> Option<String> {
        self.question.clone().or_else(|| {
            self.file.as_ref().and_then(|path| {
                std::fs::read_to_string(path)
                    .map_err(|e| tracing::error!("Failed to read question file: {}", e))
                    .ok()
                    .map(|s| s.trim().to_string())
            })
        })
    }
}
