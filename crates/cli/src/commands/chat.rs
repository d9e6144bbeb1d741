//! Interactive chat command handler.

use clap::Args;
use helpdesk_chat::ClassificationMode;
use helpdesk_core::{config::AppConfig, AppResult};
use std::io::Write;

/// Interactive chat session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Session identifier (history is kept per session)
    #[arg(long, default_value = "default")]
    pub session: String,

    /// Use model-assisted intent classification
    #[arg(long)]
    pub model_classification: bool,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Starting interactive chat (session: {})", self.session);

        let orchestrator = super::build_orchestrator(config).await?;

        let mode = if self.model_classification {
            ClassificationMode::ModelAssisted
        } else {
            ClassificationMode::Keyword
        };

        println!("Helpdesk Assistant");
        println!("Type 'exit' or 'quit' to end the conversation");
        println!("Type 'history' to see conversation history");
        println!("Type 'status' to see system status");
        println!("Type 'clear' to clear conversation history");
        println!();

        let stdin = std::io::stdin();
        loop {
            print!("You: ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if stdin.read_line(&mut line)? == 0 {
                // EOF
                println!();
                break;
            }
            let input = line.trim();

            if input.is_empty() {
                continue;
            }

            match input.to_lowercase().as_str() {
                "exit" | "quit" | "bye" => {
                    println!("Thank you for using the helpdesk assistant. Goodbye!");
                    break;
                }
                "history" => {
                    let history = orchestrator.history(&self.session).await;
                    if history.is_empty() {
                        println!("No conversation history yet.\n");
                    } else {
                        println!("\nConversation History:");
                        for turn in &history {
                            println!("You: {}", turn.user.text);
                            println!("Assistant: {}", turn.assistant.text);
                        }
                        println!();
                    }
                    continue;
                }
                "status" => {
                    println!("\nSystem Status:");
                    for (component, health) in orchestrator.status().await {
                        println!("  {}: {}", component, health);
                    }
                    println!();
                    continue;
                }
                "clear" => {
                    orchestrator.clear_session(&self.session).await;
                    println!("Conversation history cleared.\n");
                    continue;
                }
                _ => {}
            }

            let result = orchestrator.handle(input, mode, &self.session).await;

            println!("\nAssistant: {}", result.answer);
            println!("(Intent: {})\n", result.intent.label());

            for diagnostic in &result.diagnostics {
                tracing::debug!("Diagnostic: {}", diagnostic);
            }
        }

        Ok(())
    }
}
