//! LLM integration crate for the Helpdesk Assistant.
//!
//! This crate provides a provider-agnostic abstraction for the response
//! generator collaborator. It supports multiple providers through a unified
//! trait-based interface; the orchestrator only ever sees `dyn LlmClient`.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Claude**: Anthropic messages API
//!
//! # Example
//! ```no_run
//! use helpdesk_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{ClaudeClient, OllamaClient};
