//! LLM provider implementations.

mod claude;
mod ollama;

pub use claude::ClaudeClient;
pub use ollama::OllamaClient;
