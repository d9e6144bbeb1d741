//! Prompt system for the Helpdesk Assistant.
//!
//! This crate provides structured prompt assembly with:
//! - Built-in Handlebars templates, one per answer path
//! - Optional per-workspace template overrides
//! - Conversation history rendering (oldest turn first)
//! - Retrieved context injection

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, render_context, render_history};
pub use loader::load_library;
pub use types::{BuiltPrompt, HistoryTurn, PromptLibrary, PromptVars};
