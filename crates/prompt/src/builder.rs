//! Prompt builder for rendering templates and injecting context.

use crate::types::{BuiltPrompt, HistoryTurn, PromptVars};
use helpdesk_core::{AppError, AppResult};
use handlebars::Handlebars;

/// Build a prompt from a template and assembled variables.
///
/// This function:
/// 1. Renders the template using Handlebars with the provided variables
/// 2. Attaches the system instructions as a separate system message
/// 3. Returns a `BuiltPrompt` ready for LLM execution
///
/// # Arguments
/// * `template` - Handlebars template over [`PromptVars`]
/// * `system` - System instructions for the generator
/// * `vars` - Resolved template variables
pub fn build_prompt(template: &str, system: &str, vars: &PromptVars) -> AppResult<BuiltPrompt> {
    let rendered = render_template(template, vars)?;

    let system = if system.is_empty() {
        None
    } else {
        Some(system.to_string())
    };

    Ok(BuiltPrompt {
        system,
        user: rendered,
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, vars: &PromptVars) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", vars)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

/// Render conversation history into a text block, oldest turn first.
///
/// The generator reads this block as dialogue history; it must stay in
/// chronological order.
pub fn render_history(turns: &[HistoryTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("Customer: {}\nAssistant: {}", turn.user, turn.assistant))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render retrieved context blocks into a single numbered section.
pub fn render_context(blocks: &[String]) -> String {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| format!("[Document {}]\n{}", i + 1, block))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
