//! Prompt loader for workspace template overrides.

use crate::types::PromptLibrary;
use helpdesk_core::{AppError, AppResult};
use std::path::Path;

/// Load the prompt library for a workspace.
///
/// Built-in templates are used unless the workspace provides an override in
/// `.helpdesk/prompts/<name>.hbs`, where `<name>` is one of `user_guide`,
/// `contract`, `general`, or `classification`.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.helpdesk/`
///
/// # Returns
/// The resolved `PromptLibrary`, or an error if an override exists but is
/// unreadable or empty.
pub fn load_library(workspace_path: &Path) -> AppResult<PromptLibrary> {
    let prompts_dir = workspace_path.join(".helpdesk/prompts");
    let mut library = PromptLibrary::default();

    if !prompts_dir.exists() {
        return Ok(library);
    }

    if let Some(template) = load_override(&prompts_dir, "user_guide")? {
        library.user_guide = template;
    }
    if let Some(template) = load_override(&prompts_dir, "contract")? {
        library.contract = template;
    }
    if let Some(template) = load_override(&prompts_dir, "general")? {
        library.general = template;
    }
    if let Some(template) = load_override(&prompts_dir, "classification")? {
        library.classification = template;
    }

    Ok(library)
}

/// Load a single template override if present.
fn load_override(prompts_dir: &Path, name: &str) -> AppResult<Option<String>> {
    let path = prompts_dir.join(format!("{}.hbs", name));

    if !path.exists() {
        return Ok(None);
    }

    tracing::debug!("Loading prompt override from: {:?}", path);

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| AppError::Prompt(format!("Failed to read template {:?}: {}", path, e)))?;

    if contents.trim().is_empty() {
        return Err(AppError::Prompt(format!(
            "Template override is empty: {:?}",
            path
        )));
    }

    tracing::info!("Loaded prompt override: {}", name);

    Ok(Some(contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_library_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let library = load_library(temp_dir.path()).unwrap();
        assert_eq!(library.general, PromptLibrary::default().general);
    }

    #[test]
    fn test_load_library_with_override() {
        let temp_dir = TempDir::new().unwrap();
        let prompts_dir = temp_dir.path().join(".helpdesk/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join("general.hbs"), "Custom: {{question}}").unwrap();

        let library = load_library(temp_dir.path()).unwrap();
        assert_eq!(library.general, "Custom: {{question}}");
        // Untouched templates fall back to defaults
        assert_eq!(library.contract, PromptLibrary::default().contract);
    }

    #[test]
    fn test_load_library_empty_override_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let prompts_dir = temp_dir.path().join(".helpdesk/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join("contract.hbs"), "   \n").unwrap();

        let result = load_library(temp_dir.path());
        assert!(result.is_err());
    }
}
