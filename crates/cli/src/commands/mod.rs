//! Command handlers for the Helpdesk CLI.

mod ask;
mod chat;
mod status;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use status::StatusCommand;

use helpdesk_chat::Orchestrator;
use helpdesk_core::config::{AppConfig, ProviderConfig};
use helpdesk_core::{AppError, AppResult};
use helpdesk_llm::create_client;
use helpdesk_prompt::load_library;
use helpdesk_retrieval::GuideRetriever;
use helpdesk_sql::{LlmSqlGenerator, OfflineExecutor, SqlExecutor, SqlxExecutor};
use std::sync::Arc;

/// Wire the orchestrator and its collaborators from configuration.
///
/// A missing guides directory or an unreachable database degrades the
/// corresponding collaborator instead of failing startup; the orchestrator's
/// per-request degradation policy takes it from there.
pub(crate) async fn build_orchestrator(config: &AppConfig) -> AppResult<Orchestrator> {
    // Response generator via the provider factory
    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = match &provider_config {
        Some(ProviderConfig::Ollama { endpoint, .. }) => Some(endpoint.as_str()),
        Some(ProviderConfig::OpenAI { endpoint, .. }) => endpoint.as_deref(),
        Some(ProviderConfig::Claude { endpoint, .. }) => endpoint.as_deref(),
        None => None,
    };
    let api_key = config.resolve_api_key(&config.provider);
    let generator =
        create_client(&config.provider, endpoint, api_key.as_deref()).map_err(AppError::Config)?;

    // Guide retriever over the local passage index
    let index_path = config.helpdesk_dir().join("guides.db");
    let retriever =
        match GuideRetriever::initialize_or_load(&config.chat.guides_path, &index_path) {
            Ok((retriever, status)) => {
                tracing::info!("Guide retriever: {}", status);
                retriever
            }
            Err(e) => {
                tracing::warn!("Guide index unavailable, starting empty: {}", e);
                GuideRetriever::in_memory()?
            }
        };

    // Contract database executor
    let executor: Arc<dyn SqlExecutor> =
        match SqlxExecutor::connect(&config.chat.database_url).await {
            Ok(executor) => Arc::new(executor),
            Err(e) => {
                tracing::warn!("Contracts database unavailable: {}", e);
                Arc::new(OfflineExecutor::new(e.to_string()))
            }
        };

    // SQL generator shares the response generator client
    let sql_generator = LlmSqlGenerator::new(Arc::clone(&generator), &config.model);

    // Prompt templates, with workspace overrides applied
    let prompts = load_library(&config.workspace)?;

    Ok(Orchestrator::new(
        config.chat.clone(),
        &config.model,
        generator,
        Arc::new(retriever),
        Arc::new(sql_generator),
        executor,
        prompts,
    ))
}
