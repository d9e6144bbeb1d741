//! Request routing and orchestration.
//!
//! [`Orchestrator::handle`] drives one full request/response cycle: classify
//! the utterance, branch to the right collaborator, gate generated SQL
//! through the safety validator, assemble the prompt, invoke the response
//! generator, and append the completed turn to session memory.
//!
//! No collaborator failure escapes this module. Every call is bounded by the
//! configured timeout and converts to a degraded answer with the failure
//! reason recorded in diagnostics.

use crate::intent::{
    ClassificationMode, Classifier, Intent, KeywordClassifier, ModelAssistedClassifier,
};
use crate::memory::SessionRegistry;
use crate::safety::{SqlValidation, SqlValidator};
use crate::types::{ConversationTurn, Message, QueryPayload, QueryResult};
use helpdesk_core::config::ChatConfig;
use helpdesk_core::{AppError, AppResult};
use helpdesk_llm::{LlmClient, LlmRequest};
use helpdesk_prompt::{
    build_prompt, render_context, render_history, HistoryTurn, PromptLibrary, PromptVars,
};
use helpdesk_retrieval::Retriever;
use helpdesk_sql::{SqlExecutor, SqlGenerator};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Deterministic answer used whenever the response generator is unavailable.
const FALLBACK_ANSWER: &str =
    "I'm unable to retrieve that information right now. Please try again in a moment.";

/// Deterministic answer used when generated SQL fails validation.
const REFUSAL_ANSWER: &str = "I wasn't able to fulfill that request safely, so I didn't run it \
                              against the contract database. Please rephrase your question, or \
                              contact our support team for help.";

/// Composes the classifier, memory, and collaborators into one
/// request/response cycle per session.
pub struct Orchestrator {
    config: ChatConfig,
    model: String,
    generator: Arc<dyn LlmClient>,
    retriever: Arc<dyn Retriever>,
    sql_generator: Arc<dyn SqlGenerator>,
    sql_executor: Arc<dyn SqlExecutor>,
    validator: SqlValidator,
    keyword_classifier: Arc<KeywordClassifier>,
    model_classifier: ModelAssistedClassifier,
    prompts: PromptLibrary,
    sessions: SessionRegistry,
}

/// What a routing branch produced before answer generation.
struct RoutedContext {
    context_blocks: Vec<String>,
    payload: QueryPayload,
    sql: Option<String>,
    refusal: Option<String>,
}

impl RoutedContext {
    fn none() -> Self {
        Self {
            context_blocks: Vec::new(),
            payload: QueryPayload::None,
            sql: None,
            refusal: None,
        }
    }

    fn refusal(reason: String) -> Self {
        Self {
            refusal: Some(reason),
            ..Self::none()
        }
    }
}

impl Orchestrator {
    /// Wire an orchestrator from configuration and its collaborators.
    pub fn new(
        config: ChatConfig,
        model: impl Into<String>,
        generator: Arc<dyn LlmClient>,
        retriever: Arc<dyn Retriever>,
        sql_generator: Arc<dyn SqlGenerator>,
        sql_executor: Arc<dyn SqlExecutor>,
        prompts: PromptLibrary,
    ) -> Self {
        let model = model.into();
        let keyword_classifier = Arc::new(KeywordClassifier::from_config(&config));
        let model_classifier = ModelAssistedClassifier::new(
            Arc::clone(&generator),
            model.clone(),
            prompts.classification.clone(),
            Duration::from_secs(config.collaborator_timeout_secs),
            Arc::clone(&keyword_classifier),
        );
        let validator = SqlValidator::from_config(&config.sql_guard);
        let sessions = SessionRegistry::new(config.memory_max_turns);

        Self {
            config,
            model,
            generator,
            retriever,
            sql_generator,
            sql_executor,
            validator,
            keyword_classifier,
            model_classifier,
            prompts,
            sessions,
        }
    }

    /// Process one utterance end-to-end for a session.
    ///
    /// Always returns a result with a non-empty answer; collaborator failures
    /// degrade the answer and surface in `diagnostics` instead of
    /// propagating. The per-session lock is held for the whole request, so
    /// concurrent requests for the same session are serialized while other
    /// sessions proceed untouched. The turn is appended only after the full
    /// answer exists; a request aborted mid-flight appends nothing.
    pub async fn handle(
        &self,
        utterance: &str,
        mode: ClassificationMode,
        session_id: &str,
    ) -> QueryResult {
        let memory = self.sessions.get_or_create(session_id).await;
        let mut memory = memory.lock().await;

        let mut diagnostics = Vec::new();

        // 1. Classify
        let outcome = match mode {
            ClassificationMode::Keyword => self.keyword_classifier.classify(utterance).await,
            ClassificationMode::ModelAssisted => self.model_classifier.classify(utterance).await,
        };
        if outcome.fell_back {
            diagnostics.push(format!(
                "classification fell back to keyword matching: {}",
                outcome.fallback_reason.as_deref().unwrap_or("unknown")
            ));
        }
        let intent = outcome.intent;
        tracing::info!("Classified intent: {}", intent.label());

        // 2. Branch on intent. The match is exhaustive; a new intent
        // variant does not compile until it is routed here.
        let routed = match intent {
            Intent::UserGuide => self.route_user_guide(utterance, &mut diagnostics).await,
            Intent::Contract => self.route_contract(utterance, &mut diagnostics).await,
            Intent::General | Intent::Unknown => RoutedContext::none(),
        };

        // 3-4. Assemble the prompt and generate the answer. A rejected SQL
        // statement short-circuits into its fixed refusal answer.
        let answer = if let Some(refusal) = &routed.refusal {
            refusal.clone()
        } else {
            let history = memory.recent(self.config.memory_window);
            self.generate_answer(intent, utterance, &routed, &history, &mut diagnostics)
                .await
        };

        // 5. Record the completed turn and return
        let turn = ConversationTurn {
            user: Message::user(utterance),
            assistant: Message::assistant(answer.clone()),
            intent,
            context: routed.context_blocks.clone(),
        };
        memory.append(turn);

        QueryResult {
            intent,
            answer,
            source_context: routed.context_blocks,
            payload: routed.payload,
            diagnostics,
        }
    }

    /// User-guide branch: retrieve scored passages as context.
    async fn route_user_guide(
        &self,
        utterance: &str,
        diagnostics: &mut Vec<String>,
    ) -> RoutedContext {
        let retrieval = self.with_timeout(
            "guide retrieval",
            self.retriever.retrieve(utterance, self.config.retrieval_top_k),
        );

        match retrieval.await {
            Ok(passages) => {
                tracing::debug!("Retrieved {} guide passages", passages.len());
                RoutedContext {
                    context_blocks: passages.iter().map(|p| p.text.clone()).collect(),
                    payload: QueryPayload::Documents(passages),
                    sql: None,
                    refusal: None,
                }
            }
            Err(e) => {
                tracing::warn!("Guide retrieval unavailable: {}", e);
                diagnostics.push(format!("guide retrieval unavailable: {}", e));
                RoutedContext::none()
            }
        }
    }

    /// Contract branch: generate SQL, gate it through the validator, execute.
    async fn route_contract(
        &self,
        utterance: &str,
        diagnostics: &mut Vec<String>,
    ) -> RoutedContext {
        // Prefer live schema introspection, fall back to the configured text
        let schema = match self
            .with_timeout("schema introspection", self.sql_executor.schema())
            .await
        {
            Ok(schema) if !schema.trim().is_empty() => schema,
            Ok(_) => self.config.schema_description.clone(),
            Err(e) => {
                diagnostics.push(format!("schema introspection failed: {}", e));
                self.config.schema_description.clone()
            }
        };

        let sql = match self
            .with_timeout(
                "SQL generation",
                self.sql_generator.generate_sql(utterance, &schema),
            )
            .await
        {
            Ok(sql) => sql,
            Err(e) => {
                tracing::warn!("SQL generation failed: {}", e);
                diagnostics.push(format!("SQL generation failed: {}", e));
                return RoutedContext::none();
            }
        };

        // The hard gate: rejected statements never reach the executor
        match self.validator.validate(&sql) {
            SqlValidation::Rejected { reason } => {
                tracing::warn!("Rejected generated SQL ({}): {}", reason, sql);
                diagnostics.push(format!("SQL rejected: {}", reason));
                RoutedContext::refusal(REFUSAL_ANSWER.to_string())
            }
            SqlValidation::Accepted => {
                match self
                    .with_timeout("SQL execution", self.sql_executor.execute(&sql))
                    .await
                {
                    Ok(rows) => {
                        tracing::debug!("Query returned {} rows", rows.row_count);
                        RoutedContext {
                            context_blocks: rows.to_lines(),
                            payload: QueryPayload::Rows(rows),
                            sql: Some(sql),
                            refusal: None,
                        }
                    }
                    Err(e) => {
                        tracing::warn!("SQL execution failed: {}", e);
                        diagnostics.push(format!("SQL execution failed: {}", e));
                        RoutedContext::none()
                    }
                }
            }
        }
    }

    /// Assemble the prompt and invoke the response generator.
    async fn generate_answer(
        &self,
        intent: Intent,
        utterance: &str,
        routed: &RoutedContext,
        history: &[ConversationTurn],
        diagnostics: &mut Vec<String>,
    ) -> String {
        let template = match intent {
            Intent::UserGuide => &self.prompts.user_guide,
            Intent::Contract => &self.prompts.contract,
            Intent::General | Intent::Unknown => &self.prompts.general,
        };

        let history_turns: Vec<HistoryTurn> = history
            .iter()
            .map(|turn| HistoryTurn {
                user: turn.user.text.clone(),
                assistant: turn.assistant.text.clone(),
            })
            .collect();

        let context = match &routed.payload {
            QueryPayload::Rows(rows) => rows.to_text(),
            QueryPayload::Documents(_) | QueryPayload::None => {
                render_context(&routed.context_blocks)
            }
        };

        let vars = PromptVars {
            question: utterance.to_string(),
            context,
            history: render_history(&history_turns),
            sql: routed.sql.clone().unwrap_or_default(),
        };

        let prompt = match build_prompt(template, &self.config.system_prompt, &vars) {
            Ok(prompt) => prompt,
            Err(e) => {
                diagnostics.push(format!("prompt assembly failed: {}", e));
                return FALLBACK_ANSWER.to_string();
            }
        };

        let mut request = LlmRequest::new(prompt.user, &self.model);
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }

        match self
            .with_timeout("response generation", self.generator.complete(&request))
            .await
        {
            Ok(response) if !response.content.trim().is_empty() => response.content,
            Ok(_) => {
                diagnostics.push("response generation returned empty text".to_string());
                FALLBACK_ANSWER.to_string()
            }
            Err(e) => {
                tracing::warn!("Response generation failed: {}", e);
                diagnostics.push(format!("response generation failed: {}", e));
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    /// Conversation history for a session, oldest turn first.
    pub async fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        match self.sessions.get(session_id).await {
            Some(memory) => memory.lock().await.all(),
            None => Vec::new(),
        }
    }

    /// Clear a session's memory. Other sessions are unaffected.
    pub async fn clear_session(&self, session_id: &str) {
        if let Some(memory) = self.sessions.get(session_id).await {
            memory.lock().await.clear();
        }
    }

    /// Tear down a session entirely.
    pub async fn end_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).await
    }

    /// Component health, keyed by component name.
    pub async fn status(&self) -> BTreeMap<String, String> {
        let mut status = BTreeMap::new();

        status.insert(
            "generator".to_string(),
            format!("configured ({})", self.generator.provider_name()),
        );

        status.insert(
            "retriever".to_string(),
            match self.retriever.passage_count() {
                Ok(count) => format!("ok ({} passages)", count),
                Err(e) => format!("unavailable: {}", e),
            },
        );

        let budget = Duration::from_secs(self.config.collaborator_timeout_secs);
        let sql_ok = tokio::time::timeout(budget, self.sql_executor.ping())
            .await
            .unwrap_or(false);
        let sql_health = if sql_ok { "ok" } else { "unreachable" };
        status.insert("sql".to_string(), sql_health.to_string());

        status.insert(
            "sessions".to_string(),
            self.sessions.count().await.to_string(),
        );

        status
    }

    /// Bound a collaborator call by the configured timeout.
    async fn with_timeout<T>(
        &self,
        what: &str,
        fut: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        let budget = Duration::from_secs(self.config.collaborator_timeout_secs);
        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Chat(format!(
                "{} timed out after {}s",
                what,
                budget.as_secs()
            ))),
        }
    }
}
