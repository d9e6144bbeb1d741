//! Intent classification.
//!
//! Two implementations of one classifier capability, selected per request:
//! keyword matching (deterministic, always available) and model-assisted
//! classification (higher precision, falls back to keywords on any failure).

use helpdesk_core::config::ChatConfig;
use helpdesk_llm::{LlmClient, LlmRequest};
use helpdesk_prompt::{build_prompt, PromptVars};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Classified category of a user utterance.
///
/// The router matches exhaustively on this set; adding a variant does not
/// compile until every branch site handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Procedural/how-to question answered from user guides
    UserGuide,

    /// Structured contract-data question answered from the database
    Contract,

    /// Greeting or small talk
    General,

    /// Nothing matched; handled conservatively without retrieval
    Unknown,
}

impl Intent {
    /// Stable label used in logs and shell output.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::UserGuide => "user_guide",
            Intent::Contract => "contract",
            Intent::General => "general",
            Intent::Unknown => "unknown",
        }
    }
}

/// How an utterance should be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationMode {
    /// Keyword matching only
    Keyword,

    /// Ask the response generator, fall back to keywords on failure
    ModelAssisted,
}

/// The result of classification, with fallback bookkeeping.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    /// The classified intent
    pub intent: Intent,

    /// True when model-assisted classification failed and keyword matching
    /// supplied the intent instead
    pub fell_back: bool,

    /// Why the fallback happened, when it did
    pub fallback_reason: Option<String>,
}

impl ClassificationOutcome {
    fn direct(intent: Intent) -> Self {
        Self {
            intent,
            fell_back: false,
            fallback_reason: None,
        }
    }
}

/// Trait for classifier implementations.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Classify an utterance.
    async fn classify(&self, utterance: &str) -> ClassificationOutcome;
}

/// Keyword-matching classifier.
///
/// Purely functional given its configured keyword sets. Contract keywords
/// take priority over user-guide keywords when both match.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    user_guide_keywords: Vec<String>,
    contract_keywords: Vec<String>,
    greeting_patterns: Vec<String>,
}

impl KeywordClassifier {
    /// Build a classifier from the chat configuration.
    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(
            config.user_guide_keywords.clone(),
            config.contract_keywords.clone(),
            config.greeting_patterns.clone(),
        )
    }

    /// Build a classifier from explicit keyword sets.
    pub fn new(
        user_guide_keywords: Vec<String>,
        contract_keywords: Vec<String>,
        greeting_patterns: Vec<String>,
    ) -> Self {
        Self {
            user_guide_keywords: lowercase_all(user_guide_keywords),
            contract_keywords: lowercase_all(contract_keywords),
            greeting_patterns: lowercase_all(greeting_patterns),
        }
    }

    /// Classify an utterance by keyword matching.
    pub fn classify_keywords(&self, utterance: &str) -> Intent {
        let lower = utterance.to_lowercase();

        let contract_hit = self.contract_keywords.iter().any(|k| lower.contains(k));
        if contract_hit {
            return Intent::Contract;
        }

        let guide_hit = self.user_guide_keywords.iter().any(|k| lower.contains(k));
        if guide_hit {
            return Intent::UserGuide;
        }

        let greeting_hit = self.greeting_patterns.iter().any(|p| lower.contains(p));
        if greeting_hit {
            return Intent::General;
        }

        Intent::Unknown
    }
}

#[async_trait::async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, utterance: &str) -> ClassificationOutcome {
        ClassificationOutcome::direct(self.classify_keywords(utterance))
    }
}

/// Model-assisted classifier.
///
/// Sends a constrained prompt whose only valid outputs are the four intent
/// labels. Output outside the closed set coerces to `Unknown`; any generator
/// failure or timeout falls back to the keyword classifier and records that
/// the fallback happened.
pub struct ModelAssistedClassifier {
    generator: Arc<dyn LlmClient>,
    model: String,
    template: String,
    timeout: Duration,
    fallback: Arc<KeywordClassifier>,
}

impl ModelAssistedClassifier {
    /// Create a model-assisted classifier with a keyword fallback.
    pub fn new(
        generator: Arc<dyn LlmClient>,
        model: impl Into<String>,
        template: impl Into<String>,
        timeout: Duration,
        fallback: Arc<KeywordClassifier>,
    ) -> Self {
        Self {
            generator,
            model: model.into(),
            template: template.into(),
            timeout,
            fallback,
        }
    }

    async fn classify_with_model(&self, utterance: &str) -> Result<Intent, String> {
        let vars = PromptVars {
            question: utterance.to_string(),
            ..Default::default()
        };

        let prompt = build_prompt(&self.template, "", &vars)
            .map_err(|e| format!("classification prompt failed: {}", e))?;

        let request = LlmRequest::new(prompt.user, &self.model)
            .with_temperature(0.0)
            .with_max_tokens(16);

        let response = tokio::time::timeout(self.timeout, self.generator.complete(&request))
            .await
            .map_err(|_| "classification timed out".to_string())?
            .map_err(|e| format!("classification failed: {}", e))?;

        Ok(parse_intent_label(&response.content))
    }
}

#[async_trait::async_trait]
impl Classifier for ModelAssistedClassifier {
    async fn classify(&self, utterance: &str) -> ClassificationOutcome {
        match self.classify_with_model(utterance).await {
            Ok(intent) => ClassificationOutcome::direct(intent),
            Err(reason) => {
                tracing::warn!(
                    "Model classification unavailable, using keywords: {}",
                    reason
                );
                ClassificationOutcome {
                    intent: self.fallback.classify_keywords(utterance),
                    fell_back: true,
                    fallback_reason: Some(reason),
                }
            }
        }
    }
}

/// Map a model response onto the closed intent set.
///
/// Anything outside the four labels coerces to `Unknown`.
pub fn parse_intent_label(raw: &str) -> Intent {
    let normalized = raw.trim().to_uppercase();

    if normalized.contains("USER_GUIDE") {
        Intent::UserGuide
    } else if normalized.contains("CONTRACT") {
        Intent::Contract
    } else if normalized.contains("GENERAL") {
        Intent::General
    } else {
        Intent::Unknown
    }
}

fn lowercase_all(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::{AppError, AppResult};
    use helpdesk_llm::{LlmResponse, LlmUsage};
    use helpdesk_prompt::PromptLibrary;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::from_config(&ChatConfig::default())
    }

    #[test]
    fn test_contract_keywords_classify_as_contract() {
        let c = classifier();
        assert_eq!(
            c.classify_keywords("When does my contract expire?"),
            Intent::Contract
        );
        assert_eq!(
            c.classify_keywords("what is the PRICING for next year"),
            Intent::Contract
        );
    }

    #[test]
    fn test_user_guide_keywords_classify_as_user_guide() {
        let c = classifier();
        assert_eq!(
            c.classify_keywords("How do I export a report?"),
            Intent::UserGuide
        );
    }

    #[test]
    fn test_both_sets_matching_prefers_contract() {
        let c = classifier();
        // "how do" is a guide keyword, "contract" a contract keyword
        assert_eq!(
            c.classify_keywords("How do I read my contract?"),
            Intent::Contract
        );
    }

    #[test]
    fn test_greeting_classifies_as_general() {
        let c = classifier();
        assert_eq!(c.classify_keywords("Hello there!"), Intent::General);
        assert_eq!(c.classify_keywords("thanks a lot"), Intent::General);
    }

    #[test]
    fn test_no_match_classifies_as_unknown() {
        let c = classifier();
        assert_eq!(c.classify_keywords("xyzzy plugh"), Intent::Unknown);
    }

    #[test]
    fn test_parse_intent_label_closed_set() {
        assert_eq!(parse_intent_label("USER_GUIDE"), Intent::UserGuide);
        assert_eq!(parse_intent_label("  contract\n"), Intent::Contract);
        assert_eq!(parse_intent_label("GENERAL"), Intent::General);
        assert_eq!(parse_intent_label("UNKNOWN"), Intent::Unknown);
        assert_eq!(parse_intent_label("banana"), Intent::Unknown);
        assert_eq!(parse_intent_label(""), Intent::Unknown);
    }

    /// Generator stub that either answers with a fixed label or fails.
    struct StubGenerator {
        reply: Option<String>,
    }

    #[async_trait::async_trait]
    impl LlmClient for StubGenerator {
        fn provider_name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            match &self.reply {
                Some(reply) => Ok(LlmResponse {
                    content: reply.clone(),
                    model: "stub".to_string(),
                    usage: LlmUsage::default(),
                }),
                None => Err(AppError::Llm("stub generator offline".to_string())),
            }
        }
    }

    fn model_classifier(reply: Option<String>) -> ModelAssistedClassifier {
        ModelAssistedClassifier::new(
            Arc::new(StubGenerator { reply }),
            "stub-model",
            PromptLibrary::default().classification,
            Duration::from_secs(5),
            Arc::new(classifier()),
        )
    }

    #[tokio::test]
    async fn test_model_assisted_uses_model_label() {
        let c = model_classifier(Some("CONTRACT".to_string()));
        let outcome = c.classify("whatever the model says wins").await;
        assert_eq!(outcome.intent, Intent::Contract);
        assert!(!outcome.fell_back);
    }

    #[tokio::test]
    async fn test_model_assisted_coerces_unexpected_output() {
        let c = model_classifier(Some("I think this is about cooking".to_string()));
        let outcome = c.classify("unrelated").await;
        assert_eq!(outcome.intent, Intent::Unknown);
        assert!(!outcome.fell_back);
    }

    #[tokio::test]
    async fn test_model_assisted_falls_back_on_failure() {
        let c = model_classifier(None);
        let outcome = c.classify("When does my contract expire?").await;
        assert_eq!(outcome.intent, Intent::Contract);
        assert!(outcome.fell_back);
        assert!(outcome.fallback_reason.is_some());
    }
}
