//! Prompt types for the Helpdesk Assistant.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};

/// One completed exchange rendered into prompt history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    /// What the customer asked
    pub user: String,

    /// What the assistant answered
    pub assistant: String,
}

/// Variables available to every chat template.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptVars {
    /// The current user question
    pub question: String,

    /// Rendered retrieved context (guide passages or serialized rows)
    pub context: String,

    /// Rendered conversation history, oldest turn first
    pub history: String,

    /// The SQL statement that produced the rows, when applicable
    pub sql: String,
}

/// The set of templates used by the router, one per answer path.
///
/// Each field holds a Handlebars template over [`PromptVars`]. Defaults are
/// compiled in; a workspace may override any of them (see `loader`).
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    /// Template for user-guide answers grounded in retrieved passages
    pub user_guide: String,

    /// Template for contract answers grounded in query results
    pub contract: String,

    /// Template for general conversation without retrieval
    pub general: String,

    /// Constrained intent-classification template
    pub classification: String,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self {
            user_guide: DEFAULT_USER_GUIDE_TEMPLATE.to_string(),
            contract: DEFAULT_CONTRACT_TEMPLATE.to_string(),
            general: DEFAULT_GENERAL_TEMPLATE.to_string(),
            classification: DEFAULT_CLASSIFICATION_TEMPLATE.to_string(),
        }
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,
}

pub(crate) const DEFAULT_USER_GUIDE_TEMPLATE: &str = "\
{{#if history}}Conversation so far:
{{history}}

{{/if}}Context from user guides:
{{context}}

User question: {{question}}

Please provide a helpful answer based on the context above. If the context \
does not contain the information needed, let the customer know and offer to \
escalate to a human agent.";

pub(crate) const DEFAULT_CONTRACT_TEMPLATE: &str = "\
{{#if history}}Conversation so far:
{{history}}

{{/if}}User question: {{question}}

Database query results:
{{context}}

SQL query used: {{sql}}

Please provide a helpful, natural language answer based on the query results \
above. If no results were found, let the customer know politely and offer \
alternatives.";

pub(crate) const DEFAULT_GENERAL_TEMPLATE: &str = "\
{{#if history}}Conversation so far:
{{history}}

{{/if}}{{question}}";

pub(crate) const DEFAULT_CLASSIFICATION_TEMPLATE: &str = "\
Classify the following customer query into one of these categories:
1. USER_GUIDE - Questions about how to use the software, features, tutorials, instructions
2. CONTRACT - Questions about contract details, expiration dates, pricing, purchased modules
3. GENERAL - General questions or greetings
4. UNKNOWN - Anything that fits none of the above

Query: {{question}}

Respond with only the category name (USER_GUIDE, CONTRACT, GENERAL, or UNKNOWN).";
