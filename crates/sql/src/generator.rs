//! Natural-language-to-SQL generation.
//!
//! The generator delegates to the LLM collaborator with a constrained prompt
//! and cleans up the common decorations models wrap around SQL. Its output
//! stays untrusted; the safety validator in `helpdesk-chat` gates every
//! generated statement before execution.

use helpdesk_core::{AppError, AppResult};
use helpdesk_llm::{LlmClient, LlmRequest};
use std::sync::Arc;

/// Trait for SQL-generation backends.
#[async_trait::async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Generate a SQL statement answering a natural-language question.
    ///
    /// # Arguments
    /// * `question` - The user's question
    /// * `schema` - Human-readable schema description of the target database
    async fn generate_sql(&self, question: &str, schema: &str) -> AppResult<String>;
}

/// SQL generator backed by the LLM collaborator.
pub struct LlmSqlGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmSqlGenerator {
    /// Create a generator over an existing LLM client.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn system_prompt(schema: &str) -> String {
        format!(
            r#"You are a SQL query generator. Given a natural language request, generate a valid SQL query.

Database schema:
{schema}

Rules:
- Output ONLY the SQL query, no explanations or markdown
- Generate a single read-only SELECT statement
- Be precise with table and column names from the schema
- Add a reasonable LIMIT if none is specified (max 100 rows)"#
        )
    }
}

#[async_trait::async_trait]
impl SqlGenerator for LlmSqlGenerator {
    async fn generate_sql(&self, question: &str, schema: &str) -> AppResult<String> {
        tracing::debug!("Generating SQL for question: {}", question);

        let request = LlmRequest::new(question, &self.model)
            .with_system(Self::system_prompt(schema))
            .with_temperature(0.0)
            .with_max_tokens(512);

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(|e| AppError::Sql(format!("SQL generation failed: {}", e)))?;

        let sql = clean_generated_sql(&response.content);

        if sql.is_empty() {
            return Err(AppError::Sql("SQL generation returned no statement".to_string()));
        }

        tracing::debug!("Generated SQL: {}", sql);
        Ok(sql)
    }
}

/// Strip the decorations models commonly wrap around SQL.
///
/// Handles markdown code fences and `SQLQuery:`-style prefixes, then trims
/// whitespace. The result is still untrusted; validation happens downstream.
pub fn clean_generated_sql(raw: &str) -> String {
    let mut sql = raw.trim();

    // If there's a "SQLQuery:" marker, keep everything after it
    if let Some(idx) = sql.find("SQLQuery:") {
        sql = sql[idx + "SQLQuery:".len()..].trim();
    }

    // Remove code block markers
    sql = sql
        .trim_start_matches("```sql")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    // Remove other common prefixes if still at the start
    for prefix in ["SQL:", "Query:", "sql:", "query:"] {
        if let Some(stripped) = sql.strip_prefix(prefix) {
            sql = stripped.trim();
            break;
        }
    }

    sql.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_plain_sql() {
        assert_eq!(
            clean_generated_sql("SELECT * FROM contracts"),
            "SELECT * FROM contracts"
        );
    }

    #[test]
    fn test_clean_markdown_fences() {
        let raw = "```sql\nSELECT customer_name FROM contracts\n```";
        assert_eq!(
            clean_generated_sql(raw),
            "SELECT customer_name FROM contracts"
        );
    }

    #[test]
    fn test_clean_sqlquery_marker() {
        let raw = "Here is the statement.\nSQLQuery: SELECT 1";
        assert_eq!(clean_generated_sql(raw), "SELECT 1");
    }

    #[test]
    fn test_clean_prefix() {
        assert_eq!(clean_generated_sql("SQL: SELECT 1"), "SELECT 1");
        assert_eq!(clean_generated_sql("query: SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_clean_whitespace_only() {
        assert_eq!(clean_generated_sql("   \n  "), "");
    }

    #[test]
    fn test_system_prompt_includes_schema() {
        let prompt = LlmSqlGenerator::system_prompt("TABLE contracts (contract_id)");
        assert!(prompt.contains("TABLE contracts (contract_id)"));
        assert!(prompt.contains("SELECT"));
    }
}
