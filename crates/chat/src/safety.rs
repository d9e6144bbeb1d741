//! SQL safety validation.
//!
//! The validator is a hard gate, not advisory: every SQL statement on the
//! contract path passes through [`SqlValidator::validate`] before execution,
//! and a rejected statement never reaches the executor. Generated SQL is
//! untrusted input, so the rules below assume hostile statements.

use helpdesk_core::config::SqlGuardConfig;

/// Catalog/system schemas that leak metadata if queried.
const CATALOG_SCHEMAS: &[&str] = &[
    "pg_catalog",
    "information_schema",
    "sqlite_master",
    "sqlite_temp_master",
    "mysql",
    "performance_schema",
    "sys",
];

/// The outcome of validating one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValidation {
    /// Statement may be executed unmodified
    Accepted,

    /// Statement must not be executed
    Rejected {
        /// Which rule rejected it
        reason: String,
    },
}

impl SqlValidation {
    /// True when the statement was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, SqlValidation::Accepted)
    }

    /// Rejection reason, if rejected.
    pub fn reason(&self) -> Option<&str> {
        match self {
            SqlValidation::Accepted => None,
            SqlValidation::Rejected { reason } => Some(reason),
        }
    }
}

/// Validates generated SQL before it can reach the executor.
///
/// Rules are applied in order and the first violation wins:
/// 1. must be a single `SELECT` statement
/// 2. no blocklisted keyword anywhere in the text (comments included, since
///    comments cannot be trusted to be inert across all backends)
/// 3. no catalog/system table references outside the allow list
/// 4. statement length within the configured maximum
#[derive(Debug, Clone)]
pub struct SqlValidator {
    blocked_keywords: Vec<String>,
    allowed_schemas: Vec<String>,
    max_statement_length: usize,
}

impl SqlValidator {
    /// Build a validator from the configured guard settings.
    pub fn from_config(config: &SqlGuardConfig) -> Self {
        Self::new(
            config.blocked_keywords.clone(),
            config.allowed_schemas.clone(),
            config.max_statement_length,
        )
    }

    /// Build a validator from explicit settings.
    pub fn new(
        blocked_keywords: Vec<String>,
        allowed_schemas: Vec<String>,
        max_statement_length: usize,
    ) -> Self {
        Self {
            blocked_keywords: blocked_keywords
                .into_iter()
                .map(|k| k.to_uppercase())
                .collect(),
            allowed_schemas: allowed_schemas
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
            max_statement_length,
        }
    }

    /// Validate a statement. Rules short-circuit on the first violation.
    pub fn validate(&self, sql: &str) -> SqlValidation {
        let trimmed = sql.trim();

        if trimmed.is_empty() {
            return reject("statement is empty");
        }

        // Rule 1: a single SELECT statement
        let body = trimmed.strip_suffix(';').unwrap_or(trimmed);
        if body.contains(';') {
            return reject("multiple statements are not allowed");
        }

        let first_token = tokens(body).next().map(|t| t.to_uppercase());
        if first_token.as_deref() != Some("SELECT") {
            return reject("only SELECT statements are allowed");
        }

        // Rule 2: blocklisted keywords as standalone tokens, anywhere
        for token in tokens(trimmed) {
            let upper = token.to_uppercase();
            if self.blocked_keywords.iter().any(|k| *k == upper) {
                return reject(&format!("blocked keyword: {}", upper));
            }
        }

        // Rule 3: catalog/system table references
        for token in tokens(trimmed) {
            let lower = token.to_lowercase();
            if CATALOG_SCHEMAS.contains(&lower.as_str())
                && !self.allowed_schemas.iter().any(|s| *s == lower)
            {
                return reject(&format!("system catalog reference: {}", lower));
            }
        }

        // Rule 4: length bound
        if trimmed.len() > self.max_statement_length {
            return reject(&format!(
                "statement exceeds maximum length of {} bytes",
                self.max_statement_length
            ));
        }

        SqlValidation::Accepted
    }
}

impl Default for SqlValidator {
    fn default() -> Self {
        Self::from_config(&SqlGuardConfig::default())
    }
}

fn reject(reason: &str) -> SqlValidation {
    SqlValidation::Rejected {
        reason: reason.to_string(),
    }
}

/// Split a statement into identifier-like tokens.
///
/// Splitting on every non-word character means keywords are found inside
/// comments and string literals too, which is intentional.
fn tokens(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SqlValidator {
        SqlValidator::default()
    }

    #[test]
    fn test_accepts_simple_select() {
        let v = validator();
        let result = v.validate("SELECT customer_name, expiration_date FROM contracts WHERE contract_id = 12345");
        assert!(result.is_accepted());
        assert!(result.reason().is_none());
    }

    #[test]
    fn test_accepts_select_with_trailing_semicolon() {
        let v = validator();
        assert!(v.validate("SELECT * FROM contracts;").is_accepted());
    }

    #[test]
    fn test_accepts_lowercase_select() {
        let v = validator();
        assert!(v.validate("select pricing from contracts where contract_id = 1").is_accepted());
    }

    #[test]
    fn test_rejects_empty_statement() {
        let v = validator();
        assert!(!v.validate("   ").is_accepted());
    }

    #[test]
    fn test_rejects_non_select() {
        let v = validator();
        let result = v.validate("DROP TABLE contracts");
        assert!(!result.is_accepted());
    }

    #[test]
    fn test_rejects_multiple_statements() {
        let v = validator();
        let result = v.validate("SELECT * FROM contracts; DROP TABLE contracts");
        assert_eq!(
            result.reason(),
            Some("multiple statements are not allowed")
        );
    }

    #[test]
    fn test_rejects_blocked_keywords() {
        let v = validator();
        for sql in [
            "SELECT * FROM contracts WHERE note = 'x' OR DELETE",
            "SELECT (INSERT) FROM t",
            "SELECT * FROM contracts UNION SELECT * FROM t WHERE UPDATE",
        ] {
            let result = v.validate(sql);
            assert!(!result.is_accepted(), "expected rejection for: {}", sql);
            assert!(result.reason().unwrap().contains("blocked keyword"));
        }
    }

    #[test]
    fn test_rejects_keyword_inside_comment() {
        let v = validator();
        let result = v.validate("SELECT * FROM contracts -- DROP everything later");
        assert!(!result.is_accepted());
        assert!(result.reason().unwrap().contains("DROP"));
    }

    #[test]
    fn test_keyword_matching_is_token_based() {
        // "updated_at" contains "update" as a substring but not as a token
        let v = validator();
        assert!(v
            .validate("SELECT updated_at FROM contracts WHERE contract_id = 1")
            .is_accepted());
    }

    #[test]
    fn test_rejects_catalog_tables() {
        let v = validator();
        let result = v.validate("SELECT * FROM information_schema.tables");
        assert!(!result.is_accepted());
        assert!(result.reason().unwrap().contains("information_schema"));

        assert!(!v.validate("SELECT name FROM sqlite_master").is_accepted());
        assert!(!v.validate("SELECT * FROM pg_catalog.pg_tables").is_accepted());
    }

    #[test]
    fn test_allow_listed_schema_is_accepted() {
        let v = SqlValidator::new(
            SqlGuardConfig::default().blocked_keywords,
            vec!["information_schema".to_string()],
            2000,
        );
        assert!(v
            .validate("SELECT table_name FROM information_schema.tables")
            .is_accepted());
    }

    #[test]
    fn test_rejects_over_length_statement() {
        let v = SqlValidator::new(SqlGuardConfig::default().blocked_keywords, vec![], 30);
        let result = v.validate("SELECT customer_name, pricing FROM contracts");
        assert!(!result.is_accepted());
        assert!(result.reason().unwrap().contains("maximum length"));
    }

    #[test]
    fn test_first_violation_wins() {
        // Both a non-SELECT start and a blocked keyword: rule 1 fires first
        let v = validator();
        let result = v.validate("TRUNCATE TABLE contracts");
        assert_eq!(result.reason(), Some("only SELECT statements are allowed"));
    }
}
