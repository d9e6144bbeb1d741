//! Result types for SQL execution.

use serde::{Deserialize, Serialize};

/// Rows returned by a query, with column names preserved in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlRowSet {
    /// Column names in select order
    pub columns: Vec<String>,

    /// Row values, one vector per row, aligned with `columns`
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Number of rows returned
    pub row_count: usize,
}

impl SqlRowSet {
    /// An empty result set.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
        }
    }

    /// Format rows as human-readable `column: value` lines.
    ///
    /// This text becomes the retrieved context for the response generator,
    /// so it favors readability over machine parseability.
    pub fn to_text(&self) -> String {
        if self.rows.is_empty() {
            return "No results found.".to_string();
        }

        if self.rows.len() == 1 {
            return self.format_row(&self.rows[0]);
        }

        let mut formatted = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            formatted.push(format!("Result {}:", i + 1));
            for line in self.format_row(row).lines() {
                formatted.push(format!("  {}", line));
            }
        }
        formatted.join("\n")
    }

    /// Format rows as one `column: value, column: value` string per row.
    ///
    /// Used for the per-row source context attached to a query result.
    pub fn to_lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(column, value)| format!("{}: {}", column, render_value(value)))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect()
    }

    fn format_row(&self, row: &[serde_json::Value]) -> String {
        self.columns
            .iter()
            .zip(row.iter())
            .map(|(column, value)| format!("{}: {}", column, render_value(value)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Render a JSON value without quoting strings.
fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_rows_to_text() {
        let rows = SqlRowSet::empty();
        assert_eq!(rows.to_text(), "No results found.");
    }

    #[test]
    fn test_single_row_to_text() {
        let rows = SqlRowSet {
            columns: vec!["customer_name".to_string(), "expiration_date".to_string()],
            rows: vec![vec![json!("ACME Corp"), json!("2024-12-31")]],
            row_count: 1,
        };

        let text = rows.to_text();
        assert_eq!(text, "customer_name: ACME Corp\nexpiration_date: 2024-12-31");
    }

    #[test]
    fn test_multiple_rows_to_text() {
        let rows = SqlRowSet {
            columns: vec!["module_name".to_string()],
            rows: vec![vec![json!("Inventory Management")], vec![json!("Reporting Suite")]],
            row_count: 2,
        };

        let text = rows.to_text();
        assert!(text.contains("Result 1:"));
        assert!(text.contains("  module_name: Inventory Management"));
        assert!(text.contains("Result 2:"));
        assert!(text.contains("  module_name: Reporting Suite"));
    }

    #[test]
    fn test_to_lines_one_string_per_row() {
        let rows = SqlRowSet {
            columns: vec!["contract_id".to_string(), "customer_name".to_string()],
            rows: vec![
                vec![json!(12345), json!("ACME Corp")],
                vec![json!(67890), json!("Globex")],
            ],
            row_count: 2,
        };

        let lines = rows.to_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "contract_id: 12345, customer_name: ACME Corp");
        assert_eq!(lines[1], "contract_id: 67890, customer_name: Globex");
    }

    #[test]
    fn test_null_and_number_rendering() {
        let rows = SqlRowSet {
            columns: vec!["pricing".to_string(), "notes".to_string()],
            rows: vec![vec![json!(25000.0), serde_json::Value::Null]],
            row_count: 1,
        };

        let text = rows.to_text();
        assert!(text.contains("pricing: 25000"));
        assert!(text.contains("notes: null"));
    }
}
