use std::collections::BTreeMap;

use askdb_core::Value;
use serde::{Deserialize, Serialize};

use crate::{Dialect, SqlToolsError};

/// A result set with its column names.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One line per row, cells separated by tabs.
    pub fn tab_separated(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>().join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => "None".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ValueCount {
    pub value: Value,
    pub count: i64,
}

/// table -> column -> most common values.
pub type CommonValues = BTreeMap<String, BTreeMap<String, Vec<ValueCount>>>;

/// The live database behind one session.
#[async_trait::async_trait]
pub trait SqlDatabase: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// DDL of a table or view, `None` when it does not exist.
    async fn reflect_table(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Option<String>, SqlToolsError>;

    async fn sample_rows(
        &self,
        schema: Option<&str>,
        table: &str,
        limit: usize,
    ) -> Result<Rows, SqlToolsError>;

    /// `limit = None` returns every distinct value.
    async fn column_value_counts(
        &self,
        table: &str,
        column: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ValueCount>, SqlToolsError>;

    /// Runs exactly one statement.
    async fn fetch_rows(&self, sql: &str) -> Result<Rows, SqlToolsError>;
}
