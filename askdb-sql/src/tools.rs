//! Schema introspection, common-value sampling and SQL execution with
//! shared TTL caches and a size cap on everything handed to the model.
//!
//! One [`DatabaseTools`] is built at startup and shared by every session
//! through an `Arc`. Cache keys always include the caller's `db_id`, so
//! several databases can share one instance.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use askdb_core::TableColumns;
use moka::future::Cache;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{cap_response, Capped, CommonValues, Rows, SqlDatabase, SqlToolsError, ValueCount};

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseToolsConfig {
    /// Results whose text is longer than this become the sentinel.
    pub max_response_chars: usize,
    pub cache_ttl: Duration,
    /// Maximum number of cached entries per cache.
    pub cache_capacity: u64,
    /// Sample rows shown under each table's DDL.
    pub sample_rows: usize,
}

impl Default for DatabaseToolsConfig {
    fn default() -> Self {
        Self {
            max_response_chars: 20_000,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            cache_capacity: 100,
            sample_rows: 3,
        }
    }
}

type TableSchemas = Arc<RwLock<HashMap<String, String>>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ValuesKey {
    db_id: String,
    table: String,
    column: String,
    limit: Option<usize>,
}

pub struct DatabaseTools {
    config: DatabaseToolsConfig,
    schemas: Cache<String, TableSchemas>,
    common_values: Cache<ValuesKey, Arc<Vec<ValueCount>>>,
    results: Cache<(String, String), Arc<Rows>>,
}

impl Default for DatabaseTools {
    fn default() -> Self {
        Self::new(DatabaseToolsConfig::default())
    }
}

impl DatabaseTools {
    pub fn new(config: DatabaseToolsConfig) -> Self {
        let ttl = config.cache_ttl;
        Self {
            schemas: Cache::builder()
                .max_capacity(config.cache_capacity)
                .time_to_live(ttl)
                .build(),
            // These are keyed per column and per statement, not per database.
            common_values: Cache::builder()
                .max_capacity(config.cache_capacity * 1_000)
                .time_to_live(ttl)
                .build(),
            results: Cache::builder()
                .max_capacity(config.cache_capacity * 100)
                .time_to_live(ttl)
                .build(),
            config,
        }
    }

    pub fn config(&self) -> &DatabaseToolsConfig {
        &self.config
    }

    /// DDL plus sample rows for each table, joined by newlines in request
    /// order. Only tables not yet cached for `db_id` are reflected; tables
    /// that do not exist contribute an empty string.
    pub async fn get_tables_schema(
        &self,
        db: &dyn SqlDatabase,
        tables: &[String],
        db_id: &str,
    ) -> Result<Capped<String>, SqlToolsError> {
        let entry = self
            .schemas
            .get_with(db_id.to_string(), async { TableSchemas::default() })
            .await;

        let missing: Vec<&String> = {
            let cached = entry.read().await;
            let mut seen = HashSet::new();
            tables
                .iter()
                .filter(|table| !cached.contains_key(*table) && seen.insert(table.as_str()))
                .collect()
        };

        if !missing.is_empty() {
            debug!(db_id, tables = ?missing, "reflecting tables missing from schema cache");
            let mut reflected = Vec::with_capacity(missing.len());
            for table in missing {
                reflected.push((table.clone(), self.reflect_schema(db, table).await?));
            }
            entry.write().await.extend(reflected);
        }

        let cached = entry.read().await;
        let schema = tables
            .iter()
            .map(|table| cached.get(table).map(String::as_str).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");
        cap_response(schema, self.config.max_response_chars)
    }

    async fn reflect_schema(
        &self,
        db: &dyn SqlDatabase,
        name: &str,
    ) -> Result<String, SqlToolsError> {
        let (schema, table) = match name.split_once('.') {
            Some((schema, table)) => (Some(schema), table),
            None => (None, name),
        };
        let Some(ddl) = db.reflect_table(schema, table).await? else {
            return Ok(String::new());
        };
        let sample = db.sample_rows(schema, table, self.config.sample_rows).await?;
        Ok(format!(
            "\nTable: {name}\n{}\nSample rows:\n{}\n",
            ddl.trim_end(),
            sample.tab_separated()
        ))
    }

    /// Most common values per requested column, at most
    /// `num_common_values` each. Indicator columns (case-insensitive) are
    /// never limited.
    pub async fn get_common_column_values(
        &self,
        db: &dyn SqlDatabase,
        columns: &TableColumns,
        db_id: &str,
        num_common_values: usize,
        indicator_vars: &[String],
    ) -> Result<Capped<CommonValues>, SqlToolsError> {
        let mut values = CommonValues::new();
        for (table, table_columns) in columns {
            let per_table = values.entry(table.clone()).or_default();
            for column in table_columns {
                let limit =
                    (!is_indicator(column, indicator_vars)).then_some(num_common_values);
                let key = ValuesKey {
                    db_id: db_id.to_string(),
                    table: table.clone(),
                    column: column.clone(),
                    limit,
                };
                let counts = match self.common_values.get(&key).await {
                    Some(hit) => hit,
                    None => {
                        let counts = Arc::new(db.column_value_counts(table, column, limit).await?);
                        self.common_values.insert(key, counts.clone()).await;
                        counts
                    }
                };
                per_table.insert(column.clone(), counts.as_ref().clone());
            }
        }
        cap_response(values, self.config.max_response_chars)
    }

    /// Runs one statement. Results are cached per `(db_id, sql)`.
    pub async fn run_sql(
        &self,
        db: &dyn SqlDatabase,
        sql: &str,
        db_id: &str,
    ) -> Result<Capped<Rows>, SqlToolsError> {
        let key = (db_id.to_string(), sql.to_string());
        let rows = match self.results.get(&key).await {
            Some(hit) => hit,
            None => {
                let rows = Arc::new(db.fetch_rows(sql).await?);
                self.results.insert(key, rows.clone()).await;
                rows
            }
        };
        cap_response(rows.as_ref().clone(), self.config.max_response_chars)
    }

    /// Table names currently cached for `db_id`, sorted.
    pub async fn cached_tables(&self, db_id: &str) -> Vec<String> {
        let Some(entry) = self.schemas.get(db_id).await else {
            return Vec::new();
        };
        let mut tables: Vec<String> = entry.read().await.keys().cloned().collect();
        tables.sort();
        tables
    }
}

fn is_indicator(column: &str, indicator_vars: &[String]) -> bool {
    indicator_vars
        .iter()
        .any(|var| var.eq_ignore_ascii_case(column))
}
