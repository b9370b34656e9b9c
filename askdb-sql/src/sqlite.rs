use askdb_core::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::{Dialect, Rows, SqlDatabase, SqlToolsError, ValueCount};

#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct SqliteDatabaseBuilder {
    database_url: String,
    max_connections: u32,
}

impl SqliteDatabase {
    pub fn builder(database_url: impl Into<String>) -> SqliteDatabaseBuilder {
        SqliteDatabaseBuilder {
            database_url: database_url.into(),
            max_connections: 1,
        }
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SqliteDatabaseBuilder {
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub async fn build(self) -> Result<SqliteDatabase, SqlToolsError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
            .map_err(SqlToolsError::Connection)?;
        Ok(SqliteDatabase { pool })
    }
}

fn query_error(sql: &str) -> impl FnOnce(sqlx::Error) -> SqlToolsError + '_ {
    move |source| SqlToolsError::Query {
        sql: sql.to_string(),
        source,
    }
}

fn qualified(schema: Option<&str>, table: &str) -> String {
    let table = Dialect::Sqlite.quote_identifier(table);
    match schema {
        Some(schema) => format!("{}.{table}", Dialect::Sqlite.quote_identifier(schema)),
        None => table,
    }
}

fn decode_cell(row: &SqliteRow, index: usize) -> Result<Value, SqlToolsError> {
    let decode_error = |err: sqlx::Error| SqlToolsError::Decode {
        column: row.column(index).name().to_string(),
        reason: err.to_string(),
    };
    let raw = row.try_get_raw(index).map_err(decode_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    // SQLite is dynamically typed; decode by the stored value's class.
    let class = raw.type_info().name().to_ascii_uppercase();
    let value = match class.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            Value::from(row.try_get::<i64, _>(index).map_err(decode_error)?)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            Value::from(row.try_get::<f64, _>(index).map_err(decode_error)?)
        }
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index).map_err(decode_error)?;
            Value::from(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::from(row.try_get::<String, _>(index).map_err(decode_error)?),
    };
    Ok(value)
}

fn to_rows(rows: &[SqliteRow]) -> Result<Rows, SqlToolsError> {
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    let rows = rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|i| decode_cell(row, i))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Rows { columns, rows })
}

#[async_trait::async_trait]
impl SqlDatabase for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn reflect_table(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Option<String>, SqlToolsError> {
        let master = match schema {
            Some(schema) => format!("{}.sqlite_master", Dialect::Sqlite.quote_identifier(schema)),
            None => "sqlite_master".to_string(),
        };
        let sql = format!("SELECT sql FROM {master} WHERE type IN ('table', 'view') AND name = ?1");
        let ddl: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error(&sql))?;
        Ok(ddl.flatten())
    }

    async fn sample_rows(
        &self,
        schema: Option<&str>,
        table: &str,
        limit: usize,
    ) -> Result<Rows, SqlToolsError> {
        let sql = format!("SELECT * FROM {} LIMIT {limit}", qualified(schema, table));
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error(&sql))?;
        to_rows(&rows)
    }

    async fn column_value_counts(
        &self,
        table: &str,
        column: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ValueCount>, SqlToolsError> {
        let sql = Dialect::Sqlite.common_values_sql(table, column, limit);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error(&sql))?;
        rows.iter()
            .map(|row| {
                let count = row.try_get::<i64, _>(1).map_err(|err| SqlToolsError::Decode {
                    column: "COUNT(*)".to_string(),
                    reason: err.to_string(),
                })?;
                Ok(ValueCount {
                    value: decode_cell(row, 0)?,
                    count,
                })
            })
            .collect()
    }

    async fn fetch_rows(&self, sql: &str) -> Result<Rows, SqlToolsError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error(sql))?;
        to_rows(&rows)
    }
}
