use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SqlToolsError;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sqlite,
    Postgresql,
    Mysql,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgresql => "postgresql",
            Dialect::Mysql => "mysql",
        }
    }

    pub fn parse(name: &str) -> Result<Self, SqlToolsError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgresql),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            _ => Err(SqlToolsError::UnsupportedDialect(name.to_string())),
        }
    }

    /// Quotes one identifier, doubling any embedded quote character.
    pub fn quote_identifier(&self, ident: &str) -> String {
        let quote = match self {
            Dialect::Sqlite | Dialect::Postgresql => '"',
            Dialect::Mysql => '`',
        };
        let escaped = ident.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Quotes each part of a possibly schema-qualified name.
    pub fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Frequency of each distinct value, most common first.
    pub fn common_values_sql(&self, table: &str, column: &str, limit: Option<usize>) -> String {
        let column = self.quote_identifier(column);
        let mut sql = format!(
            "SELECT {column}, COUNT(*) FROM {} GROUP BY {column} ORDER BY COUNT(*) DESC",
            self.quote_qualified(table)
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(Dialect::Sqlite.quote_identifier("beds"), "\"beds\"");
        assert_eq!(Dialect::Sqlite.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(Dialect::Mysql.quote_identifier("a`b"), "`a``b`");
        assert_eq!(
            Dialect::Postgresql.quote_qualified("health.facilities"),
            "\"health\".\"facilities\""
        );
    }

    #[test]
    fn common_values_limit_is_optional() {
        let limited = Dialect::Sqlite.common_values_sql("t", "c", Some(5));
        assert!(limited.ends_with("ORDER BY COUNT(*) DESC LIMIT 5"));
        let all = Dialect::Sqlite.common_values_sql("t", "c", None);
        assert!(all.ends_with("ORDER BY COUNT(*) DESC"));
    }

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!(Dialect::parse("SQLite").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::parse("postgres").unwrap(), Dialect::Postgresql);
        assert!(Dialect::parse("oracle").is_err());
    }
}
