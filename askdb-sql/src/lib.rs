pub mod capped;
pub mod database;
pub mod dialect;
pub mod error;
pub mod sqlite;
pub mod tools;

pub use capped::{cap_response, Capped, ResponseText, TOO_LONG_SENTINEL};
pub use database::{CommonValues, Rows, SqlDatabase, ValueCount};
pub use dialect::Dialect;
pub use error::SqlToolsError;
pub use sqlite::{SqliteDatabase, SqliteDatabaseBuilder};
pub use tools::{DatabaseTools, DatabaseToolsConfig};
