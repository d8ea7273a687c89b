use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{errors::DbError, models::connections::DbType};

/// Returns the first listed type that decodes the column, converted to JSON.
/// SQL NULL becomes `Value::Null` whatever the column type.
macro_rules! decode_column {
    ($row:expr, $index:expr, $($ty:ty => $convert:expr),+ $(,)?) => {
        $(
            if let Ok(value) = $row.try_get::<Option<$ty>, _>($index) {
                return value.map($convert).unwrap_or(serde_json::Value::Null);
            }
        )+
    };
}

pub(crate) use decode_column;

pub mod mysql;
pub mod postgres;
pub mod sqlite;

/// Connection boundary. Everything above this trait is driver-agnostic.
#[async_trait]
pub trait DbClient: Send + Sync {
    fn db_type(&self) -> DbType;
    async fn query(&self, query: &str) -> Result<ResultSet, DbError>;
    async fn execute(&self, query: &str) -> Result<u64, DbError>;
    async fn metadata(&self) -> Result<MetaData, DbError>;
    async fn close(self: Box<Self>) -> Result<(), DbError>;
}

/// Opens a client for the backend named by the URL scheme.
pub async fn connect(database_url: &str) -> Result<Box<dyn DbClient>, DbError> {
    let db_type = DbType::from_url(database_url).ok_or_else(|| {
        DbError::Config(format!("unsupported database URL: {}", database_url))
    })?;

    let client: Box<dyn DbClient> = match db_type {
        DbType::Postgres => Box::new(postgres::PostgresClient::connect(database_url).await?),
        DbType::MySql => Box::new(mysql::MySqlClient::connect(database_url).await?),
        DbType::Sqlite => Box::new(sqlite::SqliteClient::connect(database_url).await?),
    };
    Ok(client)
}

pub(crate) fn column_names<C: sqlx::Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// Rows returned by a query, one JSON object per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Value>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Snapshot of the connected database, taken at the time of the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub db_type: DbType,
    pub backend_name: String,
    pub table_names: Vec<String>,
}

impl MetaData {
    pub fn has_table(&self, table_name: &str) -> bool {
        self.table_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(table_name))
    }
}

/// Expands positional `%s` placeholders with `args`, in order.
///
/// `%%` yields a literal `%`; any other `%` sequence is copied unchanged.
/// Surplus arguments are ignored. No quoting or escaping is applied, so the
/// template and arguments must come from trusted code, never user input.
pub fn format_query(template: &str, args: &[&str]) -> Result<String, DbError> {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                let arg = args.next().ok_or_else(|| {
                    DbError::Template(format!("not enough arguments for template: {template}"))
                })?;
                out.push_str(arg);
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }

    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_query() {
        let sql = format_query("SELECT * FROM %s WHERE id = %s", &["users", "1"]).unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE id = 1");
    }

    #[test]
    fn test_format_query_literal_percent() {
        let sql = format_query("SELECT * FROM %s WHERE name LIKE 'a%'", &["users"]).unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE name LIKE 'a%'");

        let sql = format_query("SELECT '100%%'", &[]).unwrap();
        assert_eq!(sql, "SELECT '100%'");
    }

    #[test]
    fn test_format_query_missing_argument() {
        let err = format_query("SELECT %s FROM %s", &["id"]).unwrap_err();
        assert!(matches!(err, DbError::Template(_)));
    }

    #[test]
    fn test_format_query_ignores_surplus_arguments() {
        let sql = format_query("SELECT 1", &["unused"]).unwrap();
        assert_eq!(sql, "SELECT 1");
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        let result = connect("oracle://scott@localhost/orcl").await;
        assert!(matches!(result, Err(DbError::Config(msg)) if msg.contains("oracle")));
    }

    #[test]
    fn test_has_table_is_case_insensitive() {
        let metadata = mock::metadata_with(&["USERS"]);
        assert!(metadata.has_table("users"));
        assert!(metadata.has_table("Users"));
        assert!(!metadata.has_table("orders"));
    }
}
