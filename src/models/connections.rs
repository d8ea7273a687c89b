use std::env;

use serde::{Deserialize, Serialize};

use crate::errors::DbError;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    MySql,
    Sqlite,
}

impl DbType {
    /// Guess the backend from a connection URL scheme.
    pub fn from_url(database_url: &str) -> Option<Self> {
        let scheme = database_url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Some(DbType::Postgres),
            "mysql" | "mariadb" => Some(DbType::MySql),
            "sqlite" => Some(DbType::Sqlite),
            _ => None,
        }
    }

    pub fn identifier_quote(&self) -> char {
        match self {
            DbType::MySql => '`',
            DbType::Postgres | DbType::Sqlite => '"',
        }
    }

    /// Wrap an identifier in the backend's quote character. Embedded quotes
    /// are not escaped; identifiers come from trusted declarations.
    pub fn quote_identifier(&self, name: &str) -> String {
        let q = self.identifier_quote();
        format!("{q}{name}{q}")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionConfig {
    pub database_url: String,
    #[serde(default)]
    pub table_prefix: String,
}

impl ConnectionConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            table_prefix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Reads `DATABASE_URL` and the optional `DATABASE_PREFIX`, loading a
    /// `.env` file first if one is present.
    pub fn from_env() -> Result<Self, DbError> {
        dotenv::dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| DbError::Config("DATABASE_URL must be set".to_string()))?;
        let table_prefix = env::var("DATABASE_PREFIX").unwrap_or_default();

        Ok(Self {
            database_url,
            table_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_type_from_url() {
        assert_eq!(
            DbType::from_url("postgres://user@localhost/app"),
            Some(DbType::Postgres)
        );
        assert_eq!(DbType::from_url("mysql://root@localhost/app"), Some(DbType::MySql));
        assert_eq!(DbType::from_url("sqlite::memory:"), Some(DbType::Sqlite));
        assert_eq!(DbType::from_url("SQLITE://data.db"), Some(DbType::Sqlite));
        assert_eq!(DbType::from_url("oracle://nope"), None);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(DbType::Postgres.quote_identifier("users"), "\"users\"");
        assert_eq!(DbType::Sqlite.quote_identifier("users"), "\"users\"");
        assert_eq!(DbType::MySql.quote_identifier("users"), "`users`");
    }

    #[test]
    fn test_config_builder() {
        let config = ConnectionConfig::new("sqlite::memory:").with_prefix("app_");
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.table_prefix, "app_");
    }

    // Both cases share one test so no other test observes the variables.
    #[test]
    fn test_config_from_env() {
        env::remove_var("DATABASE_URL");
        env::remove_var("DATABASE_PREFIX");
        let err = ConnectionConfig::from_env().unwrap_err();
        assert!(matches!(err, DbError::Config(msg) if msg.contains("DATABASE_URL")));

        env::set_var("DATABASE_URL", "postgres://app@localhost/app");
        let config = ConnectionConfig::from_env().unwrap();
        assert_eq!(config.database_url, "postgres://app@localhost/app");
        assert!(config.table_prefix.is_empty());

        env::set_var("DATABASE_PREFIX", "app_");
        let config = ConnectionConfig::from_env().unwrap();
        assert_eq!(config.table_prefix, "app_");

        env::remove_var("DATABASE_URL");
        env::remove_var("DATABASE_PREFIX");
    }

    #[test]
    fn test_config_deserialize_default_prefix() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"database_url": "sqlite://app.db"}"#).unwrap();
        assert_eq!(config.database_url, "sqlite://app.db");
        assert!(config.table_prefix.is_empty());
    }
}
