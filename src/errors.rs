use thiserror::Error;

/// Error type shared by schema processing and statement execution.
#[derive(Error, Debug)]
pub enum DbError {
    /// Error raised by the underlying sqlx driver.
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    /// A declared logical type has no SQL mapping.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    /// A table declaration is malformed (empty, duplicate columns, bad keys).
    #[error("Invalid declaration: {0}")]
    Declaration(String),
    /// Connection could not be opened or used.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A query, update or DDL statement failed at the driver level.
    #[error("Statement error: {0}")]
    Statement(String),
    /// Query template placeholders do not match the supplied arguments.
    #[error("Template error: {0}")]
    Template(String),
    /// Configuration error (e.g., missing database URL).
    #[error("Configuration error: {0}")]
    Config(String),
}
