//! Declare table shapes as data, get `CREATE TABLE` statements, and create
//! whatever is missing from the connected database.
//!
//! ```no_run
//! use flatdb::{Database, FieldSpec, LogicalType, TableSpec};
//!
//! let accounts = TableSpec::new("accounts")
//!     .field(FieldSpec::new("id", LogicalType::Integer).primary_key())
//!     .field(FieldSpec::new("email", LogicalType::Text));
//!
//! let db = Database::builder()
//!     .url("sqlite://app.db?mode=rwc")
//!     .prefix("app_")
//!     .table(accounts)
//!     .build()?;
//!
//! let rows = db.execute_query("SELECT * FROM %s", &["app_accounts"])?;
//! # Ok::<(), flatdb::DbError>(())
//! ```

pub mod database;
pub mod db;
pub mod errors;
pub mod models;
pub mod schema;

pub use database::{Database, DatabaseBuilder};
pub use db::{DbClient, MetaData, ResultSet};
pub use errors::DbError;
pub use models::{
    connections::{ConnectionConfig, DbType},
    schema::{ColumnSpec, FieldSpec, ForeignKeyRef, TableDeclaration, TableSpec},
};
pub use schema::{
    ddl::DdlBuilder,
    processor::{SchemaProcessor, SchemaReport, TableOutcome, TableStatus},
    types::{LogicalType, SqlTypePair, TypeResolver},
};
