use log::{error, info};
use tokio::runtime::{Builder, Runtime};

use crate::{
    db::{self, format_query, DbClient, MetaData, ResultSet},
    errors::DbError,
    models::{
        connections::{ConnectionConfig, DbType},
        schema::{TableDeclaration, TableSpec},
    },
    schema::{
        processor::{SchemaProcessor, SchemaReport},
        types::TypeResolver,
    },
};

/// Blocking façade over one database connection.
///
/// Construction creates every declared table that does not exist yet;
/// afterwards the handle is a thin pass-through for `%s`-templated
/// statements. Each call runs to completion on the caller's thread using a
/// private current-thread runtime, so a `Database` must not be created or
/// used from inside another tokio runtime.
pub struct Database {
    runtime: Runtime,
    client: Box<dyn DbClient>,
    prefix: String,
    report: SchemaReport,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub fn connect(config: &ConnectionConfig, tables: &[TableSpec]) -> Result<Self, DbError> {
        DatabaseBuilder::new()
            .config(config.clone())
            .tables(tables.iter().cloned())
            .build()
    }

    /// Wraps an already-open client, e.g. a custom driver or a test double.
    pub fn with_client(
        client: Box<dyn DbClient>,
        prefix: &str,
        tables: &[TableSpec],
    ) -> Result<Self, DbError> {
        let runtime = new_runtime()?;
        Ok(Self::open(
            runtime,
            client,
            prefix,
            tables,
            &SchemaProcessor::default(),
        ))
    }

    fn open(
        runtime: Runtime,
        client: Box<dyn DbClient>,
        prefix: &str,
        tables: &[TableSpec],
        processor: &SchemaProcessor,
    ) -> Self {
        let report = runtime.block_on(processor.process_all(client.as_ref(), prefix, tables));
        if report.is_clean() {
            info!("Schema ready: {} table(s) declared", report.outcomes().len());
        } else {
            error!(
                "Schema processed with {} failure(s)",
                report.failed().len()
            );
        }

        Self {
            runtime,
            client,
            prefix: prefix.to_string(),
            report,
        }
    }

    /// Runs a row-returning statement. The template is trusted code; its
    /// arguments are substituted verbatim.
    pub fn execute_query(&self, sql: &str, args: &[&str]) -> Result<ResultSet, DbError> {
        let query = format_query(sql, args).map_err(|e| log_failure("query", e))?;
        self.runtime
            .block_on(self.client.query(&query))
            .map_err(|e| log_failure("query", e))
    }

    /// Runs a statement and returns the affected row count.
    pub fn execute_update(&self, sql: &str, args: &[&str]) -> Result<u64, DbError> {
        let statement = format_query(sql, args).map_err(|e| log_failure("update", e))?;
        self.runtime
            .block_on(self.client.execute(&statement))
            .map_err(|e| log_failure("update", e))
    }

    pub fn metadata(&self) -> Result<MetaData, DbError> {
        self.runtime
            .block_on(self.client.metadata())
            .map_err(|e| log_failure("metadata", e))
    }

    /// Case-insensitive check against the live table list. `table_name` is
    /// matched as given; include the prefix if the table has one.
    pub fn table_exists(&self, table_name: &str) -> Result<bool, DbError> {
        Ok(self.metadata()?.has_table(table_name))
    }

    pub fn db_type(&self) -> DbType {
        self.client.db_type()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Declarations processed at construction. Informational only; the
    /// database itself is the source of truth.
    pub fn tables(&self) -> &[TableDeclaration] {
        self.report.declarations()
    }

    pub fn report(&self) -> &SchemaReport {
        &self.report
    }

    pub fn close(self) -> Result<(), DbError> {
        let Database {
            runtime, client, ..
        } = self;
        runtime.block_on(client.close())
    }
}

fn log_failure(operation: &str, e: DbError) -> DbError {
    error!("{} failed: {}", operation, e);
    e
}

fn new_runtime() -> Result<Runtime, DbError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| DbError::Connection(e.to_string()))
}

/// Collects connection settings and table declarations for a [`Database`].
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    database_url: Option<String>,
    prefix: String,
    tables: Vec<TableSpec>,
    resolver: TypeResolver,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = Some(database_url.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn config(self, config: ConnectionConfig) -> Self {
        self.url(config.database_url).prefix(config.table_prefix)
    }

    pub fn table(mut self, table: TableSpec) -> Self {
        self.tables.push(table);
        self
    }

    pub fn tables(mut self, tables: impl IntoIterator<Item = TableSpec>) -> Self {
        self.tables.extend(tables);
        self
    }

    pub fn resolver(mut self, resolver: TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Connects and processes the declared tables. Fails only if the URL
    /// is missing or names an unknown backend, or if the connection cannot
    /// be opened; per-table problems end up in [`Database::report`].
    pub fn build(self) -> Result<Database, DbError> {
        let database_url = self
            .database_url
            .clone()
            .ok_or_else(|| DbError::Config("database URL is not set".to_string()))?;
        if DbType::from_url(&database_url).is_none() {
            return Err(log_failure(
                "connect",
                DbError::Config(format!("unsupported database URL: {}", database_url)),
            ));
        }

        let runtime = new_runtime()?;
        let client = runtime
            .block_on(db::connect(&database_url))
            .map_err(|e| log_failure("connect", e))?;

        Ok(self.finish(runtime, client))
    }

    pub fn build_with_client(self, client: Box<dyn DbClient>) -> Result<Database, DbError> {
        let runtime = new_runtime()?;
        Ok(self.finish(runtime, client))
    }

    fn finish(self, runtime: Runtime, client: Box<dyn DbClient>) -> Database {
        let processor = SchemaProcessor::new(self.resolver);
        Database::open(runtime, client, &self.prefix, &self.tables, &processor)
    }
}
