use log::{debug, error, info, warn};

use crate::{
    db::DbClient,
    errors::DbError,
    models::schema::{TableDeclaration, TableSpec},
};

use super::{ddl::DdlBuilder, types::TypeResolver};

#[derive(Debug)]
pub enum TableStatus {
    Created,
    AlreadyExists,
    Failed(DbError),
}

#[derive(Debug)]
pub struct TableOutcome {
    /// Prefixed table name.
    pub table: String,
    pub status: TableStatus,
}

/// Result of one [`SchemaProcessor::process_all`] pass.
#[derive(Debug, Default)]
pub struct SchemaReport {
    outcomes: Vec<TableOutcome>,
    declarations: Vec<TableDeclaration>,
}

impl SchemaReport {
    pub fn outcomes(&self) -> &[TableOutcome] {
        &self.outcomes
    }

    /// Every declaration that resolved, whether it was created, skipped,
    /// or failed to execute.
    pub fn declarations(&self) -> &[TableDeclaration] {
        &self.declarations
    }

    pub fn created(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TableStatus::Created))
            .map(|o| o.table.as_str())
            .collect()
    }

    pub fn failed(&self) -> Vec<(&str, &DbError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                TableStatus::Failed(err) => Some((o.table.as_str(), err)),
                _ => None,
            })
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failed().is_empty()
    }
}

/// Creates declared tables that are missing from the database.
///
/// Creation only: a table that already exists is left untouched, even if
/// its columns differ from the declaration.
#[derive(Debug, Clone, Default)]
pub struct SchemaProcessor {
    resolver: TypeResolver,
}

impl SchemaProcessor {
    pub fn new(resolver: TypeResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    pub async fn process_all(
        &self,
        client: &dyn DbClient,
        prefix: &str,
        specs: &[TableSpec],
    ) -> SchemaReport {
        let mut report = SchemaReport::default();

        for spec in specs {
            let table = format!("{}{}", prefix, spec.name);

            let declaration = match TableDeclaration::build(spec, prefix, &self.resolver) {
                Ok(declaration) => declaration,
                Err(e) => {
                    warn!("Skipping table {}: {}", table, e);
                    report.outcomes.push(TableOutcome {
                        table,
                        status: TableStatus::Failed(e),
                    });
                    continue;
                }
            };

            let status = self.process(client, &declaration).await;
            report.outcomes.push(TableOutcome { table, status });
            report.declarations.push(declaration);
        }

        report
    }

    async fn process(&self, client: &dyn DbClient, declaration: &TableDeclaration) -> TableStatus {
        let table = declaration.qualified_name();

        // Always ask the database: an earlier table in this pass may have
        // created the same name.
        debug!("Checking if {} exists", table);
        match client.metadata().await {
            Ok(metadata) if metadata.has_table(&table) => {
                info!("Table {} already exists", table);
                return TableStatus::AlreadyExists;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to read metadata for {}: {}", table, e);
                return TableStatus::Failed(e);
            }
        }

        let ddl = DdlBuilder::new(client.db_type()).build(declaration);
        debug!("Executing: {}", ddl);
        match client.execute(&ddl).await {
            Ok(_) => {
                info!("Created table {}", table);
                TableStatus::Created
            }
            Err(e) => {
                error!("Failed to create table {}: {}", table, e);
                TableStatus::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use mockall::predicate;

    use super::*;
    use crate::{
        db::mock::{metadata_with, MockDbClientMock},
        models::{connections::DbType, schema::FieldSpec},
        schema::types::LogicalType,
    };

    fn accounts() -> TableSpec {
        TableSpec::new("accounts")
            .field(FieldSpec::new("id", LogicalType::Integer).primary_key())
            .field(FieldSpec::new("email", LogicalType::Text))
    }

    fn orders() -> TableSpec {
        TableSpec::new("orders")
            .field(FieldSpec::new("id", LogicalType::Integer).primary_key())
            .field(FieldSpec::new("account_id", LogicalType::Integer).references("accounts", "id"))
    }

    /// Mock that remembers created tables so metadata reflects earlier DDL.
    fn stateful_mock(existing: &[&str]) -> (MockDbClientMock, Arc<Mutex<Vec<String>>>) {
        let tables = Arc::new(Mutex::new(
            existing.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
        ));
        let executed = Arc::new(Mutex::new(Vec::new()));

        let mut mock_db = MockDbClientMock::new();
        mock_db.expect_db_type().return_const(DbType::Sqlite);

        let snapshot = tables.clone();
        mock_db.expect_metadata().returning(move || {
            let names = snapshot.lock().unwrap().clone();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            Ok(metadata_with(&refs))
        });

        let created = tables.clone();
        let log = executed.clone();
        mock_db.expect_execute().returning(move |ddl| {
            let name = ddl.split('"').nth(1).unwrap().to_string();
            created.lock().unwrap().push(name);
            log.lock().unwrap().push(ddl.to_string());
            Ok(0)
        });

        (mock_db, executed)
    }

    #[tokio::test]
    async fn test_creates_missing_tables() {
        let (mock_db, executed) = stateful_mock(&[]);
        let processor = SchemaProcessor::default();

        let report = processor
            .process_all(&mock_db, "app_", &[accounts(), orders()])
            .await;

        assert!(report.is_clean());
        assert_eq!(report.created(), vec!["app_accounts", "app_orders"]);
        assert_eq!(report.declarations().len(), 2);

        let executed = executed.lock().unwrap();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "app_accounts""#));
        assert!(executed[1].contains(r#"REFERENCES "app_accounts"("id")"#));
    }

    #[tokio::test]
    async fn test_skips_existing_table_case_insensitively() {
        let (mock_db, executed) = stateful_mock(&["APP_ACCOUNTS"]);
        let processor = SchemaProcessor::default();

        let report = processor.process_all(&mock_db, "app_", &[accounts()]).await;

        assert!(matches!(
            report.outcomes()[0].status,
            TableStatus::AlreadyExists
        ));
        assert_eq!(report.declarations().len(), 1);
        assert!(executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_executes_nothing() {
        let (mock_db, executed) = stateful_mock(&[]);
        let processor = SchemaProcessor::default();
        let specs = [accounts(), orders()];

        processor.process_all(&mock_db, "", &specs).await;
        let second = processor.process_all(&mock_db, "", &specs).await;

        assert!(second.created().is_empty());
        assert!(second.is_clean());
        assert_eq!(executed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_declaration_in_one_pass_is_created_once() {
        let (mock_db, executed) = stateful_mock(&[]);
        let processor = SchemaProcessor::default();

        let report = processor
            .process_all(&mock_db, "", &[accounts(), accounts()])
            .await;

        assert_eq!(report.created(), vec!["accounts"]);
        assert!(matches!(
            report.outcomes()[1].status,
            TableStatus::AlreadyExists
        ));
        assert_eq!(executed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_type_does_not_block_other_tables() {
        let (mock_db, executed) = stateful_mock(&[]);
        let processor = SchemaProcessor::default();
        let broken = TableSpec::new("places").field(FieldSpec::new(
            "location",
            LogicalType::Custom("geometry".to_string()),
        ));

        let report = processor
            .process_all(&mock_db, "", &[broken, accounts()])
            .await;

        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "places");
        assert!(matches!(failed[0].1, DbError::UnsupportedType(name) if name == "geometry"));
        assert_eq!(report.created(), vec!["accounts"]);
        assert_eq!(report.declarations().len(), 1);
        assert_eq!(executed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_ddl_is_reported_and_processing_continues() {
        let mut mock_db = MockDbClientMock::new();
        mock_db.expect_db_type().return_const(DbType::Sqlite);
        mock_db
            .expect_metadata()
            .returning(|| Ok(metadata_with(&[])));
        mock_db
            .expect_execute()
            .with(predicate::function(|ddl: &str| ddl.contains("\"accounts\"")))
            .returning(|_| Err(DbError::Statement("disk I/O error".to_string())));
        mock_db
            .expect_execute()
            .with(predicate::function(|ddl: &str| ddl.contains("\"orders\"")))
            .returning(|_| Ok(0));

        let report = SchemaProcessor::default()
            .process_all(&mock_db, "", &[accounts(), orders()])
            .await;

        assert_eq!(report.failed().len(), 1);
        assert_eq!(report.failed()[0].0, "accounts");
        assert_eq!(report.created(), vec!["orders"]);
        // Both resolved, so both are recorded.
        assert_eq!(report.declarations().len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_failure_is_reported() {
        let mut mock_db = MockDbClientMock::new();
        mock_db.expect_db_type().return_const(DbType::Sqlite);
        mock_db
            .expect_metadata()
            .returning(|| Err(DbError::Statement("connection reset".to_string())));
        mock_db.expect_execute().never();

        let report = SchemaProcessor::default()
            .process_all(&mock_db, "", &[accounts()])
            .await;

        assert!(!report.is_clean());
    }
}
