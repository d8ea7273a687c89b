use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use sqlx::{
    sqlite::SqliteRow, Column, Connection, Executor, Row, SqliteConnection, TypeInfo,
};
use tokio::sync::Mutex;

use crate::{errors::DbError, models::connections::DbType};

use super::{column_names, decode_column, DbClient, MetaData, ResultSet};

pub struct SqliteClient {
    conn: Mutex<SqliteConnection>,
}

impl SqliteClient {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let conn = SqliteConnection::connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        debug!("Connected to SQLite");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// SQLite stores booleans as integers, so the declared column type decides
/// whether 0/1 comes back as `false`/`true`. Temporal types are stored as
/// text and decode as strings.
fn column_value(row: &SqliteRow, index: usize) -> Value {
    if row.column(index).type_info().name() == "BOOLEAN" {
        decode_column!(row, index, bool => Value::from);
    }
    decode_column!(row, index,
        i64 => Value::from,
        f64 => Value::from,
        String => Value::String,
    );
    Value::Null
}

#[async_trait]
impl DbClient for SqliteClient {
    fn db_type(&self) -> DbType {
        DbType::Sqlite
    }

    async fn query(&self, query: &str) -> Result<ResultSet, DbError> {
        let mut conn = self.conn.lock().await;
        // Non-persistent: the prepared statement is released when the call
        // returns instead of staying in the connection cache.
        let rows = sqlx::query(query)
            .persistent(false)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DbError::Statement(e.to_string()))?;

        let columns = match rows.first() {
            Some(row) => column_names(row.columns()),
            None => {
                let describe = (&mut *conn)
                    .describe(query)
                    .await
                    .map_err(|e| DbError::Statement(e.to_string()))?;
                column_names(describe.columns())
            }
        };

        let rows = rows
            .iter()
            .map(|row| {
                let json_map = row
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(i, column)| (column.name().to_string(), column_value(row, i)))
                    .collect();

                Value::Object(json_map)
            })
            .collect();

        Ok(ResultSet { columns, rows })
    }

    async fn execute(&self, query: &str) -> Result<u64, DbError> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query(query)
            .persistent(false)
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::Statement(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn metadata(&self) -> Result<MetaData, DbError> {
        let query = r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
        "#;
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(query)
            .persistent(false)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DbError::Statement(e.to_string()))?;

        let table_names = rows
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MetaData {
            db_type: DbType::Sqlite,
            backend_name: "SQLite".to_string(),
            table_names,
        })
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn.into_inner().close().await.map_err(DbError::Sqlx)
    }
}
