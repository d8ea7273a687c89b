use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use sqlx::{
    postgres::PgRow,
    types::{
        chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc},
        Decimal,
    },
    Column, Connection, Executor, PgConnection, Row,
};
use tokio::sync::Mutex;

use crate::{errors::DbError, models::connections::DbType};

use super::{column_names, decode_column, DbClient, MetaData, ResultSet};

pub struct PostgresClient {
    conn: Mutex<PgConnection>,
}

impl PostgresClient {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let conn = PgConnection::connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        debug!("Connected to PostgreSQL");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// PostgreSQL types are strict, so at most one entry matches each column.
fn column_value(row: &PgRow, index: usize) -> Value {
    decode_column!(row, index,
        bool => Value::from,
        i16 => Value::from,
        i32 => Value::from,
        i64 => Value::from,
        f32 => |v: f32| Value::from(f64::from(v)),
        f64 => Value::from,
        Decimal => |v: Decimal| Value::String(v.to_string()),
        NaiveDateTime => |v: NaiveDateTime| Value::String(v.to_string()),
        DateTime<Utc> => |v: DateTime<Utc>| Value::String(v.to_rfc3339()),
        NaiveDate => |v: NaiveDate| Value::String(v.to_string()),
        NaiveTime => |v: NaiveTime| Value::String(v.to_string()),
        String => Value::String,
    );
    Value::Null
}

#[async_trait]
impl DbClient for PostgresClient {
    fn db_type(&self) -> DbType {
        DbType::Postgres
    }

    async fn query(&self, query: &str) -> Result<ResultSet, DbError> {
        let mut conn = self.conn.lock().await;
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
            SELECT CAST(table_name AS TEXT) AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'
        "#;
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(query)
            .persistent(false)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DbError::Statement(e.to_string()))?;

        let table_names = rows
            .iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MetaData {
            db_type: DbType::Postgres,
            backend_name: "PostgreSQL".to_string(),
            table_names,
        })
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn.into_inner().close().await.map_err(DbError::Sqlx)
    }
}
