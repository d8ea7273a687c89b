use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use sqlx::{
    mysql::MySqlRow,
    types::{
        chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc},
        Decimal,
    },
    Column, Connection, Executor, MySqlConnection, Row,
};
use tokio::sync::Mutex;

use crate::{errors::DbError, models::connections::DbType};

use super::{column_names, decode_column, DbClient, MetaData, ResultSet};

pub struct MySqlClient {
    conn: Mutex<MySqlConnection>,
}

impl MySqlClient {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let conn = MySqlConnection::connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        debug!("Connected to MySQL");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// BOOLEAN is TINYINT(1) in MySQL; it is tried first so it reads as a bool.
fn column_value(row: &MySqlRow, index: usize) -> Value {
    decode_column!(row, index,
        bool => Value::from,
        i64 => Value::from,
        u64 => Value::from,
        f32 => |v: f32| Value::from(f64::from(v)),
        f64 => Value::from,
        Decimal => |v: Decimal| Value::String(v.to_string()),
        DateTime<Utc> => |v: DateTime<Utc>| Value::String(v.to_rfc3339()),
        NaiveDateTime => |v: NaiveDateTime| Value::String(v.to_string()),
        NaiveDate => |v: NaiveDate| Value::String(v.to_string()),
        NaiveTime => |v: NaiveTime| Value::String(v.to_string()),
        String => Value::String,
        Vec<u8> => |v: Vec<u8>| Value::String(String::from_utf8_lossy(&v).into_owned()),
    );
    Value::Null
}

#[async_trait]
impl DbClient for MySqlClient {
    fn db_type(&self) -> DbType {
        DbType::MySql
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
            SELECT CAST(table_name AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
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
            db_type: DbType::MySql,
            backend_name: "MySQL".to_string(),
            table_names,
        })
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.conn.into_inner().close().await.map_err(DbError::Sqlx)
    }
}
