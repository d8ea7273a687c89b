use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DbError;

/// Logical field type as written in a table declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalType {
    Integer,
    BigInt,
    SmallInt,
    Float,
    Double,
    Decimal,
    Text,
    Char,
    Boolean,
    Timestamp,
    Date,
    Time,
    Uuid,
    /// Any other name. Only resolvable if registered on the [`TypeResolver`].
    Custom(String),
}

impl LogicalType {
    pub fn name(&self) -> &str {
        match self {
            LogicalType::Integer => "integer",
            LogicalType::BigInt => "bigint",
            LogicalType::SmallInt => "smallint",
            LogicalType::Float => "float",
            LogicalType::Double => "double",
            LogicalType::Decimal => "decimal",
            LogicalType::Text => "text",
            LogicalType::Char => "char",
            LogicalType::Boolean => "boolean",
            LogicalType::Timestamp => "timestamp",
            LogicalType::Date => "date",
            LogicalType::Time => "time",
            LogicalType::Uuid => "uuid",
            LogicalType::Custom(name) => name,
        }
    }
}

impl FromStr for LogicalType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => LogicalType::Integer,
            "bigint" | "long" => LogicalType::BigInt,
            "smallint" | "short" => LogicalType::SmallInt,
            "float" | "real" => LogicalType::Float,
            "double" => LogicalType::Double,
            "decimal" | "numeric" => LogicalType::Decimal,
            "text" | "string" | "varchar" => LogicalType::Text,
            "char" => LogicalType::Char,
            "boolean" | "bool" => LogicalType::Boolean,
            "timestamp" | "datetime" => LogicalType::Timestamp,
            "date" => LogicalType::Date,
            "time" => LogicalType::Time,
            "uuid" => LogicalType::Uuid,
            _ => LogicalType::Custom(s.trim().to_string()),
        };
        Ok(ty)
    }
}

impl From<String> for LogicalType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(ty) => ty,
            Err(never) => match never {},
        }
    }
}

impl From<LogicalType> for String {
    fn from(value: LogicalType) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved SQL type and default literal for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTypePair {
    sql_type: String,
    default_value: String,
}

impl SqlTypePair {
    pub fn of(sql_type: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self {
            sql_type: sql_type.into(),
            default_value: default_value.into(),
        }
    }

    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }
}

/// Maps logical types to SQL types with their zero/empty defaults.
///
/// Built-in types follow a fixed table. Extra names can be registered with
/// [`TypeResolver::register`] before the resolver is handed to a
/// [`SchemaProcessor`](crate::schema::processor::SchemaProcessor).
#[derive(Debug, Clone, Default)]
pub struct TypeResolver {
    custom: HashMap<String, SqlTypePair>,
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: &str, pair: SqlTypePair) -> Self {
        self.custom.insert(name.to_ascii_lowercase(), pair);
        self
    }

    pub fn resolve(
        &self,
        logical_type: &LogicalType,
        explicit_default: Option<&str>,
    ) -> Result<SqlTypePair, DbError> {
        let pair = self.lookup(logical_type)?;
        Ok(match explicit_default {
            Some(default) => SqlTypePair::of(pair.sql_type, default),
            None => pair,
        })
    }

    fn lookup(&self, logical_type: &LogicalType) -> Result<SqlTypePair, DbError> {
        let (sql_type, default) = match logical_type {
            LogicalType::Integer => ("INT", "0"),
            LogicalType::BigInt => ("BIGINT", "0"),
            LogicalType::SmallInt => ("SMALLINT", "0"),
            LogicalType::Float => ("REAL", "0"),
            LogicalType::Double => ("DOUBLE PRECISION", "0"),
            LogicalType::Decimal => ("DECIMAL(19,4)", "0"),
            LogicalType::Text => ("VARCHAR(255)", ""),
            LogicalType::Char => ("CHAR(1)", ""),
            LogicalType::Boolean => ("BOOLEAN", "FALSE"),
            LogicalType::Timestamp => ("TIMESTAMP", "CURRENT_TIMESTAMP"),
            LogicalType::Date => ("DATE", "CURRENT_DATE"),
            LogicalType::Time => ("TIME", "CURRENT_TIME"),
            LogicalType::Uuid => ("CHAR(36)", ""),
            LogicalType::Custom(name) => {
                return self
                    .custom
                    .get(&name.to_ascii_lowercase())
                    .cloned()
                    .ok_or_else(|| DbError::UnsupportedType(name.clone()));
            }
        };
        Ok(SqlTypePair::of(sql_type, default))
    }
}
