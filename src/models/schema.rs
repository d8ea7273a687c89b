use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    errors::DbError,
    schema::types::{LogicalType, TypeResolver},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// One declared field, before type resolution.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub references: Option<ForeignKeyRef>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            default: None,
            primary_key: false,
            nullable: false,
            auto_increment: false,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }
}

/// Caller-supplied shape of one table.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TableSpec {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// A fully type-resolved column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub is_auto_increment: bool,
    pub foreign_key: Option<ForeignKeyRef>,
}

/// Resolved, immutable description of one table.
///
/// Built fresh from a [`TableSpec`] on every processing pass; there is no
/// way to mutate it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDeclaration {
    name: String,
    prefix: String,
    columns: Vec<ColumnSpec>,
}

impl TableDeclaration {
    pub fn build(
        spec: &TableSpec,
        prefix: &str,
        resolver: &TypeResolver,
    ) -> Result<Self, DbError> {
        validate(spec)?;

        let columns = spec
            .fields
            .iter()
            .map(|field| {
                let pair = resolver.resolve(&field.logical_type, field.default.as_deref())?;
                Ok(ColumnSpec {
                    name: field.name.clone(),
                    sql_type: pair.sql_type().to_string(),
                    default_value: if field.auto_increment {
                        None
                    } else {
                        Some(pair.default_value().to_string())
                    },
                    is_primary_key: field.primary_key,
                    is_nullable: field.nullable,
                    is_auto_increment: field.auto_increment,
                    foreign_key: field.references.clone(),
                })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Self {
            name: spec.name.clone(),
            prefix: prefix.to_string(),
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Table name with the prefix applied, as it appears in the database.
    pub fn qualified_name(&self) -> String {
        format!("{}{}", self.prefix, self.name)
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn foreign_keys(&self) -> Vec<(&str, &ForeignKeyRef)> {
        self.columns
            .iter()
            .filter_map(|c| c.foreign_key.as_ref().map(|fk| (c.name.as_str(), fk)))
            .collect()
    }
}

fn validate(spec: &TableSpec) -> Result<(), DbError> {
    if spec.name.trim().is_empty() {
        return Err(DbError::Declaration("table name is empty".to_string()));
    }
    if spec.fields.is_empty() {
        return Err(DbError::Declaration(format!(
            "table {} declares no columns",
            spec.name
        )));
    }

    let mut seen = HashSet::new();
    for field in &spec.fields {
        if field.name.trim().is_empty() {
            return Err(DbError::Declaration(format!(
                "table {} has a column with an empty name",
                spec.name
            )));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(DbError::Declaration(format!(
                "table {} declares column {} more than once",
                spec.name, field.name
            )));
        }
        if let Some(fk) = &field.references {
            if fk.table.trim().is_empty() || fk.column.trim().is_empty() {
                return Err(DbError::Declaration(format!(
                    "column {}.{} has an incomplete foreign key reference",
                    spec.name, field.name
                )));
            }
        }
    }

    let auto_increment: Vec<&FieldSpec> =
        spec.fields.iter().filter(|f| f.auto_increment).collect();
    if let Some(field) = auto_increment.first() {
        let key_count = spec.fields.iter().filter(|f| f.primary_key).count();
        if auto_increment.len() > 1 || !field.primary_key || key_count != 1 {
            return Err(DbError::Declaration(format!(
                "table {}: auto-increment is only allowed on a single-column primary key",
                spec.name
            )));
        }
    }

    Ok(())
}
