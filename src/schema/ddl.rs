use crate::models::{
    connections::DbType,
    schema::{ColumnSpec, TableDeclaration},
};

/// Defaults that are SQL expressions rather than string literals.
const KEYWORD_DEFAULTS: &[&str] = &[
    "NULL",
    "TRUE",
    "FALSE",
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIME",
];

/// Turns a [`TableDeclaration`] into a single `CREATE TABLE IF NOT EXISTS`
/// statement for one backend.
#[derive(Debug, Clone, Copy)]
pub struct DdlBuilder {
    db_type: DbType,
}

impl DdlBuilder {
    pub fn new(db_type: DbType) -> Self {
        Self { db_type }
    }

    pub fn build(&self, table: &TableDeclaration) -> String {
        let mut clauses: Vec<String> = table
            .columns()
            .iter()
            .map(|column| self.column_clause(column))
            .collect();

        let primary_key = table.primary_key();
        if !primary_key.is_empty() {
            clauses.push(format!("PRIMARY KEY ({})", self.quote_list(&primary_key)));
        }

        for (column, fk) in table.foreign_keys() {
            clauses.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                self.quote(column),
                self.quote(&format!("{}{}", table.prefix(), fk.table)),
                self.quote(&fk.column)
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            self.quote(&table.qualified_name()),
            clauses.join(", ")
        )
    }

    fn column_clause(&self, column: &ColumnSpec) -> String {
        let sql_type = match self.db_type {
            // An INTEGER primary key is SQLite's rowid alias, which is what
            // makes it auto-assign.
            DbType::Sqlite if column.is_auto_increment => "INTEGER",
            _ => column.sql_type.as_str(),
        };

        let mut clause = format!("{} {}", self.quote(&column.name), sql_type);
        if !column.is_nullable {
            clause.push_str(" NOT NULL");
        }
        if column.is_auto_increment {
            match self.db_type {
                DbType::Postgres => clause.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
                DbType::MySql => clause.push_str(" AUTO_INCREMENT"),
                DbType::Sqlite => {}
            }
        }
        if let Some(default) = &column.default_value {
            clause.push_str(" DEFAULT ");
            clause.push_str(&self.render_default(default));
        }
        clause
    }

    /// MySQL accepts `CURRENT_DATE`/`CURRENT_TIME` only as parenthesized
    /// expression defaults; `CURRENT_TIMESTAMP` is allowed bare.
    fn render_default(&self, value: &str) -> String {
        let literal = default_literal(value);
        match self.db_type {
            DbType::MySql if matches!(literal.as_str(), "CURRENT_DATE" | "CURRENT_TIME") => {
                format!("({})", literal)
            }
            _ => literal,
        }
    }

    fn quote(&self, identifier: &str) -> String {
        self.db_type.quote_identifier(identifier)
    }

    fn quote_list(&self, identifiers: &[&str]) -> String {
        identifiers
            .iter()
            .map(|id| self.quote(id))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn default_literal(value: &str) -> String {
    if KEYWORD_DEFAULTS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(value.trim()))
    {
        value.trim().to_ascii_uppercase()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}
