//! Validation scopes: which tables a query level can see, and how column
//! references resolve against them.
//!
//! A [`VetContext`] borrows the declared schema and owns two ephemeral
//! pieces: the inner schema (CTEs and derived tables registered while
//! validating the current statement) and the tables inherited from enclosing
//! query levels. Nested levels get a clone of both, so registrations made
//! inside a subquery never leak upward and the declared schema is never
//! touched.

use std::collections::HashMap;

use crate::ast::{ColumnUse, TableRef};
use crate::error::{VetError, VetResult};
use crate::schema::{Column, Schema, Table};

pub(crate) struct VetContext<'a> {
    schema: &'a Schema,
    /// CTEs and derived tables, visible for the rest of this statement.
    inner: HashMap<String, Table>,
    /// Tables inherited from enclosing query levels (LATERAL siblings,
    /// correlated subquery scopes).
    outer_tables: Vec<TableRef>,
}

impl<'a> VetContext<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        VetContext {
            schema,
            inner: HashMap::new(),
            outer_tables: Vec::new(),
        }
    }

    /// Context for a nested query level: same schema, a snapshot of the
    /// inner schema, and the enclosing tables extended with `siblings`.
    pub fn nested(&self, siblings: &[TableRef]) -> VetContext<'a> {
        let mut outer_tables = self.outer_tables.clone();
        outer_tables.extend(siblings.iter().cloned());
        VetContext {
            schema: self.schema,
            inner: self.inner.clone(),
            outer_tables,
        }
    }

    /// Inner schema first, so a CTE or derived table shadows a base table of
    /// the same name.
    pub fn lookup_table(&self, name: &str) -> Option<&Table> {
        self.inner.get(name).or_else(|| self.schema.table(name))
    }

    /// Install a derived table or CTE under `name`. Entries are always
    /// read-only.
    pub fn register_derived(&mut self, name: &str, columns: impl IntoIterator<Item = String>) {
        let columns = columns
            .into_iter()
            .map(|column| {
                (
                    column.clone(),
                    Column {
                        name: column,
                        sql_type: None,
                    },
                )
            })
            .collect();
        tracing::debug!(name, "scope: registered derived table");
        self.inner.insert(
            name.to_string(),
            Table {
                name: name.to_string(),
                columns,
                read_only: true,
            },
        );
    }

    /// Check that a statement's target table exists, and is writable when
    /// the statement modifies it.
    pub fn validate_table(&self, name: &str, require_writable: bool) -> VetResult<()> {
        let Some(table) = self.lookup_table(name) else {
            return Err(VetError::InvalidTable(name.to_string()));
        };
        if require_writable && table.read_only {
            return Err(VetError::ReadOnlyTable(name.to_string()));
        }
        Ok(())
    }

    /// Resolve every gathered column against the visible tables: the ones
    /// the statement introduced plus the ones inherited from enclosing
    /// levels.
    ///
    /// Qualified references must match a visible alias or real name and the
    /// column must exist there. Unqualified references succeed as soon as
    /// any visible table has the column; ambiguity across tables is left to
    /// the database. When nothing matches and exactly one table is visible,
    /// the error names it.
    pub fn resolve_columns(
        &self,
        local_tables: &[TableRef],
        columns: &[ColumnUse],
    ) -> VetResult<()> {
        let mut visible: Vec<&Table> = Vec::new();
        let mut by_qualifier: HashMap<&str, &Table> = HashMap::new();
        for table_ref in local_tables.iter().chain(&self.outer_tables) {
            let Some(table) = self.lookup_table(&table_ref.name) else {
                return Err(VetError::InvalidTable(table_ref.name.clone()));
            };
            by_qualifier.insert(table_ref.name.as_str(), table);
            if let Some(alias) = &table_ref.alias {
                by_qualifier.insert(alias.as_str(), table);
            }
            visible.push(table);
        }

        for column in columns {
            match &column.table {
                Some(qualifier) => {
                    let Some(table) = by_qualifier.get(qualifier.as_str()) else {
                        return Err(VetError::TableUnavailable {
                            table: qualifier.clone(),
                            location: column.location,
                        });
                    };
                    if !table.has_column(&column.column) {
                        return Err(VetError::ColumnNotFound {
                            column: column.column.clone(),
                            table: Some(qualifier.clone()),
                            location: column.location,
                        });
                    }
                }
                None => {
                    if !visible.iter().any(|table| table.has_column(&column.column)) {
                        let table = match visible.as_slice() {
                            [only] => Some(only.name.clone()),
                            _ => None,
                        };
                        return Err(VetError::ColumnNotFound {
                            column: column.column.clone(),
                            table,
                            location: column.location,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
