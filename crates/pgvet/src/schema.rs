//! In-memory schema model and the DDL loader.
//!
//! A [`Schema`] maps table names to [`Table`]s; it is built once (usually
//! from `CREATE TABLE` / `CREATE VIEW` statements via [`Schema::from_sql`])
//! and then shared read-only across validations. Views are registered
//! read-only: they can be selected from but never written to.

use std::collections::BTreeMap;

use pg_query::NodeEnum;
use serde::{Deserialize, Serialize};

use crate::ast;
use crate::error::VetResult;

/// A column of a declared table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// SQL type text as written in the DDL (absent for view columns).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
}

/// A declared table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
    /// Read-only relations (views, CTEs, derived tables) cannot be the
    /// target of INSERT, UPDATE, or DELETE.
    #[serde(default)]
    pub read_only: bool,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }
}

/// The declared database schema: table name → table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Build a schema from DDL text.
    ///
    /// `CREATE TABLE` statements contribute tables with typed columns;
    /// `CREATE VIEW` statements contribute read-only tables whose columns
    /// come from the view query's projection. Other statement kinds in the
    /// input are ignored.
    pub fn from_sql(ddl: &str) -> VetResult<Self> {
        let parsed = pg_query::parse(ddl)?;
        let mut tables = BTreeMap::new();

        for raw in &parsed.protobuf.stmts {
            let Some(kind) = raw.stmt.as_deref().and_then(|node| node.node.as_ref()) else {
                continue;
            };
            match kind {
                NodeEnum::CreateStmt(create) => {
                    let Some(relation) = create.relation.as_ref() else {
                        continue;
                    };
                    let mut table = Table {
                        name: relation.relname.clone(),
                        columns: BTreeMap::new(),
                        read_only: false,
                    };
                    for element in &create.table_elts {
                        let Some(NodeEnum::ColumnDef(def)) = element.node.as_ref() else {
                            continue;
                        };
                        let sql_type = def
                            .type_name
                            .as_ref()
                            .map(|type_name| {
                                type_name
                                    .names
                                    .iter()
                                    .filter_map(ast::string_value)
                                    .collect::<Vec<_>>()
                                    .join(".")
                            })
                            .filter(|joined| !joined.is_empty());
                        table.columns.insert(
                            def.colname.clone(),
                            Column {
                                name: def.colname.clone(),
                                sql_type,
                            },
                        );
                    }
                    tracing::debug!(
                        table = %table.name,
                        columns = table.columns.len(),
                        "schema: registered table"
                    );
                    tables.insert(table.name.clone(), table);
                }
                NodeEnum::ViewStmt(view) => {
                    let Some(relation) = view.view.as_ref() else {
                        continue;
                    };
                    let mut table = Table {
                        name: relation.relname.clone(),
                        columns: BTreeMap::new(),
                        read_only: true,
                    };
                    if let Some(NodeEnum::SelectStmt(select)) =
                        view.query.as_deref().and_then(|node| node.node.as_ref())
                    {
                        for item in &select.target_list {
                            let Some(target) = ast::res_target(item) else {
                                continue;
                            };
                            if let Some(name) = ast::projection_name(target) {
                                table
                                    .columns
                                    .insert(name.clone(), Column { name, sql_type: None });
                            }
                        }
                    }
                    tracing::debug!(
                        view = %table.name,
                        columns = table.columns.len(),
                        "schema: registered view"
                    );
                    tables.insert(table.name.clone(), table);
                }
                _ => {}
            }
        }

        Ok(Schema { tables })
    }
}
