//! Typed helpers over the parser's AST.
//!
//! The parse tree is a forest of `Node` wrappers whose single meaningful
//! field is the tagged [`NodeEnum`]; the helpers here unwrap that tagging and
//! convert the handful of node shapes the validator cares about into its own
//! vocabulary. Everything is total: a partial or unexpected node degrades to
//! an empty result instead of failing, and callers skip node kinds they do
//! not recognize.

use pg_query::protobuf::{ColumnRef, Node, RangeVar, ResTarget};
use pg_query::NodeEnum;

/// A table brought into scope by a query, under its real name and an
/// optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

/// A column referenced by a query, with the qualifier text exactly as it
/// appeared (an alias, a real table name, or nothing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnUse {
    pub column: String,
    pub table: Option<String>,
    /// Byte offset into the query string, for diagnostics.
    pub location: i32,
}

/// Discriminator name of a node kind, for diagnostics.
pub(crate) fn kind_name(kind: &NodeEnum) -> String {
    let debug = format!("{kind:?}");
    debug
        .split(['(', ' ', '{'])
        .next()
        .unwrap_or("Unknown")
        .to_string()
}

/// The string payload of a `String` node, if that is what the node holds.
pub(crate) fn string_value(node: &Node) -> Option<&str> {
    match node.node.as_ref()? {
        NodeEnum::String(s) => Some(s.sval.as_str()),
        _ => None,
    }
}

/// The `ResTarget` body of a target-list entry, if the entry is one.
pub(crate) fn res_target(node: &Node) -> Option<&ResTarget> {
    match node.node.as_ref()? {
        NodeEnum::ResTarget(target) => Some(target),
        _ => None,
    }
}

pub(crate) fn range_var_to_table(range_var: &RangeVar) -> TableRef {
    TableRef {
        name: range_var.relname.clone(),
        alias: range_var
            .alias
            .as_ref()
            .map(|alias| alias.aliasname.clone())
            .filter(|alias| !alias.is_empty()),
    }
}

/// Convert a `ColumnRef` into a [`ColumnUse`].
///
/// One name part is a bare column, two parts are `table.column`. A wildcard
/// part (`*`, `t.*`) names no particular column and yields `None`.
pub(crate) fn column_ref_to_use(column_ref: &ColumnRef) -> Option<ColumnUse> {
    let mut parts: Vec<&str> = Vec::new();
    for field in &column_ref.fields {
        match field.node.as_ref() {
            Some(NodeEnum::String(s)) => parts.push(s.sval.as_str()),
            Some(NodeEnum::AStar(_)) => return None,
            _ => {}
        }
    }

    let (table, column) = match parts.as_slice() {
        [] => return None,
        [column] => (None, *column),
        [table, column, ..] => (Some((*table).to_string()), *column),
    };

    Some(ColumnUse {
        column: column.to_string(),
        table,
        location: column_ref.location,
    })
}

/// The column name one projection entry contributes: the explicit alias when
/// present, else the referenced column's name, else the called function's
/// name. Entries that name nothing stable (`*`, literals, expressions) yield
/// `None`.
pub(crate) fn projection_name(target: &ResTarget) -> Option<String> {
    if !target.name.is_empty() {
        return Some(target.name.clone());
    }

    match target.val.as_deref().and_then(|val| val.node.as_ref()) {
        Some(NodeEnum::ColumnRef(column_ref)) => {
            let last = column_ref.fields.last()?;
            string_value(last).map(str::to_string)
        }
        Some(NodeEnum::FuncCall(func)) => {
            let last = func.funcname.last()?;
            string_value(last).map(str::to_string)
        }
        _ => None,
    }
}
