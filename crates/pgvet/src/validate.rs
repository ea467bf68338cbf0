//! Top-level validation entry points.

use pg_query::protobuf::RawStmt;
use pg_query::NodeEnum;

use crate::ast;
use crate::error::{VetError, VetResult};
use crate::params::Param;
use crate::schema::Schema;
use crate::scope::VetContext;
use crate::stmt;

/// Validate a single SQL statement against `schema`.
///
/// Returns the positional placeholders the statement uses, ascending and
/// de-duplicated. Inputs with zero or more than one statement are rejected.
pub fn validate_query(schema: &Schema, sql: &str) -> VetResult<Vec<Param>> {
    let parsed = pg_query::parse(sql)?;
    let stmts = &parsed.protobuf.stmts;
    if stmts.is_empty() {
        return Err(VetError::EmptyStatement);
    }
    if stmts.len() > 1 {
        return Err(VetError::MultipleStatements);
    }
    validate_raw(schema, &stmts[0])
}

/// Validate a string containing any number of statements.
///
/// Each statement is validated independently against a fresh context; the
/// result holds one placeholder list per statement. The first failing
/// statement aborts the whole call.
pub fn validate_queries(schema: &Schema, sql: &str) -> VetResult<Vec<Vec<Param>>> {
    let parsed = pg_query::parse(sql)?;
    if parsed.protobuf.stmts.is_empty() {
        return Err(VetError::EmptyStatement);
    }
    parsed
        .protobuf
        .stmts
        .iter()
        .map(|raw| validate_raw(schema, raw))
        .collect()
}

fn validate_raw(schema: &Schema, raw: &RawStmt) -> VetResult<Vec<Param>> {
    let Some(kind) = raw.stmt.as_deref().and_then(|node| node.node.as_ref()) else {
        return Err(VetError::InvalidStatementKind);
    };
    tracing::debug!(statement = %ast::kind_name(kind), "validating statement");

    let mut ctx = VetContext::new(schema);
    let (params, _projection) = match kind {
        NodeEnum::SelectStmt(select) => stmt::validate_select(&mut ctx, select)?,
        NodeEnum::InsertStmt(insert) => stmt::validate_insert(&mut ctx, insert)?,
        NodeEnum::UpdateStmt(update) => stmt::validate_update(&mut ctx, update)?,
        NodeEnum::DeleteStmt(delete) => stmt::validate_delete(&mut ctx, delete)?,
        // Schema management and session statements reference no columns to
        // check.
        NodeEnum::DropStmt(_)
        | NodeEnum::TruncateStmt(_)
        | NodeEnum::AlterTableStmt(_)
        | NodeEnum::CreateSchemaStmt(_)
        | NodeEnum::VariableSetStmt(_) => (Vec::new(), Vec::new()),
        other => return Err(VetError::UnsupportedStatement(ast::kind_name(other))),
    };
    Ok(params)
}
