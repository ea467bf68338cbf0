//! Per-statement validation: SELECT, INSERT, UPDATE, DELETE.
//!
//! Each validator gathers the tables and column uses of its statement into
//! one [`Gathered`], runs any postponed derived-table validations, and
//! finishes by resolving every column against the visible scope. Validators
//! return the statement's placeholders together with the column names it
//! projects (the SELECT target list, or the RETURNING list for writes) so
//! CTE and derived-table registration can reuse them.

use pg_query::protobuf::{DeleteStmt, InsertStmt, Node, SelectStmt, UpdateStmt};
use pg_query::NodeEnum;

use crate::ast::{self, ColumnUse};
use crate::error::{VetError, VetResult};
use crate::expr::{self, Gathered};
use crate::params::{self, Param};
use crate::scope::VetContext;

/// Validate any DML node. Used for CTE bodies, which may be statements of
/// any of the four kinds.
pub(crate) fn validate_node(
    ctx: &mut VetContext,
    node: &Node,
) -> VetResult<(Vec<Param>, Vec<String>)> {
    match node.node.as_ref() {
        Some(NodeEnum::SelectStmt(select)) => validate_select(ctx, select),
        Some(NodeEnum::InsertStmt(insert)) => validate_insert(ctx, insert),
        Some(NodeEnum::UpdateStmt(update)) => validate_update(ctx, update),
        Some(NodeEnum::DeleteStmt(delete)) => validate_delete(ctx, delete),
        Some(other) => Err(VetError::UnsupportedStatement(ast::kind_name(other))),
        None => Err(VetError::InvalidStatementKind),
    }
}

pub(crate) fn validate_select(
    ctx: &mut VetContext,
    stmt: &SelectStmt,
) -> VetResult<(Vec<Param>, Vec<String>)> {
    // Set operations (UNION/INTERSECT/EXCEPT): each branch is its own
    // scope; the output columns are the left branch's projection. The outer
    // ORDER BY names output columns, not table columns, so it is not
    // resolved here.
    if let (Some(left), Some(right)) = (stmt.larg.as_deref(), stmt.rarg.as_deref()) {
        let mut set_params = Vec::new();
        if let Some(with) = &stmt.with_clause {
            process_ctes(ctx, &with.ctes, &mut set_params)?;
        }
        let (left_params, projection) = validate_select(&mut ctx.nested(&[]), left)?;
        let (right_params, _) = validate_select(&mut ctx.nested(&[]), right)?;
        params::merge_params(&mut set_params, left_params);
        params::merge_params(&mut set_params, right_params);
        return Ok((set_params, projection));
    }

    let mut out = Gathered::default();

    if let Some(with) = &stmt.with_clause {
        process_ctes(ctx, &with.ctes, &mut out.params)?;
    }

    for item in &stmt.from_clause {
        expr::walk_from_item(ctx, item, &mut out)?;
    }

    let mut projection = Vec::new();
    for item in &stmt.target_list {
        let Some(target) = ast::res_target(item) else {
            continue;
        };
        if let Some(name) = ast::projection_name(target) {
            projection.push(name);
        }
        if let Some(val) = target.val.as_deref() {
            expr::walk_expr(ctx, val, &mut out)?;
        }
    }

    if let Some(where_clause) = stmt.where_clause.as_deref() {
        expr::walk_expr(ctx, where_clause, &mut out)
            .map_err(|e| VetError::context("invalid WHERE clause", e))?;
    }
    for item in &stmt.group_clause {
        expr::walk_expr(ctx, item, &mut out)?;
    }
    if let Some(having) = stmt.having_clause.as_deref() {
        expr::walk_expr(ctx, having, &mut out)?;
    }
    if let Some(window) = stmt.window_clause.first() {
        expr::walk_expr(ctx, window, &mut out)?;
    }
    for item in &stmt.sort_clause {
        expr::walk_expr(ctx, item, &mut out)?;
    }

    expr::run_postponed(ctx, &mut out)?;

    ctx.resolve_columns(&out.tables, &out.columns)?;
    Ok((out.params, projection))
}

pub(crate) fn validate_insert(
    ctx: &mut VetContext,
    stmt: &InsertStmt,
) -> VetResult<(Vec<Param>, Vec<String>)> {
    let mut out = Gathered::default();

    if let Some(with) = &stmt.with_clause {
        process_ctes(ctx, &with.ctes, &mut out.params)?;
    }

    let Some(relation) = stmt.relation.as_ref() else {
        return Err(VetError::InvalidStatementKind);
    };
    let target = ast::range_var_to_table(relation);
    ctx.validate_table(&target.name, true)?;

    let mut target_columns: Vec<ColumnUse> = Vec::new();
    for item in &stmt.cols {
        let Some(col) = ast::res_target(item) else {
            continue;
        };
        if col.name.is_empty() {
            continue;
        }
        target_columns.push(ColumnUse {
            column: col.name.clone(),
            table: Some(target.name.clone()),
            location: col.location,
        });
    }
    out.columns.extend(target_columns.iter().cloned());
    out.tables.push(target);

    if let Some(source) = stmt.select_stmt.as_deref() {
        let select = match source.node.as_ref() {
            Some(NodeEnum::SelectStmt(select)) => select,
            Some(other) => {
                return Err(VetError::InvalidSubexpression(format!(
                    "unsupported INSERT source: {}",
                    ast::kind_name(other)
                )))
            }
            None => {
                return Err(VetError::InvalidSubexpression(
                    "INSERT source without a body".to_string(),
                ))
            }
        };

        if !select.values_lists.is_empty() {
            for row in &select.values_lists {
                let Some(NodeEnum::List(list)) = row.node.as_ref() else {
                    return Err(VetError::InvalidSubexpression(
                        "INSERT values row is not a list".to_string(),
                    ));
                };
                if list.items.len() != target_columns.len() {
                    return Err(VetError::ColumnCountMismatch {
                        columns: target_columns.len(),
                        values: list.items.len(),
                    });
                }
                for value in &list.items {
                    expr::walk_expr(ctx, value, &mut out)
                        .map_err(|e| VetError::context("invalid value list", e))?;
                }
            }
        } else {
            // INSERT INTO … SELECT …
            for item in &select.from_clause {
                expr::walk_from_item(ctx, item, &mut out)?;
            }
            if let Some(where_clause) = select.where_clause.as_deref() {
                expr::walk_expr(ctx, where_clause, &mut out)
                    .map_err(|e| VetError::context("invalid WHERE clause", e))?;
            }
            for item in &select.target_list {
                let Some(source_target) = ast::res_target(item) else {
                    continue;
                };
                if let Some(val) = source_target.val.as_deref() {
                    expr::walk_expr(ctx, val, &mut out)
                        .map_err(|e| VetError::context("invalid SELECT query in value list", e))?;
                }
            }
        }
    }

    let projection = process_returning(&stmt.returning_list, &mut out);
    expr::run_postponed(ctx, &mut out)?;
    ctx.resolve_columns(&out.tables, &out.columns)?;
    Ok((out.params, projection))
}

pub(crate) fn validate_update(
    ctx: &mut VetContext,
    stmt: &UpdateStmt,
) -> VetResult<(Vec<Param>, Vec<String>)> {
    let mut out = Gathered::default();

    if let Some(with) = &stmt.with_clause {
        process_ctes(ctx, &with.ctes, &mut out.params)?;
    }

    let Some(relation) = stmt.relation.as_ref() else {
        return Err(VetError::InvalidStatementKind);
    };
    let target = ast::range_var_to_table(relation);
    ctx.validate_table(&target.name, true)?;
    out.tables.push(target.clone());

    for item in &stmt.target_list {
        let Some(set_target) = ast::res_target(item) else {
            continue;
        };
        if !set_target.name.is_empty() {
            out.columns.push(ColumnUse {
                column: set_target.name.clone(),
                table: Some(target.name.clone()),
                location: set_target.location,
            });
        }
        // UPDATE t SET a = b FROM u — a column value reads from the row,
        // a placeholder value binds a parameter.
        match set_target.val.as_deref().and_then(|val| val.node.as_ref()) {
            Some(NodeEnum::ColumnRef(column_ref)) => {
                if let Some(column) = ast::column_ref_to_use(column_ref) {
                    out.columns.push(column);
                }
            }
            Some(NodeEnum::ParamRef(param)) => params::add_param(
                &mut out.params,
                Param {
                    number: param.number,
                },
            ),
            _ => {}
        }
    }

    for item in &stmt.from_clause {
        expr::walk_from_item(ctx, item, &mut out)?;
    }

    if let Some(where_clause) = stmt.where_clause.as_deref() {
        expr::walk_expr(ctx, where_clause, &mut out)
            .map_err(|e| VetError::context("invalid WHERE clause", e))?;
    }

    let projection = process_returning(&stmt.returning_list, &mut out);
    expr::run_postponed(ctx, &mut out)?;
    ctx.resolve_columns(&out.tables, &out.columns)?;
    Ok((out.params, projection))
}

pub(crate) fn validate_delete(
    ctx: &mut VetContext,
    stmt: &DeleteStmt,
) -> VetResult<(Vec<Param>, Vec<String>)> {
    let mut out = Gathered::default();

    if let Some(with) = &stmt.with_clause {
        process_ctes(ctx, &with.ctes, &mut out.params)?;
    }

    let Some(relation) = stmt.relation.as_ref() else {
        return Err(VetError::InvalidStatementKind);
    };
    let target = ast::range_var_to_table(relation);
    ctx.validate_table(&target.name, true)?;
    out.tables.push(target);

    // A DELETE must be narrowed by a predicate over actual columns;
    // `DELETE FROM t` and `DELETE FROM t WHERE true` are both rejected.
    let Some(where_clause) = stmt.where_clause.as_deref() else {
        return Err(VetError::MissingWhere);
    };
    expr::walk_expr(ctx, where_clause, &mut out)
        .map_err(|e| VetError::context("invalid WHERE clause", e))?;
    if out.columns.is_empty() {
        return Err(VetError::EmptyWherePredicate);
    }

    for item in &stmt.using_clause {
        expr::walk_from_item(ctx, item, &mut out)?;
    }

    let projection = process_returning(&stmt.returning_list, &mut out);
    expr::run_postponed(ctx, &mut out)?;
    ctx.resolve_columns(&out.tables, &out.columns)?;
    Ok((out.params, projection))
}

/// Validate each CTE and register it as a read-only inner table carrying its
/// projected columns. Placeholders inside CTE bodies belong to the
/// enclosing statement's parameter list.
fn process_ctes(ctx: &mut VetContext, ctes: &[Node], out_params: &mut Vec<Param>) -> VetResult<()> {
    for item in ctes {
        let Some(NodeEnum::CommonTableExpr(cte)) = item.node.as_ref() else {
            continue;
        };
        let Some(query) = cte.ctequery.as_deref() else {
            continue;
        };

        let mut cte_ctx = ctx.nested(&[]);
        let (cte_params, mut projection) = validate_node(&mut cte_ctx, query)?;
        params::merge_params(out_params, cte_params);

        // An explicit column list on the CTE overrides the projection's
        // names: WITH x(a, b) AS (...).
        let alias_names: Vec<String> = cte
            .aliascolnames
            .iter()
            .filter_map(|name| ast::string_value(name).map(str::to_string))
            .collect();
        if !alias_names.is_empty() {
            projection = alias_names;
        }

        ctx.register_derived(&cte.ctename, projection);
    }
    Ok(())
}

/// RETURNING entries: record referenced columns and report the projected
/// names for callers registering this statement as a CTE.
fn process_returning(list: &[Node], out: &mut Gathered<'_>) -> Vec<String> {
    let mut projection = Vec::new();
    for item in list {
        let Some(target) = ast::res_target(item) else {
            continue;
        };
        if let Some(name) = ast::projection_name(target) {
            projection.push(name);
        }
        if let Some(NodeEnum::ColumnRef(column_ref)) =
            target.val.as_deref().and_then(|val| val.node.as_ref())
        {
            if let Some(column) = ast::column_ref_to_use(column_ref) {
                out.columns.push(column);
            }
        }
    }
    projection
}
