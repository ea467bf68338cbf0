//! Query traversal: expression walking and FROM-clause gathering.
//!
//! [`walk_expr`] records column uses and placeholders from an expression
//! tree; [`walk_from_item`] gathers the tables a FROM item brings into
//! scope. Derived tables (`FROM (SELECT …) AS alias`) are not validated on
//! sight: they are queued on the accumulator and run by [`run_postponed`]
//! once the whole FROM list is known, so LATERAL subqueries can resolve
//! against their preceding siblings.

use pg_query::protobuf::{Node, SelectStmt};
use pg_query::NodeEnum;

use crate::ast::{self, ColumnUse, TableRef};
use crate::error::{VetError, VetResult};
use crate::params::{self, Param};
use crate::scope::VetContext;
use crate::stmt;

/// Everything gathered while traversing one query level.
#[derive(Default)]
pub(crate) struct Gathered<'a> {
    pub columns: Vec<ColumnUse>,
    pub tables: Vec<TableRef>,
    pub params: Vec<Param>,
    pub postponed: Vec<DerivedTable<'a>>,
}

/// A FROM-clause subquery whose validation is deferred until the enclosing
/// FROM list has been fully gathered.
pub(crate) struct DerivedTable<'a> {
    pub subquery: &'a SelectStmt,
    pub alias: String,
    pub lateral: bool,
    /// Tables introduced by the preceding FROM items at the same level.
    pub siblings: Vec<TableRef>,
}

/// Walk an expression tree, recording column uses and placeholders.
///
/// Traversal is iterative so long operator and boolean chains cannot grow
/// the call stack; only nested sub-SELECTs recurse. Children are pushed in
/// reverse, keeping the visit order left-to-right. Node kinds outside the
/// recognized set are skipped.
pub(crate) fn walk_expr<'a>(
    ctx: &VetContext,
    root: &'a Node,
    out: &mut Gathered<'a>,
) -> VetResult<()> {
    let mut pending: Vec<&'a Node> = vec![root];

    while let Some(node) = pending.pop() {
        let Some(kind) = node.node.as_ref() else {
            continue;
        };
        match kind {
            NodeEnum::AExpr(expr) => {
                if let Some(rexpr) = expr.rexpr.as_deref() {
                    pending.push(rexpr);
                }
                if let Some(lexpr) = expr.lexpr.as_deref() {
                    pending.push(lexpr);
                }
            }
            NodeEnum::BoolExpr(expr) => pending.extend(expr.args.iter().rev()),
            NodeEnum::NullTest(test) => {
                if let Some(arg) = test.arg.as_deref() {
                    pending.push(arg);
                }
            }
            NodeEnum::TypeCast(cast) => {
                if let Some(arg) = cast.arg.as_deref() {
                    pending.push(arg);
                }
            }
            NodeEnum::CoalesceExpr(expr) => pending.extend(expr.args.iter().rev()),
            NodeEnum::List(list) => pending.extend(list.items.iter().rev()),
            NodeEnum::ColumnRef(column_ref) => {
                if let Some(column) = ast::column_ref_to_use(column_ref) {
                    out.columns.push(column);
                }
            }
            NodeEnum::ParamRef(param) => params::add_param(
                &mut out.params,
                Param {
                    number: param.number,
                },
            ),
            NodeEnum::AConst(_) => {}
            NodeEnum::FuncCall(func) => {
                if let Some(window) = &func.over {
                    pending.extend(window.order_clause.iter().rev());
                    pending.extend(window.partition_clause.iter().rev());
                }
                pending.extend(func.args.iter().rev());
            }
            NodeEnum::WindowDef(window) => {
                pending.extend(window.order_clause.iter().rev());
                pending.extend(window.partition_clause.iter().rev());
            }
            NodeEnum::SortBy(sort) => {
                if let Some(inner) = sort.node.as_deref() {
                    pending.push(inner);
                }
            }
            NodeEnum::SubLink(link) => {
                let select = subselect_stmt(link.subselect.as_deref())?;
                let mut sub_ctx = ctx.nested(&[]);
                let (sub_params, _projection) = stmt::validate_select(&mut sub_ctx, select)?;
                params::merge_params(&mut out.params, sub_params);
            }
            NodeEnum::JoinExpr(_) | NodeEnum::RangeVar(_) | NodeEnum::RangeSubselect(_) => {
                walk_from_item(ctx, node, out)?;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Gather one FROM item: base tables, join trees, derived subqueries.
pub(crate) fn walk_from_item<'a>(
    ctx: &VetContext,
    node: &'a Node,
    out: &mut Gathered<'a>,
) -> VetResult<()> {
    let Some(kind) = node.node.as_ref() else {
        return Ok(());
    };
    match kind {
        NodeEnum::RangeVar(range_var) => out.tables.push(ast::range_var_to_table(range_var)),
        NodeEnum::JoinExpr(join) => {
            if let Some(larg) = join.larg.as_deref() {
                walk_from_item(ctx, larg, out)?;
            }
            if let Some(rarg) = join.rarg.as_deref() {
                walk_from_item(ctx, rarg, out)?;
            }
            if let Some(quals) = join.quals.as_deref() {
                walk_expr(ctx, quals, out)?;
            }
        }
        NodeEnum::RangeSubselect(subselect) => {
            let select = subselect_stmt(subselect.subquery.as_deref())?;
            let alias = subselect
                .alias
                .as_ref()
                .map(|alias| alias.aliasname.clone())
                .unwrap_or_default();
            out.postponed.push(DerivedTable {
                subquery: select,
                alias: alias.clone(),
                lateral: subselect.lateral,
                siblings: out.tables.clone(),
            });
            // The alias is visible to later siblings and to the enclosing
            // statement right away; its columns arrive when the postponed
            // validation runs.
            if !alias.is_empty() {
                out.tables.push(TableRef { name: alias, alias: None });
            }
        }
        _ => {}
    }
    Ok(())
}

/// Validate the derived tables recorded while gathering a FROM list, in
/// FROM order. A LATERAL subquery sees the sibling tables gathered before
/// it; a plain subquery sees only the enclosing levels.
pub(crate) fn run_postponed(ctx: &mut VetContext, out: &mut Gathered<'_>) -> VetResult<()> {
    let postponed = std::mem::take(&mut out.postponed);
    for derived in postponed {
        let mut sub_ctx = if derived.lateral {
            ctx.nested(&derived.siblings)
        } else {
            ctx.nested(&[])
        };
        let (sub_params, projection) = stmt::validate_select(&mut sub_ctx, derived.subquery)?;
        params::merge_params(&mut out.params, sub_params);
        if !derived.alias.is_empty() {
            ctx.register_derived(&derived.alias, projection);
        }
    }
    Ok(())
}

fn subselect_stmt(node: Option<&Node>) -> VetResult<&SelectStmt> {
    match node.and_then(|n| n.node.as_ref()) {
        Some(NodeEnum::SelectStmt(select)) => Ok(select),
        Some(other) => Err(VetError::InvalidSubexpression(format!(
            "unsupported subquery kind: {}",
            ast::kind_name(other)
        ))),
        None => Err(VetError::InvalidSubexpression(
            "subquery without a SELECT body".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn schema() -> Schema {
        Schema::from_sql(
            "CREATE TABLE users (id BIGINT, name TEXT, email TEXT);
             CREATE TABLE posts (id BIGINT, user_id BIGINT, title TEXT);",
        )
        .expect("schema")
    }

    fn where_clause(sql: &str) -> Node {
        let parsed = pg_query::parse(sql).expect("parse SQL");
        let node = parsed.protobuf.stmts[0]
            .stmt
            .as_deref()
            .and_then(|n| n.node.as_ref())
            .expect("statement");
        let NodeEnum::SelectStmt(select) = node else {
            panic!("expected SELECT");
        };
        select
            .where_clause
            .as_deref()
            .expect("WHERE clause")
            .clone()
    }

    #[test]
    fn test_walk_expr_collects_columns_and_params() {
        let schema = schema();
        let ctx = VetContext::new(&schema);
        let clause = where_clause(
            "SELECT 1 FROM users WHERE id = $2 AND name = $1 OR email IN ('a', 'b')",
        );

        let mut out = Gathered::default();
        walk_expr(&ctx, &clause, &mut out).expect("walk");

        let columns: Vec<&str> = out.columns.iter().map(|c| c.column.as_str()).collect();
        assert_eq!(columns, vec!["id", "name", "email"]);
        let numbers: Vec<i32> = out.params.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_walk_expr_handles_functions_and_casts() {
        let schema = schema();
        let ctx = VetContext::new(&schema);
        let clause = where_clause(
            "SELECT 1 FROM users WHERE lower(name) = 'x'::text AND email IS NOT NULL",
        );

        let mut out = Gathered::default();
        walk_expr(&ctx, &clause, &mut out).expect("walk");

        let columns: Vec<&str> = out.columns.iter().map(|c| c.column.as_str()).collect();
        assert_eq!(columns, vec!["name", "email"]);
    }

    #[test]
    fn test_walk_expr_survives_deep_boolean_chains() {
        let schema = schema();
        let ctx = VetContext::new(&schema);

        let mut sql = String::from("SELECT 1 FROM users WHERE id = 0");
        for n in 0..20_000 {
            sql.push_str(&format!(" OR id = {n}"));
        }
        let clause = where_clause(&sql);

        let mut out = Gathered::default();
        walk_expr(&ctx, &clause, &mut out).expect("walk");
        assert!(!out.columns.is_empty());
    }

    #[test]
    fn test_walk_from_item_join_tree() {
        let schema = schema();
        let ctx = VetContext::new(&schema);
        let parsed =
            pg_query::parse("SELECT 1 FROM users u JOIN posts p ON p.user_id = u.id").expect("sql");
        let node = parsed.protobuf.stmts[0]
            .stmt
            .as_deref()
            .and_then(|n| n.node.as_ref())
            .expect("statement");
        let NodeEnum::SelectStmt(select) = node else {
            panic!("expected SELECT");
        };

        let mut out = Gathered::default();
        for item in &select.from_clause {
            walk_from_item(&ctx, item, &mut out).expect("walk");
        }

        let names: Vec<&str> = out.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "posts"]);
        // Join condition columns were gathered too.
        assert_eq!(out.columns.len(), 2);
    }
}
