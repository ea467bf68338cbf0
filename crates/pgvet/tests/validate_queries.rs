use pgvet::{validate_queries, validate_query, Param, Schema, VetError};

fn schema() -> Schema {
    Schema::from_sql(
        "CREATE TABLE users (id BIGINT, name TEXT, email TEXT);
         CREATE TABLE posts (id BIGINT, user_id BIGINT, title TEXT);
         CREATE VIEW active_users AS SELECT id, name FROM users;",
    )
    .expect("schema")
}

fn numbers(params: &[Param]) -> Vec<i32> {
    params.iter().map(|p| p.number).collect()
}

#[test]
fn simple_select_with_param() {
    let params = validate_query(&schema(), "SELECT id, name FROM users WHERE id = $1")
        .expect("valid");
    assert_eq!(numbers(&params), vec![1]);
}

#[test]
fn join_with_aliases() {
    let params = validate_query(
        &schema(),
        "SELECT u.id, p.title FROM users u JOIN posts p ON p.user_id = u.id WHERE u.email = $1",
    )
    .expect("valid");
    assert_eq!(numbers(&params), vec![1]);
}

#[test]
fn insert_value_count_mismatch() {
    let err = validate_query(
        &schema(),
        "INSERT INTO users (id, name) VALUES ($1, $2, $3)",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        VetError::ColumnCountMismatch {
            columns: 2,
            values: 3
        }
    ));
}

#[test]
fn insert_matching_values() {
    let params = validate_query(&schema(), "INSERT INTO users (id, name) VALUES ($1, $2)")
        .expect("valid");
    assert_eq!(numbers(&params), vec![1, 2]);
}

#[test]
fn insert_multi_row_values() {
    let params = validate_query(
        &schema(),
        "INSERT INTO users (id, name) VALUES ($1, $2), ($3, $4)",
    )
    .expect("valid");
    assert_eq!(numbers(&params), vec![1, 2, 3, 4]);

    let err = validate_query(
        &schema(),
        "INSERT INTO users (id, name) VALUES ($1, $2), ($3)",
    )
    .unwrap_err();
    assert!(matches!(err, VetError::ColumnCountMismatch { .. }));
}

#[test]
fn update_of_view_is_rejected() {
    let err = validate_query(&schema(), "UPDATE active_users SET name = 'x' WHERE id = 1")
        .unwrap_err();
    assert!(matches!(err, VetError::ReadOnlyTable(name) if name == "active_users"));
}

#[test]
fn select_from_view_is_fine() {
    let params = validate_query(&schema(), "SELECT id, name FROM active_users WHERE id = $1")
        .expect("valid");
    assert_eq!(numbers(&params), vec![1]);
}

#[test]
fn delete_without_where() {
    let err = validate_query(&schema(), "DELETE FROM users").unwrap_err();
    assert!(matches!(err, VetError::MissingWhere));
}

#[test]
fn delete_with_constant_where() {
    let err = validate_query(&schema(), "DELETE FROM users WHERE 1 = 1").unwrap_err();
    assert!(matches!(err, VetError::EmptyWherePredicate));
}

#[test]
fn delete_with_real_predicate() {
    let params = validate_query(&schema(), "DELETE FROM users WHERE id = $1").expect("valid");
    assert_eq!(numbers(&params), vec![1]);
}

#[test]
fn delete_using_brings_tables_into_scope() {
    let params = validate_query(
        &schema(),
        "DELETE FROM posts USING users WHERE posts.user_id = users.id AND users.email = $1",
    )
    .expect("valid");
    assert_eq!(numbers(&params), vec![1]);
}

#[test]
fn cte_resolves_and_contributes_params() {
    let params = validate_query(
        &schema(),
        "WITH recent AS (SELECT id FROM users WHERE id > $1)
         SELECT id FROM recent WHERE id = $2",
    )
    .expect("valid");
    assert_eq!(numbers(&params), vec![1, 2]);
}

#[test]
fn cte_column_is_checked() {
    let err = validate_query(
        &schema(),
        "WITH recent AS (SELECT id FROM users) SELECT name FROM recent",
    )
    .unwrap_err();
    assert!(matches!(err, VetError::ColumnNotFound { .. }));
}

#[test]
fn derived_table_with_aliased_projection() {
    validate_query(&schema(), "SELECT x FROM (SELECT id AS x FROM users) sub").expect("valid");
}

#[test]
fn derived_table_unknown_column() {
    let err = validate_query(&schema(), "SELECT y FROM (SELECT id AS x FROM users) sub")
        .unwrap_err();
    assert!(matches!(err, VetError::ColumnNotFound { .. }));
}

#[test]
fn lateral_subquery_sees_siblings() {
    validate_query(
        &schema(),
        "SELECT u.id FROM users u, LATERAL (SELECT p.id FROM posts p WHERE p.user_id = u.id) q",
    )
    .expect("valid");
}

#[test]
fn non_lateral_subquery_does_not_see_siblings() {
    let err = validate_query(
        &schema(),
        "SELECT u.id FROM users u, (SELECT p.id FROM posts p WHERE p.user_id = u.id) q",
    )
    .unwrap_err();
    assert!(matches!(err, VetError::TableUnavailable { table, .. } if table == "u"));
}

#[test]
fn unqualified_unknown_column_names_single_table() {
    let err = validate_query(&schema(), "SELECT zzz FROM users").unwrap_err();
    match err {
        VetError::ColumnNotFound { column, table, .. } => {
            assert_eq!(column, "zzz");
            assert_eq!(table.as_deref(), Some("users"));
        }
        other => panic!("expected ColumnNotFound, got {other}"),
    }
}

#[test]
fn qualifier_not_in_scope() {
    let err = validate_query(&schema(), "SELECT users.zzz FROM posts").unwrap_err();
    assert!(matches!(err, VetError::TableUnavailable { table, .. } if table == "users"));
}

#[test]
fn unknown_table() {
    let err = validate_query(&schema(), "SELECT id FROM missing").unwrap_err();
    assert!(matches!(err, VetError::InvalidTable(name) if name == "missing"));
}

#[test]
fn params_are_ascending_and_unique() {
    let params = validate_query(
        &schema(),
        "SELECT id FROM users WHERE id = $1 OR id = $3 OR id = $1 OR id = $2",
    )
    .expect("valid");
    assert_eq!(numbers(&params), vec![1, 2, 3]);
}

#[test]
fn subquery_in_where() {
    let params = validate_query(
        &schema(),
        "SELECT name FROM users WHERE id IN (SELECT user_id FROM posts WHERE title = $1)",
    )
    .expect("valid");
    assert_eq!(numbers(&params), vec![1]);
}

#[test]
fn group_having_order_clauses_are_checked() {
    validate_query(
        &schema(),
        "SELECT user_id, count(*) FROM posts GROUP BY user_id HAVING count(*) > 1 ORDER BY user_id",
    )
    .expect("valid");

    let err = validate_query(&schema(), "SELECT id FROM posts ORDER BY zzz").unwrap_err();
    assert!(matches!(err, VetError::ColumnNotFound { .. }));
}

#[test]
fn window_function_columns_are_checked() {
    validate_query(
        &schema(),
        "SELECT rank() OVER (PARTITION BY user_id ORDER BY id) FROM posts",
    )
    .expect("valid");

    let err = validate_query(
        &schema(),
        "SELECT rank() OVER (PARTITION BY zzz) FROM posts",
    )
    .unwrap_err();
    assert!(matches!(err, VetError::ColumnNotFound { .. }));
}

#[test]
fn returning_columns_are_checked() {
    let params = validate_query(
        &schema(),
        "UPDATE users SET name = $1 WHERE id = $2 RETURNING email",
    )
    .expect("valid");
    assert_eq!(numbers(&params), vec![1, 2]);

    let err = validate_query(
        &schema(),
        "DELETE FROM users WHERE id = $1 RETURNING zzz",
    )
    .unwrap_err();
    assert!(matches!(err, VetError::ColumnNotFound { .. }));
}

#[test]
fn repeat_validation_is_deterministic() {
    let schema = schema();
    let sql = "WITH recent AS (SELECT id FROM users WHERE id > $2)
               SELECT id FROM recent WHERE id = $1";
    let first = validate_query(&schema, sql).expect("valid");
    let second = validate_query(&schema, sql).expect("valid");
    assert_eq!(first, second);
    assert_eq!(numbers(&first), vec![1, 2]);
}

#[test]
fn schema_is_not_mutated() {
    let schema = schema();
    let snapshot = schema.clone();
    let _ = validate_query(
        &schema,
        "WITH recent AS (SELECT id FROM users) SELECT id FROM recent",
    );
    let _ = validate_query(&schema, "SELECT zzz FROM users");
    assert_eq!(schema, snapshot);
}

#[test]
fn multi_statement_entry_points() {
    let schema = schema();
    let err = validate_query(&schema, "SELECT id FROM users; SELECT id FROM posts").unwrap_err();
    assert!(matches!(err, VetError::MultipleStatements));

    let all = validate_queries(
        &schema,
        "SELECT id FROM users WHERE id = $1; DELETE FROM posts WHERE id = $1",
    )
    .expect("valid");
    assert_eq!(all.len(), 2);
    assert_eq!(numbers(&all[0]), vec![1]);
    assert_eq!(numbers(&all[1]), vec![1]);
}

#[test]
fn error_location_points_into_query() {
    let sql = "SELECT users.zzz FROM posts";
    let err = validate_query(&schema(), sql).unwrap_err();
    let location = err.location().expect("location") as usize;
    assert_eq!(&sql[location..location + 5], "users");
}
