//! # pgvet
//!
//! Static validation of PostgreSQL statements against a declared schema.
//!
//! Queries are parsed with `pg_query` (the PostgreSQL server's own parser);
//! every referenced table and column is then checked against a [`Schema`]
//! built from `CREATE TABLE` / `CREATE VIEW` DDL. Validation resolves names
//! through aliases, CTEs, derived tables and LATERAL subqueries, refuses
//! writes to read-only relations, and enforces a couple of safety rules
//! (DELETE requires a column-bearing WHERE clause, INSERT rows must match
//! their column list). A successful validation returns the positional
//! placeholders (`$1`, `$2`, …) the statement binds, ascending and
//! de-duplicated.
//!
//! ```
//! use pgvet::{validate_query, Schema};
//!
//! let schema = Schema::from_sql("CREATE TABLE users (id BIGINT, name TEXT)")?;
//! let params = validate_query(&schema, "SELECT name FROM users WHERE id = $1")?;
//! assert_eq!(params.len(), 1);
//! assert_eq!(params[0].number, 1);
//! # Ok::<(), pgvet::VetError>(())
//! ```
//!
//! The validator is stateless per call: a [`Schema`] is never mutated and
//! may be shared freely across threads.

mod ast;
mod error;
mod expr;
mod params;
mod schema;
mod scope;
mod stmt;
mod validate;

pub use error::{VetError, VetResult};
pub use params::Param;
pub use schema::{Column, Schema, Table};
pub use validate::{validate_queries, validate_query};
