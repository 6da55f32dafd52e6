//! # vsql
//!
//! A compiler from a restricted, dynamically-typed expression language into
//! parameterised Oracle SQL, driven by a data-driven, user-extensible
//! rule-table type system and an auto-joining query builder.
//!
//! ## Pipeline
//!
//! ```text
//! source text --[frontend]--> Ast --[Query]--> "SELECT ... FROM ... WHERE ..."
//! ```
//!
//! - [`frontend::parse`] lexes and parses vSQL source against a [`schema::Group`]
//!   of in-scope variables, producing a validated [`ast::Ast`].
//! - The [`registry::Registry`] holds the rule tables (operators, functions,
//!   methods, attributes) that decide what a node's result type is and how it
//!   renders to SQL; callers extend it with their own rules instead of
//!   patching the compiler.
//! - [`query::Query`] collects `SELECT`/`WHERE`/`ORDER BY` expressions,
//!   auto-registers the joins their field references require, and renders the
//!   final statement.
//!
//! ## Quick start
//!
//! ```rust
//! use std::collections::HashMap;
//! use vsql::datatype::DataType;
//! use vsql::registry::default_backend;
//! use vsql::schema::{Field, Group};
//! use vsql::query::Query;
//!
//! let registry = default_backend().unwrap();
//!
//! let records = Group::table("dat_record");
//! records.insert(Field::new("v_title", DataType::Str, "dat_title"));
//!
//! let mut vars = HashMap::new();
//! vars.insert(
//!     "record".to_string(),
//!     Field::new("record", DataType::Int, "dat_id").with_refgroup(records),
//! );
//!
//! let mut query = Query::new(&registry, vars);
//! query.select(&["record.v_title"]).unwrap();
//! let sql = query.sqlsource("  ");
//! assert!(sql.contains("dat_title"));
//! ```
//!
//! ## Extensibility
//!
//! The type system is a set of rule tables keyed by operand `DataType` tuples,
//! not a hardcoded match. Register a rule for a new type combination on the
//! [`registry::Registry`] rather than branching in the compiler:
//!
//! ```rust
//! use vsql::registry::default_backend;
//! use vsql::op::BinaryOp;
//!
//! let mut registry = default_backend().unwrap();
//! registry
//!     .add_binary_rules(BinaryOp::Add, "COLOR <- COLOR + COLOR", "vsql_color_add({s1}, {s2})")
//!     .unwrap();
//! ```

pub mod ast;
pub mod datatype;
pub mod error;
pub mod frontend;
pub mod op;
pub mod query;
pub mod registry;
pub mod rule;
pub mod schema;
pub mod serialize;

pub use ast::{Ast, ContentToken, NodeKind};
pub use datatype::{CompileError, DataType};
pub use error::{Error, ErrorKind, Result, Span};
pub use query::{Query, SortDirection, SortNulls};
pub use registry::{default_backend, Registry};
pub use rule::Rule;
pub use schema::{Field, Group, GroupBuilder, WILDCARD};
pub use serialize::{serialize, serialize_json, SerializedNode};
