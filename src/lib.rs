//! # relicdb — In-Memory SQL Engine
//!
//! relicdb is a self-contained, in-memory relational database engine.
//! SQL text flows through a lexer and a recursive-descent parser into a
//! typed AST, and an executor evaluates it against tables stored as typed
//! row collections with B-tree secondary indexes.
//!
//! ## Quick Start
//!
//! ```rust
//! use relicdb::Database;
//!
//! # fn main() -> relicdb::RelicResult<()> {
//! let mut db = Database::new();
//!
//! db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")?;
//! db.execute("INSERT INTO users VALUES (1, 'Alice'), (2, 'Bob')")?;
//!
//! let result = db.execute("SELECT name FROM users WHERE id >= 2 ORDER BY name")?;
//! assert_eq!(result.rows.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution Pipeline
//!
//! ```text
//! SQL String → Lexer → Tokens → Parser → AST → Executor → QueryResult
//!                                          │
//!                                          └── Database → Table → B-tree indexes
//! ```
//!
//! ## Module Structure
//! - [`engine`] — database engine ([`Database`])
//! - [`sql`] — lexer, AST, parser, executor
//! - [`storage`] — row store with constraint enforcement
//! - [`index`] — B-tree indexes and the per-table index manager
//! - [`schema`] — table/column metadata and the catalog
//! - [`value`] — value domains, coercion, comparison
//!
//! Supported statements: CREATE TABLE, DROP TABLE, INSERT, SELECT (with
//! joins, WHERE, ORDER BY, LIMIT/OFFSET), UPDATE, DELETE. Predicates use
//! SQL three-valued logic; LIKE is case-insensitive.

pub mod engine;
pub mod error;
pub mod index;
pub mod schema;
pub mod sql;
pub mod storage;
pub mod value;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use engine::Database;
pub use error::{RelicError, RelicResult};
pub use sql::executor::QueryResult;
pub use value::{DataType, Value};
