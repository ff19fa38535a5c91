//! File-backed SQLite session management.
//!
//! # Intention
//!
//! - Own exactly one SQLite connection per [`Session`] and serialize every
//!   operation on it behind a single lock.
//! - Track the connection lifecycle through [`SessionState`].
//! - Build `CREATE TABLE` statements from a small column DSL
//!   ([`ColumnType`], [`ColumnModifier`], [`ColumnSpec`]).
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/session code belongs here.
//! - No pooling, no transactions, no parameter binding on the public surface.
//! - Host lifecycles talk to the session through [`BaseDb`] or [`Lifecycle`].

pub mod error;
pub mod query;
pub mod schema;
pub mod service;
pub mod session;
pub mod sql;
pub mod state;
pub mod value;

pub use error::{Error, Result};
pub use query::{Query, QueryOperator};
pub use schema::{ColumnModifier, ColumnSpec, ColumnType, Schema, TableDefinition};
pub use service::{Lifecycle, SqliteConfig, SqliteService};
pub use session::{BaseDb, Session};
pub use state::SessionState;
pub use value::{Cursor, Row, Value};
