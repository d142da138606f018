//! Persistence core: schema definitions, statement generation and the
//! narrow gateway trait the state machine talks through.

pub mod mysql;
pub mod schema;
pub mod sql;
pub mod tables;

use async_trait::async_trait;

use crate::error::Result;
use schema::{FieldMap, TableDef};

/// Narrow persistence boundary used by the stores and the ledger.
///
/// Implementations only open a connection and run raw statement text; all
/// statement generation stays in [`sql`]. Two interchangeable
/// implementations exist: the production [`mysql::MySqlGateway`] and the
/// in-memory gateway the test suite supplies.
#[async_trait]
pub trait DbGateway: Send + Sync {
    /// Run a statement that returns no rows.
    ///
    /// A storage-level uniqueness violation must surface as
    /// [`crate::NestPayError::UniqueViolation`] so callers can treat
    /// duplicate inserts as already-processed work.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Run a query and decode each row into a field map typed by `table`.
    async fn rows(&self, sql: &str, table: &TableDef) -> Result<Vec<FieldMap>>;

    /// Escape a text value for embedding in statement text.
    fn escape(&self, value: &str) -> String;

    /// Auto-increment id assigned by the most recent INSERT.
    async fn last_insert_id(&self) -> Result<u64>;
}
