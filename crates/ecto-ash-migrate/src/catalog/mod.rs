//! Catalog Reader: authoritative table facts from the live database.
//!
//! [`CatalogSource`] is the seam between the generator and the database.
//! [`PgCatalog`] implements it against PostgreSQL; tests substitute an
//! in-memory source.

mod postgres;
mod tls;
mod types;

pub use postgres::PgCatalog;
pub use tls::SslMode;
pub use types::{
    merge_unique_sources, CatalogModel, Column, EnumColumn, ForeignKeyConstraint,
    ReverseForeignKey, UniqueConstraint, UniqueOrigin,
};

use crate::error::Result;
use async_trait::async_trait;

/// Read-only access to catalog metadata for one table at a time.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Read columns, keys, constraints, enums and relationship edges for a table.
    ///
    /// Fails with a catalog error when the connection or a query fails, and
    /// with `TableNotFound` when the table has no columns.
    async fn read_table(&self, schema: &str, table: &str) -> Result<CatalogModel>;

    /// Get the database type identifier (e.g., "postgres").
    fn db_type(&self) -> &str;
}
