//! # ecto-ash-migrate
//!
//! Generate Ash resource definitions from a live PostgreSQL catalog, with
//! hints mined from the legacy Ecto schema module.
//!
//! The catalog is authoritative: columns, keys, unique constraints, enum
//! labels and foreign-key edges all come from it. The legacy schema only
//! contributes relationship names and associations the catalog cannot see
//! (`has_one`, `many_to_many`), which are emitted as commented directives.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ecto_ash_migrate::{Config, Generator, PgCatalog};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> ecto_ash_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let catalog = PgCatalog::connect(&config.database).await?;
//!     let generator = Generator::new(catalog, config)?;
//!     let generation = generator
//!         .generate("orders", Some(Path::new("lib/shop/order.ex")))
//!         .await?;
//!     generation.write().await?;
//!     println!("{}", generation.summary.to_json()?);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod legacy;
pub mod naming;
pub mod reconcile;
pub mod synth;
pub mod typemap;

// Re-exports for convenient access
pub use catalog::{CatalogModel, CatalogSource, PgCatalog};
pub use config::{Config, DatabaseConfig, GeneratorConfig};
pub use diagnostics::Diagnostic;
pub use error::{MigrateError, Result};
pub use generator::{Generation, GenerationSummary, Generator};
pub use legacy::LegacyModel;
pub use reconcile::MergedRelationship;
pub use synth::ResourceDefinition;
pub use typemap::{TargetType, TypeMap};
