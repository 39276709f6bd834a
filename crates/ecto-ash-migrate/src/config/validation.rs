//! Configuration validation.

use super::Config;
use crate::catalog::SslMode;
use crate::error::{MigrateError, Result};
use crate::typemap::TargetType;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let db = &config.database;

    if db.url.as_deref().map_or(true, str::is_empty) {
        if db.host.is_empty() {
            return Err(MigrateError::Config(
                "database.host is required (or database.url)".into(),
            ));
        }
        if db.database.is_empty() {
            return Err(MigrateError::Config("database.database is required".into()));
        }
        if db.user.is_empty() {
            return Err(MigrateError::Config("database.user is required".into()));
        }
    }

    if db.schema.is_empty() {
        return Err(MigrateError::Config("database.schema cannot be empty".into()));
    }

    SslMode::parse(&db.ssl_mode)?;

    let gen = &config.generator;
    if gen.namespace.is_empty() {
        return Err(MigrateError::Config(
            "generator.namespace cannot be empty".into(),
        ));
    }
    if !gen
        .namespace
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
    {
        return Err(MigrateError::Config(format!(
            "generator.namespace must be a module name, got '{}'",
            gen.namespace
        )));
    }
    if gen.timestamp_columns.iter().any(String::is_empty) {
        return Err(MigrateError::Config(
            "generator.timestamp_columns entries cannot be empty".into(),
        ));
    }

    for (type_name, tag) in &gen.type_overrides {
        tag.parse::<TargetType>().map_err(|_| {
            MigrateError::Config(format!(
                "generator.type_overrides.{}: unknown target type '{}'",
                type_name, tag
            ))
        })?;
    }

    Ok(())
}
