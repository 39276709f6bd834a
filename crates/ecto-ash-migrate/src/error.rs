//! Error types for resource generation.
//!
//! Only catalog-layer failures (and I/O around the artifact itself) surface
//! as errors. Everything that merely lowers the fidelity of one field or
//! section is reported as a [`Diagnostic`](crate::diagnostics::Diagnostic).

use thiserror::Error;

/// Exit code for configuration problems (bad YAML, missing connection details).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when the catalog could not be reached or queried.
pub const EXIT_CATALOG_ERROR: u8 = 2;
/// Exit code when the requested table does not exist in the catalog.
pub const EXIT_TABLE_NOT_FOUND: u8 = 3;
/// Exit code for file system failures.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for generation runs.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog connection or query error
    #[error("Catalog unavailable: {0}")]
    Catalog(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// The catalog returned no columns for the requested table
    #[error("Table {schema}.{table} not found in catalog")]
    TableNotFound { schema: String, table: String },

    /// IO error (config file, artifact output)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => {
                EXIT_CONFIG_ERROR
            }
            MigrateError::Catalog(_) | MigrateError::Pool { .. } => EXIT_CATALOG_ERROR,
            MigrateError::TableNotFound { .. } => EXIT_TABLE_NOT_FOUND,
            MigrateError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            MigrateError::pool("refused", "connecting").exit_code(),
            EXIT_CATALOG_ERROR
        );
        assert_eq!(
            MigrateError::TableNotFound {
                schema: "public".into(),
                table: "nope".into()
            }
            .exit_code(),
            EXIT_TABLE_NOT_FOUND
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(MigrateError::from(io).exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = MigrateError::from(io);
        let text = err.format_detailed();
        assert!(text.starts_with("Error: IO error: denied"));
    }
}
