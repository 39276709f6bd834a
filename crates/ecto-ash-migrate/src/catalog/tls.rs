//! TLS setup for the catalog connection.

use std::sync::Arc;

use rustls::ClientConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{info, warn};

use crate::error::{MigrateError, Result};

/// SSL modes accepted in `database.ssl_mode`.
///
/// rustls always verifies the server certificate, so `require` and
/// `verify-full` both validate against the bundled web PKI roots; they
/// differ only in how loudly a plaintext fallback is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Plain TCP connection.
    #[default]
    Disable,
    /// TLS with certificate verification.
    Require,
    /// TLS with certificate and hostname verification.
    VerifyFull,
}

impl SslMode {
    /// Parse an SSL mode from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "disable" | "" => Ok(SslMode::Disable),
            "require" => Ok(SslMode::Require),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(MigrateError::Config(format!(
                "Invalid ssl_mode '{}'. Valid values: disable, require, verify-full",
                other
            ))),
        }
    }

    /// Check if this mode requires TLS.
    pub fn requires_tls(&self) -> bool {
        !matches!(self, SslMode::Disable)
    }

    /// Build a connector for deadpool-postgres. Returns None if TLS is disabled.
    pub fn connector(&self) -> Result<Option<MakeRustlsConnect>> {
        match self {
            SslMode::Disable => {
                warn!("Catalog TLS is disabled. Credentials will be transmitted in plaintext.");
                Ok(None)
            }
            SslMode::Require | SslMode::VerifyFull => {
                info!("Catalog TLS enabled with certificate verification");
                Ok(Some(MakeRustlsConnect::new(client_config()?)))
            }
        }
    }
}

fn client_config() -> Result<ClientConfig> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| MigrateError::Config(format!("TLS setup failed: {}", e)))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(config)
}
