//! Legacy Schema Miner: best-effort facts from an Ecto schema module.
//!
//! The legacy source is advisory. Every failure here degrades to an empty
//! [`LegacyModel`] plus a diagnostic; nothing in this module returns an error.

mod lexer;
mod miner;
mod model;

pub use miner::mine;
pub use model::{
    Association, AssociationKind, LegacyModel, MutationFunction, ValidationDirective,
    VirtualField,
};

use std::path::Path;
use tracing::{debug, warn};

use crate::diagnostics::Diagnostic;

/// Outcome of reading the optional legacy schema file.
#[derive(Debug, Clone, Default)]
pub struct LegacyLoad {
    pub model: LegacyModel,
    pub diagnostics: Vec<Diagnostic>,

    /// Whether a legacy path was given at all.
    pub supplied: bool,
}

/// Read and mine the legacy schema at `path`, if any.
pub async fn load(path: Option<&Path>) -> LegacyLoad {
    let Some(path) = path else {
        return LegacyLoad::default();
    };
    let shown = path.display().to_string();

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Legacy schema {} unavailable: {}", shown, e);
            return degraded(Diagnostic::LegacyUnavailable {
                path: shown,
                reason: e.to_string(),
            });
        }
    };

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!("Legacy schema {} is not valid UTF-8", shown);
            return degraded(Diagnostic::LegacyUnavailable {
                path: shown,
                reason: format!("not valid UTF-8: {}", e.utf8_error()),
            });
        }
    };

    let model = mine(&text);
    if model.is_empty() {
        warn!("No schema declarations found in {}", shown);
        return degraded(Diagnostic::LegacyEmpty { path: shown });
    }

    debug!(
        "Mined {} associations, {} validations, {} changeset functions from {}",
        model.associations.len(),
        model.validations.len(),
        model.mutation_functions.len(),
        shown
    );

    LegacyLoad {
        model,
        diagnostics: Vec::new(),
        supplied: true,
    }
}

fn degraded(diagnostic: Diagnostic) -> LegacyLoad {
    LegacyLoad {
        model: LegacyModel::default(),
        diagnostics: vec![diagnostic],
        supplied: true,
    }
}
