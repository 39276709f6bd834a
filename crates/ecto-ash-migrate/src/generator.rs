//! Generator: one table in, one resource module out.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogModel, CatalogSource};
use crate::config::Config;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::legacy::{self, LegacyModel};
use crate::naming::resource_file_stem;
use crate::reconcile::reconcile;
use crate::synth::ResourceDefinition;
use crate::typemap::TypeMap;

/// Runs the generation pipeline against a catalog source.
pub struct Generator<C: CatalogSource> {
    catalog: C,
    config: Config,
    type_map: TypeMap,
}

/// Result of generating one resource.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Table the resource was generated for.
    pub table: String,

    /// Resource module name.
    pub module: String,

    /// Rendered resource source.
    pub source: String,

    /// Where [`Generation::write`] puts the source.
    pub output_path: PathBuf,

    pub summary: GenerationSummary,
}

/// Counts gathered from the legacy schema.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LegacySummary {
    pub module: Option<String>,
    pub virtual_fields: usize,
    pub associations: usize,
    pub validations: BTreeMap<&'static str, usize>,
    pub changeset_functions: Vec<String>,
}

impl LegacySummary {
    fn from_model(model: &LegacyModel) -> Self {
        Self {
            module: model.module.clone(),
            virtual_fields: model.virtual_fields.len(),
            associations: model.associations.len(),
            validations: model.validation_counts(),
            changeset_functions: model
                .mutation_functions
                .iter()
                .map(|f| format!("{}/{}", f.name, f.arity))
                .collect(),
        }
    }
}

/// Structured summary printed after a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationSummary {
    pub table: String,
    pub module: String,
    pub output_path: PathBuf,
    pub columns: usize,
    pub primary_key: Vec<String>,
    pub foreign_keys: usize,
    pub reverse_foreign_keys: usize,
    pub unique_constraints: usize,
    pub enum_columns: usize,
    pub resolved_relationships: usize,
    pub unresolved_relationships: usize,

    /// Present only when a legacy schema path was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy: Option<LegacySummary>,

    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationSummary {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<C: CatalogSource> Generator<C> {
    /// Create a generator. Fails when a configured type override is invalid.
    pub fn new(catalog: C, config: Config) -> Result<Self> {
        let type_map = TypeMap::with_overrides(&config.generator.type_overrides)?;
        Ok(Self {
            catalog,
            config,
            type_map,
        })
    }

    /// Generate the resource for `table`, optionally mining a legacy schema.
    ///
    /// The catalog read and the legacy load run concurrently. A catalog
    /// failure aborts the run before anything is rendered.
    pub async fn generate(&self, table: &str, legacy_path: Option<&Path>) -> Result<Generation> {
        self.generate_into(table, legacy_path, &self.config.generator.output_dir)
            .await
    }

    /// Like [`Generator::generate`] with an explicit output directory.
    pub async fn generate_into(
        &self,
        table: &str,
        legacy_path: Option<&Path>,
        output_dir: &Path,
    ) -> Result<Generation> {
        let schema = &self.config.database.schema;
        info!("Generating resource for {}.{}", schema, table);

        let (catalog, legacy) = tokio::join!(
            self.catalog.read_table(schema, table),
            legacy::load(legacy_path)
        );
        let catalog = catalog?;
        debug!(
            "Catalog ({}) for {}: {} columns, {} foreign keys, {} reverse foreign keys",
            self.catalog.db_type(),
            catalog.full_name(),
            catalog.columns.len(),
            catalog.foreign_keys.len(),
            catalog.reverse_foreign_keys.len()
        );

        let mut diagnostics = legacy.diagnostics.clone();
        if let Some(declared) = &legacy.model.source_table {
            if declared != table {
                warn!(
                    "Legacy schema declares table {} but generating {}",
                    declared, table
                );
                diagnostics.push(Diagnostic::LegacyTableMismatch {
                    declared: declared.clone(),
                    table: table.to_string(),
                });
            }
        }

        let generator = &self.config.generator;
        let merged = reconcile(&catalog, &legacy.model, &generator.namespace);
        let (definition, synth_diagnostics) =
            ResourceDefinition::build(&catalog, &merged.relationships, &self.type_map, generator);
        diagnostics.extend(merged.diagnostics.iter().cloned());
        diagnostics.extend(synth_diagnostics);

        let source = definition.render();
        let output_path = output_dir.join(format!("{}.ex", resource_file_stem(table)));

        for diagnostic in &diagnostics {
            warn!("{}: {}", table, diagnostic);
        }

        let summary = GenerationSummary {
            table: table.to_string(),
            module: definition.module.clone(),
            output_path: output_path.clone(),
            resolved_relationships: merged.resolved().count(),
            unresolved_relationships: merged.unresolved().count(),
            legacy: legacy
                .supplied
                .then(|| LegacySummary::from_model(&legacy.model)),
            diagnostics,
            ..summary_counts(&catalog)
        };

        info!(
            "Generated {} ({} attributes, {} relationships, {} diagnostics)",
            definition.module,
            definition.attributes.len(),
            definition.relationships.len(),
            summary.diagnostics.len()
        );

        Ok(Generation {
            table: table.to_string(),
            module: definition.module,
            source,
            output_path,
            summary,
        })
    }
}

fn summary_counts(catalog: &CatalogModel) -> GenerationSummary {
    GenerationSummary {
        columns: catalog.columns.len(),
        primary_key: catalog.primary_key.clone(),
        foreign_keys: catalog.foreign_keys.len(),
        reverse_foreign_keys: catalog.reverse_foreign_keys.len(),
        unique_constraints: catalog.unique_constraints.len(),
        enum_columns: catalog.enum_columns.len(),
        ..Default::default()
    }
}

impl Generation {
    /// Write the source to `output_path`, creating parent directories.
    pub async fn write(&self) -> Result<()> {
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.output_path, &self.source).await?;
        info!("Wrote {}", self.output_path.display());
        Ok(())
    }
}
