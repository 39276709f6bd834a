//! Synthesizer: assemble and render an Ash resource for one table.
//!
//! [`ResourceDefinition::build`] turns catalog facts and merged
//! relationships into declarations; [`ResourceDefinition::render`] prints
//! them in a fixed section order.

mod constraints;
mod defaults;
mod render;

pub use constraints::constraint_clause;
pub use defaults::{translate_default, DefaultValue};

use crate::catalog::CatalogModel;
use crate::config::GeneratorConfig;
use crate::diagnostics::Diagnostic;
use crate::naming::{identity_name, resource_module};
use crate::reconcile::MergedRelationship;
use crate::typemap::{TargetType, TypeMap};

/// Specialized primary key declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyKind {
    Integer,
    Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyDecl {
    pub name: String,
    pub kind: PrimaryKeyKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: String,
    pub target_type: TargetType,
    pub allow_nil: bool,

    /// Single-column key without a specialized declaration.
    pub primary_key: bool,

    pub default: Option<String>,

    /// Rendered `[...]` clause.
    pub constraints: Option<String>,
}

/// How the insert/update timestamp pair is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamps {
    None,
    /// Conventional names, rendered as `timestamps()`.
    Standard,
    /// Custom names, rendered as create/update timestamp declarations.
    Named { create: String, update: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDecl {
    pub name: String,
    pub columns: Vec<String>,
}

/// Everything needed to print one resource module.
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    pub module: String,
    pub domain: String,
    pub repo: String,
    pub table: String,

    /// Set when the table lives outside `public`.
    pub schema: Option<String>,

    pub primary_key: Option<PrimaryKeyDecl>,
    pub attributes: Vec<AttributeDecl>,
    pub timestamps: Timestamps,
    pub identities: Vec<IdentityDecl>,
    pub relationships: Vec<MergedRelationship>,
}

const DEFAULT_TIMESTAMPS: [&str; 2] = ["inserted_at", "updated_at"];

impl ResourceDefinition {
    /// Assemble declarations. Returns the definition plus per-field
    /// diagnostics in column order.
    pub fn build(
        catalog: &CatalogModel,
        relationships: &[MergedRelationship],
        type_map: &TypeMap,
        config: &GeneratorConfig,
    ) -> (Self, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();

        let mappings: Vec<_> = catalog
            .columns
            .iter()
            .map(|col| {
                let enum_column = catalog.enum_for(&col.name);
                (col, enum_column, type_map.map(col, enum_column))
            })
            .collect();

        let primary_key = match catalog.primary_key.as_slice() {
            [] => {
                diagnostics.push(Diagnostic::NoPrimaryKey);
                None
            }
            [single] => mappings
                .iter()
                .find(|(col, _, _)| &col.name == single)
                .and_then(|(col, _, mapping)| {
                    let kind = match mapping.target_type {
                        TargetType::Integer => PrimaryKeyKind::Integer,
                        TargetType::Uuid => PrimaryKeyKind::Uuid,
                        ref other => {
                            diagnostics.push(Diagnostic::UnsupportedPrimaryKeyType {
                                column: col.name.clone(),
                                target_type: other.to_string(),
                            });
                            return None;
                        }
                    };
                    Some(PrimaryKeyDecl {
                        name: col.name.clone(),
                        kind,
                    })
                }),
            columns => {
                diagnostics.push(Diagnostic::CompositePrimaryKey {
                    columns: columns.to_vec(),
                });
                None
            }
        };

        let [create, update] = &config.timestamp_columns;
        let timestamps = if catalog.column(create).is_some() && catalog.column(update).is_some() {
            if [create.as_str(), update.as_str()] == DEFAULT_TIMESTAMPS {
                Timestamps::Standard
            } else {
                Timestamps::Named {
                    create: create.clone(),
                    update: update.clone(),
                }
            }
        } else {
            Timestamps::None
        };

        let mut attributes = Vec::new();
        for (col, enum_column, mapping) in &mappings {
            if primary_key.as_ref().is_some_and(|pk| pk.name == col.name) {
                continue;
            }
            if timestamps != Timestamps::None && (&col.name == create || &col.name == update) {
                continue;
            }
            if let Some(diagnostic) = &mapping.diagnostic {
                diagnostics.push(diagnostic.clone());
            }

            let target = &mapping.target_type;
            let default = match translate_default(col, target, *enum_column) {
                DefaultValue::Literal(value) => Some(value),
                DefaultValue::None => None,
                DefaultValue::Dropped(diagnostic) => {
                    diagnostics.push(diagnostic);
                    None
                }
            };

            attributes.push(AttributeDecl {
                name: col.name.clone(),
                target_type: target.clone(),
                allow_nil: col.is_nullable,
                primary_key: catalog.has_single_pk() && catalog.primary_key[0] == col.name,
                default,
                constraints: constraint_clause(col, target, *enum_column),
            });
        }

        let identities = catalog
            .unique_constraints
            .iter()
            .map(|unique| {
                let name = identity_name(&unique.columns);
                if unique.is_multi_column() {
                    diagnostics.push(Diagnostic::MultiColumnIdentity {
                        name: name.clone(),
                        columns: unique.columns.clone(),
                    });
                }
                IdentityDecl {
                    name,
                    columns: unique.columns.clone(),
                }
            })
            .collect();

        let definition = Self {
            module: resource_module(&config.namespace, &catalog.table),
            domain: config.domain_module(),
            repo: config.repo_module(),
            table: catalog.table.clone(),
            schema: (catalog.schema != "public" && !catalog.schema.is_empty())
                .then(|| catalog.schema.clone()),
            primary_key,
            attributes,
            timestamps,
            identities,
            relationships: relationships.to_vec(),
        };
        (definition, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, EnumColumn, UniqueConstraint, UniqueOrigin};

    fn col(name: &str, data_type: &str, udt: &str, nullable: bool) -> Column {
        Column {
            name: name.into(),
            data_type: data_type.into(),
            udt_name: udt.into(),
            is_nullable: nullable,
            default: None,
            max_length: None,
            precision: None,
            scale: None,
            ordinal_pos: 0,
        }
    }

    fn build(catalog: &CatalogModel) -> (ResourceDefinition, Vec<Diagnostic>) {
        ResourceDefinition::build(
            catalog,
            &[],
            &TypeMap::builtin(),
            &GeneratorConfig::default(),
        )
    }

    #[test]
    fn test_integer_primary_key_not_an_attribute() {
        let catalog = CatalogModel {
            schema: "public".into(),
            table: "orders".into(),
            columns: vec![col("id", "bigint", "int8", false), col("notes", "text", "text", true)],
            primary_key: vec!["id".into()],
            ..Default::default()
        };
        let (def, diags) = build(&catalog);
        assert_eq!(
            def.primary_key,
            Some(PrimaryKeyDecl {
                name: "id".into(),
                kind: PrimaryKeyKind::Integer
            })
        );
        assert_eq!(def.attributes.len(), 1);
        assert_eq!(def.attributes[0].name, "notes");
        assert!(def.attributes[0].allow_nil);
        assert!(def.schema.is_none());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_composite_primary_key_columns_stay_attributes() {
        let catalog = CatalogModel {
            table: "order_lines".into(),
            columns: vec![
                col("order_id", "integer", "int4", false),
                col("line_no", "integer", "int4", false),
            ],
            primary_key: vec!["order_id".into(), "line_no".into()],
            ..Default::default()
        };
        let (def, diags) = build(&catalog);
        assert!(def.primary_key.is_none());
        assert_eq!(def.attributes.len(), 2);
        assert!(def.attributes.iter().all(|a| !a.primary_key));
        assert_eq!(
            diags,
            vec![Diagnostic::CompositePrimaryKey {
                columns: vec!["order_id".into(), "line_no".into()]
            }]
        );
    }

    #[test]
    fn test_text_primary_key_falls_back_to_attribute() {
        let catalog = CatalogModel {
            table: "countries".into(),
            columns: vec![col("code", "character", "bpchar", false)],
            primary_key: vec!["code".into()],
            ..Default::default()
        };
        let (def, diags) = build(&catalog);
        assert!(def.primary_key.is_none());
        assert!(def.attributes[0].primary_key);
        assert!(matches!(
            diags.as_slice(),
            [Diagnostic::UnsupportedPrimaryKeyType { .. }]
        ));
    }

    #[test]
    fn test_timestamps_pair() {
        let mut catalog = CatalogModel {
            table: "posts".into(),
            columns: vec![
                col("id", "uuid", "uuid", false),
                col("inserted_at", "timestamp without time zone", "timestamp", false),
                col("updated_at", "timestamp without time zone", "timestamp", false),
            ],
            primary_key: vec!["id".into()],
            ..Default::default()
        };
        let (def, _) = build(&catalog);
        assert_eq!(def.timestamps, Timestamps::Standard);
        assert!(def.attributes.is_empty());
        assert_eq!(def.primary_key.unwrap().kind, PrimaryKeyKind::Uuid);

        catalog.columns.pop();
        let (def, _) = build(&catalog);
        assert_eq!(def.timestamps, Timestamps::None);
        assert_eq!(def.attributes[0].name, "inserted_at");
    }

    #[test]
    fn test_enum_and_identities() {
        let catalog = CatalogModel {
            table: "accounts".into(),
            columns: vec![
                col("id", "integer", "int4", false),
                col("status", "USER-DEFINED", "account_status", false),
                col("org_id", "integer", "int4", false),
                col("email", "text", "text", false),
            ],
            primary_key: vec!["id".into()],
            enum_columns: vec![EnumColumn {
                column: "status".into(),
                type_name: "account_status".into(),
                labels: vec!["open".into(), "frozen".into()],
            }],
            unique_constraints: vec![
                UniqueConstraint {
                    name: "accounts_email_key".into(),
                    columns: vec!["email".into()],
                    origin: UniqueOrigin::Constraint,
                },
                UniqueConstraint {
                    name: "accounts_org_email_idx".into(),
                    columns: vec!["org_id".into(), "email".into()],
                    origin: UniqueOrigin::Index,
                },
            ],
            ..Default::default()
        };
        let (def, diags) = build(&catalog);
        let status = &def.attributes[0];
        assert_eq!(status.target_type, TargetType::Atom);
        assert_eq!(status.constraints.as_deref(), Some("[one_of: [:open, :frozen]]"));

        let names: Vec<_> = def.identities.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["unique_email", "unique_org_id_email"]);
        assert_eq!(
            diags,
            vec![Diagnostic::MultiColumnIdentity {
                name: "unique_org_id_email".into(),
                columns: vec!["org_id".into(), "email".into()],
            }]
        );
    }

    #[test]
    fn test_no_primary_key() {
        let catalog = CatalogModel {
            schema: "audit".into(),
            table: "events".into(),
            columns: vec![col("payload", "jsonb", "jsonb", true)],
            ..Default::default()
        };
        let (def, diags) = build(&catalog);
        assert_eq!(def.schema.as_deref(), Some("audit"));
        assert_eq!(diags, vec![Diagnostic::NoPrimaryKey]);
        assert_eq!(def.module, "MyApp.Event");
    }
}
