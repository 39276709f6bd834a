//! Reconciler: merge catalog relationship edges with legacy associations.
//!
//! Catalog edges decide *which* relationships exist; legacy associations
//! only contribute names. A legacy association can lend its name to at most
//! one catalog edge. Candidates are matched in extraction order, so when two
//! legacy associations fit the same edge the one declared first wins and the
//! other is reported as unresolved.
//!
//! Output order: belongs-to edges in catalog column order, then has-many
//! edges in catalog table order, then unresolved directives in extraction
//! order.

use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::catalog::CatalogModel;
use crate::diagnostics::Diagnostic;
use crate::legacy::{Association, AssociationKind, LegacyModel};
use crate::naming::{module_to_table, pluralize, resource_module, singularize, strip_id_suffix};

/// Kinds of relationship the catalog can confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    BelongsTo,
    HasMany,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::BelongsTo => "belongs_to",
            RelationshipKind::HasMany => "has_many",
        }
    }
}

/// A catalog-backed relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRelationship {
    pub kind: RelationshipKind,
    pub name: String,

    /// Resource module on the other end.
    pub destination: String,

    /// Attribute on the resource that owns the declaration.
    pub source_attribute: String,

    /// Attribute on the destination resource.
    pub destination_attribute: String,
}

/// Why a legacy association has no catalog counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    NoReferencingColumn,
    NoReverseForeignKey,
    ManualDefinition,
}

impl UnresolvedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvedReason::NoReferencingColumn => "no referencing column found",
            UnresolvedReason::NoReverseForeignKey => "no reverse foreign key found",
            UnresolvedReason::ManualDefinition => "must be defined manually",
        }
    }
}

/// A relationship asserted only by the legacy schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedDirective {
    pub kind: AssociationKind,
    pub name: String,
    pub module: String,
    pub join_through: Option<String>,
    pub through: Vec<String>,
    pub reason: UnresolvedReason,
}

/// One entry of the merged relationship set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergedRelationship {
    Resolved(ResolvedRelationship),
    Unresolved(UnresolvedDirective),
}

impl MergedRelationship {
    pub fn name(&self) -> &str {
        match self {
            MergedRelationship::Resolved(r) => &r.name,
            MergedRelationship::Unresolved(u) => &u.name,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, MergedRelationship::Resolved(_))
    }
}

/// Merged relationships plus the diagnostics raised while merging.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub relationships: Vec<MergedRelationship>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Reconciliation {
    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedRelationship> {
        self.relationships.iter().filter_map(|r| match r {
            MergedRelationship::Resolved(r) => Some(r),
            MergedRelationship::Unresolved(_) => None,
        })
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &UnresolvedDirective> {
        self.relationships.iter().filter_map(|r| match r {
            MergedRelationship::Unresolved(u) => Some(u),
            MergedRelationship::Resolved(_) => None,
        })
    }
}

struct Merger<'a> {
    associations: &'a [Association],
    consumed: Vec<bool>,
    taken: HashSet<String>,
    out: Reconciliation,
}

impl<'a> Merger<'a> {
    /// Column names are reserved up front; a relationship may not shadow an attribute.
    fn new(catalog: &CatalogModel, legacy: &'a LegacyModel) -> Self {
        Self {
            associations: &legacy.associations,
            consumed: vec![false; legacy.associations.len()],
            taken: catalog.columns.iter().map(|c| c.name.clone()).collect(),
            out: Reconciliation::default(),
        }
    }

    /// Claim the first unconsumed association of `kind` accepted by `fits`.
    fn claim(
        &mut self,
        kind: AssociationKind,
        fits: impl Fn(&Association) -> bool,
    ) -> Option<String> {
        let idx = self
            .associations
            .iter()
            .enumerate()
            .position(|(i, a)| !self.consumed[i] && a.kind == kind && fits(a))?;
        self.consumed[idx] = true;
        Some(self.associations[idx].name.clone())
    }

    /// Reserve a relationship name, suffixing it with `stem` on collision
    /// (`record` when the stem is the name itself).
    fn reserve(&mut self, name: String, stem: &str) -> String {
        if self.taken.insert(name.clone()) {
            return name;
        }

        let stem = if stem == name { "record" } else { stem };
        let mut renamed = format!("{}_{}", name, stem);
        let mut n = 2;
        while self.taken.contains(&renamed) {
            renamed = format!("{}_{}_{}", name, stem, n);
            n += 1;
        }
        self.taken.insert(renamed.clone());
        self.out.diagnostics.push(Diagnostic::RelationshipRenamed {
            original: name,
            renamed: renamed.clone(),
        });
        renamed
    }

    fn push(&mut self, relationship: ResolvedRelationship) {
        debug!(
            "Resolved {} :{} -> {}",
            relationship.kind.as_str(),
            relationship.name,
            relationship.destination
        );
        self.out
            .relationships
            .push(MergedRelationship::Resolved(relationship));
    }

    fn finish(mut self) -> Reconciliation {
        for (assoc, consumed) in self.associations.iter().zip(&self.consumed) {
            if *consumed {
                continue;
            }
            let reason = match assoc.kind {
                _ if !assoc.through.is_empty() => UnresolvedReason::ManualDefinition,
                AssociationKind::BelongsTo => UnresolvedReason::NoReferencingColumn,
                AssociationKind::HasMany => UnresolvedReason::NoReverseForeignKey,
                AssociationKind::HasOne | AssociationKind::ManyToMany => {
                    UnresolvedReason::ManualDefinition
                }
            };
            self.out.diagnostics.push(Diagnostic::UnresolvedRelationship {
                association: assoc.kind.to_string(),
                name: assoc.name.clone(),
                reason: reason.as_str().to_string(),
            });
            self.out
                .relationships
                .push(MergedRelationship::Unresolved(UnresolvedDirective {
                    kind: assoc.kind,
                    name: assoc.name.clone(),
                    module: assoc.module.clone(),
                    join_through: assoc.join_through.clone(),
                    through: assoc.through.clone(),
                    reason,
                }));
        }
        self.out
    }
}

/// Merge catalog edges and legacy associations for one table.
pub fn reconcile(catalog: &CatalogModel, legacy: &LegacyModel, namespace: &str) -> Reconciliation {
    let mut merger = Merger::new(catalog, legacy);

    for constraint in &catalog.skipped_foreign_keys {
        merger.out.diagnostics.push(Diagnostic::CompositeForeignKey {
            constraint: constraint.clone(),
        });
    }

    for fk in &catalog.foreign_keys {
        let stem = strip_id_suffix(&fk.column).unwrap_or(&fk.column);
        let name = merger
            .claim(AssociationKind::BelongsTo, |a| a.local_column() == fk.column)
            .unwrap_or_else(|| match strip_id_suffix(&fk.column) {
                Some(stem) => stem.to_string(),
                None => singularize(&fk.ref_table),
            });
        let name = merger.reserve(name, stem);

        merger.push(ResolvedRelationship {
            kind: RelationshipKind::BelongsTo,
            name,
            destination: resource_module(namespace, &fk.ref_table),
            source_attribute: fk.column.clone(),
            destination_attribute: fk.ref_column.clone(),
        });
    }

    for rfk in &catalog.reverse_foreign_keys {
        let stem = strip_id_suffix(&rfk.source_column).unwrap_or(&rfk.source_column);
        let name = merger
            .claim(AssociationKind::HasMany, |a| {
                a.through.is_empty() && module_to_table(&a.module) == rfk.source_table
            })
            .unwrap_or_else(|| pluralize(&rfk.source_table));
        let name = merger.reserve(name, stem);

        merger.push(ResolvedRelationship {
            kind: RelationshipKind::HasMany,
            name,
            destination: resource_module(namespace, &rfk.source_table),
            source_attribute: rfk.target_column.clone(),
            destination_attribute: rfk.source_column.clone(),
        });
    }

    merger.finish()
}
