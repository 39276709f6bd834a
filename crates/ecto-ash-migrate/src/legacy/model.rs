//! Facts mined from a legacy schema module.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The four association macros a legacy schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    BelongsTo,
    HasMany,
    HasOne,
    ManyToMany,
}

impl AssociationKind {
    /// Macro name as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationKind::BelongsTo => "belongs_to",
            AssociationKind::HasMany => "has_many",
            AssociationKind::HasOne => "has_one",
            AssociationKind::ManyToMany => "many_to_many",
        }
    }

    pub(crate) fn from_macro(name: &str) -> Option<Self> {
        match name {
            "belongs_to" => Some(AssociationKind::BelongsTo),
            "has_many" => Some(AssociationKind::HasMany),
            "has_one" => Some(AssociationKind::HasOne),
            "many_to_many" => Some(AssociationKind::ManyToMany),
            _ => None,
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An association declared in the legacy schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Association {
    pub kind: AssociationKind,

    /// Local association name.
    pub name: String,

    /// Referenced module as written (`Blog.Comment`). Empty for
    /// `through:` associations.
    pub module: String,

    /// Join table or join module for many-to-many.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_through: Option<String>,

    /// Association path of a `through: [...]` association.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub through: Vec<String>,

    /// Explicit `foreign_key:` option.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

impl Association {
    /// Local column a belongs-to association conventionally owns.
    pub fn local_column(&self) -> String {
        self.foreign_key
            .clone()
            .unwrap_or_else(|| format!("{}_id", self.name))
    }
}

/// A non-persisted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualField {
    pub name: String,
    pub field_type: String,
}

/// A validation call. Options are kept as raw source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationDirective {
    Required { field: String },
    Length { field: String, options: String },
    Format { field: String, pattern: String },
    Inclusion { field: String, values: String },
    Number { field: String, options: String },
}

impl ValidationDirective {
    /// Short kind label used for counting.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationDirective::Required { .. } => "required",
            ValidationDirective::Length { .. } => "length",
            ValidationDirective::Format { .. } => "format",
            ValidationDirective::Inclusion { .. } => "inclusion",
            ValidationDirective::Number { .. } => "number",
        }
    }

    /// Field the validation applies to.
    pub fn field(&self) -> &str {
        match self {
            ValidationDirective::Required { field }
            | ValidationDirective::Length { field, .. }
            | ValidationDirective::Format { field, .. }
            | ValidationDirective::Inclusion { field, .. }
            | ValidationDirective::Number { field, .. } => field,
        }
    }
}

/// A changeset-building function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationFunction {
    pub name: String,
    pub arity: usize,
    #[serde(skip)]
    pub body: String,
}

/// Everything mined from one legacy schema file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyModel {
    /// `defmodule` name.
    pub module: Option<String>,

    /// Table named by `schema "..."`.
    pub source_table: Option<String>,

    pub virtual_fields: Vec<VirtualField>,

    /// Associations in extraction (source) order.
    pub associations: Vec<Association>,

    pub validations: Vec<ValidationDirective>,

    pub mutation_functions: Vec<MutationFunction>,
}

impl LegacyModel {
    /// Whether no schema facts were found at all.
    pub fn is_empty(&self) -> bool {
        self.module.is_none()
            && self.source_table.is_none()
            && self.virtual_fields.is_empty()
            && self.associations.is_empty()
            && self.validations.is_empty()
            && self.mutation_functions.is_empty()
    }

    /// Validation counts keyed by kind.
    pub fn validation_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for v in &self.validations {
            *counts.entry(v.kind()).or_insert(0) += 1;
        }
        counts
    }
}
