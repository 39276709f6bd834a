//! Attribute constraint assembly.

use crate::catalog::{Column, EnumColumn};
use crate::naming::atom_literal;
use crate::typemap::TargetType;

/// Build the single `[...]` constraint clause for an attribute, or `None`
/// when no constraint applies.
pub fn constraint_clause(
    column: &Column,
    target: &TargetType,
    enum_column: Option<&EnumColumn>,
) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(enum_column) = enum_column {
        let labels: Vec<String> = enum_column.labels.iter().map(|l| atom_literal(l)).collect();
        parts.push(format!("one_of: [{}]", labels.join(", ")));
    }

    match target {
        TargetType::String => {
            if let Some(len) = column.max_length.filter(|l| *l > 0) {
                parts.push(format!("max_length: {}", len));
            }
        }
        TargetType::Decimal => {
            if let Some(precision) = column.precision.filter(|p| *p > 0) {
                parts.push(format!("precision: {}", precision));
                if let Some(scale) = column.scale {
                    parts.push(format!("scale: {}", scale));
                }
            }
        }
        _ => {}
    }

    (!parts.is_empty()).then(|| format!("[{}]", parts.join(", ")))
}
