//! Text rendering for [`ResourceDefinition`].

use super::{AttributeDecl, PrimaryKeyKind, ResourceDefinition, Timestamps};
use crate::legacy::AssociationKind;
use crate::naming::{atom_literal, string_literal};
use crate::reconcile::{MergedRelationship, RelationshipKind, ResolvedRelationship, UnresolvedDirective};

const INDENT: &str = "  ";

/// Line-oriented writer with block nesting.
struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Blank line before every item but the first of a block.
    fn separate(&mut self, first: &mut bool) {
        if !std::mem::take(first) {
            self.blank();
        }
    }

    fn open(&mut self, header: impl AsRef<str>) {
        self.line(format!("{} do", header.as_ref()));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("end");
    }
}

impl ResourceDefinition {
    /// Print the resource module.
    ///
    /// Section order: header, data layer, attributes, identities (only when
    /// present), relationships (only when present), actions.
    pub fn render(&self) -> String {
        let mut w = Writer::new();

        w.open(format!("defmodule {}", self.module));
        w.line("use Ash.Resource,");
        w.line(format!("{}domain: {},", INDENT, self.domain));
        w.line(format!("{}data_layer: AshPostgres.DataLayer", INDENT));
        w.blank();

        w.open("postgres");
        w.line(format!("table {}", string_literal(&self.table)));
        if let Some(schema) = &self.schema {
            w.line(format!("schema {}", string_literal(schema)));
        }
        w.line(format!("repo {}", self.repo));
        w.close();
        w.blank();

        self.render_attributes(&mut w);

        if !self.identities.is_empty() {
            w.blank();
            w.open("identities");
            for identity in &self.identities {
                let columns: Vec<_> = identity.columns.iter().map(|c| atom_literal(c)).collect();
                w.line(format!(
                    "identity {}, [{}]",
                    atom_literal(&identity.name),
                    columns.join(", ")
                ));
            }
            w.close();
        }

        if !self.relationships.is_empty() {
            w.blank();
            w.open("relationships");
            for (i, relationship) in self.relationships.iter().enumerate() {
                // Consecutive unresolved directives stay on adjacent lines.
                if i > 0 && (relationship.is_resolved() || self.relationships[i - 1].is_resolved()) {
                    w.blank();
                }
                match relationship {
                    MergedRelationship::Resolved(r) => render_resolved(&mut w, r),
                    MergedRelationship::Unresolved(u) => render_unresolved(&mut w, u),
                }
            }
            w.close();
        }

        w.blank();
        w.open("actions");
        w.line("defaults [:read, :create, :update, :destroy]");
        w.close();

        w.close();
        w.out
    }

    fn render_attributes(&self, w: &mut Writer) {
        w.open("attributes");

        let mut first = true;

        if let Some(pk) = &self.primary_key {
            w.separate(&mut first);
            let macro_name = match pk.kind {
                PrimaryKeyKind::Integer => "integer_primary_key",
                PrimaryKeyKind::Uuid => "uuid_primary_key",
            };
            w.line(format!("{} {}", macro_name, atom_literal(&pk.name)));
        }

        for attr in &self.attributes {
            w.separate(&mut first);
            render_attribute(w, attr);
        }

        match &self.timestamps {
            Timestamps::None => {}
            Timestamps::Standard => {
                w.separate(&mut first);
                w.line("timestamps()");
            }
            Timestamps::Named { create, update } => {
                w.separate(&mut first);
                w.line(format!("create_timestamp {}", atom_literal(create)));
                w.line(format!("update_timestamp {}", atom_literal(update)));
            }
        }

        w.close();
    }
}

fn render_attribute(w: &mut Writer, attr: &AttributeDecl) {
    w.open(format!(
        "attribute {}, {}",
        atom_literal(&attr.name),
        attr.target_type
    ));
    if attr.primary_key {
        w.line("primary_key? true");
    }
    w.line(format!("allow_nil? {}", attr.allow_nil && !attr.primary_key));
    if let Some(default) = &attr.default {
        w.line(format!("default {}", default));
    }
    if let Some(constraints) = &attr.constraints {
        w.line(format!("constraints {}", constraints));
    }
    w.line("public? true");
    w.close();
}

fn render_resolved(w: &mut Writer, r: &ResolvedRelationship) {
    w.open(format!(
        "{} {}, {}",
        r.kind.as_str(),
        atom_literal(&r.name),
        r.destination
    ));
    w.line(format!("source_attribute {}", atom_literal(&r.source_attribute)));
    w.line(format!(
        "destination_attribute {}",
        atom_literal(&r.destination_attribute)
    ));
    if r.kind == RelationshipKind::BelongsTo {
        w.line("define_attribute? false");
    }
    w.close();
}

fn render_unresolved(w: &mut Writer, u: &UnresolvedDirective) {
    let target = if u.through.is_empty() {
        u.module.clone()
    } else {
        let path: Vec<_> = u.through.iter().map(|step| atom_literal(step)).collect();
        format!("through: [{}]", path.join(", "))
    };
    let mut directive = format!(
        "# UNRESOLVED {} {}, {}",
        u.kind,
        atom_literal(&u.name),
        target
    );
    if let (AssociationKind::ManyToMany, Some(through)) = (u.kind, &u.join_through) {
        if through.starts_with(|c: char| c.is_ascii_uppercase()) {
            directive.push_str(&format!(", join_through: {}", through));
        } else {
            directive.push_str(&format!(", join_through: {}", string_literal(through)));
        }
    }
    directive.push_str(&format!(" ({})", u.reason.as_str()));
    w.line(directive);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::UnresolvedReason;
    use crate::synth::{IdentityDecl, PrimaryKeyDecl};
    use crate::typemap::TargetType;

    fn orders() -> ResourceDefinition {
        ResourceDefinition {
            module: "MyApp.Order".into(),
            domain: "MyApp.Domain".into(),
            repo: "MyApp.Repo".into(),
            table: "orders".into(),
            schema: None,
            primary_key: Some(PrimaryKeyDecl {
                name: "id".into(),
                kind: PrimaryKeyKind::Integer,
            }),
            attributes: vec![AttributeDecl {
                name: "notes".into(),
                target_type: TargetType::String,
                allow_nil: true,
                primary_key: false,
                default: None,
                constraints: None,
            }],
            timestamps: Timestamps::Standard,
            identities: vec![IdentityDecl {
                name: "unique_customer_id".into(),
                columns: vec!["customer_id".into()],
            }],
            relationships: vec![
                MergedRelationship::Resolved(ResolvedRelationship {
                    kind: RelationshipKind::BelongsTo,
                    name: "customer".into(),
                    destination: "MyApp.Customer".into(),
                    source_attribute: "customer_id".into(),
                    destination_attribute: "id".into(),
                }),
                MergedRelationship::Unresolved(UnresolvedDirective {
                    kind: AssociationKind::HasOne,
                    name: "profile".into(),
                    module: "Blog.Profile".into(),
                    join_through: None,
                    through: Vec::new(),
                    reason: UnresolvedReason::ManualDefinition,
                }),
            ],
        }
    }

    #[test]
    fn test_render_full_resource() {
        let expected = r#"defmodule MyApp.Order do
  use Ash.Resource,
    domain: MyApp.Domain,
    data_layer: AshPostgres.DataLayer

  postgres do
    table "orders"
    repo MyApp.Repo
  end

  attributes do
    integer_primary_key :id

    attribute :notes, :string do
      allow_nil? true
      public? true
    end

    timestamps()
  end

  identities do
    identity :unique_customer_id, [:customer_id]
  end

  relationships do
    belongs_to :customer, MyApp.Customer do
      source_attribute :customer_id
      destination_attribute :id
      define_attribute? false
    end

    # UNRESOLVED has_one :profile, Blog.Profile (must be defined manually)
  end

  actions do
    defaults [:read, :create, :update, :destroy]
  end
end
"#;
        assert_eq!(orders().render(), expected);
    }

    #[test]
    fn test_optional_sections_omitted() {
        let mut def = orders();
        def.identities.clear();
        def.relationships.clear();
        let out = def.render();
        assert!(!out.contains("identities do"));
        assert!(!out.contains("relationships do"));
        assert!(out.contains("  actions do\n"));
    }

    #[test]
    fn test_attribute_details() {
        let mut def = orders();
        def.primary_key = None;
        def.schema = Some("sales".into());
        def.timestamps = Timestamps::Named {
            create: "created_at".into(),
            update: "modified_at".into(),
        };
        def.attributes = vec![
            AttributeDecl {
                name: "code".into(),
                target_type: TargetType::String,
                allow_nil: false,
                primary_key: true,
                default: None,
                constraints: Some("[max_length: 8]".into()),
            },
            AttributeDecl {
                name: "status".into(),
                target_type: TargetType::Atom,
                allow_nil: true,
                primary_key: false,
                default: Some(":pending".into()),
                constraints: Some("[one_of: [:pending, :active, :closed]]".into()),
            },
        ];
        let out = def.render();
        assert!(out.contains("    schema \"sales\"\n"));
        assert!(out.contains(
            "    attribute :code, :string do\n      primary_key? true\n      allow_nil? false\n      constraints [max_length: 8]\n"
        ));
        assert!(out.contains(
            "      default :pending\n      constraints [one_of: [:pending, :active, :closed]]\n"
        ));
        assert!(out.contains("    create_timestamp :created_at\n    update_timestamp :modified_at\n"));
    }

    #[test]
    fn test_many_to_many_directive() {
        let mut def = orders();
        def.relationships = vec![
            MergedRelationship::Unresolved(UnresolvedDirective {
                kind: AssociationKind::ManyToMany,
                name: "tags".into(),
                module: "Blog.Tag".into(),
                join_through: Some("posts_tags".into()),
                through: Vec::new(),
                reason: UnresolvedReason::ManualDefinition,
            }),
            MergedRelationship::Unresolved(UnresolvedDirective {
                kind: AssociationKind::BelongsTo,
                name: "category".into(),
                module: "Blog.Category".into(),
                join_through: None,
                through: Vec::new(),
                reason: UnresolvedReason::NoReferencingColumn,
            }),
        ];
        let out = def.render();
        assert!(out.contains(
            "    # UNRESOLVED many_to_many :tags, Blog.Tag, join_through: \"posts_tags\" (must be defined manually)\n    # UNRESOLVED belongs_to :category, Blog.Category (no referencing column found)\n"
        ));
    }

    #[test]
    fn test_through_directive() {
        let mut def = orders();
        def.relationships = vec![MergedRelationship::Unresolved(UnresolvedDirective {
            kind: AssociationKind::HasMany,
            name: "commenters".into(),
            module: String::new(),
            join_through: None,
            through: vec!["comments".into(), "author".into()],
            reason: UnresolvedReason::ManualDefinition,
        })];
        let out = def.render();
        assert!(out.contains(
            "    # UNRESOLVED has_many :commenters, through: [:comments, :author] (must be defined manually)\n"
        ));
    }
}
