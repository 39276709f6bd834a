//! Independent pattern scans over legacy schema source.
//!
//! Each scan reads the same immutable [`Source`] and produces one kind of
//! fact, so the scans can run in any order. Matches that start inside a
//! string literal or sigil are ignored.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

use super::lexer::{block_body, call_args, split_args, Source};
use super::model::{
    Association, AssociationKind, LegacyModel, MutationFunction, ValidationDirective,
    VirtualField,
};

static DEFMODULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*defmodule[ \t]+([A-Z][\w.]*)[ \t]+do\b").expect("valid defmodule regex")
});

static SCHEMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*schema[ \t]*\(?[ \t]*"([^"]+)""#).expect("valid schema regex")
});

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*field[ \t]*\(?[ \t]*:(\w+[?!]?)(.*)$").expect("valid field regex")
});

static VIRTUAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvirtual:\s*true\b").expect("valid virtual regex"));

static ASSOCIATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(belongs_to|has_many|has_one|many_to_many)[ \t]*\(?[ \t]*:(\w+)[ \t]*,[ \t]*([A-Z][\w.]*|__MODULE__|through:)(.*)$",
    )
    .expect("valid association regex")
});

static FOREIGN_KEY_OPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bforeign_key:\s*:(\w+)").expect("valid foreign_key regex"));

static JOIN_THROUGH_OPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bjoin_through:\s*(?:"([^"]+)"|([A-Z][\w.]*))"#).expect("valid join_through regex")
});

static VALIDATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bvalidate_(required|length|format|inclusion|number)[ \t]*\(")
        .expect("valid validation regex")
});

static LIST_ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*@(\w+)[ \t]+(\[|~w)").expect("valid module attribute regex")
});

static ATOM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(\w+[?!]?)").expect("valid atom regex"));

static CHANGESET_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*def[ \t]+(\w*changeset)[ \t]*\(").expect("valid changeset regex")
});

/// Mine a legacy schema module. Never fails: text without recognizable
/// declarations produces an empty model.
pub fn mine(raw: &str) -> LegacyModel {
    let source = Source::new(raw);

    let module = scan_module(&source);
    let mut associations = scan_associations(&source);
    if let Some(module) = &module {
        for assoc in &mut associations {
            if assoc.module == "__MODULE__" {
                assoc.module = module.clone();
            }
        }
    }

    LegacyModel {
        source_table: scan_schema_table(&source),
        virtual_fields: scan_virtual_fields(&source),
        associations,
        validations: scan_validations(&source),
        mutation_functions: scan_mutation_functions(&source),
        module,
    }
}

fn code_captures<'s>(re: &'s Regex, source: &'s Source) -> impl Iterator<Item = Captures<'s>> {
    re.captures_iter(&source.text).filter(move |caps| {
        caps.get(0)
            .is_some_and(|m| source.is_code(m.start() + (m.len() - m.as_str().trim_start().len())))
    })
}

fn scan_module(source: &Source) -> Option<String> {
    code_captures(&DEFMODULE_RE, source)
        .next()
        .map(|caps| caps[1].to_string())
}

fn scan_schema_table(source: &Source) -> Option<String> {
    code_captures(&SCHEMA_RE, source)
        .next()
        .map(|caps| caps[1].to_string())
}

fn scan_virtual_fields(source: &Source) -> Vec<VirtualField> {
    code_captures(&FIELD_RE, source)
        .filter(|caps| VIRTUAL_RE.is_match(&caps[2]))
        .map(|caps| {
            let rest = caps[2].trim().trim_start_matches(',').trim();
            let rest = rest.strip_suffix(')').unwrap_or(rest);
            let field_type = split_args(rest)
                .first()
                .filter(|arg| !is_keyword_pair(arg))
                .map(|arg| arg.to_string())
                .unwrap_or_else(|| ":string".to_string());
            VirtualField {
                name: caps[1].to_string(),
                field_type,
            }
        })
        .collect()
}

fn is_keyword_pair(arg: &str) -> bool {
    arg.split_once(':')
        .is_some_and(|(key, _)| !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

/// Options of an association may continue onto following lines when the
/// line ends with a comma.
fn continued_options(text: &str, first_line_end: usize) -> &str {
    let mut end = first_line_end;
    while text[..end].trim_end().ends_with(',') {
        match text[end..].strip_prefix('\n') {
            Some(rest) => end += 1 + rest.find('\n').unwrap_or(rest.len()),
            None => break,
        }
    }
    &text[..end]
}

fn scan_associations(source: &Source) -> Vec<Association> {
    code_captures(&ASSOCIATION_RE, source)
        .filter_map(|caps| {
            let kind = AssociationKind::from_macro(&caps[1])?;
            let opts_match = caps.get(4)?;
            let full = continued_options(&source.text, opts_match.end());
            let options = &full[opts_match.start()..];

            let (module, through) = if &caps[3] == "through:" {
                (String::new(), through_path(options))
            } else {
                (caps[3].to_string(), Vec::new())
            };

            let foreign_key = FOREIGN_KEY_OPT_RE
                .captures(options)
                .map(|c| c[1].to_string());
            let join_through = if kind == AssociationKind::ManyToMany {
                JOIN_THROUGH_OPT_RE.captures(options).and_then(|c| {
                    c.get(1)
                        .or_else(|| c.get(2))
                        .map(|m| m.as_str().to_string())
                })
            } else {
                None
            };

            Some(Association {
                kind,
                name: caps[2].to_string(),
                module,
                join_through,
                through,
                foreign_key,
            })
        })
        .collect()
}

/// Atoms of the `[...]` list that starts an association's options.
fn through_path(options: &str) -> Vec<String> {
    let Some(open) = options.find('[') else {
        return Vec::new();
    };
    call_args(options, open + 1)
        .map(|inner| {
            ATOM_RE
                .captures_iter(inner)
                .map(|c| c[1].to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Module attributes bound to a field list (`@required [:a]`, `@optional ~w(b)a`).
fn scan_list_attributes(source: &Source) -> HashMap<String, String> {
    let text = &source.text;
    code_captures(&LIST_ATTRIBUTE_RE, source)
        .filter_map(|caps| {
            let start = caps.get(2)?.start();
            let value = if &caps[2] == "[" {
                let inner = call_args(text, start + 1)?;
                &text[start..start + inner.len() + 2]
            } else {
                text[start..].lines().next()?.trim_end()
            };
            Some((caps[1].to_string(), value.to_string()))
        })
        .collect()
}

fn scan_validations(source: &Source) -> Vec<ValidationDirective> {
    let text = &source.text;
    let attributes = scan_list_attributes(source);
    let mut validations = Vec::new();

    for caps in code_captures(&VALIDATION_RE, source) {
        let Some(whole) = caps.get(0) else { continue };

        // Skip local helper definitions such as `defp validate_length(...)`.
        let line_start = text[..whole.start()].rfind('\n').map_or(0, |p| p + 1);
        let before = text[line_start..whole.start()].trim_end();
        if before.ends_with("def") || before.ends_with("defp") {
            continue;
        }

        let Some(args) = call_args(text, whole.end()) else {
            continue;
        };
        let mut args = split_args(args);
        if args
            .first()
            .is_some_and(|a| !a.starts_with([':', '[', '~', '@']))
        {
            args.remove(0);
        }
        let Some(first) = args.first().copied() else {
            continue;
        };
        let rest = args[1..].join(", ");

        match &caps[1] {
            "required" => {
                for field in field_list(first, &attributes) {
                    validations.push(ValidationDirective::Required { field });
                }
            }
            kind => {
                let Some(field) = first.strip_prefix(':').map(str::to_string) else {
                    continue;
                };
                validations.push(match kind {
                    "length" => ValidationDirective::Length {
                        field,
                        options: rest,
                    },
                    "format" => ValidationDirective::Format {
                        field,
                        pattern: rest,
                    },
                    "inclusion" => ValidationDirective::Inclusion {
                        field,
                        values: rest,
                    },
                    _ => ValidationDirective::Number {
                        field,
                        options: rest,
                    },
                });
            }
        }
    }

    validations
}

/// Field names in `:a`, `[:a, :b]`, `~w(a b)a` or `@attribute` form, or a
/// `++` concatenation of those.
fn field_list(arg: &str, attributes: &HashMap<String, String>) -> Vec<String> {
    if arg.contains("++") {
        return arg
            .split("++")
            .flat_map(|part| field_list(part.trim(), attributes))
            .collect();
    }
    if let Some(name) = arg.strip_prefix('@') {
        return attributes
            .get(name)
            .map(|value| field_list(value, attributes))
            .unwrap_or_default();
    }
    if let Some(words) = arg.strip_prefix("~w") {
        let inner = words
            .get(1..)
            .unwrap_or_default()
            .trim_end_matches(|c: char| c.is_ascii_alphabetic());
        let inner = inner.get(..inner.len().saturating_sub(1)).unwrap_or_default();
        return inner.split_whitespace().map(str::to_string).collect();
    }
    ATOM_RE
        .captures_iter(arg)
        .map(|c| c[1].to_string())
        .collect()
}

fn scan_mutation_functions(source: &Source) -> Vec<MutationFunction> {
    let text = &source.text;

    code_captures(&CHANGESET_DEF_RE, source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let args = call_args(text, whole.end())?;
            let after_args = whole.end() + args.len() + 1;
            let body = block_body(text, after_args).unwrap_or_default();
            Some(MutationFunction {
                name: caps[1].to_string(),
                arity: split_args(args).len(),
                body: body.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST_SCHEMA: &str = r#"
defmodule Blog.Post do
  use Ecto.Schema
  import Ecto.Changeset

  @moduledoc """
  has_one :ghost, Blog.Ghost
  """

  schema "posts" do
    field :title, :string
    field :body, :string
    field :status, Ecto.Enum, values: [:draft, :published]
    field :password, :string, virtual: true
    field :tags_input, {:array, :string}, virtual: true, default: []
    field :confirm, :boolean, virtual: true

    belongs_to :author, Blog.Accounts.User
    belongs_to :editor, Blog.Accounts.User, foreign_key: :edited_by_id
    has_many :comments, Blog.Comment
    has_one :cover, Blog.CoverImage
    # has_one :legacy, Blog.Legacy
    many_to_many :tags, Blog.Tag,
      join_through: "posts_tags",
      on_replace: :delete
    many_to_many :categories, Blog.Category, join_through: Blog.PostCategory
    belongs_to :parent, __MODULE__

    timestamps()
  end

  def changeset(post, attrs) do
    post
    |> cast(attrs, [:title, :body, :status])
    |> validate_required([:title, :body])
    |> validate_length(:title, min: 3, max: 120)
    |> validate_format(:title, ~r/^[A-Z(]/, message: "must start upper, or (")
    |> validate_inclusion(:status, [:draft, :published])
  end

  def publish_changeset(post, attrs \\ %{}) do
    post
    |> changeset(attrs)
    |> validate_required(:status)
    |> validate_number(:word_count, greater_than: 0)
    |> then(fn cs -> cs end)
  end

  def quick_changeset(post), do: change(post, status: :draft)

  defp validate_length(cs, field), do: cs
end
"#;

    #[test]
    fn test_module_and_table() {
        let model = mine(POST_SCHEMA);
        assert_eq!(model.module.as_deref(), Some("Blog.Post"));
        assert_eq!(model.source_table.as_deref(), Some("posts"));
    }

    #[test]
    fn test_virtual_fields() {
        let model = mine(POST_SCHEMA);
        let names: Vec<_> = model.virtual_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["password", "tags_input", "confirm"]);
        assert_eq!(model.virtual_fields[0].field_type, ":string");
        assert_eq!(model.virtual_fields[1].field_type, "{:array, :string}");
        assert_eq!(model.virtual_fields[2].field_type, ":boolean");
    }

    #[test]
    fn test_associations_in_source_order() {
        let model = mine(POST_SCHEMA);
        let summary: Vec<_> = model
            .associations
            .iter()
            .map(|a| (a.kind, a.name.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (AssociationKind::BelongsTo, "author"),
                (AssociationKind::BelongsTo, "editor"),
                (AssociationKind::HasMany, "comments"),
                (AssociationKind::HasOne, "cover"),
                (AssociationKind::ManyToMany, "tags"),
                (AssociationKind::ManyToMany, "categories"),
                (AssociationKind::BelongsTo, "parent"),
            ]
        );
    }

    #[test]
    fn test_association_options() {
        let model = mine(POST_SCHEMA);
        let editor = &model.associations[1];
        assert_eq!(editor.foreign_key.as_deref(), Some("edited_by_id"));
        assert_eq!(editor.local_column(), "edited_by_id");
        assert_eq!(model.associations[0].local_column(), "author_id");

        assert_eq!(model.associations[4].join_through.as_deref(), Some("posts_tags"));
        assert_eq!(
            model.associations[5].join_through.as_deref(),
            Some("Blog.PostCategory")
        );
        assert_eq!(model.associations[6].module, "Blog.Post");
    }

    #[test]
    fn test_validations() {
        let model = mine(POST_SCHEMA);
        let counts = model.validation_counts();
        assert_eq!(counts.get("required"), Some(&3));
        assert_eq!(counts.get("length"), Some(&1));
        assert_eq!(counts.get("format"), Some(&1));
        assert_eq!(counts.get("inclusion"), Some(&1));
        assert_eq!(counts.get("number"), Some(&1));

        assert!(model.validations.contains(&ValidationDirective::Length {
            field: "title".into(),
            options: "min: 3, max: 120".into(),
        }));
        assert!(model.validations.contains(&ValidationDirective::Format {
            field: "title".into(),
            pattern: "~r/^[A-Z(]/, message: \"must start upper, or (\"".into(),
        }));
        assert!(model.validations.contains(&ValidationDirective::Required {
            field: "status".into(),
        }));
    }

    #[test]
    fn test_mutation_functions() {
        let model = mine(POST_SCHEMA);
        let fns: Vec<_> = model
            .mutation_functions
            .iter()
            .map(|f| (f.name.as_str(), f.arity))
            .collect();
        assert_eq!(
            fns,
            vec![("changeset", 2), ("publish_changeset", 2), ("quick_changeset", 1)]
        );
        assert!(model.mutation_functions[0].body.contains("validate_inclusion"));
        assert!(!model.mutation_functions[0].body.contains("publish_changeset"));
        assert_eq!(
            model.mutation_functions[2].body,
            "change(post, status: :draft)"
        );
    }

    #[test]
    fn test_required_sigil_list() {
        let model = mine("cs |> validate_required(~w(name email)a)");
        let fields: Vec<_> = model.validations.iter().map(|v| v.field()).collect();
        assert_eq!(fields, vec!["name", "email"]);
    }

    #[test]
    fn test_required_fields_from_module_attributes() {
        let model = mine(
            r#"
defmodule Blog.Article do
  @required_fields ~w(title body)a
  @optional_fields [
    :summary,
    :slug
  ]

  def changeset(article, attrs) do
    article
    |> cast(attrs, @required_fields ++ @optional_fields)
    |> validate_required(@required_fields)
  end

  def admin_changeset(article, attrs) do
    article
    |> changeset(attrs)
    |> validate_required(@required_fields ++ @optional_fields)
  end
end
"#,
        );
        let fields: Vec<_> = model.validations.iter().map(|v| v.field()).collect();
        assert_eq!(fields, vec!["title", "body", "title", "body", "summary", "slug"]);
        assert_eq!(model.validation_counts().get("required"), Some(&6));
    }

    #[test]
    fn test_through_association() {
        let model = mine(
            r#"
schema "posts" do
  has_many :comments, Blog.Comment
  has_many :commenters, through: [:comments, :author]
end
"#,
        );
        let names: Vec<_> = model.associations.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["comments", "commenters"]);
        let commenters = &model.associations[1];
        assert_eq!(commenters.kind, AssociationKind::HasMany);
        assert!(commenters.module.is_empty());
        assert_eq!(commenters.through, vec!["comments", "author"]);
        assert!(model.associations[0].through.is_empty());
    }

    #[test]
    fn test_garbage_yields_empty_model() {
        assert!(mine("").is_empty());
        assert!(mine("}}}} (((( \"unterminated").is_empty());
        assert!(mine("validate_length(").is_empty());
    }
}
