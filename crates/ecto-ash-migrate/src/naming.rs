//! Identifier heuristics shared by the reconciler and the synthesizer.
//!
//! Every function here is a pure string transform. Inflection works on the
//! last `_`-separated segment only, so `order_item` pluralizes to
//! `order_items` and `people_group` keeps its prefix untouched.
//!
//! # Edge cases
//!
//! - Words already ending in a plural `s` are left alone by [`pluralize`]
//!   (`comments`, `skus`, `taxis` stay as they are). Only `ss`, `sis`,
//!   `xis`, `sus` and `tus` endings plus a short list of Latin nouns
//!   (`bus`, `campus`, `virus`) are treated as singular.
//! - Consonant + `y` becomes `ies`; vowel + `y` just takes an `s`.
//! - Sibilant endings (`x`, `z`, `ch`, `sh`, `ss`) take `es`.
//! - A small table of irregular and uncountable nouns is consulted first.

/// Nouns with identical singular and plural forms.
const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "fish",
    "information",
    "metadata",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
];

/// (singular, plural) pairs that do not follow the suffix rules.
const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("man", "men"),
    ("mouse", "mice"),
    ("person", "people"),
    ("woman", "women"),
];

/// Nouns ending in `s` that are singular despite the suffix rules.
const SINGULAR_S: &[&str] = &[
    "alias", "bonus", "bus", "campus", "chorus", "circus", "corpus", "focus", "fungus", "genus",
    "iris", "minus", "nucleus", "octopus", "plus", "radius", "sinus", "stimulus", "surplus",
    "syllabus", "thesaurus", "virus", "walrus",
];

/// Whether a lowercase word ending in `s` is a singular noun.
fn is_singular_s(lower: &str) -> bool {
    lower.ends_with("ss")
        || lower.ends_with("sis")
        || lower.ends_with("xis")
        || lower.ends_with("sus")
        || lower.ends_with("tus")
        || SINGULAR_S.contains(&lower)
}

fn split_last_segment(word: &str) -> (&str, &str) {
    match word.rfind('_') {
        Some(idx) => (&word[..=idx], &word[idx + 1..]),
        None => ("", word),
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Pluralize a snake_case noun. Idempotent on regular plurals.
pub fn pluralize(word: &str) -> String {
    let (prefix, tail) = split_last_segment(word);
    if tail.is_empty() {
        return word.to_string();
    }
    let lower = tail.to_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return format!("{}{}", prefix, plural);
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == lower) {
        return word.to_string();
    }

    let plural_tail = if (lower.ends_with("sis") || lower.ends_with("xis")) && lower.len() > 3 {
        format!("{}es", &tail[..tail.len() - 2])
    } else if is_singular_s(&lower)
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{}es", tail)
    } else if lower.ends_with('s') {
        tail.to_string()
    } else if lower.ends_with('y')
        && lower
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| !is_vowel(c))
    {
        format!("{}ies", &tail[..tail.len() - 1])
    } else {
        format!("{}s", tail)
    };

    format!("{}{}", prefix, plural_tail)
}

/// Singularize a snake_case noun. Idempotent on regular singulars.
pub fn singularize(word: &str) -> String {
    let (prefix, tail) = split_last_segment(word);
    if tail.is_empty() {
        return word.to_string();
    }
    let lower = tail.to_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == lower) {
        return format!("{}{}", prefix, singular);
    }
    if IRREGULAR.iter().any(|(singular, _)| *singular == lower) {
        return word.to_string();
    }

    let strip = |n: usize| tail[..tail.len() - n].to_string();

    let singular_tail = if lower.ends_with("ies") && lower.len() > 4 {
        format!("{}y", strip(3))
    } else if lower.ends_with("sses")
        || lower.ends_with("xes")
        || lower.ends_with("ches")
        || lower.ends_with("shes")
        || lower.ends_with("zzes")
    {
        strip(2)
    } else if lower.ends_with("uses") {
        // statuses -> status, but houses -> house
        let before = lower.chars().rev().nth(4);
        if before.is_some_and(|c| !is_vowel(c)) {
            strip(2)
        } else {
            strip(1)
        }
    } else if is_singular_s(&lower) {
        tail.to_string()
    } else if lower.ends_with('s') && lower.len() > 1 {
        strip(1)
    } else {
        tail.to_string()
    };

    format!("{}{}", prefix, singular_tail)
}

/// Convert an identifier in any common casing to snake_case.
///
/// Word boundaries are lower→upper transitions, the end of an acronym
/// (`HTTPRequest` → `http_request`), and any non-alphanumeric separator.
pub fn snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out.trim_end_matches('_').to_string()
}

/// Convert snake_case to CamelCase (`order_item` → `OrderItem`).
pub fn camelize(input: &str) -> String {
    input
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Map a legacy module reference to the table name it conventionally owns.
///
/// Takes the last module segment, snake-cases it and pluralizes it:
/// `Blog.Comments.Comment` → `comments`, `MyApp.OrderItem` → `order_items`.
pub fn module_to_table(module: &str) -> String {
    let last = module.rsplit('.').next().unwrap_or(module);
    pluralize(&snake_case(last))
}

/// Strip a trailing `_id` from a column name. Returns `None` when the
/// column has no such suffix or nothing would be left.
pub fn strip_id_suffix(column: &str) -> Option<&str> {
    column
        .strip_suffix("_id")
        .filter(|stem| !stem.is_empty())
}

/// Module name of the generated resource for a table.
pub fn resource_module(namespace: &str, table: &str) -> String {
    format!("{}.{}", namespace, camelize(&singularize(table)))
}

/// File stem of the generated resource for a table.
pub fn resource_file_stem(table: &str) -> String {
    singularize(&snake_case(table))
}

/// Deterministic identity name for a unique column set.
pub fn identity_name(columns: &[String]) -> String {
    format!("unique_{}", columns.join("_"))
}

/// Render a name as an atom literal, quoting it when it is not a bare
/// identifier (`in-progress` → `:"in-progress"`).
pub fn atom_literal(name: &str) -> String {
    let body = name.strip_suffix(['?', '!']).unwrap_or(name);
    let bare = body
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && body.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if bare {
        format!(":{}", name)
    } else {
        format!(":{}", string_literal(name))
    }
}

/// Render a double-quoted string literal with `\`, `"` and `#{` escaped.
pub fn string_literal(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("#{", "\\#{");
    format!("\"{}\"", escaped)
}
