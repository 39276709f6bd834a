//! Just enough Elixir lexing to keep the pattern scans honest.
//!
//! Nothing here builds a syntax tree. The helpers only know where string
//! literals, sigils and comments begin and end, so that bracket matching and
//! argument splitting are not fooled by a `)` inside a regex or a `,` inside
//! a message string. All delimiters are ASCII, so byte offsets produced here
//! are always valid char boundaries.

/// Comment-free source text plus the byte spans of its literals.
#[derive(Debug)]
pub(crate) struct Source {
    pub text: String,
    literals: Vec<(usize, usize)>,
}

impl Source {
    /// Blank out `#` comments (keeping offsets) and index literal spans.
    pub fn new(raw: &str) -> Self {
        let b = raw.as_bytes();
        let mut out = Vec::with_capacity(b.len());
        let mut literals = Vec::new();
        let mut i = 0;

        while i < b.len() {
            if let Some(end) = literal_end(b, i) {
                literals.push((i, end));
                out.extend_from_slice(&b[i..end]);
                i = end;
            } else if b[i] == b'#' {
                while i < b.len() && b[i] != b'\n' {
                    out.push(b' ');
                    i += 1;
                }
            } else {
                out.push(b[i]);
                i += 1;
            }
        }

        // Only ASCII bytes were substituted, so this cannot fail on UTF-8 input.
        let text = String::from_utf8(out).unwrap_or_else(|_| raw.to_string());
        Self { text, literals }
    }

    /// Whether a byte offset sits outside every string literal and sigil.
    pub fn is_code(&self, offset: usize) -> bool {
        let idx = self.literals.partition_point(|(start, _)| *start <= offset);
        idx == 0 || offset >= self.literals[idx - 1].1
    }
}

/// If a string, charlist or sigil starts at `i`, return the offset just past it.
fn literal_end(b: &[u8], i: usize) -> Option<usize> {
    match b[i] {
        b'"' if b[i..].starts_with(b"\"\"\"") => Some(
            find(b, i + 3, b"\"\"\"")
                .map(|j| j + 3)
                .unwrap_or(b.len()),
        ),
        b'"' | b'\'' => Some(closing(b, i + 1, b[i])),
        b'~' if i + 2 < b.len() && b[i + 1].is_ascii_alphabetic() => {
            let close = match b[i + 2] {
                b'(' => b')',
                b'[' => b']',
                b'{' => b'}',
                b'<' => b'>',
                d @ (b'/' | b'|' | b'"' | b'\'') => d,
                _ => return None,
            };
            let mut j = closing(b, i + 3, close);
            while j < b.len() && b[j].is_ascii_alphabetic() {
                j += 1;
            }
            Some(j)
        }
        _ => None,
    }
}

fn closing(b: &[u8], mut j: usize, close: u8) -> usize {
    while j < b.len() {
        if b[j] == b'\\' {
            j += 2;
            continue;
        }
        if b[j] == close {
            return j + 1;
        }
        j += 1;
    }
    b.len()
}

fn find(b: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    b.get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Arguments of a call whose opening `(` ends right before `after_open`.
///
/// Returns `None` when the parenthesis is never closed.
pub(crate) fn call_args(text: &str, after_open: usize) -> Option<&str> {
    let b = text.as_bytes();
    let mut depth = 1usize;
    let mut i = after_open;

    while i < b.len() {
        if let Some(end) = literal_end(b, i) {
            i = end;
            continue;
        }
        match b[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[after_open..i]);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split an argument list on top-level commas.
pub(crate) fn split_args(args: &str) -> Vec<&str> {
    let b = args.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < b.len() {
        if let Some(end) = literal_end(b, i) {
            i = end;
            continue;
        }
        match b[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(args[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Body of the `do ... end` block (or `do:` one-liner) that follows `from`.
///
/// Depth counting treats `do` and `fn` as openers and `end` as the closer.
/// An unterminated block yields the rest of the text.
pub(crate) fn block_body(text: &str, from: usize) -> Option<&str> {
    let b = text.as_bytes();
    let mut i = from;
    let mut depth = 0usize;
    let mut body_start: Option<usize> = None;

    while i < b.len() {
        if let Some(end) = literal_end(b, i) {
            i = end;
            continue;
        }
        let c = b[i];
        if !(c.is_ascii_alphabetic() || c == b'_') {
            i += 1;
            continue;
        }

        let word_start = i;
        while i < b.len() && (b[i].is_ascii_alphanumeric() || matches!(b[i], b'_' | b'?' | b'!')) {
            i += 1;
        }
        let word = &text[word_start..i];
        let prefixed = word_start > 0 && matches!(b[word_start - 1], b':' | b'.');
        let keyword = b.get(i) == Some(&b':');
        if prefixed {
            continue;
        }

        match (word, keyword) {
            ("do", true) if body_start.is_none() => {
                let line_end = text[i + 1..].find('\n').map_or(text.len(), |p| p + i + 1);
                return Some(text[i + 1..line_end].trim());
            }
            ("do", false) => match body_start {
                None => {
                    body_start = Some(i);
                    depth = 1;
                }
                Some(_) => depth += 1,
            },
            ("fn", false) if body_start.is_some() => depth += 1,
            ("end", false) => {
                if let Some(start) = body_start {
                    depth -= 1;
                    if depth == 0 {
                        return Some(text[start..word_start].trim());
                    }
                }
            }
            _ => {}
        }
    }

    body_start.map(|start| text[start..].trim())
}
