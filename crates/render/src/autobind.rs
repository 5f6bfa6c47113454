//! Lexical automatic parameter binding as a source-text preprocessing
//! pass, run once before a template source is handed to `minijinja`.
//!
//! Some Jinja-based templaters hook this into the lexer itself via an
//! extension that rewrites every `{{ expr }}` output node that doesn't
//! already end in `bind`, `inclause`, `identifier`, or `sqlsafe` to
//! `{{ (expr)|bind("name") }}` at the token-stream level, so no
//! expression can reach rendered SQL without passing through a filter
//! that knows how to escape or bind it.
//!
//! `minijinja` has no equivalent lexer-extension hook, so this module
//! performs the same rewrite one layer down, directly on the template
//! source text, before compilation. It only needs to find the boundaries
//! of `{{ ... }}` blocks (respecting string literals, so a `}}` inside a
//! quoted string doesn't end the block early) and, for each one, decide
//! whether its filter chain already ends "safe".

const SAFE_TERMINAL_FILTERS: [&str; 4] = ["bind", "inclause", "identifier", "sqlsafe"];

/// Rewrite every unguarded `{{ expr }}` in `source` to `{{ (expr)|bind("name") }}`.
///
/// `{% ... %}` statement blocks and `{# ... #}` comments are copied
/// through untouched; only `{{ ... }}` output expressions are rewritten.
pub fn auto_bind(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + source.len() / 4);
    let mut counter = 0usize;
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0usize;
    let n = chars.len();

    while i < n {
        if starts_with(&chars, i, "{{") {
            let (expr, consumed) = scan_expr_block(&chars, i);
            out.push_str(&rewrite_expr(&expr, &mut counter));
            i += consumed;
        } else if starts_with(&chars, i, "{%") {
            let consumed = scan_verbatim_block(&chars, i, "%}");
            out.extend(&chars[i..i + consumed]);
            i += consumed;
        } else if starts_with(&chars, i, "{#") {
            let consumed = scan_verbatim_block(&chars, i, "#}");
            out.extend(&chars[i..i + consumed]);
            i += consumed;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn starts_with(chars: &[char], at: usize, pat: &str) -> bool {
    let pat: Vec<char> = pat.chars().collect();
    at + pat.len() <= chars.len() && chars[at..at + pat.len()] == pat[..]
}

/// Scan a `{{ ... }}` block starting at `start` (which points at the
/// opening `{`). Returns the raw inner text (without delimiters or
/// whitespace-control `-` markers) and the number of source chars
/// consumed, including delimiters.
fn scan_expr_block(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start + 2;
    let mut in_str: Option<char> = None;
    let mut depth = 0i32;
    let content_start = i;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = in_str {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == q {
                in_str = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => {
                in_str = Some(c);
                i += 1;
            }
            '(' | '[' => {
                depth += 1;
                i += 1;
            }
            ')' | ']' => {
                depth -= 1;
                i += 1;
            }
            '}' if depth <= 0 && i + 1 < chars.len() && chars[i + 1] == '}' => {
                let inner: String = chars[content_start..i].iter().collect();
                return (strip_whitespace_control(&inner), i + 2 - start);
            }
            _ => i += 1,
        }
    }
    // unterminated block: treat the rest of the source as inert text.
    let _ = content_start;
    (String::new(), chars.len() - start)
}

/// Scan a `{% ... %}` or `{# ... #}` block verbatim (string-aware only
/// for `{% %}`, since comments can't contain nested delimiters that
/// matter here). Returns the number of chars consumed including both
/// delimiters.
fn scan_verbatim_block(chars: &[char], start: usize, end_delim: &str) -> usize {
    let end: Vec<char> = end_delim.chars().collect();
    let mut i = start + 2;
    let mut in_str: Option<char> = None;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = in_str {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == q {
                in_str = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => {
                in_str = Some(c);
                i += 1;
            }
            _ if i + end.len() <= chars.len() && chars[i..i + end.len()] == end[..] => {
                return i + end.len() - start;
            }
            _ => i += 1,
        }
    }
    chars.len() - start
}

fn strip_whitespace_control(inner: &str) -> String {
    let mut s = inner.trim();
    s = s.strip_prefix('-').unwrap_or(s);
    s = s.strip_suffix('-').unwrap_or(s);
    s.trim().to_string()
}

fn rewrite_expr(expr: &str, counter: &mut usize) -> String {
    if expr.is_empty() {
        return "{{  }}".to_string();
    }
    if let Some(name) = last_filter_name(expr) {
        if SAFE_TERMINAL_FILTERS.contains(&name.as_str()) {
            return format!("{{{{ {expr} }}}}");
        }
    }
    let name = derive_param_name(expr, counter);
    format!("{{{{ ({expr})|bind(\"{name}\") }}}}")
}

/// The name of the last top-level (paren/bracket/brace-depth-0,
/// outside any string literal) filter in `expr`'s pipe chain, if any.
fn last_filter_name(expr: &str) -> Option<String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut depth = 0i32;
    let mut in_str: Option<char> = None;
    let mut last_pipe = None;
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = in_str {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == q {
                in_str = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => in_str = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '|' if depth == 0 => last_pipe = Some(i),
            _ => {}
        }
        i += 1;
    }
    let idx = last_pipe?;
    let after: String = chars[idx + 1..].iter().collect();
    let after = after.trim_start();
    let end = after
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(after.len());
    if end == 0 {
        None
    } else {
        Some(after[..end].to_string())
    }
}

/// Derive a default bind-parameter name from an expression, mirroring
/// `extension.py`'s `extract_param_name`: strip a trailing call's
/// arguments and a trailing index's brackets (preferring a string-literal
/// index key as the name), then take the final identifier segment.
/// Falls back to a counter-based name when nothing identifier-like
/// survives (e.g. a literal or expression with no named tail).
fn derive_param_name(expr: &str, counter: &mut usize) -> String {
    let mut s = expr.trim();

    if s.ends_with(')') {
        if let Some(open) = matching_open(s, s.len() - 1, '(', ')') {
            s = s[..open].trim_end();
        }
    }
    if s.ends_with(']') {
        if let Some(open) = matching_open(s, s.len() - 1, '[', ']') {
            let inner = s[open + 1..s.len() - 1].trim();
            if let Some(lit) = string_literal_value(inner) {
                return sanitize(&lit, counter);
            }
            s = s[..open].trim_end();
        }
    }

    let ident_start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    sanitize(&s[ident_start..], counter)
}

fn matching_open(s: &str, close_idx: usize, open: char, close: char) -> Option<usize> {
    let chars: Vec<char> = s.chars().collect();
    let mut depth = 0i32;
    let mut i = close_idx as isize;
    while i >= 0 {
        let c = chars[i as usize];
        if c == close {
            depth += 1;
        } else if c == open {
            depth -= 1;
            if depth == 0 {
                return Some(i as usize);
            }
        }
        i -= 1;
    }
    None
}

fn string_literal_value(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = s.chars().next().unwrap();
        let last = s.chars().last().unwrap();
        if (first == '"' || first == '\'') && first == last {
            return Some(s[1..s.len() - 1].to_string());
        }
    }
    None
}

fn sanitize(candidate: &str, counter: &mut usize) -> String {
    let valid = !candidate.is_empty()
        && !candidate.chars().next().unwrap().is_ascii_digit()
        && candidate.chars().all(|c| c.is_alphanumeric() || c == '_');
    if valid {
        candidate.to_string()
    } else {
        *counter += 1;
        format!("param_{counter}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_variable_gets_wrapped_and_named() {
        let out = auto_bind("select * from t where id = {{ task.id }}");
        assert_eq!(out, "select * from t where id = {{ (task.id)|bind(\"id\") }}");
    }

    #[test]
    fn already_bound_expression_is_left_alone() {
        let out = auto_bind("where id = {{ task.id | bind(\"task_id\") }}");
        assert_eq!(out, "where id = {{ task.id | bind(\"task_id\") }}");
    }

    #[test]
    fn sqlsafe_and_identifier_filters_are_recognized_as_safe() {
        assert_eq!(
            auto_bind("{{ 'x' | sqlsafe }}"),
            "{{ 'x' | sqlsafe }}"
        );
        assert_eq!(
            auto_bind("{{ table_name | identifier }}"),
            "{{ table_name | identifier }}"
        );
    }

    #[test]
    fn statement_and_comment_blocks_are_untouched() {
        let src = "{% if x %}{{ y }}{% endif %}{# a comment with {{ braces }} #}";
        let out = auto_bind(src);
        assert!(out.starts_with("{% if x %}"));
        assert!(out.contains("(y)|bind(\"y\")"));
        assert!(out.ends_with("{# a comment with {{ braces }} #}"));
    }

    #[test]
    fn string_literal_containing_double_brace_does_not_end_block_early() {
        let out = auto_bind(r#"{{ "literal }} text" }}"#);
        assert!(out.contains("bind"));
    }

    #[test]
    fn call_expression_derives_name_from_callee() {
        let out = auto_bind("{{ resolve_status(x) }}");
        assert!(out.contains("bind(\"resolve_status\")"));
    }

    #[test]
    fn string_index_derives_name_from_key() {
        let out = auto_bind(r#"{{ row["user_id"] }}"#);
        assert!(out.contains("bind(\"user_id\")"));
    }

    #[test]
    fn unnameable_literal_falls_back_to_counter() {
        let out = auto_bind("{{ 42 }}");
        assert!(out.contains("bind(\"param_1\")"));
    }
}
