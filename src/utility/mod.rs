use std::sync::LazyLock;

use regex::Regex;

static FIELD_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\s)::(\S+)").unwrap());

/// Value of a `::slot` field in a double-colon delimited line.
///
/// `"::s1 of course ::s2 ::cost 0.3"` yields `Some("0.3")` for `cost` and
/// `Some("")` for `s2`. The value runs up to the next `::field` marker or
/// the end of the line. A repeated field yields its last value.
pub fn slot_value(line: &str, slot: &str) -> Option<String> {
    let markers: Vec<_> = FIELD_MARKER.captures_iter(line).collect();
    markers.iter().enumerate().rev().find_map(|(i, caps)| {
        if caps.get(1)?.as_str() != slot {
            return None;
        }
        let start = caps.get(0)?.end();
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(line.len(), |next| next.start());
        Some(line[start..end].trim().to_string())
    })
}

/// Like [`slot_value`], but an empty value counts as absent.
pub fn non_empty_slot_value(line: &str, slot: &str) -> Option<String> {
    slot_value(line, slot).filter(|v| !v.is_empty())
}

/// True when `s` is wrapped in one pair of parentheses that close each other,
/// e.g. `(A B)` but not `(A) (B)`.
pub fn has_matching_outer_parentheses(s: &str) -> bool {
    if !s.starts_with('(') || !s.ends_with(')') {
        return false;
    }
    let last = s.len() - 1;
    let mut open = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' => open += 1,
            ')' => open -= 1,
            _ => {}
        }
        if open <= 0 && i < last {
            return false;
        }
    }
    open == 0
}

/// Wraps a multi-token DAIDE expression in parentheses unless it already is one.
pub fn parenthesize_compound(s: &str) -> String {
    if s.contains(' ') && !has_matching_outer_parentheses(s) {
        format!("({s})")
    } else {
        s.to_string()
    }
}

/// Capitalizes the first letter and appends a period.
pub fn finish_clause(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}
