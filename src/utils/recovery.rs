//! Partial-result recovery for structured worker output.
//!
//! Language-model workers answer with JSON that is sometimes wrapped in a
//! markdown code fence or cut off by a token limit. [`recover_json`] strips
//! the fence, parses, and if parsing fails tries to salvage the longest
//! prefix that ends on a complete `}` or `]` by appending the missing
//! closers.
//!
//! Contract: recovery may silently drop trailing incomplete records. The
//! [`Recovery`] outcome tells callers whether that happened so they can log it.

use serde_json::Value;

/// Upper bound on cut points tried while repairing.
const MAX_REPAIR_ATTEMPTS: usize = 64;

/// Outcome of parsing structured worker output.
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    /// Parsed as-is.
    Clean(Value),
    /// Parsed after truncation repair; trailing records may be lost.
    Repaired(Value),
    /// Nothing to parse.
    Empty,
    /// Unparseable even after repair.
    Failed { error: String },
}

impl Recovery {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Recovery::Clean(v) | Recovery::Repaired(v) => Some(v),
            Recovery::Empty | Recovery::Failed { .. } => None,
        }
    }

    pub fn was_repaired(&self) -> bool {
        matches!(self, Recovery::Repaired(_))
    }
}

/// Strip a surrounding markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fence(raw: &str) -> &str {
    let raw = raw.trim();
    let marker = if raw.contains("```json") {
        "```json"
    } else if raw.contains("```") {
        "```"
    } else {
        return raw;
    };
    let Some(start) = raw.find(marker) else {
        return raw;
    };
    let body = &raw[start + marker.len()..];
    let body = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

/// Parse worker output, repairing truncation when needed.
pub fn recover_json(raw: &str) -> Recovery {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Recovery::Empty;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Recovery::Clean(value),
        Err(e) => match repair_truncated_json(body) {
            Some(value) => Recovery::Repaired(value),
            None => Recovery::Failed {
                error: e.to_string(),
            },
        },
    }
}

/// Try to close a JSON document that was cut off mid-way.
///
/// Walks back over the positions of `}` and `]`, cutting the input right after
/// each one and appending the closers still open at that point. The first
/// prefix that parses wins, so the result keeps as many complete records as
/// possible.
pub fn repair_truncated_json(raw: &str) -> Option<Value> {
    let cut_points = raw
        .char_indices()
        .rev()
        .filter(|(_, c)| *c == '}' || *c == ']')
        .map(|(i, _)| i)
        .filter(|i| *i > 0)
        .take(MAX_REPAIR_ATTEMPTS);

    for end in cut_points {
        let prefix = raw[..=end].trim_end();
        let Some(closers) = unclosed_closers(prefix) else {
            continue;
        };
        let candidate = format!("{}{}", prefix, closers);
        if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
            return Some(value);
        }
    }
    None
}

/// Closing characters needed to balance `prefix`, innermost first.
///
/// Returns `None` when the prefix ends inside a string or has a mismatched
/// closer, since no suffix of closers can fix either.
fn unclosed_closers(prefix: &str) -> Option<String> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in prefix.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
            }
            _ => {}
        }
    }

    if in_string {
        return None;
    }
    Some(stack.iter().rev().collect())
}
