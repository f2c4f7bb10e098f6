//! Lenient recovery of a JSON value from model text.

use serde_json::Value;

/// Upper bound on balanced-slice candidates tried in one text.
const MAX_SLICE_CANDIDATES: usize = 32;
/// Upper bound on cut-back rounds when repairing truncated output.
const MAX_REPAIR_ROUNDS: usize = 16;

/// Parse `text` as JSON, tolerating surrounding prose, trailing commas, and
/// output that was cut off mid-value.
pub fn parse_lenient(text: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return Some(v);
    }

    let mut from = 0;
    for _ in 0..MAX_SLICE_CANDIDATES {
        let Some((start, end)) = balanced_span(text, from) else {
            break;
        };
        let slice = &text[start..end];
        if let Ok(v) = serde_json::from_str::<Value>(slice) {
            return Some(v);
        }
        if let Ok(v) = serde_json::from_str::<Value>(&strip_trailing_commas(slice)) {
            return Some(v);
        }
        from = start + 1;
    }

    let repaired = repair_truncated(text)?;
    serde_json::from_str(&repaired).ok()
}

/// Byte span of the first balanced `{..}` or `[..]` block starting at or
/// after `from`. Brackets inside string literals are ignored.
pub fn balanced_span(text: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut search = from;

    'outer: while search < bytes.len() {
        let start = search + bytes[search..].iter().position(|b| matches!(b, b'{' | b'['))?;
        let mut stack: Vec<u8> = Vec::new();
        let mut in_str = false;
        let mut escape = false;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if in_str {
                if escape {
                    escape = false;
                } else if b == b'\\' {
                    escape = true;
                } else if b == b'"' {
                    in_str = false;
                }
                continue;
            }
            match b {
                b'"' => in_str = true,
                b'{' => stack.push(b'}'),
                b'[' => stack.push(b']'),
                b'}' | b']' => {
                    if stack.pop() != Some(b) {
                        // mismatched closer, try the next opener
                        search = start + 1;
                        continue 'outer;
                    }
                    if stack.is_empty() {
                        return Some((start, i + 1));
                    }
                }
                _ => {}
            }
        }
        return None;
    }
    None
}

/// Remove commas that directly precede `}` or `]`, outside string literals.
pub fn strip_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_str = false;
    let mut escape = false;
    for (i, c) in input.char_indices() {
        if in_str {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_str = false;
            }
            out.push(c);
            continue;
        }
        match c {
            '"' => {
                in_str = true;
                out.push(c);
            }
            ',' => {
                let next = input[i + 1..].trim_start().chars().next();
                if !matches!(next, Some('}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

struct ScanState {
    closers: Vec<char>,
    in_string: bool,
    last_comma: Option<usize>,
}

fn scan(text: &str) -> ScanState {
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    let mut last_comma = None;

    for (i, c) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                closers.pop();
            }
            ',' => last_comma = Some(i),
            _ => {}
        }
    }
    ScanState {
        closers,
        in_string,
        last_comma,
    }
}

/// Close a JSON value that was cut off before its end.
///
/// Open strings and containers are closed; when the tail is an incomplete
/// member, the text is cut back to the previous separator and closed again.
/// Returns `None` when the text is not truncated JSON or cannot be repaired.
pub fn repair_truncated(text: &str) -> Option<String> {
    let start = text.find(['{', '['])?;
    let mut candidate = text[start..].trim_end().to_string();

    for _ in 0..MAX_REPAIR_ROUNDS {
        let state = scan(&candidate);
        if state.closers.is_empty() && !state.in_string {
            return None;
        }

        let mut attempt = candidate.clone();
        if state.in_string {
            attempt.push('"');
        }
        let mut attempt = attempt
            .trim_end()
            .trim_end_matches([',', ':'])
            .to_string();
        attempt.extend(state.closers.iter().rev());
        let attempt = strip_trailing_commas(&attempt);

        if serde_json::from_str::<Value>(&attempt).is_ok() {
            return Some(attempt);
        }

        let cut = state.last_comma?;
        candidate.truncate(cut);
    }
    None
}
