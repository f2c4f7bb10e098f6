//! Markdown code-fence stripping.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A complete fenced block, optionally tagged (```json, ```JSON5, ...).
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```")
            .expect("fence pattern is valid");
}

const FENCE: &str = "```";

/// Remove Markdown code fences and trim surrounding whitespace.
///
/// Text that opens with a fence only loses that outer wrapper, so code blocks
/// inside the payload survive. Otherwise complete blocks are replaced by
/// their body and the prose around them is kept. A dangling opening fence
/// (output cut off before the closing one) loses its language tag.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains(FENCE) {
        return trimmed.to_string();
    }

    if let Some(rest) = trimmed.strip_prefix(FENCE) {
        let body = rest.strip_suffix(FENCE).unwrap_or(rest);
        return skip_language_tag(body).trim().to_string();
    }

    let replaced = FENCED_BLOCK.replace_all(trimmed, "${1}");
    let out = replaced.trim();
    out.strip_suffix(FENCE).unwrap_or(out).trim().to_string()
}

/// Drop a `json`/`JSON5`/... tag and the line break following it.
fn skip_language_tag(body: &str) -> &str {
    let rest = body.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || "_+-".contains(c));
    let rest = rest.trim_start_matches([' ', '\t']);
    rest.strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_trimmed() {
        assert_eq!(strip_code_fences("  {\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn tagged_fence_is_removed() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn untagged_single_line_fence() {
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn prose_around_fence_is_kept() {
        assert_eq!(
            strip_code_fences("Sure! ```json\n{\"topic\":\"Cats\"}\n```"),
            "Sure! {\"topic\":\"Cats\"}"
        );
    }

    #[test]
    fn dangling_opening_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": [1, 2"), "{\"a\": [1, 2");
    }

    #[test]
    fn inner_code_block_survives_outer_fence() {
        let text = "```json\n{\"answer\": \"Run:\\n```rust\\nfn main() {}\\n```\"}\n```";
        assert_eq!(
            strip_code_fences(text),
            "{\"answer\": \"Run:\\n```rust\\nfn main() {}\\n```\"}"
        );
    }

    #[test]
    fn closing_fence_after_prose_is_dropped() {
        assert_eq!(strip_code_fences("Here you go:\n{\"a\":1}\n```"), "Here you go:\n{\"a\":1}");
    }
}
