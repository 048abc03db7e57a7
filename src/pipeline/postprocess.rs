//! Post-processing: deterministic cleanup of model-generated Markdown.
//!
//! Even a well-prompted model sometimes wraps its answer in a
//! ```` ```markdown ```` fence, opens with "Here is the analysis:", or writes
//! the section names as plain `Summary:` lines instead of headings. These
//! cheap rules fix that without touching content, so the prompt can stay
//! focused on *what* to extract.
//!
//! ## Rule Order
//!
//! Normalise line endings before anything line-based, strip fences before
//! the preamble rule so it sees the real first line, and promote section
//! labels before heading spacing so the new headings get blank lines.

use crate::prompts::{SECTION_SUGGESTIONS, SECTION_SUMMARY, SECTION_SUPPORTIVE};
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to one model response.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip outer markdown fences
/// 3. Drop a conversational preamble line ("Here is …:")
/// 4. Trim trailing whitespace per line
/// 5. Promote bare section labels to `##` headings
/// 6. Ensure heading lines have a blank line before them
/// 7. Collapse 3+ consecutive blank lines down to 1
/// 8. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 9. Trim leading and trailing blank space
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_markdown_fences(&s);
    let s = drop_preamble(&s);
    let s = trim_trailing_whitespace(&s);
    let s = promote_section_labels(&s);
    let s = normalise_heading_spacing(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 3: Drop conversational preamble ─────────────────────────────────────

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(here is|here's|below is|sure[,!])[^\n]*:\s*(\n|$)").unwrap()
});

fn drop_preamble(input: &str) -> String {
    RE_PREAMBLE.replace(input, "").to_string()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Promote section labels ───────────────────────────────────────────

/// `Summary:`, `**Summary:**`, `### Summary` → `## Summary`
fn promote_section_labels(input: &str) -> String {
    input
        .lines()
        .map(|line| match section_label(line) {
            Some(section) => format!("## {section}"),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section_label(line: &str) -> Option<&'static str> {
    let bare = line
        .trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim()
        .trim_end_matches(':')
        .trim();
    [SECTION_SUGGESTIONS, SECTION_SUPPORTIVE, SECTION_SUMMARY]
        .into_iter()
        .find(|s| bare.eq_ignore_ascii_case(s))
}

// ── Rule 6: Normalise heading spacing ────────────────────────────────────────

fn normalise_heading_spacing(input: &str) -> String {
    let mut result = String::with_capacity(input.len() + 64);
    for (i, line) in input.lines().enumerate() {
        let is_heading = line.starts_with('#');
        if is_heading && i > 0 {
            let trimmed = result.trim_end_matches('\n');
            result.truncate(trimmed.len());
            result.push_str("\n\n");
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}

// ── Rule 7: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 8: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n## Summary\nGood\n```";
        assert_eq!(strip_markdown_fences(input), "## Summary\nGood");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "## Summary\nGood";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_drop_preamble() {
        let input = "Here is the structured feedback:\n## Summary";
        assert_eq!(drop_preamble(input), "## Summary");
        let keep = "Here students asked for more examples.";
        assert_eq!(drop_preamble(keep), keep);
    }

    #[test]
    fn test_promote_section_labels() {
        let input = "Constructive Suggestions for Improvement:\n- a\n**Supportive Student Comments:**\n### summary";
        let out = promote_section_labels(input);
        assert_eq!(
            out,
            "## Constructive Suggestions for Improvement\n- a\n## Supportive Student Comments\n## Summary"
        );
    }

    #[test]
    fn test_label_inside_sentence_untouched() {
        assert!(section_label("Summary: students liked the labs").is_none());
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "great\u{200B}course\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "greatcourse");
    }

    #[test]
    fn test_clean_markdown_end_to_end() {
        let raw = "```markdown\r\nSure! Here is the analysis:\r\nConstructive Suggestions for Improvement:\r\n- Slow down   \r\nSummary:\r\n- Pacing\r\n```";
        let out = clean_markdown(raw);
        assert_eq!(
            out,
            "## Constructive Suggestions for Improvement\n- Slow down\n\n## Summary\n- Pacing"
        );
    }
}
