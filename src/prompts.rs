//! Instruction prompts for course-evaluation summarisation.
//!
//! Every prompt lives here so wording changes touch exactly one file and
//! tests can inspect prompts without calling a model.
//!
//! Callers can override either prompt via
//! [`crate::config::SummaryConfig::instruction_prompt`] and
//! [`crate::config::SummaryConfig::synthesis_prompt`]; the constants here are
//! used only when no override is provided.

/// Heading the model is asked to use for rewritten criticism.
pub const SECTION_SUGGESTIONS: &str = "Constructive Suggestions for Improvement";

/// Heading the model is asked to use for quoted praise.
pub const SECTION_SUPPORTIVE: &str = "Supportive Student Comments";

/// Heading the model is asked to use for the closing overview.
pub const SECTION_SUMMARY: &str = "Summary";

/// Default per-chunk instruction. The chunk text is appended after it.
pub const DEFAULT_INSTRUCTION_PROMPT: &str = r#"Please analyze the following course evaluation text and extract feedback in the format below.

Instructions:
Extract TWO types of feedback:

Constructive Suggestions - Rewrite harsh or mean comments into professional, actionable feedback. Focus on the underlying educational concern rather than personal attacks.
Supportive Comments - Include positive, encouraging, or particularly kind student comments as direct quotes.

What to INCLUDE:
- Specific suggestions for course improvement
- Comments about teaching methods, materials, or organization
- Constructive criticism about pacing, clarity, or structure
- Requests for additional resources or support
- Positive feedback that highlights what works well
- Comments that show genuine engagement with the learning process

What to EXCLUDE:
- Personal attacks on the instructor's character
- Complaints without constructive suggestions
- Comments that are purely emotional venting
- Inappropriate or unprofessional language
- Repetitive complaints already captured elsewhere

Output Format (Markdown):

## Constructive Suggestions for Improvement

- **[Suggestion theme]** (mentioned by X students) - [Professional rewrite of the core concern]
- **[Individual unique suggestion]** (mentioned by 1 student) - [Specific concern]

## Supportive Student Comments

> "[Direct quote from positive feedback]"

> "[Another encouraging comment]"

## Summary

- **Most Common Concerns:** the top 3-4 themes that appeared most frequently
- **Key Strengths Highlighted:** main positive themes from supportive comments
- **Unique Suggestions:** one-off suggestions that might be worth considering

Output ONLY the Markdown report. Do not wrap it in code fences.

Course evaluation text:
"#;

/// Default synthesis instruction. The joined chunk analyses are appended.
pub const DEFAULT_SYNTHESIS_PROMPT: &str = r#"The following are several partial analyses of ONE set of course evaluations. The evaluations were too long to analyze at once, so each part covers a different section.

Merge them into a single cohesive report:
- Combine duplicate or overlapping themes into one entry and add up their "mentioned by" counts
- Keep the most representative supportive quotes; drop exact duplicates
- Rewrite the Summary so it reflects the whole set of evaluations

Use exactly the same format as the parts:

## Constructive Suggestions for Improvement
## Supportive Student Comments
## Summary

Output ONLY the merged Markdown report. Do not mention that the input was split into parts.

Partial analyses:
"#;

/// Delimiter placed between chunk analyses in the synthesis request.
pub const PART_DELIMITER: &str = "\n\n---\n\n";

/// Append the document text to an instruction prompt.
pub fn with_payload(instruction: &str, payload: &str) -> String {
    let mut prompt = String::with_capacity(instruction.len() + payload.len() + 2);
    prompt.push_str(instruction);
    if !instruction.ends_with('\n') {
        prompt.push('\n');
    }
    prompt.push_str(payload);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_names_every_section() {
        for section in [SECTION_SUGGESTIONS, SECTION_SUPPORTIVE, SECTION_SUMMARY] {
            assert!(DEFAULT_INSTRUCTION_PROMPT.contains(section), "missing {section}");
            assert!(DEFAULT_SYNTHESIS_PROMPT.contains(section), "missing {section}");
        }
    }

    #[test]
    fn payload_follows_instruction_on_its_own_line() {
        let p = with_payload("Analyze:", "great course");
        assert_eq!(p, "Analyze:\ngreat course");
        let p = with_payload("Analyze:\n", "great course");
        assert_eq!(p, "Analyze:\ngreat course");
    }
}
