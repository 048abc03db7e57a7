//! Word-aligned chunking under a character budget.
//!
//! Lengths are counted in `char`s, not bytes, so accented names and curly
//! quotes in student comments do not shrink the effective budget.

/// Greedily pack whitespace-separated words into chunks of at most
/// `max_chars` characters, joining words with a single space.
///
/// A word longer than the budget is placed in a chunk of its own. Word order
/// is preserved and no word is dropped or duplicated. Empty input yields no
/// chunks. A budget of 0 behaves like 1.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let budget = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if needed > budget && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(chunks: &[String]) -> Vec<&str> {
        chunks.iter().flat_map(|c| c.split_whitespace()).collect()
    }

    #[test]
    fn packs_greedily() {
        let chunks = chunk_text("aa bb cc dd", 5);
        assert_eq!(chunks, vec!["aa bb", "cc dd"]);
    }

    #[test]
    fn every_chunk_within_budget_and_words_preserved() {
        let text = "The pacing was too fast in weeks three and four but the labs were \
                    excellent and the instructor always answered questions";
        for budget in [1, 7, 12, 20, 45, 500] {
            let chunks = chunk_text(text, budget);
            for c in &chunks {
                let len = c.chars().count();
                assert!(
                    len <= budget || !c.contains(' '),
                    "budget {budget}: chunk {c:?} has {len} chars"
                );
            }
            assert_eq!(words(&chunks), text.split_whitespace().collect::<Vec<_>>());
        }
    }

    #[test]
    fn oversized_word_stands_alone() {
        let chunks = chunk_text("ok supercalifragilistic ok", 6);
        assert_eq!(chunks, vec!["ok", "supercalifragilistic", "ok"]);
    }

    #[test]
    fn no_whitespace_gives_one_chunk() {
        let chunks = chunk_text("abcdefghij", 3);
        assert_eq!(chunks, vec!["abcdefghij"]);
    }

    #[test]
    fn empty_input_gives_no_chunks() {
        assert!(chunk_text("   \n\t ", 10).is_empty());
    }

    #[test]
    fn budget_counts_chars_not_bytes() {
        let chunks = chunk_text("éé éé", 5);
        assert_eq!(chunks, vec!["éé éé"]);
    }

    #[test]
    fn zero_budget_behaves_like_one() {
        assert_eq!(chunk_text("a b", 0), vec!["a", "b"]);
    }
}
