//! Query gate: cheap rejection of queries too short or unstructured to be
//! worth an embedding call.

/// Interrogative and auxiliary words that mark a query as a question.
pub const QUESTION_WORDS: [&str; 12] = [
    "what", "where", "when", "who", "why", "how", "which", "is", "are", "can", "do", "does",
];

/// Minimum length (in characters) of the trimmed query.
pub const MIN_QUERY_LEN: usize = 3;

/// Minimum length (in characters) of a single-word query.
pub const MIN_SINGLE_WORD_LEN: usize = 4;

/// Decide whether `query` deserves retrieval work.
///
/// - trimmed, lowercased length below [`MIN_QUERY_LEN`] → reject
/// - one token → accept iff at least [`MIN_SINGLE_WORD_LEN`] characters
/// - several tokens → accept if any token is a [`QUESTION_WORDS`] entry,
///   or if there are at least two tokens
///
/// The last rule accepts every multi-token query, which makes the
/// question-word check unreachable in practice. It is kept as is.
pub fn is_meaningful(query: &str) -> bool {
    let normalized = query.trim().to_lowercase();
    if normalized.chars().count() < MIN_QUERY_LEN {
        return false;
    }

    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.len() == 1 {
        return tokens[0].chars().count() >= MIN_SINGLE_WORD_LEN;
    }

    let has_question_word = tokens.iter().any(|t| QUESTION_WORDS.contains(t));
    has_question_word || tokens.len() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_queries() {
        for q in ["", " ", "hi", "ok", "  a  ", "é"] {
            assert!(!is_meaningful(q), "expected rejection for {:?}", q);
        }
    }

    #[test]
    fn test_single_word_threshold() {
        assert!(!is_meaningful("abc"));
        assert!(!is_meaningful("  npk "));
        assert!(is_meaningful("urea"));
        assert!(is_meaningful("Navyakosh"));
    }

    #[test]
    fn test_single_word_counts_chars_not_bytes() {
        // three characters, six bytes
        assert!(!is_meaningful("ééé"));
        assert!(is_meaningful("éééé"));
    }

    #[test]
    fn test_multi_token_always_accepted() {
        assert!(is_meaningful("a b"));
        assert!(is_meaningful("fertilizer dose"));
        assert!(is_meaningful("how much per acre"));
    }

    #[test]
    fn test_case_and_whitespace_normalized() {
        assert!(is_meaningful("   WHAT   IS   IT   "));
        assert!(!is_meaningful("\tHI\n"));
    }
}
