//! Question text helpers shared by the resolution stages.

/// Lower-cased words split on anything that is not alphanumeric
pub fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Lower-cased text with every non-alphanumeric character removed
pub fn compact(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Byte offset of the first occurrence of `term` in `haystack` that is not glued to
/// surrounding letters or digits. Both arguments are expected lower-case.
pub fn find_term(haystack: &str, term: &str) -> Option<usize> {
    if term.is_empty() {
        return None;
    }
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(term) {
        let begin = start + pos;
        let end = begin + term.len();
        let before_ok = haystack[..begin]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(begin);
        }
        start = begin + term.chars().next().map_or(1, char::len_utf8);
    }
    None
}

pub fn contains_term(haystack: &str, term: &str) -> bool {
    find_term(haystack, term).is_some()
}

pub fn contains_any_term(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| contains_term(haystack, t))
}

/// Whether `words` mention `keyword`: long keywords match as word prefixes ("products"),
/// short ones only as whole words or plurals ("sdks")
pub fn mentions_word(words: &[String], keyword: &str) -> bool {
    words.iter().any(|w| {
        if keyword.len() >= 4 {
            w.starts_with(keyword)
        } else {
            w == keyword || (w.len() == keyword.len() + 1 && w.starts_with(keyword) && w.ends_with('s'))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_boundaries() {
        assert!(contains_term("show me go-sdk usage", "go"));
        assert!(!contains_term("google usage", "go"));
        assert!(!contains_term("most requests", "os"));
        assert!(contains_term("requests on os x", "os"));
        assert!(contains_term("usage of .net sdks", ".net"));
        assert!(contains_term("c# usage", "c#"));
        assert!(!contains_term("target", "get"));
    }

    #[test]
    fn test_find_term_skips_glued_occurrences() {
        assert_eq!(find_term("gopher go", "go"), Some(7));
    }

    #[test]
    fn test_tokens_and_compact() {
        assert_eq!(tokens("Go-SDK request counts"), vec!["go", "sdk", "request", "counts"]);
        assert_eq!(compact("Go-SDK request counts"), "gosdkrequestcounts");
    }

    #[test]
    fn test_mentions_word() {
        let words = tokens("top sdks for products in the stopwatch");
        assert!(mentions_word(&words, "product"));
        assert!(mentions_word(&words, "sdk"));
        assert!(mentions_word(&words, "top"));
        assert!(!mentions_word(&words, "watch"));
        assert!(!mentions_word(&words, "os"));
    }
}
