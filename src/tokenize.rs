//! Query tokenization for the lexical scorer.
//!
//! Queries are lowercased, punctuation becomes whitespace, and common
//! Spanish filler words are dropped. A short allow list of domain acronyms
//! is kept even when a term collides with the stop-word or length filters,
//! so technical terms like `dao` or `oxg` always survive tokenization.

/// Filler words that carry no retrieval signal.
const STOP_WORDS: &[&str] = &[
    "me", "te", "le", "la", "el", "de", "en", "un", "una", "es", "se", "por", "con", "para",
    "que", "del", "las", "los", "sus", "como", "puedes", "hablar", "favor",
];

/// Domain acronyms that must never be filtered out, however short.
const DOMAIN_TERMS: &[&str] = &["dao", "oxg", "rspo", "hopo"];

/// Flat-bonus vocabulary for the scorer: a token from this list is boosted
/// regardless of where it matched.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "palma",
    "aceite",
    "oleico",
    "fedepalma",
    "congreso",
    "guaicaramo",
    "dao",
    "oxg",
    "híbrido",
    "rspo",
    "sostenible",
];

/// Split a raw query into scoring tokens.
///
/// An empty or all-stop-word query produces an empty token set; callers
/// treat that as "no results", never as a wildcard.
pub fn tokenize_query(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|word| word.chars().count() > 1)
        .filter(|word| is_domain_term(word) || !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

pub fn is_domain_term(word: &str) -> bool {
    DOMAIN_TERMS.contains(&word)
}

pub fn is_domain_keyword(word: &str) -> bool {
    DOMAIN_KEYWORDS.contains(&word)
}

/// Short alphabetic tokens (2 to 4 letters) are treated as acronyms and
/// given extra weight, counteracting the low raw weight short terms earn.
pub fn is_acronym_like(word: &str) -> bool {
    let count = word.chars().count();
    (2..=4).contains(&count) && word.chars().all(|c| c.is_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        let tokens = tokenize_query("¿Cuándo EMPIEZA el congreso?");
        assert_eq!(tokens, vec!["cuándo", "empieza", "congreso"]);
    }

    #[test]
    fn drops_stop_words() {
        let tokens = tokenize_query("me puedes hablar de la palma por favor");
        assert_eq!(tokens, vec!["palma"]);
    }

    #[test]
    fn keeps_domain_acronyms_despite_stop_list() {
        // "dao" is short and would look like filler, but it is a company name.
        let tokens = tokenize_query("que es dao y oxg");
        assert_eq!(tokens, vec!["dao", "oxg"]);
    }

    #[test]
    fn empty_and_punctuation_only_queries_yield_no_tokens() {
        assert!(tokenize_query("").is_empty());
        assert!(tokenize_query("¿¡!? ...").is_empty());
        assert!(tokenize_query("de la el").is_empty());
    }

    #[test]
    fn single_letter_fragments_dropped() {
        let tokens = tokenize_query("a b congreso");
        assert_eq!(tokens, vec!["congreso"]);
    }

    #[test]
    fn acronym_detection() {
        assert!(is_acronym_like("dao"));
        assert!(is_acronym_like("rspo"));
        assert!(is_acronym_like("ab"));
        assert!(!is_acronym_like("a"));
        assert!(!is_acronym_like("palma"));
        assert!(!is_acronym_like("23"));
    }
}
