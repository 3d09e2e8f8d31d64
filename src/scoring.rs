//! Lexical relevance scoring.
//!
//! Scores every corpus chunk against the tokenized query with weighted
//! field matches: an exact word-boundary hit in the title outweighs one in
//! the content, which outweighs one in the source string. When a token has
//! no exact hit anywhere, lower-weight substring matches are credited
//! instead. Keyword-list hits, domain vocabulary, and short acronyms earn
//! bonuses on top.
//!
//! The final score rewards coverage: matching more distinct query tokens
//! lifts a chunk super-linearly over one that matches a single token
//! repeatedly. Scores are normalized into `[0, 1]` and capped.

use crate::config::ScoringWeights;
use crate::models::{DocumentChunk, ScoredChunk};
use crate::tokenize::{is_acronym_like, is_domain_keyword, tokenize_query};

/// Rank the corpus against a free-text query.
///
/// Deterministic for identical inputs: chunks are scored in corpus order
/// and the descending sort is stable, so equal scores keep insertion order.
pub fn search(
    corpus: &[DocumentChunk],
    query: &str,
    limit: usize,
    threshold: f64,
    weights: &ScoringWeights,
) -> Vec<ScoredChunk> {
    let tokens = tokenize_query(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredChunk> = corpus
        .iter()
        .map(|chunk| {
            let (similarity, matched_words) = score_chunk(chunk, &tokens, weights);
            ScoredChunk {
                chunk: chunk.clone(),
                similarity,
                matched_words,
            }
        })
        .filter(|s| s.similarity > 0.0 && s.similarity >= threshold)
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);
    scored
}

/// Score one chunk against the token set. Returns the normalized score and
/// the number of distinct tokens that matched anywhere.
pub fn score_chunk(
    chunk: &DocumentChunk,
    tokens: &[String],
    weights: &ScoringWeights,
) -> (f64, usize) {
    let title = chunk.title.to_lowercase();
    let content = chunk.content.to_lowercase();
    let source = chunk.source.to_lowercase();

    let mut raw = 0.0;
    let mut matched_words = 0usize;

    for token in tokens {
        let mut token_score = 0.0;
        let mut found = false;

        // Exact word-boundary tier.
        if contains_word(&title, token) {
            token_score += weights.exact_title;
            found = true;
        }
        if contains_word(&content, token) {
            token_score += weights.exact_content;
            found = true;
        }
        if contains_word(&source, token) {
            token_score += weights.exact_source;
            found = true;
        }

        // Substring tier, only when the exact tier found nothing.
        if !found {
            if title.contains(token.as_str()) {
                token_score += weights.partial_title;
                found = true;
            }
            if content.contains(token.as_str()) {
                token_score += weights.partial_content;
                found = true;
            }
            if source.contains(token.as_str()) {
                token_score += weights.partial_source;
                found = true;
            }
        }

        if chunk
            .metadata
            .keywords
            .iter()
            .any(|k| k.to_lowercase().contains(token.as_str()))
        {
            token_score += weights.keyword_bonus;
            found = true;
        }

        if is_domain_keyword(token) {
            token_score += weights.domain_bonus;
        }

        if is_acronym_like(token) {
            token_score *= weights.acronym_multiplier;
        }

        if found {
            matched_words += 1;
            raw += token_score;
        }
    }

    if matched_words == 0 {
        return (0.0, 0);
    }

    // Coverage-weighted normalization, capped at 1. The divisor is a tuned
    // parameter (`scoring.normalization`), not a constant of nature.
    let normalized = (raw * matched_words as f64)
        / (tokens.len() as f64 * weights.normalization);
    (normalized.min(1.0), matched_words)
}

/// Word-boundary containment: `needle` occurs in `haystack` with no
/// alphanumeric character directly before or after. Both sides are expected
/// to be lowercase already.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    for (start, _) in haystack.match_indices(needle) {
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[start + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ChunkMetadata, DocumentChunk};

    fn make_chunk(id: &str, title: &str, content: &str, keywords: &[&str]) -> DocumentChunk {
        DocumentChunk {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            source: "FEDEPALMA - test.json".to_string(),
            metadata: ChunkMetadata {
                category: Category::General,
                section: "root".to_string(),
                document_type: Category::General,
                keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
                last_updated: None,
            },
        }
    }

    fn weights() -> ScoringWeights {
        ScoringWeights::default()
    }

    #[test]
    fn word_boundary_matching() {
        assert!(contains_word("el congreso nacional", "congreso"));
        assert!(contains_word("dao, empresa pionera", "dao"));
        assert!(!contains_word("pensamiento daoista", "dao"));
        assert!(!contains_word("guaicaramos", "guaicaramo"));
        assert!(contains_word("congreso", "congreso"));
        assert!(!contains_word("congreso", ""));
    }

    #[test]
    fn deterministic_ranking() {
        let corpus = vec![
            make_chunk("a", "Agenda del congreso", "Horarios de las plenarias", &[]),
            make_chunk("b", "Empresa palmera", "Cultivo de palma en el llano", &[]),
        ];
        let first = search(&corpus, "congreso palma", 5, 0.0, &weights());
        let second = search(&corpus, "congreso palma", 5, 0.0, &weights());

        let ids_a: Vec<&str> = first.iter().map(|s| s.chunk.id.as_str()).collect();
        let ids_b: Vec<&str> = second.iter().map(|s| s.chunk.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
        for (x, y) in first.iter().zip(second.iter()) {
            assert_eq!(x.similarity, y.similarity);
        }
    }

    #[test]
    fn threshold_filters_and_is_monotonic() {
        let corpus = vec![
            make_chunk("a", "Congreso de palmicultores", "Programa del congreso", &[]),
            make_chunk("b", "Nota suelta", "Menciona congresos de otros sectores", &[]),
        ];
        let loose = search(&corpus, "congreso palmicultores", 10, 0.05, &weights());
        let strict = search(&corpus, "congreso palmicultores", 10, 0.6, &weights());

        assert!(strict.len() <= loose.len());
        assert!(strict.iter().all(|s| s.similarity >= 0.6));
        assert!(loose.iter().all(|s| s.similarity >= 0.05));
    }

    #[test]
    fn limit_bounds_result_count() {
        let corpus: Vec<DocumentChunk> = (0..20)
            .map(|i| {
                make_chunk(
                    &format!("c{}", i),
                    "Congreso palmero",
                    "Sesiones del congreso",
                    &[],
                )
            })
            .collect();
        let results = search(&corpus, "congreso", 5, 0.0, &weights());
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn coverage_outranks_single_strong_match() {
        // A matches 2 of 3 tokens in its title; B matches only 1 token,
        // repeated five times. Coverage must win.
        let corpus = vec![
            make_chunk(
                "b",
                "Guaicaramo Guaicaramo Guaicaramo Guaicaramo Guaicaramo",
                "Texto sin relación",
                &[],
            ),
            make_chunk("a", "Aceite alto oleico", "Texto sin relación", &[]),
        ];
        let results = search(&corpus, "alto oleico guaicaramo", 5, 0.0, &weights());
        assert_eq!(results[0].chunk.id, "a");
        assert_eq!(results[0].matched_words, 2);
        assert_eq!(results[1].matched_words, 1);
    }

    #[test]
    fn acronym_word_boundary_beats_substring() {
        // Normalization is raised so neither score hits the cap, keeping the
        // two tiers distinguishable.
        let mut w = weights();
        w.normalization = 25.0;

        let corpus = vec![
            make_chunk("substring", "Pensamiento daoista", "Filosofía antigua", &[]),
            make_chunk("exact", "DAO alto oleico", "Aceite de palma alto oleico", &[]),
        ];
        let results = search(&corpus, "DAO", 5, 0.0, &w);
        assert_eq!(results[0].chunk.id, "exact");
        assert!(results[0].similarity > results[1].similarity);
    }

    #[test]
    fn keyword_list_contributes() {
        let mut w = weights();
        w.normalization = 25.0;

        let corpus = vec![
            make_chunk("plain", "Perfil empresarial", "Cultivos en el llano", &[]),
            make_chunk(
                "tagged",
                "Perfil empresarial",
                "Cultivos en el llano",
                &["palma"],
            ),
        ];
        let results = search(&corpus, "palma", 5, 0.0, &w);
        assert_eq!(results[0].chunk.id, "tagged");
        assert!(results[0].similarity > results[1].similarity);
    }

    #[test]
    fn empty_query_returns_nothing() {
        let corpus = vec![make_chunk("a", "Congreso", "Contenido del congreso", &[])];
        assert!(search(&corpus, "", 5, 0.0, &weights()).is_empty());
        assert!(search(&corpus, "de la el", 5, 0.0, &weights()).is_empty());
    }

    #[test]
    fn no_match_returns_empty_not_wildcard() {
        let corpus = vec![make_chunk("a", "Congreso", "Contenido del congreso", &[])];
        let results = search(&corpus, "astronomía", 5, 0.0, &weights());
        assert!(results.is_empty());
    }

    #[test]
    fn equal_scores_keep_corpus_order() {
        let corpus = vec![
            make_chunk("first", "Congreso palmero", "Mismo contenido", &[]),
            make_chunk("second", "Congreso palmero", "Mismo contenido", &[]),
        ];
        let results = search(&corpus, "congreso", 5, 0.0, &weights());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].similarity, results[1].similarity);
        assert_eq!(results[0].chunk.id, "first");
        assert_eq!(results[1].chunk.id, "second");
    }

    #[test]
    fn scores_are_capped_at_one() {
        let corpus = vec![make_chunk(
            "a",
            "Congreso palma aceite",
            "congreso palma aceite congreso palma aceite",
            &["congreso", "palma", "aceite"],
        )];
        let results = search(&corpus, "congreso palma aceite", 5, 0.0, &weights());
        assert!((results[0].similarity - 1.0).abs() < 1e-9);
    }
}
