//! Text heuristics behind name suggestion and term statistics.

use indexmap::IndexMap;

/// English stopwords.
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
    "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
    "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will", "just", "don",
    "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "couldn", "didn",
    "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn", "needn", "shan",
    "shouldn", "wasn", "weren", "won", "wouldn",
];

/// Frequent adjectives, verbs and adverbs that show up in attribute names
/// and values and must not be tagged as nouns.
const NON_NOUNS: &[&str] = &[
    "new", "old", "big", "small", "large", "high", "low", "long", "short", "good", "bad",
    "total", "average", "mean", "max", "min", "maximum", "minimum", "first", "last", "next",
    "main", "open", "closed", "active", "inactive", "true", "false", "yes", "null", "none",
    "nan", "get", "set", "use", "used", "make", "made", "create", "created", "update",
    "updated", "north", "south", "east", "west", "upper", "lower", "public", "private",
    "local", "national", "general", "other", "various", "known", "unknown",
];

/// Tokenization and part-of-speech signals used by the metadata analyzer.
///
/// The scoring weights live in the analyzer; implementations only decide
/// what a token is. Swapping the implementation changes the inferred names
/// without touching the pipeline.
pub trait TextAnalyzer {
    /// Splits `text` into word tokens, preserving case.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Returns `true` for tokens tagged as nouns.
    fn is_noun(&self, token: &str) -> bool;

    /// Returns `true` for stopwords.
    fn is_stopword(&self, token: &str) -> bool;

    /// Most frequent alphabetic tokens, most frequent first; ties keep
    /// first-appearance order.
    fn frequent_terms(&self, tokens: &[String], limit: usize) -> Vec<String> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for token in tokens
            .iter()
            .filter(|token| token.chars().all(char::is_alphabetic))
        {
            *counts.entry(token.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(limit)
            .map(|(token, _)| token.to_string())
            .collect()
    }
}

/// Lexicon-based [`TextAnalyzer`].
///
/// A token is a noun when it is alphabetic, at least two characters long,
/// neither a stopword nor a known non-noun, and does not end in `-ly`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconTextAnalyzer;

impl TextAnalyzer for LexiconTextAnalyzer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn is_noun(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        lower.chars().count() >= 2
            && lower.chars().all(char::is_alphabetic)
            && !self.is_stopword(&lower)
            && !NON_NOUNS.contains(&lower.as_str())
            && !lower.ends_with("ly")
    }

    fn is_stopword(&self, token: &str) -> bool {
        STOPWORDS.contains(&token.to_lowercase().as_str())
    }
}
