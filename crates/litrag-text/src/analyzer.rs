use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream};

use litrag_core::config::AnalyzerConfig;

/// Case-insensitive tokenizer shared by index build and query parsing.
///
/// Splits on non-alphanumeric boundaries, lowercases, removes stop words and
/// drops tokens shorter than `min_token_len` characters. The same input always
/// yields the same token sequence.
#[derive(Clone)]
pub struct Analyzer {
    inner: TextAnalyzer,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let inner = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(StopWordFilter::remove(config.stop_words.iter().map(|s| s.to_lowercase())))
            .build();
        Self { inner, config }
    }

    pub fn config(&self) -> &AnalyzerConfig { &self.config }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        // token_stream needs &mut; clones keep concurrent callers independent
        let mut analyzer = self.inner.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            let token = &stream.token().text;
            if token.chars().count() >= self.config.min_token_len { tokens.push(token.clone()); }
        }
        tokens
    }
}

impl Default for Analyzer {
    fn default() -> Self { Self::new(AnalyzerConfig::default()) }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_splits_on_punctuation() {
        let a = Analyzer::default();
        assert_eq!(a.tokenize("IL-6, CRP/procalcitonin"), vec!["crp", "procalcitonin"]);
    }

    #[test]
    fn strips_stop_words_and_short_tokens() {
        let a = Analyzer::default();
        assert_eq!(a.tokenize("The role of the biomarker in ICU triage"), vec!["role", "biomarker", "icu", "triage"]);
    }

    #[test]
    fn min_len_is_configurable() {
        let a = Analyzer::new(AnalyzerConfig { min_token_len: 1, stop_words: vec![] });
        assert_eq!(a.tokenize("IL-6 is up"), vec!["il", "6", "is", "up"]);
    }

    #[test]
    fn empty_and_stopword_only_inputs() {
        let a = Analyzer::default();
        assert!(a.tokenize("").is_empty());
        assert!(a.tokenize("  ... ").is_empty());
        assert!(a.tokenize("this is the one that was").iter().all(|t| t == "one"));
    }

    #[test]
    fn deterministic_across_clones() {
        let a = Analyzer::default();
        let b = a.clone();
        let text = "Procalcitonin-guided antibiotic therapy reduced exposure.";
        assert_eq!(a.tokenize(text), b.tokenize(text));
    }
}
