// Bounded title vocabulary with smoothed inverse document frequency weights
use ahash::{AHashMap, AHashSet};

#[derive(Debug, Clone)]
pub struct TextVocabulary {
    terms: Vec<String>,
    index: AHashMap<String, usize>,
    weights: Vec<f32>,
}

impl TextVocabulary {
    /// Tokenize text for the vocabulary.
    /// Uses lowercase normalization and removes punctuation
    #[inline]
    pub fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|s| !s.is_empty() && s.chars().count() > 1)
            .collect()
    }

    /// Build a vocabulary of at most `max_terms` terms, most frequent documents first.
    /// Ties keep the order in which terms were first seen.
    pub fn fit<'a, I>(documents: I, max_terms: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut first_seen: Vec<String> = Vec::new();
        let mut doc_freq: AHashMap<String, u32> = AHashMap::new();
        let mut total_docs = 0u32;

        for doc in documents {
            total_docs += 1;
            let tokens = Self::tokenize(doc);
            for token in &tokens {
                if !doc_freq.contains_key(token) {
                    first_seen.push(token.clone());
                    doc_freq.insert(token.clone(), 0);
                }
            }
            let unique: AHashSet<String> = tokens.into_iter().collect();
            for token in unique {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(usize, &String)> = first_seen.iter().enumerate().collect();
        ranked.sort_by(|a, b| {
            let df_a = doc_freq[a.1];
            let df_b = doc_freq[b.1];
            df_b.cmp(&df_a).then(a.0.cmp(&b.0))
        });
        ranked.truncate(max_terms);

        let n = total_docs as f32;
        let mut terms = Vec::with_capacity(ranked.len());
        let mut weights = Vec::with_capacity(ranked.len());
        let mut index = AHashMap::with_capacity(ranked.len());
        for (_, term) in ranked {
            let df = doc_freq[term] as f32;
            index.insert(term.clone(), terms.len());
            weights.push(((1.0 + n) / (1.0 + df)).ln() + 1.0);
            terms.push(term.clone());
        }

        Self { terms, index, weights }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn weight(&self, term: &str) -> Option<f32> {
        self.index.get(term).map(|&i| self.weights[i])
    }

    /// Write the L2-normalized weighted term-presence block into `out`.
    /// Terms outside the vocabulary are ignored.
    pub fn encode_into(&self, text: &str, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.terms.len());
        out.fill(0.0);
        for token in Self::tokenize(text) {
            if let Some(&slot) = self.index.get(&token) {
                out[slot] = self.weights[slot];
            }
        }
        let norm: f32 = out.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            out.iter_mut().for_each(|x| *x /= norm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = TextVocabulary::tokenize("Laptop-A, 15\" (Silver) x");
        assert_eq!(tokens, vec!["laptop", "15", "silver"]);
    }

    #[test]
    fn test_vocabulary_bounded_by_frequency() {
        let titles = ["red shirt", "blue shirt", "red shoes", "green hat"];
        let vocab = TextVocabulary::fit(titles.iter().copied(), 2);
        assert_eq!(vocab.len(), 2);
        // "red" and "shirt" both appear in two titles; "red" was seen first
        assert_eq!(vocab.terms(), &["red".to_string(), "shirt".to_string()]);
        assert!(vocab.weight("hat").is_none());
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let titles = ["red shirt", "red shoes", "red hat"];
        let vocab = TextVocabulary::fit(titles.iter().copied(), 10);
        assert!(vocab.weight("hat").unwrap() > vocab.weight("red").unwrap());
    }

    #[test]
    fn test_encode_ignores_unknown_terms() {
        let vocab = TextVocabulary::fit(["red shirt", "blue shirt"].iter().copied(), 10);
        let mut out = vec![0.0; vocab.len()];
        vocab.encode_into("purple kite", &mut out);
        assert!(out.iter().all(|x| *x == 0.0));

        vocab.encode_into("red shirt", &mut out);
        let norm: f32 = out.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
