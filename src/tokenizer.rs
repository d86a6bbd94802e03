
use crate::error::{EmbeddingError, Result};
use regex::Regex;

// runs of word characters, or runs of anything that is neither a word character nor whitespace
const WORD_PUNCT_PATTERN: &str = r"\w+|[^\w\s]+";

// defines the behavior needed for tokenizing a corpus
pub trait Tokenizer {

    fn tokenize(&self, corpus: &str) -> Vec<String>;

    fn tokenize_bytes(&self, corpus: &[u8]) -> Result<Vec<String>> {
        let text = std::str::from_utf8(corpus).map_err(|e| EmbeddingError::Encoding(e.to_string()))?;
        Ok(self.tokenize(text))
    }

    // one token sequence per non-empty line, this is the document split used for training
    fn tokenize_documents(&self, corpus: &str) -> Vec<Vec<String>> {
        corpus
        .lines()
        .map(|line| self.tokenize(line))
        .filter(|tokens| !tokens.is_empty())
        .collect()
    }
}

/// Punctuation-aware word splitting: contractions, punctuation marks and
/// hyphenations all become token boundaries, so `"don't"` yields
/// `["don", "'", "t"]` and `"well-known"` yields `["well", "-", "known"]`.
#[derive(Clone, Debug)]
pub struct WordPunct {
    pattern: Regex,
    lowercase: bool,
}

impl WordPunct {

    pub fn new() -> Result<WordPunct> {
        Ok(
            Self {
                pattern: Regex::new(WORD_PUNCT_PATTERN)?,
                lowercase: false
            }
        )
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }
}

impl Tokenizer for WordPunct {

    fn tokenize(&self, corpus: &str) -> Vec<String> {
        self.pattern
        .find_iter(corpus)
        .map(|m| {
            if self.lowercase {
                m.as_str().to_lowercase()
            } else {
                m.as_str().to_owned()
            }
        })
        .collect()
    }
}


#[cfg(test)]
mod tests {

    use super::{Tokenizer, WordPunct};
    use crate::error::EmbeddingError;

    fn tokenizer() -> WordPunct {
        WordPunct::new().unwrap()
    }

    #[test]
    fn empty_corpus_test() {
        assert!(tokenizer().tokenize("").is_empty());
        assert!(tokenizer().tokenize("  \n\t ").is_empty());
    }

    #[test]
    fn contraction_test() {
        assert_eq!(tokenizer().tokenize("don't stop"), vec!["don", "'", "t", "stop"]);
    }

    #[test]
    fn punctuation_and_hyphens_test() {
        let tokens = tokenizer().tokenize("A well-known fact... isn't it?!");
        assert_eq!(tokens, vec!["A", "well", "-", "known", "fact", "...", "isn", "'", "t", "it", "?!"]);
    }

    #[test]
    fn keeps_order_and_duplicates_test() {
        let tokens = tokenizer().tokenize("the cat sat on the mat");
        assert_eq!(tokens, vec!["the", "cat", "sat", "on", "the", "mat"]);
    }

    #[test]
    fn unicode_words_test() {
        assert_eq!(tokenizer().tokenize("café naïve"), vec!["café", "naïve"]);
    }

    #[test]
    fn lowercase_test() {
        let tokens = tokenizer().with_lowercase(true).tokenize("Are YOU there");
        assert_eq!(tokens, vec!["are", "you", "there"]);
    }

    #[test]
    fn documents_split_by_line_test() {
        let docs = tokenizer().tokenize_documents("the cat sat\n\n on the mat.\n");
        assert_eq!(docs, vec![vec!["the", "cat", "sat"], vec!["on", "the", "mat", "."]]);
    }

    #[test]
    fn documents_hold_every_token_test() {
        // tokens never span a line break, so the documents concatenate to the flat sequence
        let corpus = "don't stop\nwell-known,\n\n  fact...\r\nend";
        let flat = tokenizer().tokenize(corpus);
        let joined: Vec<String> = tokenizer().tokenize_documents(corpus).into_iter().flatten().collect();
        assert_eq!(joined, flat);
    }

    #[test]
    fn invalid_encoding_test() {
        let bytes = [b'o', b'k', 0xff, 0xfe];
        match tokenizer().tokenize_bytes(&bytes) {
            Err(EmbeddingError::Encoding(_)) => {},
            other => panic!("expected encoding error, got {:?}", other)
        }
        assert_eq!(tokenizer().tokenize_bytes(b"ok go").unwrap(), vec!["ok", "go"]);
    }
}
