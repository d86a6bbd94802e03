
// imports
use crate::config::{files_handling, Mode, Params};
use crate::embeddings::{self, Embeddings};
use crate::error::{EmbeddingError, Result};
use crate::registry::{LocalRegistry, ModelRegistry};
use crate::tokenizer::{Tokenizer, WordPunct};

use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub struct Pipeline {}

impl Pipeline {

    // runs the main procedure, strictly in order -
    // -> corpus reading and tokenization
    // -> registry catalog listing
    // -> training, or loading a pre-trained model
    // -> neighbor queries
    // the first failure aborts the run.

    pub fn run<W: Write>(params: &Params, out: &mut W) -> Result<()> {

        info!("{}", params);
        let tokenizer = WordPunct::new()?.with_lowercase(params.lowercase);

        // the corpus is read once in full and never written, one token sequence per line
        let documents: Option<Vec<Vec<String>>> = match &params.corpus_file {
            Some(corpus_file) => {
                let corpus = files_handling::read_input::<String>(Path::new(corpus_file))?;
                let documents = tokenizer.tokenize_documents(&corpus);
                let n_tokens: usize = documents.iter().map(|d| d.len()).sum();
                info!("tokenized corpus {}, {} tokens in {} documents", corpus_file, n_tokens, documents.len());
                Some(documents)
            },
            None => None
        };

        let registry = LocalRegistry::new(&params.registry_dir);
        if let Some(category) = &params.catalog_category {
            for entry in registry.list_available(category)? {
                writeln!(out, "{}", entry.line(params.desc_len))?;
            }
        }

        let timer = Instant::now();
        let model: Box<dyn Embeddings> = match params.mode {
            Mode::Train => {
                let documents = documents.ok_or_else(|| EmbeddingError::invalid("corpus_file is required for training"))?;
                let model = embeddings::train(&documents, &params.train)?;
                if let Some(output_dir) = &params.output_dir {
                    model.save(Path::new(output_dir))?;
                }
                Box::new(model)
            },
            Mode::Pretrained => {
                let model = embeddings::load(&registry, &params.pretrained_model)?;
                info!("loaded pre-trained model {}", model.name());
                Box::new(model)
            }
        };
        info!("model ready, {} words of size {}, took {} ms", model.vocab_size(), model.dim(), timer.elapsed().as_millis());

        for word in &params.query_words {
            let neighbors = embeddings::nearest(model.as_ref(), word, params.top_k)?;
            writeln!(out, "{}: {:?}", word, neighbors)?;
        }

        Ok(())
    }

}


#[cfg(test)]
mod tests {

    use super::Pipeline;
    use crate::config::{Mode, Params, TrainParams};
    use crate::error::EmbeddingError;
    use crate::registry::tests::toy_registry;
    use std::fs;

    fn pretrained_params(registry_dir: &std::path::Path) -> Params {
        Params {
            registry_dir: registry_dir.display().to_string(),
            pretrained_model: "toy-plain".to_owned(),
            query_words: vec!["woman".to_owned(), "king".to_owned()],
            ..Params::default()
        }
    }

    #[test]
    fn pretrained_run_test() {
        let dir = tempfile::tempdir().unwrap();
        toy_registry(dir.path());

        let mut out: Vec<u8> = Vec::new();
        Pipeline::run(&pretrained_params(dir.path()), &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();

        // three catalog lines, then one line per query word
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("missing-file"));
        assert!(lines[3].starts_with("woman: [(\"man\""));
        assert!(lines[4].starts_with("king: "));
    }

    #[test]
    fn train_run_test() {
        let dir = tempfile::tempdir().unwrap();
        toy_registry(dir.path());
        let corpus_file = dir.path().join("corpus.txt");
        fs::write(&corpus_file, "the cat sat on the mat\nthe dog sat on the log\n").unwrap();
        let output_dir = dir.path().join("out");

        let params = Params {
            mode: Mode::Train,
            corpus_file: Some(corpus_file.display().to_string()),
            catalog_category: None,
            output_dir: Some(output_dir.display().to_string()),
            query_words: vec!["cat".to_owned(), "the".to_owned()],
            top_k: 3,
            train: TrainParams { vector_size: 8, epochs: 3, workers: 2, seed: Some(1), ..TrainParams::default() },
            ..pretrained_params(dir.path())
        };

        let mut out: Vec<u8> = Vec::new();
        Pipeline::run(&params, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed.lines().count(), 2);
        assert!(printed.starts_with("cat: "));
        assert!(output_dir.join("params.json").is_file());
    }

    #[test]
    fn aborts_on_unknown_word_test() {
        let dir = tempfile::tempdir().unwrap();
        toy_registry(dir.path());
        let params = Params { query_words: vec!["bishop".to_owned()], catalog_category: None, ..pretrained_params(dir.path()) };

        let mut out: Vec<u8> = Vec::new();
        assert!(matches!(Pipeline::run(&params, &mut out), Err(EmbeddingError::WordNotFound(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn aborts_on_unknown_model_test() {
        let dir = tempfile::tempdir().unwrap();
        toy_registry(dir.path());
        let params = Params { pretrained_model: "glove-wiki-gigaword-50".to_owned(), ..pretrained_params(dir.path()) };

        let mut out: Vec<u8> = Vec::new();
        assert!(matches!(Pipeline::run(&params, &mut out), Err(EmbeddingError::UnknownModel(_))));
    }
}
