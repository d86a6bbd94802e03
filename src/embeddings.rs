//! The two embedding providers behind one query contract.
//!
//! [`TrainedModel`] learns GloVe vectors from tokenized documents,
//! [`PretrainedModel`] deserializes a named artifact from a
//! [`ModelRegistry`]. Both are read-only once built and answer queries
//! through the [`Embeddings`] trait.

use crate::config::{files_handling, TrainParams};
use crate::cooccurrence::{Counts, Vocab};
use crate::error::{EmbeddingError, Result};
use crate::registry::ModelRegistry;
use crate::similarity::Similarity;
use crate::train::Train;

use flate2::read::GzDecoder;
use ndarray::{Array1, Array2};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::info;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub trait Embeddings {

    fn index(&self) -> &Similarity;

    fn contains(&self, word: &str) -> bool {
        self.index().contains(word)
    }

    fn vocab_size(&self) -> usize {
        self.index().vocab_size()
    }

    fn dim(&self) -> usize {
        self.index().dim()
    }

    fn vector(&self, word: &str) -> Result<Array1<f32>> {
        self.index().extract_vec_from_word(word)
    }

    /// The `top_k` most cosine-similar words, best first, without `word` itself.
    fn nearest(&self, word: &str, top_k: usize) -> Result<Vec<(String, f32)>> {
        self.index().nearest(word, top_k)
    }

    /// Neighbors of `b - a + c`, without the three inputs.
    fn analogy(&self, inputs: [&str; 3], top_k: usize) -> Result<Vec<(String, f32)>> {
        self.index().extract_analogies(inputs, top_k)
    }
}

pub fn nearest<E: Embeddings + ?Sized>(model: &E, word: &str, top_k: usize) -> Result<Vec<(String, f32)>> {
    model.nearest(word, top_k)
}


pub struct TrainedModel {
    vocab: Vocab,
    params: TrainParams,
    vectors: Array2<f32>,
    index: Similarity
}

impl TrainedModel {

    fn from_parts(vocab: Vocab, params: TrainParams, vectors: Array2<f32>) -> Result<TrainedModel> {
        let index = Similarity::new(vectors.clone(), vocab.words().to_vec())?;
        Ok(Self { vocab, params, vectors, index })
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    // vectors, vocabulary and the hyperparameters that produced them
    pub fn save(&self, output_dir: &Path) -> Result<()> {
        files_handling::save_output(output_dir, "vecs", &self.vectors)?;
        files_handling::save_output(output_dir, "words", &self.vocab)?;
        files_handling::save_output(output_dir, "params", &self.params)?;
        info!("saved trained model to {}", output_dir.display());
        Ok(())
    }

    pub fn read(model_dir: &Path) -> Result<TrainedModel> {
        let vectors = files_handling::read_input::<Array2<f32>>(&model_dir.join("vecs"))?;
        let vocab = files_handling::read_input::<Vocab>(&model_dir.join("words"))?;
        let params = files_handling::read_input::<TrainParams>(&model_dir.join("params"))?;
        TrainedModel::from_parts(vocab, params, vectors)
    }
}

impl Embeddings for TrainedModel {
    fn index(&self) -> &Similarity {
        &self.index
    }
}

pub fn train(documents: &[Vec<String>], params: &TrainParams) -> Result<TrainedModel> {

    params.validate()?;
    info!("training started with {}", params);
    let timer = Instant::now();

    let vocab = Counts::build_vocab(documents, params.min_count, params.max_vocab_size)?;
    let slices = Counts::run(documents, &vocab, params)?;
    let trainer = Train::run(slices, vocab.len(), params)?;

    info!("training completed, took {} ms", timer.elapsed().as_millis());
    TrainedModel::from_parts(vocab, params.clone(), trainer.vectors())
}


pub struct PretrainedModel {
    name: String,
    index: Similarity
}

impl PretrainedModel {

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parses a text embedding table, one `word v1 .. vn` line per word,
    /// with an optional word2vec `"<count> <dim>"` header. Gzip input is
    /// detected by its magic bytes.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<PretrainedModel> {

        let mut raw: Vec<u8> = Vec::new();
        let bytes = if bytes.starts_with(&GZIP_MAGIC) {
            GzDecoder::new(bytes).read_to_end(&mut raw)?;
            raw.as_slice()
        } else {
            bytes
        };
        let text = std::str::from_utf8(bytes).map_err(|e| EmbeddingError::malformed(name, e.to_string()))?;

        // line numbers count every raw line, blank ones included
        let mut lines = text
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
        .peekable();

        let mut header: Option<(usize, usize)> = None;
        if let Some((_, first)) = lines.peek() {
            let parts: Vec<&str> = first.split_whitespace().collect();
            if let [count, dim] = parts.as_slice() {
                if let (Ok(count), Ok(dim)) = (count.parse::<usize>(), dim.parse::<usize>()) {
                    header = Some((count, dim));
                    lines.next();
                }
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut words: Vec<String> = Vec::new();
        let mut values: Vec<f32> = Vec::new();
        let mut dim = header.map(|(_, dim)| dim);
        for (n, line) in lines {
            let mut parts = line.split_whitespace();
            let word = match parts.next() {
                Some(word) => word,
                None => continue
            };
            if !seen.insert(word) {
                return Err(EmbeddingError::malformed(name, format!("line {}: word '{}' appears twice", n, word)));
            }

            let row = parts
            .map(|v| v.parse::<f32>())
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| EmbeddingError::malformed(name, format!("line {}: {}", n, e)))?;
            // `parse` accepts NaN and inf, neither has a cosine similarity
            if row.iter().any(|v| !v.is_finite()) {
                return Err(EmbeddingError::malformed(name, format!("line {}: non-finite value", n)));
            }

            match dim {
                Some(d) if d != row.len() => return Err(EmbeddingError::malformed(name, format!("line {}: expected {} values, found {}", n, d, row.len()))),
                Some(_) => {},
                None => dim = Some(row.len())
            }

            words.push(word.to_owned());
            values.extend(row);
        }

        if let Some((count, _)) = header {
            if count != words.len() {
                return Err(EmbeddingError::malformed(name, format!("header announces {} words, found {}", count, words.len())));
            }
        }

        let dim = match dim {
            Some(d) if d > 0 && !words.is_empty() => d,
            _ => return Err(EmbeddingError::malformed(name, "empty embedding table"))
        };

        let w = Array2::from_shape_vec((words.len(), dim), values)?;
        info!("loaded {} vectors of size {} for {}", words.len(), dim, name);
        Ok(Self { name: name.to_owned(), index: Similarity::new(w, words)? })
    }
}

impl Embeddings for PretrainedModel {
    fn index(&self) -> &Similarity {
        &self.index
    }
}

pub fn load<R: ModelRegistry + ?Sized>(registry: &R, name: &str) -> Result<PretrainedModel> {
    let bytes = registry.fetch(name)?;
    PretrainedModel::from_bytes(name, &bytes)
}
