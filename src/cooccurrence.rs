
// imports
use crate::config::TrainParams;
use crate::error::{EmbeddingError, Result};

use std::collections::HashMap;
use std::ops::Range;
use ndarray::{Array2, Array1, array, s};
use rayon::{prelude::*, ThreadPoolBuilder};
use serde::{Serialize, Deserialize};
use tracing::{debug, info};


/// Training vocabulary: words ordered by descending corpus frequency,
/// ties kept in order of first appearance. A word's index here is its
/// row in the embedding matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(String, usize)>", into = "Vec<(String, usize)>")]
pub struct Vocab {
    words: Vec<String>,
    counts: Vec<usize>,
    t2i: HashMap<String, usize>
}

impl From<Vec<(String, usize)>> for Vocab {
    fn from(entries: Vec<(String, usize)>) -> Self {
        let mut t2i = HashMap::with_capacity(entries.len());
        let mut words = Vec::with_capacity(entries.len());
        let mut counts = Vec::with_capacity(entries.len());
        for (word, count) in entries {
            t2i.entry(word.clone()).or_insert(words.len());
            words.push(word);
            counts.push(count);
        }
        Self { words, counts, t2i }
    }
}

impl From<Vocab> for Vec<(String, usize)> {
    fn from(vocab: Vocab) -> Self {
        vocab.words.into_iter().zip(vocab.counts).collect()
    }
}

impl Vocab {

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn index(&self, word: &str) -> Option<usize> {
        self.t2i.get(word).copied()
    }

    pub fn count(&self, word: &str) -> Option<usize> {
        self.index(word).map(|i| self.counts[i])
    }

    pub fn contains(&self, word: &str) -> bool {
        self.t2i.contains_key(word)
    }
}


pub struct Counts {}

impl Counts {

    fn accumulate(documents: &[Vec<String>]) -> Vec<(String, usize)> {

        // how many times each token appears in the corpus, in order of first appearance
        let mut t2pos: HashMap<&str, usize> = HashMap::new();
        let mut token2count: Vec<(String, usize)> = Vec::new();
        for tok in documents.iter().flatten() {
            match t2pos.get(tok.as_str()) {
                Some(pos) => token2count[*pos].1 += 1,
                None => {
                    t2pos.insert(tok, token2count.len());
                    token2count.push((tok.to_owned(), 1));
                }
            }
        }
        token2count
    }

    pub fn build_vocab(documents: &[Vec<String>], min_count: usize, max_vocab_size: Option<usize>) -> Result<Vocab> {

        // keep the tokens that appear at least `min_count` times, most frequent first.
        // the sort is stable so equally frequent tokens keep their first appearance order.
        let token2count = Counts::accumulate(documents);
        let n_unique = token2count.len();

        let mut tup = token2count
        .into_iter()
        .filter(|(_, count)| *count >= min_count)
        .collect::<Vec<(String, usize)>>();
        tup.sort_by(|(_, a), (_, b)| b.cmp(a));
        if let Some(max_vocab_size) = max_vocab_size {
            tup.truncate(max_vocab_size);
        }

        if tup.is_empty() {
            return Err(EmbeddingError::EmptyCorpus { min_count });
        }

        info!("using {} tokens out of {} unique tokens in corpus", tup.len(), n_unique);
        Ok(Vocab::from(tup))
    }


    fn count(window_size: usize,
        documents: &[Vec<String>],
        tup2cooc: &mut HashMap<(usize, usize), f32>,
        vocab: &Vocab,
        slice: &Range<usize>) {

            // counts cooccurrences of vocabulary tokens based on the GloVe algorithm.
            // a pair at distance d within the window contributes 1 / d.
            //
            // each worker handles a different slice of the vocabulary as pivot tokens.
            // the counts are one-sided (context to the right), the symmetric part is completed before training.
            for document in documents {

                let indexes: Vec<Option<usize>> = document.iter().map(|tok| vocab.index(tok)).collect();
                let n = indexes.len();

                for i in 0..n {

                    let token_i = match indexes[i] {
                        Some(token_i) if slice.contains(&token_i) => token_i,
                        _ => continue
                    };

                    for j in i+1..=i.saturating_add(window_size).min(n.saturating_sub(1)) {

                        let context_j = match indexes[j] {
                            Some(context_j) => context_j,
                            None => continue
                        };

                        let distance = (j-i) as f32;
                        let val = tup2cooc.entry((token_i, context_j)).or_insert(0.0);
                        *val += 1.0 / distance;
                    }
                }
            }
    }


    fn map_to_ndarray(tup2cooc: &HashMap<(usize, usize), f32>) -> Array2<f32> {
        // rows of (token, context, count), the layout the trainer consumes
        let mut nd_array: Array2<f32> = Array2::zeros((tup2cooc.len(), 3));
        for (i, (k, v)) in tup2cooc.iter().enumerate() {
            let line: Array1<f32> = array![k.0 as f32, k.1 as f32, *v];
            nd_array.slice_mut(s![i, ..]).assign(&line);
        }
        nd_array
    }


    fn run_slice(window_size: usize, documents: &[Vec<String>], vocab: &Vocab, slice: &Range<usize>, worker_i: usize) -> Array2<f32> {

        debug!("worker {}, counting vocab slice {:?}", worker_i, slice);
        let mut tup2cooc: HashMap<(usize, usize), f32> = HashMap::new();
        Counts::count(window_size, documents, &mut tup2cooc, vocab, slice);
        debug!("worker {} found {} pairs", worker_i, tup2cooc.len());

        Counts::map_to_ndarray(&tup2cooc)
    }

    pub fn run(documents: &[Vec<String>], vocab: &Vocab, params: &TrainParams) -> Result<Vec<Array2<f32>>> {

        // counting is split into one vocabulary slice per worker, each slice is a (N, 3) array.
        // a local pool keeps the requested degree of parallelism without touching the global rayon pool.
        let workers = params.workers.max(1);
        let slice_size = ((vocab.len() + workers - 1) / workers).max(1);
        let slices: Vec<Range<usize>> = (0..vocab.len())
        .step_by(slice_size)
        .map(|i| i..(i+slice_size).min(vocab.len()))
        .collect();

        let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
        let counts_by_slices: Vec<Array2<f32>> = pool.install(|| {
            slices.par_iter().enumerate().map(|(worker_i, slice)| {
                Counts::run_slice(params.window, documents, vocab, slice, worker_i)
            }).collect()
        });

        let n_pairs: usize = counts_by_slices.iter().map(|x| x.dim().0).sum();
        info!("counted {} cooccurrence pairs in {} slices", n_pairs, counts_by_slices.len());
        Ok(counts_by_slices)
    }
}
