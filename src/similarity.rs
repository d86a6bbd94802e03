
use std::collections::HashMap;
use ndarray::prelude::*;
use crate::error::{EmbeddingError, Result};

/// Cosine-similarity index over an embedding matrix. Row `i` of the
/// matrix is the vector of `words[i]`; the rows are stored l2-normalized
/// so a dot product is a cosine similarity.
#[derive(Clone, Debug)]
pub struct Similarity {
    w: Array2<f32>,
    norms: Array1<f32>,
    words: Vec<String>,
    t2i: HashMap<String, usize>
}

impl Similarity {

    pub fn new(mut w: Array2<f32>, words: Vec<String>) -> Result<Similarity> {

        if w.dim().0 != words.len() {
            return Err(EmbeddingError::invalid(format!("{} vectors for {} words", w.dim().0, words.len())));
        }

        // normalize w so each row has l2 norm 1, all-zero rows stay zero
        let mut norms: Array1<f32> = Array1::zeros(words.len());
        for (i, mut row) in w.axis_iter_mut(Axis(0)).enumerate() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|a| a / norm);
            }
            norms[i] = norm;
        }

        // one row per word, a repeated word would come back as its own neighbor
        let mut t2i: HashMap<String, usize> = HashMap::with_capacity(words.len());
        for (i, t) in words.iter().enumerate() {
            if t2i.insert(t.to_owned(), i).is_some() {
                return Err(EmbeddingError::invalid(format!("word '{}' has more than one vector", t)));
            }
        }

        Ok(
            Self {
                w,
                norms,
                words,
                t2i
            }
        )
    }

    pub fn vocab_size(&self) -> usize {
        self.words.len()
    }

    pub fn dim(&self) -> usize {
        self.w.dim().1
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn contains(&self, token: &str) -> bool {
        self.t2i.contains_key(token)
    }

    fn index_of(&self, token: &str) -> Result<usize> {
        if token.is_empty() {
            return Err(EmbeddingError::invalid("query word must not be empty"));
        }
        self.t2i.get(token).copied().ok_or_else(|| EmbeddingError::WordNotFound(token.to_owned()))
    }

    // the vector as it was given, before normalization
    pub fn extract_vec_from_word(&self, token: &str) -> Result<Array1<f32>> {
        let i = self.index_of(token)?;
        Ok(&self.w.row(i) * self.norms[i])
    }

    pub fn find_k_most_similar(&self, vec: &Array1<f32>, k: usize, exclude: &[usize]) -> Result<Vec<(String, f32)>> {

        if k == 0 {
            return Err(EmbeddingError::invalid("top_k must be a positive integer"));
        }
        if vec.len() != self.dim() {
            return Err(EmbeddingError::invalid(format!("query vector of size {} for embeddings of size {}", vec.len(), self.dim())));
        }

        let norm = vec.dot(vec).sqrt();
        let query = if norm > 0.0 { vec / norm } else { vec.to_owned() };

        // multiply all vectors by the query vector
        let scores = self.w.dot(&query); // of size vocab size
        let mut indexed_scores: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(i, _)| !exclude.contains(i))
        .collect();

        // descending, the sort is stable so ties keep vocabulary order
        indexed_scores.sort_by(|(_, s), (_, t)| t.total_cmp(s));

        Ok(
            indexed_scores
            .into_iter()
            .take(k)
            .map(|(index, score)| (self.words[index].to_owned(), score))
            .collect()
        )
    }

    pub fn nearest(&self, token: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let i = self.index_of(token)?;
        let vec = self.w.row(i).to_owned();
        self.find_k_most_similar(&vec, k, &[i])
    }

    // a is to b as like c is to ?
    // translates to b - a + c : ?
    pub fn extract_analogy_vec(&self, inputs: [&str; 3]) -> Result<Array1<f32>> {

        let mut vecs: Vec<ArrayView1<f32>> = Vec::new();
        for e in inputs {
            let i = self.index_of(e)?;
            vecs.push(self.w.row(i));
        }

        Ok(&vecs[1] - &vecs[0] + &vecs[2])
    }

    pub fn extract_analogies(&self, inputs: [&str; 3], k: usize) -> Result<Vec<(String, f32)>> {

        let analogy = self.extract_analogy_vec(inputs)?;
        let exclude = inputs.iter().map(|e| self.index_of(e)).collect::<Result<Vec<usize>>>()?;
        self.find_k_most_similar(&analogy, k, &exclude)
    }

}


#[cfg(test)]
mod tests {

    use super::Similarity;
    use crate::error::EmbeddingError;
    use ndarray::{array, Array2};

    fn words(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    fn toy() -> Similarity {
        let w: Array2<f32> = array![
            [2.0, 0.0],
            [0.9, 0.1],
            [0.0, 1.0],
            [0.0, -3.0],
            [-1.0, 0.0],
        ];
        Similarity::new(w, words(&["a", "b", "c", "d", "e"])).unwrap()
    }

    #[test]
    fn find_most_similar_test() {
        let sim = toy();
        let result = sim.nearest("a", 3).unwrap();
        let names: Vec<&str> = result.iter().map(|(t, _)| t.as_str()).collect();

        // c and d tie at 0.0 and keep vocabulary order
        assert_eq!(names, vec!["b", "c", "d"]);
        approx::assert_abs_diff_eq!(result[0].1, 0.9 / (0.82f32).sqrt(), epsilon = 1e-5);
        approx::assert_abs_diff_eq!(result[1].1, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn excludes_query_and_bounds_length_test() {
        let sim = toy();
        for token in sim.words().to_vec() {
            let result = sim.nearest(&token, 10).unwrap();
            assert_eq!(result.len(), 4);
            assert!(result.iter().all(|(t, _)| *t != token));
            assert!(result.windows(2).all(|pair| pair[0].1 >= pair[1].1));
        }
    }

    #[test]
    fn unknown_word_test() {
        match toy().nearest("zebra", 3) {
            Err(EmbeddingError::WordNotFound(word)) => assert_eq!(word, "zebra"),
            other => panic!("expected word not found, got {:?}", other)
        }
    }

    #[test]
    fn invalid_query_test() {
        assert!(matches!(toy().nearest("", 3), Err(EmbeddingError::InvalidParameter(_))));
        assert!(matches!(toy().nearest("a", 0), Err(EmbeddingError::InvalidParameter(_))));
    }

    #[test]
    fn raw_vector_test() {
        let sim = toy();
        let v = sim.extract_vec_from_word("d").unwrap();
        approx::assert_abs_diff_eq!(v[0], 0.0, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(v[1], -3.0, epsilon = 1e-5);
    }

    #[test]
    fn analogies_test() {

        // king - man + woman lands on queen
        let w: Array2<f32> = array![
            [1.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 1.0],
            [0.0, 0.0, 1.0],
            [0.3, -1.0, 0.2],
        ];
        let sim = Similarity::new(w, words(&["king", "man", "queen", "woman", "apple"])).unwrap();
        let analogies = sim.extract_analogies(["man", "king", "woman"], 2).unwrap();
        assert_eq!(analogies[0].0, "queen");
        assert!(analogies.iter().all(|(t, _)| !["man", "king", "woman"].contains(&t.as_str())));
    }

    #[test]
    fn repeated_word_test() {
        let w: Array2<f32> = array![[1.0, 0.0], [0.5, 0.5], [0.9, 0.1]];
        let result = Similarity::new(w, words(&["woman", "man", "woman"]));
        assert!(matches!(result, Err(EmbeddingError::InvalidParameter(_))));
    }

    #[test]
    fn mismatched_rows_test() {
        let w: Array2<f32> = Array2::zeros((2, 3));
        assert!(matches!(Similarity::new(w, words(&["one"])), Err(EmbeddingError::InvalidParameter(_))));
    }
}
