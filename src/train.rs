

use ndarray::concatenate;
use ndarray::prelude::*;
use ndarray::Array;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use ndarray_stats::QuantileExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use crate::config::TrainParams;
use crate::error::{EmbeddingError, Result};
use std::iter::zip;
use std::ops::AddAssign;
use std::ops::SubAssign;
use std::slice::Chunks;
use std::time::Instant;
use tracing::{debug, info};


pub struct Train {
    w_tokens: Array2<f32>,
    w_context: Array2<f32>,
    b_tokens: Array2<f32>,
    b_context: Array2<f32>,
    ag_w_tok: Array2<f32>,
    ag_w_context: Array2<f32>,
    ag_b_tok: Array2<f32>,
    ag_b_context: Array2<f32>,
}

struct DisplayProgress {
    epoch_loss: f32,          // sum of the avg batch losses in the current epoch
    total_loss: f32,          // number of batches in the current epoch
    n_slices: usize,          // the number of slices x_mat is divided to
    slice_enumeration: usize, // enumerator over n_slices
    current_slice: usize,     // the value (index) of the current slice
    total_examples: Vec<usize>,  // number of training examples per slice
}

impl DisplayProgress {

    fn new(total_examples: Vec<usize>) -> Self {
        Self {
            epoch_loss: 0.0,
            total_loss: 0.0,
            n_slices: total_examples.len(),
            slice_enumeration: 0,
            current_slice: 0,
            total_examples
        }
    }

    fn reset_loss(&mut self) {
        self.epoch_loss = 0.0;
        self.total_loss = 0.0;
    }

    fn mean_loss(&self) -> f32 {
        if self.total_loss > 0.0 { self.epoch_loss / self.total_loss } else { 0.0 }
    }
}

impl Train {

    fn new(vocab_size: usize, embedding_dim: usize, rng: &mut StdRng) -> Train {

        let scale = embedding_dim as f32;
        Self {
            w_tokens: Array::random_using((vocab_size, embedding_dim), Uniform::new(-0.5, 0.5), rng) / scale,
            w_context: Array::random_using((vocab_size, embedding_dim), Uniform::new(-0.5, 0.5), rng) / scale,
            b_tokens: Array::random_using((vocab_size, 1), Uniform::new(-0.5, 0.5), rng) / scale,
            b_context: Array::random_using((vocab_size, 1), Uniform::new(-0.5, 0.5), rng) / scale,
            ag_w_tok: Array2::from_elem((vocab_size, embedding_dim), 1.0), // init to 1.0 makes the initial eta equal to inital learning rate
            ag_w_context: Array2::from_elem((vocab_size, embedding_dim), 1.0),
            ag_b_tok: Array2::from_elem((vocab_size, 1), 1.0),
            ag_b_context: Array2::from_elem((vocab_size, 1), 1.0)
        }
    }

    // the final word vectors, token part plus context part
    pub fn vectors(&self) -> Array2<f32> {
        &self.w_tokens + &self.w_context
    }

    fn weighting_x(xs: &mut Array2<f32>, x_max: f32, alpha: f32) {
        xs.mapv_inplace(|x| {
            if x < x_max {
                (x / x_max).powf(alpha)
            } else {
                1.0
            }
        });
    }

    fn do_training_slice(&mut self,
           slice_arr: &Array2<f32>,
           train_params: &TrainParams,
           progress_params: &mut DisplayProgress,
           rng: &mut StdRng
        ) -> Result<()> {

            // train parameters extraction
            let batch_size = train_params.batch_size;
            let x_max = train_params.x_max;
            let alpha = train_params.alpha;
            let learning_rate = train_params.learning_rate;

            let slice_n_examples = progress_params.total_examples[progress_params.current_slice];
            debug!("in slice {} / {}, number of total examples here: {}",
                progress_params.slice_enumeration, progress_params.n_slices, slice_n_examples);

            let slice_len = slice_arr.dim().0;
            let mut in_slice_order = (0..slice_len).collect::<Vec<usize>>();
            in_slice_order.shuffle(rng);

            // split slice to chunks
            let slice_chunks_indexes: Chunks<usize> = in_slice_order.chunks(batch_size);

            for chunk_indexes in slice_chunks_indexes {

                // last batch can be smaller than batch_size
                let this_batch = chunk_indexes.len();

                let get_indexes = |col: usize| {
                    chunk_indexes.iter().map(|row| slice_arr[[*row, col]] as usize).collect::<Vec<usize>>()
                };
                let is = &get_indexes(0);
                let js = &get_indexes(1);
                let xs: Array2<f32> = slice_arr.select(Axis(0), chunk_indexes)
                .slice(s![.., 2usize]).to_shape((this_batch, 1))?.to_owned();

                // dimensions of (this_batch, embedding_dim) for v
                // dimensions of (this_batch, 1) for b
                let v_tok: Array2<f32> = self.w_tokens.select(Axis(0), is);
                let v_context: Array2<f32> = self.w_context.select(Axis(0), js);
                let b_tok: Array2<f32> = self.b_tokens.select(Axis(0), is);
                let b_context: Array2<f32> = self.b_context.select(Axis(0), js);

                // the rows of the accumulated squared gradients
                let g_v_tok: Array2<f32> = self.ag_w_tok.select(Axis(0), is);
                let g_v_context: Array2<f32> = self.ag_w_context.select(Axis(0), js);
                let g_b_tok: Array2<f32> = self.ag_b_tok.select(Axis(0), is);
                let g_b_context: Array2<f32> = self.ag_b_context.select(Axis(0), js);

                // weighted counts, shape (this_batch, 1)
                let mut xs_weighted: Array2<f32> = xs.clone();
                Train::weighting_x(&mut xs_weighted, x_max, alpha);

                // w_tok * w_context => (this_batch, embedding_dim) * (this_batch, embedding_dim) => (this_batch, 1)
                let dp: Array2<f32> = (&v_tok * &v_context).sum_axis(Axis(1)).to_shape((this_batch, 1))?.to_owned();
                let diff: Array2<f32> = &dp + &b_tok + &b_context - &xs.mapv(f32::ln);

                let local_batch_loss: Array2<f32> = 0.5f32 * &xs_weighted * &diff.mapv(|x| x.powi(2));
                progress_params.epoch_loss += local_batch_loss.mean().unwrap_or(0.0);
                progress_params.total_loss += 1.0;

                // dl_dw_tok is (this_batch, embedding_dim)
                // dl_db is (this_batch, 1)
                let dl_dw = &xs_weighted * &diff;
                let dl_dw_tok: Array2<f32> = &v_context * &dl_dw;
                let dl_dw_context: Array2<f32> = &v_tok * &dl_dw;
                let dl_db: Array2<f32> = dl_dw;

                // adagrad steps, the accumulators start at 1.0 so sqrt is never zero
                let dw_tok_update: Array2<f32> = learning_rate * &dl_dw_tok / &g_v_tok.mapv(f32::sqrt);
                let dw_context_update: Array2<f32> = learning_rate * &dl_dw_context / &g_v_context.mapv(f32::sqrt);
                let db_tok_update: Array2<f32> = learning_rate * &dl_db / &g_b_tok.mapv(f32::sqrt);
                let db_context_update: Array2<f32> = learning_rate * &dl_db / &g_b_context.mapv(f32::sqrt);

                let sq_w_tok = &dl_dw_tok * &dl_dw_tok;
                let sq_w_context = &dl_dw_context * &dl_dw_context;
                let sq_b = &dl_db * &dl_db;

                // update by index,
                // done in a loop since no select_mut by non-consecutive indexes is available
                for (ll, (ii, jj)) in zip(is, js).enumerate() {
                    // weights update
                    self.w_tokens.slice_mut(s![*ii, ..]).sub_assign(&dw_tok_update.slice(s![ll, ..]));
                    self.w_context.slice_mut(s![*jj, ..]).sub_assign(&dw_context_update.slice(s![ll, ..]));
                    self.b_tokens.slice_mut(s![*ii, ..]).sub_assign(&db_tok_update.slice(s![ll, ..]));
                    self.b_context.slice_mut(s![*jj, ..]).sub_assign(&db_context_update.slice(s![ll, ..]));
                    // grad update
                    self.ag_w_tok.slice_mut(s![*ii, ..]).add_assign(&sq_w_tok.slice(s![ll, ..]));
                    self.ag_w_context.slice_mut(s![*jj, ..]).add_assign(&sq_w_context.slice(s![ll, ..]));
                    self.ag_b_tok.slice_mut(s![*ii, ..]).add_assign(&sq_b.slice(s![ll, ..]));
                    self.ag_b_context.slice_mut(s![*jj, ..]).add_assign(&sq_b.slice(s![ll, ..]));
                }
            }

        Ok(())

    }


    fn train(&mut self, x_mat: &[Array2<f32>], train_params: &TrainParams, rng: &mut StdRng) -> Result<()> {

        let mut progress_params = DisplayProgress::new(x_mat.iter().map(|x| x.dim().0).collect());

        for epoch in 0..train_params.epochs {

            let timer = Instant::now();
            progress_params.reset_loss();

            // for each epoch - > shuffle the slices order and shuffle the order within each slice
            let mut slices_order = (0..progress_params.n_slices).collect::<Vec<usize>>();
            slices_order.shuffle(rng);

            for (rr, m) in slices_order.into_iter().enumerate() {
                progress_params.slice_enumeration = rr + 1;
                progress_params.current_slice = m;
                self.do_training_slice(&x_mat[m], train_params, &mut progress_params, rng)?;
            }

            info!("finished epoch {}, loss is {}, took: {} ms...", epoch, progress_params.mean_loss(), timer.elapsed().as_millis());
        }

        Ok(())

    }

    fn symmetric(x_mat_slice: &Array2<f32>) -> Result<Array2<f32>> {

        // rebuild the symmetric part of a one-sided slice, (i, j, x) also yields (j, i, x)
        let (rows, _) = x_mat_slice.dim();

        let is: Array1<f32> = x_mat_slice.slice(s![.., 0usize]).to_owned();
        let js: Array1<f32> = x_mat_slice.slice(s![.., 1usize]).to_owned();
        let xs: Array1<f32> = x_mat_slice.slice(s![.., 2usize]).to_owned();

        let new_is: Array2<f32> = concatenate![Axis(0), is, js].to_shape((rows*2, 1))?.to_owned();
        let new_js: Array2<f32> = concatenate![Axis(0), js, is].to_shape((rows*2, 1))?.to_owned();
        let new_xs: Array2<f32> = concatenate![Axis(0), xs, xs].to_shape((rows*2, 1))?.to_owned();
        Ok(concatenate![Axis(1), new_is, new_js, new_xs])
    }

    pub fn run(x_mat_slices: Vec<Array2<f32>>, vocab_size: usize, train_params: &TrainParams) -> Result<Train> {

        let mut rng = match train_params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy()
        };

        // every slice index must point inside the vocabulary
        let mut x_mat_symmetric_slices: Vec<Array2<f32>> = Vec::new();
        for x_mat_slice in x_mat_slices.iter().filter(|x| x.dim().0 > 0) {

            let max_index = *x_mat_slice.slice(s![.., ..2usize]).max()
            .map_err(|e| EmbeddingError::invalid(format!("cooccurrence slice: {}", e)))? as usize;
            if max_index >= vocab_size {
                return Err(EmbeddingError::invalid(format!("cooccurrence index {} outside vocabulary of {}", max_index, vocab_size)));
            }

            x_mat_symmetric_slices.push(Train::symmetric(x_mat_slice)?);
        }

        let n_examples: usize = x_mat_symmetric_slices.iter().map(|x| x.dim().0).sum();
        info!("training on {} examples in {} slices", n_examples, x_mat_symmetric_slices.len());

        let mut trainer = Train::new(vocab_size, train_params.vector_size, &mut rng);
        trainer.train(&x_mat_symmetric_slices, train_params, &mut rng)?;
        Ok(trainer)
    }


}


#[cfg(test)]
mod tests {

    use super::Train;
    use crate::config::TrainParams;
    use crate::error::EmbeddingError;
    use ndarray::{array, Array2};

    fn params() -> TrainParams {
        TrainParams { vector_size: 8, epochs: 5, batch_size: 2, seed: Some(11), ..TrainParams::default() }
    }

    fn slices() -> Vec<Array2<f32>> {
        vec![
            array![[0.0, 1.0, 2.0], [0.0, 2.0, 0.5], [1.0, 1.0, 1.0]],
            Array2::zeros((0, 3)),
            array![[2.0, 3.0, 1.5], [3.0, 0.0, 0.25]],
        ]
    }

    #[test]
    fn weighting_test() {
        let mut xs = array![[50.0f32], [100.0], [250.0]];
        Train::weighting_x(&mut xs, 100.0, 0.75);
        approx::assert_abs_diff_eq!(xs[[0, 0]], 0.5f32.powf(0.75), epsilon = 1e-6);
        assert_eq!(xs[[1, 0]], 1.0);
        assert_eq!(xs[[2, 0]], 1.0);
    }

    #[test]
    fn symmetric_slice_test() {
        let sym = Train::symmetric(&array![[0.0, 1.0, 2.0], [2.0, 3.0, 0.5]]).unwrap();
        assert_eq!(sym, array![[0.0, 1.0, 2.0], [2.0, 3.0, 0.5], [1.0, 0.0, 2.0], [3.0, 2.0, 0.5]]);
    }

    #[test]
    fn shapes_and_finite_test() {
        let trainer = Train::run(slices(), 4, &params()).unwrap();
        let w = trainer.vectors();
        assert_eq!(w.dim(), (4, 8));
        assert!(w.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn seed_reproducible_test() {
        let a = Train::run(slices(), 4, &params()).unwrap().vectors();
        let b = Train::run(slices(), 4, &params()).unwrap().vectors();
        assert_eq!(a, b);

        let other = TrainParams { seed: Some(12), ..params() };
        let c = Train::run(slices(), 4, &other).unwrap().vectors();
        assert_ne!(a, c);
    }

    #[test]
    fn index_outside_vocab_test() {
        let result = Train::run(slices(), 3, &params());
        assert!(matches!(result, Err(EmbeddingError::InvalidParameter(_))));
    }
}
