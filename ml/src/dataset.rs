use std::num::NonZeroUsize;

use ndarray::ArrayView2;
use rand::Rng;

use crate::error::{MlErr, Result};

/// An in-memory supervised dataset.
///
/// Inputs and labels live in paired row-major buffers so that batches can be
/// viewed without copying.
#[derive(Debug, Clone)]
pub struct Dataset {
    xs: Vec<f32>,
    ys: Vec<f32>,
    x_size: usize,
    y_size: usize,
}

impl Dataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Arguments
    /// * `xs` - Input rows, `x_size` values per sample.
    /// * `ys` - Label rows, `y_size` values per sample.
    /// * `x_size`, `y_size` - The widths of a single input and label row.
    ///
    /// # Returns
    /// An error if either buffer is empty, misaligned, or the row counts differ.
    pub fn new(xs: Vec<f32>, ys: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        if x_size == 0 || y_size == 0 || xs.is_empty() {
            return Err(MlErr::EmptyDataset);
        }
        if xs.len() % x_size != 0 {
            return Err(MlErr::SizeMismatch {
                what: "input rows",
                got: xs.len(),
                expected: (xs.len() / x_size) * x_size,
            });
        }
        if ys.len() % y_size != 0 || ys.len() / y_size != xs.len() / x_size {
            return Err(MlErr::SizeMismatch {
                what: "label rows",
                got: ys.len(),
                expected: (xs.len() / x_size) * y_size,
            });
        }

        Ok(Self {
            xs,
            ys,
            x_size,
            y_size,
        })
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.xs.len() / self.x_size
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.y_size
    }

    pub fn xs(&self) -> &[f32] {
        &self.xs
    }

    pub fn ys(&self) -> &[f32] {
        &self.ys
    }

    /// Views the whole dataset as one `(inputs, labels)` pair.
    pub fn view(&self) -> (ArrayView2<'_, f32>, ArrayView2<'_, f32>) {
        let rows = self.len();
        let x = ArrayView2::from_shape((rows, self.x_size), &self.xs).unwrap();
        let y = ArrayView2::from_shape((rows, self.y_size), &self.ys).unwrap();
        (x, y)
    }

    /// Shuffles the samples in place, keeping inputs and labels in lockstep.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        for i in (1..self.len()).rev() {
            let j = rng.random_range(0..=i);
            if i != j {
                self.swap_rows(i, j);
            }
        }
    }

    /// Returns an iterator of borrowed `(inputs, labels)` batches. The last
    /// batch may be shorter.
    pub fn batches(&self, batch_size: NonZeroUsize) -> Batches<'_> {
        Batches {
            dataset: self,
            batch_size: batch_size.get(),
            cursor: 0,
        }
    }

    fn swap_rows(&mut self, i: usize, j: usize) {
        for k in 0..self.x_size {
            self.xs.swap(i * self.x_size + k, j * self.x_size + k);
        }
        for k in 0..self.y_size {
            self.ys.swap(i * self.y_size + k, j * self.y_size + k);
        }
    }
}

/// Borrowed batch iterator over a [`Dataset`].
#[derive(Debug, Clone)]
pub struct Batches<'a> {
    dataset: &'a Dataset,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>);

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.dataset.len();
        if self.cursor >= len {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(len);
        let rows = end - self.cursor;
        let (x_size, y_size) = (self.dataset.x_size, self.dataset.y_size);

        let x = ArrayView2::from_shape(
            (rows, x_size),
            &self.dataset.xs[self.cursor * x_size..end * x_size],
        )
        .unwrap();
        let y = ArrayView2::from_shape(
            (rows, y_size),
            &self.dataset.ys[self.cursor * y_size..end * y_size],
        )
        .unwrap();

        self.cursor = end;
        Some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn linear_dataset(n: usize) -> Dataset {
        let xs: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let ys: Vec<f32> = xs.iter().map(|x| x + 100.0).collect();
        Dataset::new(xs, ys, 1, 1).unwrap()
    }

    #[test]
    fn rejects_empty_and_misaligned_buffers() {
        assert!(Dataset::new(vec![], vec![], 1, 1).is_err());
        assert!(Dataset::new(vec![1.0, 2.0, 3.0], vec![1.0], 2, 1).is_err());
        assert!(Dataset::new(vec![1.0, 2.0], vec![1.0], 1, 1).is_err());
    }

    #[test]
    fn shuffle_keeps_rows_paired() {
        let mut ds = linear_dataset(10);
        let mut rng = StdRng::seed_from_u64(3);

        ds.shuffle(&mut rng);

        for (x, y) in ds.xs().iter().zip(ds.ys()) {
            assert_eq!(y - x, 100.0);
        }

        let mut seen: Vec<f32> = ds.xs().to_vec();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, (0..10).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn batches_cover_everything_with_a_short_tail() {
        let ds = linear_dataset(10);
        let batches: Vec<_> = ds.batches(NonZeroUsize::new(4).unwrap()).collect();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].0.nrows(), 4);
        assert_eq!(batches[1].0.nrows(), 4);
        assert_eq!(batches[2].0.nrows(), 2);
        assert_eq!(batches[2].1[[1, 0]], 109.0);
    }
}
