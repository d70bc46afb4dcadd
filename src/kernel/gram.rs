//! Parallel kernel matrices.
//!
//! A classifier evaluates the composite kernel for every pair of training
//! instances, and for every (test, training) pair at prediction time. Both
//! are embarrassingly parallel; rows are spread over rayon's pool and each
//! tree's self-similarity is computed once up front.

use rayon::prelude::*;

use super::{CompositeKernel, KernelInput, KernelParams, KernelResult};

/// A dense `rows x cols` matrix of kernel values, row-major.
///
/// Each cell carries its own result so a single degenerate instance only
/// fails the cells it takes part in.
#[derive(Debug, Clone)]
pub struct KernelMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<KernelResult<f64>>,
}

impl KernelMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&KernelResult<f64>> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    pub fn row(&self, row: usize) -> Option<&[KernelResult<f64>]> {
        if row >= self.rows {
            return None;
        }
        Some(&self.cells[row * self.cols..(row + 1) * self.cols])
    }

    /// Number of cells whose evaluation failed.
    pub fn failures(&self) -> usize {
        self.cells.iter().filter(|c| c.is_err()).count()
    }

    /// All values, or the first error in row-major order.
    pub fn values(&self) -> KernelResult<Vec<Vec<f64>>> {
        (0..self.rows)
            .map(|r| {
                self.cells[r * self.cols..(r + 1) * self.cols]
                    .iter()
                    .cloned()
                    .collect()
            })
            .collect()
    }
}

/// Symmetric kernel matrix of `inputs` under `params`.
pub fn gram_matrix(inputs: &[KernelInput], params: KernelParams) -> KernelMatrix {
    CompositeKernel::new(params).gram_matrix(inputs)
}

impl CompositeKernel {
    fn norms(&self, inputs: &[KernelInput]) -> Vec<f64> {
        inputs
            .par_iter()
            .map(|input| self.self_similarity(input.tree()))
            .collect()
    }

    /// Symmetric kernel matrix over one set of instances.
    ///
    /// Only the upper triangle is evaluated; the lower one is mirrored.
    pub fn gram_matrix(&self, inputs: &[KernelInput]) -> KernelMatrix {
        let n = inputs.len();
        let norms = self.norms(inputs);

        let upper: Vec<Vec<KernelResult<f64>>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| self.composite_with_norms(&inputs[i], &inputs[j], norms[i], norms[j]))
                    .collect()
            })
            .collect();

        let mut cells = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let cell = if j >= i {
                    upper[i][j - i].clone()
                } else {
                    upper[j][i - j].clone()
                };
                cells.push(cell);
            }
        }

        let matrix = KernelMatrix {
            rows: n,
            cols: n,
            cells,
        };
        tracing::debug!(instances = n, failures = matrix.failures(), "computed gram matrix");
        matrix
    }

    /// Kernel values between every instance of `rows` and every instance of
    /// `cols`, e.g. test instances against training instances.
    pub fn cross_matrix(&self, rows: &[KernelInput], cols: &[KernelInput]) -> KernelMatrix {
        let row_norms = self.norms(rows);
        let col_norms = self.norms(cols);

        let cells: Vec<KernelResult<f64>> = rows
            .par_iter()
            .zip(row_norms.par_iter())
            .flat_map_iter(|(a, &na)| {
                cols.iter()
                    .zip(&col_norms)
                    .map(move |(b, &nb)| self.composite_with_norms(a, b, na, nb))
            })
            .collect();

        let matrix = KernelMatrix {
            rows: rows.len(),
            cols: cols.len(),
            cells,
        };
        tracing::debug!(
            rows = matrix.rows,
            cols = matrix.cols,
            failures = matrix.failures(),
            "computed cross kernel matrix"
        );
        matrix
    }
}
