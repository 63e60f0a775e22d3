//! Sparse transition kernel for one action
//!
//! Row `s` lists `(destination, probability)` pairs. Rows may sum to less
//! than one; the missing mass is absorbed (terminal states have empty rows).

use ndarray::Array1;

/// Sparse row-major transition matrix
#[derive(Debug, Clone)]
pub struct TransitionKernel {
    rows: Vec<Vec<(usize, f64)>>,
}

impl TransitionKernel {
    /// Kernel with no transitions
    pub fn new(num_states: usize) -> Self {
        Self {
            rows: vec![Vec::new(); num_states],
        }
    }

    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    /// Add probability mass to `from -> to`, merging with an existing entry
    pub fn add(&mut self, from: usize, to: usize, probability: f64) {
        let row = &mut self.rows[from];
        match row.iter_mut().find(|(dest, _)| *dest == to) {
            Some((_, p)) => *p += probability,
            None => row.push((to, probability)),
        }
    }

    pub fn row(&self, from: usize) -> &[(usize, f64)] {
        &self.rows[from]
    }

    pub fn row_sum(&self, from: usize) -> f64 {
        self.rows[from].iter().map(|(_, p)| p).sum()
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Matrix-vector product `T · values`
    pub fn expected_value(&self, values: &Array1<f64>) -> Array1<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|&(to, p)| p * values[to]).sum::<f64>())
            .collect()
    }
}
