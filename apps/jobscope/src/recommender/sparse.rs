//! Sparse vectors and a row-compressed matrix, just enough for cosine search.

use serde::{Deserialize, Serialize};

/// Borrowed sparse row: strictly increasing `indices` with parallel `values`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseView<'a> {
    pub indices: &'a [usize],
    pub values: &'a [f64],
}

impl<'a> SparseView<'a> {
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// `(index, self value, other value)` for every index nonzero in both.
    pub fn intersection(&self, other: SparseView<'a>) -> Vec<(usize, f64, f64)> {
        let (mut i, mut j) = (0, 0);
        let mut out = Vec::new();
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out.push((self.indices[i], self.values[i], other.values[j]));
                    i += 1;
                    j += 1;
                }
            }
        }
        out
    }

    pub fn dot(&self, other: SparseView<'_>) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Builds from unsorted `(index, value)` pairs; zero values are dropped.
    pub fn from_pairs(mut pairs: Vec<(usize, f64)>) -> Self {
        pairs.retain(|(_, v)| *v != 0.0);
        pairs.sort_by_key(|(i, _)| *i);
        let (indices, values) = pairs.into_iter().unzip();
        SparseVector { indices, values }
    }

    pub fn view(&self) -> SparseView<'_> {
        SparseView {
            indices: &self.indices,
            values: &self.values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Scales to unit Euclidean length; the zero vector stays zero.
    pub fn l2_normalize(&mut self) {
        let norm = self.values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            self.values.iter_mut().for_each(|v| *v /= norm);
        }
    }
}

/// Compressed sparse row matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub n_cols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f64>,
}

impl CsrMatrix {
    pub fn new(n_cols: usize) -> Self {
        CsrMatrix {
            n_cols,
            indptr: vec![0],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: &SparseVector) {
        self.indices.extend_from_slice(&row.indices);
        self.data.extend_from_slice(&row.values);
        self.indptr.push(self.indices.len());
    }

    pub fn n_rows(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    pub fn row(&self, i: usize) -> SparseView<'_> {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        SparseView {
            indices: &self.indices[start..end],
            values: &self.data[start..end],
        }
    }

    /// Structural check for matrices read back from disk.
    pub fn validate(&self) -> Result<(), String> {
        if self.indptr.first() != Some(&0) {
            return Err("indptr must start at 0".to_string());
        }
        if self.indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err("indptr is not monotonic".to_string());
        }
        if self.indptr.last() != Some(&self.indices.len()) || self.indices.len() != self.data.len() {
            return Err("indptr, indices and data lengths disagree".to_string());
        }
        for r in 0..self.n_rows() {
            let row = self.row(r);
            if row.indices.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("row {r} indices are not strictly increasing"));
            }
            if row.indices.last().is_some_and(|&c| c >= self.n_cols) {
                return Err(format!("row {r} has a column out of range"));
            }
        }
        Ok(())
    }
}
