//! Compressed sparse row matrices and an accumulating builder.
//!
//! Operators are assembled row by row into a [`CsrBuilder`], which merges
//! repeated `(row, col)` contributions, then frozen into a [`CsrMatrix`].

use std::collections::BTreeMap;

/// Row-wise accumulator for a sparse matrix.
#[derive(Debug, Clone)]
pub struct CsrBuilder {
    n_cols: usize,
    rows: Vec<BTreeMap<usize, f64>>,
}

impl CsrBuilder {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_cols,
            rows: vec![BTreeMap::new(); n_rows],
        }
    }

    /// Add `value` to entry `(row, col)`.
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(col < self.n_cols, "column {} out of range ({})", col, self.n_cols);
        *self.rows[row].entry(col).or_insert(0.0) += value;
    }

    /// Overwrite entry `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(col < self.n_cols, "column {} out of range ({})", col, self.n_cols);
        self.rows[row].insert(col, value);
    }

    /// Freeze into CSR form. Entries that summed to exactly zero are dropped.
    pub fn build(self) -> CsrMatrix {
        let n_rows = self.rows.len();
        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for row in self.rows {
            for (col, value) in row {
                if value != 0.0 {
                    col_idx.push(col);
                    values.push(value);
                }
            }
            row_ptr.push(col_idx.len());
        }
        CsrMatrix {
            n_rows,
            n_cols: self.n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }
}

/// Immutable CSR matrix with sorted column indices in every row.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `(col, value)` pairs of `row`, in column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.row_ptr[row]..self.row_ptr[row + 1];
        self.col_idx[span.clone()].iter().copied().zip(self.values[span].iter().copied())
    }

    /// Stored value at `(row, col)`, zero if absent.
    #[cfg(test)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let span = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[span.clone()].binary_search(&col) {
            Ok(k) => self.values[span.start + k],
            Err(_) => 0.0,
        }
    }

    /// `y = A x`
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.n_cols);
        debug_assert_eq!(y.len(), self.n_rows);
        for (r, out) in y.iter_mut().enumerate() {
            *out = self.row(r).map(|(c, v)| v * x[c]).sum();
        }
    }

    /// `y += A x`
    pub fn mul_vec_add(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.n_cols);
        debug_assert_eq!(y.len(), self.n_rows);
        for (r, out) in y.iter_mut().enumerate() {
            *out += self.row(r).map(|(c, v)| v * x[c]).sum::<f64>();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_merges_duplicates() {
        let mut b = CsrBuilder::new(2, 3);
        b.add(0, 2, 1.5);
        b.add(0, 0, 1.0);
        b.add(0, 2, 0.5);
        b.add(1, 1, 3.0);
        let m = b.build();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.get(0, 2), 2.0);
        assert_eq!(m.get(1, 0), 0.0);
        let cols: Vec<usize> = m.row(0).map(|(c, _)| c).collect();
        assert_eq!(cols, vec![0, 2], "columns must be sorted");
    }

    #[test]
    fn test_cancelled_entries_are_dropped() {
        let mut b = CsrBuilder::new(1, 2);
        b.add(0, 1, 2.0);
        b.add(0, 1, -2.0);
        b.add(0, 0, 1.0);
        assert_eq!(b.build().nnz(), 1);
    }

    #[test]
    fn test_mul_vec() {
        let mut b = CsrBuilder::new(3, 3);
        for i in 0..3 {
            b.set(i, i, 4.0);
            if i > 0 {
                b.set(i, i - 1, -1.0);
            }
            if i < 2 {
                b.set(i, i + 1, -1.0);
            }
        }
        let m = b.build();
        let mut y = vec![0.0; 3];
        m.mul_vec(&[1.0, 2.0, 3.0], &mut y);
        assert_eq!(y, vec![2.0, 4.0, 10.0]);
        m.mul_vec_add(&[1.0, 0.0, 0.0], &mut y);
        assert_eq!(y, vec![6.0, 3.0, 10.0]);
    }

    #[test]
    fn test_set_overwrites_accumulated_value() {
        let mut b = CsrBuilder::new(2, 2);
        b.add(0, 0, 1.0);
        b.add(0, 0, 1.0);
        b.set(0, 0, 5.0);
        let m = b.build();
        assert_eq!(m.get(0, 0), 5.0, "set must replace, not add");
        assert_eq!(m.row(1).count(), 0);
    }
}
