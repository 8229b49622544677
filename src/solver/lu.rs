//! Banded LU factorization with partial pivoting.
//!
//! The matrix is taken from CSR form, optionally renumbered by a symmetric
//! ordering `perm[new] = old`, and stored row-wise in a band wide enough for
//! the fill created by row interchanges (`kl` extra super-diagonals).
//! Factor once, then [`BandedLu::solve`] any number of right-hand sides.

use crate::error::SolverError;
use crate::solver::sparse::CsrMatrix;

#[derive(Debug, Clone)]
pub struct BandedLu {
    n: usize,
    kl: usize,
    ku: usize,
    width: usize,
    /// Row `r` holds columns `r - kl ..= r + kl + ku`.
    band: Vec<f64>,
    /// Multipliers of step `k` at `k * kl + (r - k - 1)`.
    lower: Vec<f64>,
    pivots: Vec<usize>,
    perm: Vec<usize>,
}

impl BandedLu {
    /// Factor `matrix` in its natural ordering.
    pub fn factor(matrix: &CsrMatrix) -> Result<Self, SolverError> {
        let perm: Vec<usize> = (0..matrix.n_rows()).collect();
        Self::factor_ordered(matrix, perm)
    }

    /// Factor `matrix` with rows and columns renumbered so that unknown
    /// `perm[new]` becomes `new`.
    pub fn factor_ordered(matrix: &CsrMatrix, perm: Vec<usize>) -> Result<Self, SolverError> {
        let n = matrix.n_rows();
        if matrix.n_cols() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                found: matrix.n_cols(),
            });
        }
        if perm.len() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                found: perm.len(),
            });
        }
        let mut inverse = vec![usize::MAX; n];
        for (new, &old) in perm.iter().enumerate() {
            if old >= n || inverse[old] != usize::MAX {
                return Err(SolverError::DimensionMismatch { expected: n, found: old });
            }
            inverse[old] = new;
        }

        let (mut kl, mut ku) = (0usize, 0usize);
        let mut column_scale = vec![0.0_f64; n];
        for old_row in 0..n {
            let i = inverse[old_row];
            for (old_col, value) in matrix.row(old_row) {
                let j = inverse[old_col];
                if !value.is_finite() {
                    return Err(SolverError::NonFinite { row: old_row });
                }
                if i > j {
                    kl = kl.max(i - j);
                } else {
                    ku = ku.max(j - i);
                }
                column_scale[j] = column_scale[j].max(value.abs());
            }
        }

        let width = 2 * kl + ku + 1;
        let mut lu = Self {
            n,
            kl,
            ku,
            width,
            band: vec![0.0; n * width],
            lower: vec![0.0; n * kl],
            pivots: vec![0; n],
            perm,
        };
        for old_row in 0..n {
            let i = inverse[old_row];
            for (old_col, value) in matrix.row(old_row) {
                let at = lu.offset(i, inverse[old_col]);
                lu.band[at] = value;
            }
        }

        lu.eliminate(&column_scale)?;
        Ok(lu)
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        debug_assert!(col + self.kl >= row && col <= row + self.kl + self.ku);
        row * self.width + (col + self.kl - row)
    }

    fn eliminate(&mut self, column_scale: &[f64]) -> Result<(), SolverError> {
        let (n, kl, ku) = (self.n, self.kl, self.ku);
        for k in 0..n {
            let last_row = (k + kl).min(n - 1);
            let last_col = (k + kl + ku).min(n - 1);

            let mut pivot_row = k;
            let mut pivot_abs = self.band[self.offset(k, k)].abs();
            for r in k + 1..=last_row {
                let candidate = self.band[self.offset(r, k)].abs();
                if candidate > pivot_abs {
                    pivot_row = r;
                    pivot_abs = candidate;
                }
            }
            if !pivot_abs.is_finite() {
                return Err(SolverError::NonFinite { row: self.perm[k] });
            }
            if pivot_abs <= f64::EPSILON * column_scale[k] || pivot_abs == 0.0 {
                return Err(SolverError::Singular { row: self.perm[k] });
            }

            self.pivots[k] = pivot_row;
            if pivot_row != k {
                for c in k..=last_col {
                    let a = self.offset(k, c);
                    let b = self.offset(pivot_row, c);
                    self.band.swap(a, b);
                }
            }

            let pivot = self.band[self.offset(k, k)];
            for r in k + 1..=last_row {
                let at = self.offset(r, k);
                let factor = self.band[at] / pivot;
                self.band[at] = 0.0;
                self.lower[k * kl + (r - k - 1)] = factor;
                if factor == 0.0 {
                    continue;
                }
                for c in k + 1..=last_col {
                    let upper = self.band[self.offset(k, c)];
                    if upper != 0.0 {
                        let target = self.offset(r, c);
                        self.band[target] -= factor * upper;
                    }
                }
            }
        }
        Ok(())
    }

    /// `(sub, super)` bandwidth of the reordered matrix.
    pub fn bandwidth(&self) -> (usize, usize) {
        (self.kl, self.ku)
    }

    /// Solve `A x = rhs` in the caller's numbering.
    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, SolverError> {
        let n = self.n;
        if rhs.len() != n {
            return Err(SolverError::DimensionMismatch {
                expected: n,
                found: rhs.len(),
            });
        }
        let kl = self.kl;
        let last_col = |k: usize| (k + kl + self.ku).min(n - 1);

        let mut y: Vec<f64> = self.perm.iter().map(|&old| rhs[old]).collect();
        for k in 0..n {
            y.swap(k, self.pivots[k]);
            let yk = y[k];
            if yk == 0.0 {
                continue;
            }
            for r in k + 1..=(k + kl).min(n - 1) {
                y[r] -= self.lower[k * kl + (r - k - 1)] * yk;
            }
        }

        for k in (0..n).rev() {
            let mut sum = y[k];
            for c in k + 1..=last_col(k) {
                sum -= self.band[self.offset(k, c)] * y[c];
            }
            y[k] = sum / self.band[self.offset(k, k)];
        }

        let mut x = vec![0.0; n];
        for (new, &old) in self.perm.iter().enumerate() {
            if !y[new].is_finite() {
                return Err(SolverError::NonFinite { row: old });
            }
            x[old] = y[new];
        }
        Ok(x)
    }
}
