//! Gram-Schmidt orthogonalization over a borrowed integer basis
//!
//! [`MatGso`] keeps the exact Gram matrix `g_ij = <b_i, b_j>` in `rug::Integer`
//! and derives the coefficients from it in the backend type `F`:
//!
//! ```text
//! r_ij  = g_ij - sum_{k<j} mu_jk * r_ik
//! mu_ij = r_ij / r_jj
//! ```
//!
//! `r_ii` is the squared norm of the i-th Gram-Schmidt vector. Rows are
//! computed lazily; `valid_cols[i]` counts how many leading columns of row `i`
//! are up to date, and every basis mutation lowers it for the rows it affects.

use crate::core::error::{LatticeError, PrecisionFailure, Result};
use crate::core::matrix::IntegerMatrix;
use crate::core::types::NumericBackend;
use crate::precision::FloatNumber;
use rug::Integer;

pub struct MatGso<'a, F: FloatNumber> {
    b: &'a mut IntegerMatrix,
    precision: u32,
    gram: Vec<Vec<Integer>>,
    mu: Vec<Vec<F>>,
    r: Vec<Vec<F>>,
    valid_cols: Vec<usize>,
}

impl<'a, F: FloatNumber> MatGso<'a, F> {
    /// Build the engine. Only the Gram matrix is computed here; call
    /// [`MatGso::update_gso`] before reading coefficients.
    pub fn new(b: &'a mut IntegerMatrix, precision: u32) -> Result<Self> {
        let d = b.rows();
        let mut gram = vec![vec![Integer::new(); d]; d];
        for i in 0..d {
            for j in 0..=i {
                let g = b.row_dot(i, j)?;
                gram[j][i] = g.clone();
                gram[i][j] = g;
            }
        }
        Ok(MatGso {
            b,
            precision,
            gram,
            mu: vec![vec![F::zero(precision); d]; d],
            r: vec![vec![F::zero(precision); d]; d],
            valid_cols: vec![0; d],
        })
    }

    /// Number of basis rows
    pub fn dimension(&self) -> usize {
        self.gram.len()
    }

    pub fn ambient_dimension(&self) -> usize {
        self.b.cols()
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn backend(&self) -> NumericBackend {
        F::backend(self.precision)
    }

    pub fn basis(&self) -> &IntegerMatrix {
        &*self.b
    }

    fn check_index(&self, i: usize) -> Result<()> {
        if i >= self.dimension() {
            return Err(LatticeError::out_of_range(i, self.dimension()));
        }
        Ok(())
    }

    fn gso_failure(&self, kappa: usize) -> LatticeError {
        LatticeError::insufficient_precision(self.backend(), PrecisionFailure::Gso, kappa)
    }

    /// Exact `<b_i, b_j>`
    pub fn gram(&self, i: usize, j: usize) -> Result<&Integer> {
        self.check_index(i)?;
        self.check_index(j)?;
        Ok(&self.gram[i][j])
    }

    /// Exact squared norm of basis row `i`
    pub fn sq_norm(&self, i: usize) -> Result<&Integer> {
        self.gram(i, i)
    }

    pub fn b_row_is_zero(&self, i: usize) -> Result<bool> {
        Ok(*self.sq_norm(i)? == 0)
    }

    /// Index of the first zero row, or the dimension if there is none.
    pub fn nonzero_prefix(&self) -> usize {
        (0..self.dimension())
            .find(|&i| self.gram[i][i] == 0)
            .unwrap_or(self.dimension())
    }

    /// True when row `i` is up to date through its diagonal.
    pub fn is_row_valid(&self, i: usize) -> bool {
        i < self.dimension() && self.valid_cols[i] > i
    }

    /// Bring columns `0..=last_j` of row `i` up to date, first completing the
    /// earlier rows they depend on.
    pub fn update_gso_row(&mut self, i: usize, last_j: usize) -> Result<()> {
        self.check_index(i)?;
        let last_j = last_j.min(i);
        for k in 0..(last_j + 1).min(i) {
            if self.valid_cols[k] <= k {
                self.compute_columns(k, k)?;
            }
        }
        self.compute_columns(i, last_j)
    }

    fn compute_columns(&mut self, i: usize, last_j: usize) -> Result<()> {
        let prec = self.precision;
        for j in self.valid_cols[i]..=last_j {
            let mut acc = F::from_integer(&self.gram[i][j], prec);
            for k in 0..j {
                acc = acc.sub(&self.mu[j][k].mul(&self.r[i][k]));
            }
            if !acc.is_finite() {
                return Err(self.gso_failure(i));
            }
            if j < i {
                let mu = acc.div(&self.r[j][j]);
                if !mu.is_finite() {
                    return Err(self.gso_failure(i));
                }
                self.mu[i][j] = mu;
            } else {
                self.mu[i][i] = F::one(prec);
            }
            self.r[i][j] = acc;
            self.valid_cols[i] = j + 1;
        }
        Ok(())
    }

    /// Recompute rows in `[from_row, to_row)`. Rows already up to date cost nothing.
    pub fn update_gso(&mut self, from_row: usize, to_row: usize) -> Result<()> {
        if to_row > self.dimension() {
            return Err(LatticeError::out_of_range(to_row - 1, self.dimension()));
        }
        for i in from_row..to_row {
            self.update_gso_row(i, i)?;
        }
        Ok(())
    }

    pub fn update_gso_all(&mut self) -> Result<()> {
        self.update_gso(0, self.dimension())
    }

    /// `mu_ij`; `mu_ii` is 1. Fails on a stale entry.
    pub fn get_mu(&self, i: usize, j: usize) -> Result<F> {
        self.check_index(i)?;
        if j > i {
            return Err(LatticeError::out_of_range(j, i + 1));
        }
        if j == i {
            return Ok(F::one(self.precision));
        }
        if self.valid_cols[i] <= j {
            return Err(LatticeError::invalid_state(format!(
                "mu({}, {}) is stale; update the GSO first",
                i, j
            )));
        }
        Ok(self.mu[i][j].clone())
    }

    /// `r_ij = <b_i, b*_j>`
    pub fn get_r_ij(&self, i: usize, j: usize) -> Result<F> {
        self.check_index(i)?;
        if j > i {
            return Err(LatticeError::out_of_range(j, i + 1));
        }
        if self.valid_cols[i] <= j {
            return Err(LatticeError::invalid_state(format!(
                "r({}, {}) is stale; update the GSO first",
                i, j
            )));
        }
        Ok(self.r[i][j].clone())
    }

    /// Squared norm of the i-th Gram-Schmidt vector
    pub fn get_r(&self, i: usize) -> Result<F> {
        self.get_r_ij(i, i)
    }

    /// `r_ii` split as `(m, e)` with `r_ii = m * 2^e`, `0.5 <= m < 1`.
    pub fn get_r_exp(&self, i: usize) -> Result<(F, i32)> {
        let r = self.get_r(i)?;
        let e = r.exponent();
        if e == i32::MIN {
            return Ok((r, 0));
        }
        Ok((r.mul_2si(-e), e))
    }

    /// Largest exponent among `mu_i0 .. mu_i(n_columns-1)`, `i32::MIN` if all are zero.
    pub fn get_max_mu_exp(&self, i: usize, n_columns: usize) -> Result<i32> {
        self.check_index(i)?;
        if n_columns > i {
            return Err(LatticeError::out_of_range(n_columns, i + 1));
        }
        if self.valid_cols[i] < n_columns {
            return Err(LatticeError::invalid_state(format!(
                "mu({}, {}) is stale; update the GSO first",
                i,
                n_columns - 1
            )));
        }
        Ok(self.mu[i][..n_columns]
            .iter()
            .map(|m| m.exponent())
            .max()
            .unwrap_or(i32::MIN))
    }

    /// Unchecked read for hot loops; row `i` must be valid through column `j`.
    pub(crate) fn mu_ref(&self, i: usize, j: usize) -> &F {
        &self.mu[i][j]
    }

    pub(crate) fn r_ref(&self, i: usize, j: usize) -> &F {
        &self.r[i][j]
    }

    fn invalidate_from(&mut self, row: usize) {
        for cols in self.valid_cols.iter_mut().skip(row) {
            *cols = (*cols).min(row);
        }
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) -> Result<()> {
        self.check_index(i)?;
        self.check_index(j)?;
        if i == j {
            return Ok(());
        }
        self.b.swap_rows(i, j)?;
        self.gram.swap(i, j);
        for row in self.gram.iter_mut() {
            row.swap(i, j);
        }
        self.mu.swap(i, j);
        self.r.swap(i, j);
        self.valid_cols.swap(i, j);
        self.invalidate_from(i.min(j));
        Ok(())
    }

    /// Move row `old` to index `new`, shifting the rows in between.
    pub fn move_row(&mut self, old: usize, new: usize) -> Result<()> {
        self.check_index(old)?;
        self.check_index(new)?;
        if old == new {
            return Ok(());
        }
        self.b.move_row(old, new)?;
        let g = self.gram.remove(old);
        self.gram.insert(new, g);
        for row in self.gram.iter_mut() {
            let v = row.remove(old);
            row.insert(new, v);
        }
        let mu = self.mu.remove(old);
        self.mu.insert(new, mu);
        let r = self.r.remove(old);
        self.r.insert(new, r);
        let cols = self.valid_cols.remove(old);
        self.valid_cols.insert(new, cols);
        self.invalidate_from(old.min(new));
        Ok(())
    }

    /// `b_i += x * b_j`, keeping the Gram matrix exact.
    pub fn row_addmul(&mut self, i: usize, j: usize, x: &Integer) -> Result<()> {
        self.check_index(i)?;
        self.check_index(j)?;
        if *x == 0 {
            return Ok(());
        }
        self.b.row_addmul(i, j, x)?;

        // g_ii += 2x g_ij + x^2 g_jj, using the old g_ij
        let mut diag = Integer::from(x * &self.gram[i][j]);
        diag <<= 1u32;
        diag += Integer::from(x.square_ref()) * &self.gram[j][j];
        self.gram[i][i] += diag;
        for k in 0..self.dimension() {
            if k == i {
                continue;
            }
            let delta = Integer::from(x * &self.gram[j][k]);
            self.gram[i][k] += delta;
            self.gram[k][i] = self.gram[i][k].clone();
        }

        self.valid_cols[i] = 0;
        for cols in self.valid_cols.iter_mut().skip(i + 1) {
            *cols = (*cols).min(i);
        }
        Ok(())
    }

    /// Append a zero row to the basis.
    pub fn create_row(&mut self) {
        let prec = self.precision;
        self.b.push_zero_row();
        for row in self.gram.iter_mut() {
            row.push(Integer::new());
        }
        for row in self.mu.iter_mut().chain(self.r.iter_mut()) {
            row.push(F::zero(prec));
        }
        let d = self.dimension() + 1;
        self.gram.push(vec![Integer::new(); d]);
        self.mu.push(vec![F::zero(prec); d]);
        self.r.push(vec![F::zero(prec); d]);
        self.valid_cols.push(0);
    }

    /// Drop the last basis row.
    pub fn remove_last_row(&mut self) -> Result<()> {
        if self.dimension() == 0 {
            return Err(LatticeError::invalid_state("cannot remove a row from an empty basis"));
        }
        self.b.pop_row();
        self.gram.pop();
        self.mu.pop();
        self.r.pop();
        self.valid_cols.pop();
        for row in self.gram.iter_mut() {
            row.pop();
        }
        for row in self.mu.iter_mut().chain(self.r.iter_mut()) {
            row.pop();
        }
        Ok(())
    }
}
