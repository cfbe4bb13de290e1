//! Utility functions: basis generators, exact invariants and timing helpers

use crate::core::error::{LatticeError, Result};
use crate::core::matrix::IntegerMatrix;
use rug::{Float, Integer};
use serde::{Deserialize, Serialize};

/// Reproducible test bases in the usual lattice-challenge shapes
pub mod generators {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Uniform integer in `[0, 2^bits)`
    fn random_bits(rng: &mut StdRng, bits: u32) -> Integer {
        let mut x = Integer::new();
        for _ in 0..bits.div_ceil(64) {
            x <<= 64u32;
            x += rng.random::<u64>();
        }
        x.keep_bits_mut(bits);
        x
    }

    /// Modulus with exactly `bits` bits
    fn random_modulus(rng: &mut StdRng, bits: u32) -> Integer {
        let mut q = random_bits(rng, bits);
        q.set_bit(bits.saturating_sub(1), true);
        q
    }

    /// Uniform integer in `[0, q)`; the 64 extra bits keep the bias negligible
    fn random_below(rng: &mut StdRng, q: &Integer) -> Integer {
        random_bits(rng, q.significant_bits() + 64) % q
    }

    fn check_bits(bits: u32) -> Result<()> {
        if bits == 0 {
            return Err(LatticeError::invalid_parameters("Entry size must be at least 1 bit"));
        }
        Ok(())
    }

    /// `d x d` matrix of uniform `bits`-bit entries
    pub fn uniform(d: usize, bits: u32, seed: u64) -> Result<IntegerMatrix> {
        check_bits(bits)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut b = IntegerMatrix::zeros(d, d);
        for i in 0..d {
            for j in 0..d {
                b.set(i, j, random_bits(&mut rng, bits))?;
            }
        }
        Ok(b)
    }

    /// NTRU-like `2d x 2d` basis `[[I, Rot(h)], [0, q I]]` with a random
    /// `bits`-bit modulus `q` and `h` uniform modulo `q`.
    pub fn ntrulike(d: usize, bits: u32, seed: u64) -> Result<IntegerMatrix> {
        check_bits(bits)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let q = random_modulus(&mut rng, bits);
        let h: Vec<Integer> = (0..d).map(|_| random_below(&mut rng, &q)).collect();

        let mut b = IntegerMatrix::zeros(2 * d, 2 * d);
        for i in 0..d {
            b.set(i, i, Integer::from(1))?;
            for j in 0..d {
                b.set(i, d + j, h[(j + d - i) % d].clone())?;
            }
            b.set(d + i, d + i, q.clone())?;
        }
        log::debug!("Generated NTRU-like basis of dimension {} with q = {}", 2 * d, q);
        Ok(b)
    }

    /// Integer-relation basis: row `i` is `[a_i, e_i]` with `bits`-bit `a_i`
    pub fn intrel(d: usize, bits: u32, seed: u64) -> Result<IntegerMatrix> {
        check_bits(bits)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut b = IntegerMatrix::zeros(d, d + 1);
        for i in 0..d {
            b.set(i, 0, random_bits(&mut rng, bits))?;
            b.set(i, i + 1, Integer::from(1))?;
        }
        Ok(b)
    }

    /// q-ary basis `[[I, H], [0, q I_k]]` of dimension `d` with `k` modular rows
    pub fn qary(d: usize, k: usize, bits: u32, seed: u64) -> Result<IntegerMatrix> {
        check_bits(bits)?;
        if k > d {
            return Err(LatticeError::invalid_parameters(format!(
                "q-ary basis needs k <= d, got k = {}, d = {}",
                k, d
            )));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let q = random_modulus(&mut rng, bits);
        let free = d - k;
        let mut b = IntegerMatrix::zeros(d, d);
        for i in 0..free {
            b.set(i, i, Integer::from(1))?;
            for j in free..d {
                b.set(i, j, random_below(&mut rng, &q))?;
            }
        }
        for i in free..d {
            b.set(i, i, q.clone())?;
        }
        Ok(b)
    }
}

/// Determinant of the Gram matrix `B B^T`, computed exactly by fraction-free
/// (Bareiss) elimination. Unchanged by any unimodular row operation.
pub fn gram_determinant(basis: &IntegerMatrix) -> Result<Integer> {
    let d = basis.rows();
    let mut a = (0..d)
        .map(|i| (0..d).map(|j| basis.row_dot(i, j)).collect::<Result<Vec<_>>>())
        .collect::<Result<Vec<_>>>()?;
    let mut negate = false;
    let mut prev = Integer::from(1);
    for k in 0..d {
        if a[k][k] == 0 {
            match ((k + 1)..d).find(|&i| a[i][k] != 0) {
                Some(p) => {
                    a.swap(k, p);
                    negate = !negate;
                }
                None => return Ok(Integer::new()),
            }
        }
        for i in (k + 1)..d {
            for j in (k + 1)..d {
                let v = Integer::from(&a[i][j] * &a[k][k]) - Integer::from(&a[i][k] * &a[k][j]);
                a[i][j] = v.div_exact(&prev);
            }
        }
        prev = a[k][k].clone();
    }
    if negate {
        prev = -prev;
    }
    Ok(prev)
}

/// Quality figures of a basis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisStatistics {
    pub rows: usize,
    pub cols: usize,
    pub max_bits: u32,
    /// `log2 ||b_0||`
    pub log2_first_norm: f64,
    /// `log2 ||b_i||` of the shortest row
    pub log2_min_norm: f64,
    /// `(||b_0|| / vol^(1/d))^(1/d)`, `None` for rank-deficient or empty bases
    pub root_hermite_factor: Option<f64>,
}

fn log2_sqrt(x: &Integer) -> f64 {
    if *x == 0 {
        return f64::NEG_INFINITY;
    }
    Float::with_val(64, x).log2().to_f64() / 2.0
}

pub fn basis_statistics(basis: &IntegerMatrix) -> Result<BasisStatistics> {
    let d = basis.rows();
    let norms = (0..d).map(|i| basis.sq_norm(i)).collect::<Result<Vec<_>>>()?;
    let log2_first_norm = norms.first().map(log2_sqrt).unwrap_or(f64::NEG_INFINITY);
    let log2_min_norm = norms
        .iter()
        .filter(|n| **n != 0)
        .map(log2_sqrt)
        .fold(f64::INFINITY, f64::min);

    let det = gram_determinant(basis)?;
    let root_hermite_factor = if d > 0 && det > 0 {
        let log2_vol = log2_sqrt(&det);
        let dim = d as f64;
        Some(((log2_first_norm - log2_vol / dim) / dim).exp2())
    } else {
        None
    };

    Ok(BasisStatistics {
        rows: d,
        cols: basis.cols(),
        max_bits: basis.max_bits(),
        log2_first_norm,
        log2_min_norm,
        root_hermite_factor,
    })
}

/// Profiling helpers
pub mod profiling {
    use std::time::{Duration, Instant};

    /// Run `func`, log how long it took and return the elapsed time with its result
    pub fn timed<F, R>(name: &str, func: F) -> (R, Duration)
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = func();
        let duration = start.elapsed();
        log::debug!("'{}' took {:.2?}", name, duration);
        (result, duration)
    }
}

pub use generators::*;
pub use profiling::*;
