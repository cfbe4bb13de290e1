//! Quad-double arithmetic: an unevaluated sum of four doubles
//!
//! Operations expand into a list of exact partial terms (error-free sums and
//! products) and then distil that list back into four components. Each
//! distillation pass is error free, so only the tail beyond the fourth
//! component is lost.

use super::native::{frexp_exponent, integer_to_f64, ldexp, two_prod, two_sum};
use super::FloatNumber;
use crate::core::types::NumericBackend;
use rug::{Integer, Rational};
use std::cmp::Ordering;

const COMPONENTS: usize = 4;
const MAX_PASSES: usize = 8;

/// About 212 significand bits with the exponent range of `f64`.
///
/// Components are ordered by decreasing magnitude and the first nonzero one
/// carries the sign of the value.
#[derive(Debug, Clone, Copy)]
pub struct QuadDouble {
    c: [f64; COMPONENTS],
}

/// Distil an arbitrary list of terms into at most four components.
fn renormalize(mut terms: Vec<f64>) -> [f64; COMPONENTS] {
    let mut out = [0.0; COMPONENTS];
    if terms.iter().any(|t| !t.is_finite()) {
        out[0] = terms.iter().sum();
        return out;
    }
    let mut k = 0;
    for _ in 0..MAX_PASSES {
        terms.retain(|t| *t != 0.0);
        if terms.is_empty() || k == COMPONENTS {
            break;
        }
        terms.sort_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(Ordering::Equal));
        let mut s = terms[0];
        let mut errors = Vec::with_capacity(terms.len());
        for &t in &terms[1..] {
            let (sum, err) = two_sum(t, s);
            errors.push(err);
            s = sum;
        }
        if !s.is_finite() {
            out[k] = s;
            return out;
        }
        if s != 0.0 {
            out[k] = s;
            k += 1;
        }
        terms = errors;
    }
    out
}

impl QuadDouble {
    pub fn components(&self) -> [f64; COMPONENTS] {
        self.c
    }

    fn from_terms(terms: Vec<f64>) -> Self {
        QuadDouble { c: renormalize(terms) }
    }

    fn leading(&self) -> f64 {
        self.c.iter().copied().find(|x| *x != 0.0).unwrap_or(0.0)
    }

    fn mul_f64(&self, b: f64) -> Self {
        let mut terms = Vec::with_capacity(2 * COMPONENTS);
        for &a in &self.c {
            let (p, e) = two_prod(a, b);
            terms.push(p);
            terms.push(e);
        }
        Self::from_terms(terms)
    }
}

impl PartialEq for QuadDouble {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for QuadDouble {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let diff = self.sub(other);
        let lead = diff.leading();
        if lead.is_nan() {
            return None;
        }
        lead.partial_cmp(&0.0)
    }
}

impl FloatNumber for QuadDouble {
    fn backend(_prec: u32) -> NumericBackend {
        NumericBackend::QuadDouble
    }

    fn from_integer(value: &Integer, _prec: u32) -> Self {
        let mut c = [0.0; COMPONENTS];
        let mut rest = value.clone();
        for slot in c.iter_mut() {
            let head = integer_to_f64(&rest);
            *slot = head;
            if !head.is_finite() {
                break;
            }
            match Integer::from_f64(head) {
                Some(h) => rest -= h,
                None => break,
            }
            if rest == 0 {
                break;
            }
        }
        Self::from_terms(c.to_vec())
    }

    fn from_f64(value: f64, _prec: u32) -> Self {
        QuadDouble { c: [value, 0.0, 0.0, 0.0] }
    }

    fn add(&self, other: &Self) -> Self {
        let mut terms = self.c.to_vec();
        terms.extend_from_slice(&other.c);
        Self::from_terms(terms)
    }

    fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    fn mul(&self, other: &Self) -> Self {
        let mut terms = Vec::with_capacity(24);
        for (i, &a) in self.c.iter().enumerate() {
            for (j, &b) in other.c.iter().enumerate() {
                match i + j {
                    0..=2 => {
                        let (p, e) = two_prod(a, b);
                        terms.push(p);
                        terms.push(e);
                    }
                    3 => terms.push(a * b),
                    _ => {}
                }
            }
        }
        Self::from_terms(terms)
    }

    fn div(&self, other: &Self) -> Self {
        let b0 = other.leading();
        let mut quotients = Vec::with_capacity(COMPONENTS + 1);
        let mut r = *self;
        for _ in 0..=COMPONENTS {
            let q = r.leading() / b0;
            quotients.push(q);
            if !q.is_finite() {
                break;
            }
            r = r.sub(&other.mul_f64(q));
            if r.leading() == 0.0 {
                break;
            }
        }
        Self::from_terms(quotients)
    }

    fn sqrt(&self) -> Self {
        let lead = self.leading();
        if lead == 0.0 {
            return Self::zero(0);
        }
        if lead < 0.0 || !lead.is_finite() {
            return Self::from_f64(if lead > 0.0 { lead } else { f64::NAN }, 0);
        }
        // Newton on 1/sqrt(a), doubling the correct bits each step: 53 -> 106 -> 212 -> 424
        let one = Self::one(0);
        let mut x = Self::from_f64(1.0 / lead.sqrt(), 0);
        for _ in 0..3 {
            let residual = one.sub(&self.mul(&x).mul(&x));
            x = x.add(&x.mul(&residual).mul_2si(-1));
        }
        self.mul(&x)
    }

    fn neg(&self) -> Self {
        QuadDouble { c: self.c.map(|x| -x) }
    }

    fn abs(&self) -> Self {
        if self.leading() < 0.0 {
            self.neg()
        } else {
            *self
        }
    }

    fn mul_2si(&self, e: i32) -> Self {
        QuadDouble { c: self.c.map(|x| ldexp(x, e)) }
    }

    fn sign(&self) -> i32 {
        let lead = self.leading();
        if lead > 0.0 {
            1
        } else if lead < 0.0 {
            -1
        } else {
            0
        }
    }

    fn is_finite(&self) -> bool {
        self.c.iter().all(|x| x.is_finite())
    }

    fn round_to_integer(&self) -> Option<Integer> {
        let mut exact = Rational::new();
        for &x in &self.c {
            exact += Rational::from_f64(x)?;
        }
        Some(exact.round().into_numer_denom().0)
    }

    fn exponent(&self) -> i32 {
        if !self.is_finite() {
            return i32::MIN;
        }
        frexp_exponent(self.leading())
    }

    fn to_f64(&self) -> f64 {
        self.c.iter().rev().sum()
    }

    fn precision_bits(&self) -> u32 {
        212
    }
}
