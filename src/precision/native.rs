//! `f64` backend and the bit-level helpers shared by the double-based backends

use super::FloatNumber;
use crate::core::types::NumericBackend;
use rug::Integer;

/// Exponent of `x` in the `frexp` convention, `i32::MIN` for zero and non-finite values.
pub(crate) fn frexp_exponent(x: f64) -> i32 {
    if x == 0.0 || !x.is_finite() {
        return i32::MIN;
    }
    let biased = ((x.to_bits() >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // subnormal: renormalize first
        return frexp_exponent(x * 2f64.powi(64)) - 64;
    }
    biased - 1022
}

/// Integer to `f64`, saturating to an infinity beyond the double range.
pub(crate) fn integer_to_f64(value: &Integer) -> f64 {
    if value.significant_bits() > 1024 {
        return if *value < 0 { f64::NEG_INFINITY } else { f64::INFINITY };
    }
    value.to_f64()
}

/// `x * 2^e` without spurious overflow of the scale factor.
pub(crate) fn ldexp(x: f64, e: i32) -> f64 {
    let mut x = x;
    let mut e = e;
    while e > 1000 {
        x *= 2f64.powi(1000);
        e -= 1000;
    }
    while e < -1000 {
        x *= 2f64.powi(-1000);
        e += 1000;
    }
    x * 2f64.powi(e)
}

/// Error-free sum: `a + b = s + err`.
#[inline]
pub(crate) fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

/// Error-free sum for `|a| >= |b|`.
#[inline]
pub(crate) fn quick_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let err = b - (s - a);
    (s, err)
}

/// Error-free product via fused multiply-add.
#[inline]
pub(crate) fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let err = a.mul_add(b, -p);
    (p, err)
}

impl FloatNumber for f64 {
    fn backend(_prec: u32) -> NumericBackend {
        NumericBackend::Native
    }

    fn from_integer(value: &Integer, _prec: u32) -> Self {
        integer_to_f64(value)
    }

    fn from_f64(value: f64, _prec: u32) -> Self {
        value
    }

    fn add(&self, other: &Self) -> Self {
        self + other
    }

    fn sub(&self, other: &Self) -> Self {
        self - other
    }

    fn mul(&self, other: &Self) -> Self {
        self * other
    }

    fn div(&self, other: &Self) -> Self {
        self / other
    }

    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }

    fn neg(&self) -> Self {
        -*self
    }

    fn abs(&self) -> Self {
        f64::abs(*self)
    }

    fn mul_2si(&self, e: i32) -> Self {
        ldexp(*self, e)
    }

    fn sign(&self) -> i32 {
        if *self > 0.0 {
            1
        } else if *self < 0.0 {
            -1
        } else {
            0
        }
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }

    fn round_to_integer(&self) -> Option<Integer> {
        Integer::from_f64(f64::round(*self))
    }

    fn exponent(&self) -> i32 {
        frexp_exponent(*self)
    }

    fn to_f64(&self) -> f64 {
        *self
    }

    fn precision_bits(&self) -> u32 {
        53
    }
}
