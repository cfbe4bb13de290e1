//! Double-double arithmetic: an unevaluated sum `hi + lo` with `|lo| <= ulp(hi) / 2`

use super::native::{frexp_exponent, integer_to_f64, ldexp, quick_two_sum, two_prod, two_sum};
use super::FloatNumber;
use crate::core::types::NumericBackend;
use rug::{Integer, Rational};

/// About 106 significand bits with the exponent range of `f64`.
///
/// Components are kept normalized, so the derived lexicographic ordering
/// agrees with the ordering of the represented values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DoubleDouble {
    hi: f64,
    lo: f64,
}

impl DoubleDouble {
    pub fn new(hi: f64, lo: f64) -> Self {
        let (hi, lo) = quick_two_sum(hi, lo);
        DoubleDouble { hi, lo }
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    fn from_sum(a: f64, b: f64) -> Self {
        let (hi, lo) = two_sum(a, b);
        DoubleDouble { hi, lo }
    }

    fn mul_f64(&self, b: f64) -> Self {
        let (p1, p2) = two_prod(self.hi, b);
        let p2 = p2 + self.lo * b;
        let (hi, lo) = quick_two_sum(p1, p2);
        DoubleDouble { hi, lo }
    }

    fn sqr(&self) -> Self {
        self.mul(self)
    }
}

impl FloatNumber for DoubleDouble {
    fn backend(_prec: u32) -> NumericBackend {
        NumericBackend::DoubleDouble
    }

    fn from_integer(value: &Integer, _prec: u32) -> Self {
        let hi = integer_to_f64(value);
        if !hi.is_finite() {
            return DoubleDouble { hi, lo: 0.0 };
        }
        let mut rest = value.clone();
        if let Some(head) = Integer::from_f64(hi) {
            rest -= head;
        }
        DoubleDouble::new(hi, integer_to_f64(&rest))
    }

    fn from_f64(value: f64, _prec: u32) -> Self {
        DoubleDouble { hi: value, lo: 0.0 }
    }

    fn add(&self, other: &Self) -> Self {
        let (s1, s2) = two_sum(self.hi, other.hi);
        let (t1, t2) = two_sum(self.lo, other.lo);
        let (s1, s2) = quick_two_sum(s1, s2 + t1);
        let (hi, lo) = quick_two_sum(s1, s2 + t2);
        DoubleDouble { hi, lo }
    }

    fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    fn mul(&self, other: &Self) -> Self {
        let (p1, p2) = two_prod(self.hi, other.hi);
        let p2 = p2 + (self.hi * other.lo + self.lo * other.hi);
        let (hi, lo) = quick_two_sum(p1, p2);
        DoubleDouble { hi, lo }
    }

    fn div(&self, other: &Self) -> Self {
        let q1 = self.hi / other.hi;
        if !q1.is_finite() {
            return DoubleDouble { hi: q1, lo: 0.0 };
        }
        let r = self.sub(&other.mul_f64(q1));
        let q2 = r.hi / other.hi;
        let r = r.sub(&other.mul_f64(q2));
        let q3 = r.hi / other.hi;
        let (q1, q2) = quick_two_sum(q1, q2);
        DoubleDouble { hi: q1, lo: q2 }.add(&DoubleDouble::from_f64(q3, 0))
    }

    fn sqrt(&self) -> Self {
        if self.hi == 0.0 {
            return DoubleDouble::from_f64(0.0, 0);
        }
        if self.hi < 0.0 {
            return DoubleDouble::from_f64(f64::NAN, 0);
        }
        let x = 1.0 / self.hi.sqrt();
        let ax = self.hi * x;
        let correction = self.sub(&DoubleDouble::from_f64(ax, 0).sqr()).hi * (x * 0.5);
        DoubleDouble::from_sum(ax, correction)
    }

    fn neg(&self) -> Self {
        DoubleDouble { hi: -self.hi, lo: -self.lo }
    }

    fn abs(&self) -> Self {
        if self.hi < 0.0 {
            self.neg()
        } else {
            *self
        }
    }

    fn mul_2si(&self, e: i32) -> Self {
        DoubleDouble { hi: ldexp(self.hi, e), lo: ldexp(self.lo, e) }
    }

    fn sign(&self) -> i32 {
        if self.hi > 0.0 {
            1
        } else if self.hi < 0.0 {
            -1
        } else {
            0
        }
    }

    fn is_finite(&self) -> bool {
        self.hi.is_finite() && self.lo.is_finite()
    }

    fn round_to_integer(&self) -> Option<Integer> {
        let mut exact = Rational::from_f64(self.hi)?;
        exact += Rational::from_f64(self.lo)?;
        Some(exact.round().into_numer_denom().0)
    }

    fn exponent(&self) -> i32 {
        if !self.is_finite() {
            return i32::MIN;
        }
        frexp_exponent(self.hi)
    }

    fn to_f64(&self) -> f64 {
        self.hi + self.lo
    }

    fn precision_bits(&self) -> u32 {
        106
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dd(x: f64) -> DoubleDouble {
        DoubleDouble::from_f64(x, 0)
    }

    #[test]
    fn test_keeps_bits_a_double_loses() {
        let one = dd(1.0);
        let tiny = dd(2f64.powi(-80));
        let sum = one.add(&tiny);
        assert_eq!(sum.hi(), 1.0);
        assert_eq!(sum.lo(), 2f64.powi(-80));
        assert_eq!(sum.sub(&one).to_f64(), 2f64.powi(-80));
        assert!(sum > one);
    }

    #[test]
    fn test_integer_round_trip_beyond_53_bits() {
        let v = (Integer::from(1) << 90u32) + 12345;
        let x = DoubleDouble::from_integer(&v, 0);
        assert_eq!(x.round_to_integer().unwrap(), v);
        let neg = Integer::from(-&v);
        assert_eq!(DoubleDouble::from_integer(&neg, 0).round_to_integer().unwrap(), neg);
    }

    #[test]
    fn test_division_and_sqrt() {
        let third = dd(1.0).div(&dd(3.0));
        let back = third.mul(&dd(3.0)).sub(&dd(1.0)).abs();
        assert!(back.to_f64() < 1e-30);

        let two = dd(2.0);
        let root = two.sqrt();
        let err = root.sqr().sub(&two).abs();
        assert!(err.to_f64() < 1e-30);
        assert!(dd(-1.0).sqrt().to_f64().is_nan());
    }

    #[test]
    fn test_rounding_halfway_cases() {
        assert_eq!(dd(2.5).round_to_integer().unwrap(), 3);
        assert_eq!(dd(-0.5).round_to_integer().unwrap(), -1);
        let near_half = dd(0.5).sub(&dd(2f64.powi(-70)));
        assert_eq!(near_half.round_to_integer().unwrap(), 0);
        assert!(dd(f64::INFINITY).round_to_integer().is_none());
    }

    #[test]
    fn test_overflow_is_detected() {
        let huge = Integer::from(1) << 1100u32;
        assert!(!DoubleDouble::from_integer(&huge, 0).is_finite());
    }
}
