//! MPFR-backed backends via `rug::Float`

use super::FloatNumber;
use crate::core::types::NumericBackend;
use rug::{Float, Integer};

/// Significand bits of [`ExtendedFloat`], matching an x87 long double
pub const EXTENDED_PRECISION: u32 = 64;

macro_rules! mpfr_backend {
    ($(#[$doc:meta])* $name:ident, |$prec:ident| $effective:expr, $tag:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, PartialOrd)]
        pub struct $name(pub Float);

        impl FloatNumber for $name {
            fn backend($prec: u32) -> NumericBackend {
                $tag
            }

            fn from_integer(value: &Integer, $prec: u32) -> Self {
                $name(Float::with_val($effective, value))
            }

            fn from_f64(value: f64, $prec: u32) -> Self {
                $name(Float::with_val($effective, value))
            }

            fn add(&self, other: &Self) -> Self {
                $name(Float::with_val(self.0.prec(), &self.0 + &other.0))
            }

            fn sub(&self, other: &Self) -> Self {
                $name(Float::with_val(self.0.prec(), &self.0 - &other.0))
            }

            fn mul(&self, other: &Self) -> Self {
                $name(Float::with_val(self.0.prec(), &self.0 * &other.0))
            }

            fn div(&self, other: &Self) -> Self {
                $name(Float::with_val(self.0.prec(), &self.0 / &other.0))
            }

            fn sqrt(&self) -> Self {
                $name(Float::with_val(self.0.prec(), self.0.sqrt_ref()))
            }

            fn neg(&self) -> Self {
                $name(Float::with_val(self.0.prec(), -&self.0))
            }

            fn abs(&self) -> Self {
                $name(Float::with_val(self.0.prec(), self.0.abs_ref()))
            }

            fn mul_2si(&self, e: i32) -> Self {
                let mut out = self.0.clone();
                out <<= e;
                $name(out)
            }

            fn sign(&self) -> i32 {
                match self.0.cmp0() {
                    Some(std::cmp::Ordering::Greater) => 1,
                    Some(std::cmp::Ordering::Less) => -1,
                    _ => 0,
                }
            }

            fn is_finite(&self) -> bool {
                self.0.is_finite()
            }

            fn round_to_integer(&self) -> Option<Integer> {
                if !self.0.is_finite() {
                    return None;
                }
                self.0.clone().round().to_integer()
            }

            fn exponent(&self) -> i32 {
                self.0.get_exp().unwrap_or(i32::MIN)
            }

            fn to_f64(&self) -> f64 {
                self.0.to_f64()
            }

            fn precision_bits(&self) -> u32 {
                self.0.prec()
            }
        }
    };
}

mpfr_backend!(
    /// 64-bit significand with MPFR's exponent range. Stands in for the
    /// platform `long double` so behaviour does not depend on the target.
    ExtendedFloat,
    |_prec| EXTENDED_PRECISION,
    NumericBackend::Extended
);

mpfr_backend!(
    /// MPFR float at the precision chosen when the engine was built.
    MpFloat,
    |prec| prec,
    NumericBackend::Arbitrary { bits: prec }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_has_fixed_precision() {
        let x = ExtendedFloat::from_f64(1.5, 4096);
        assert_eq!(x.precision_bits(), EXTENDED_PRECISION);
        assert_eq!(ExtendedFloat::backend(4096), NumericBackend::Extended);
    }

    #[test]
    fn test_extended_survives_double_overflow() {
        let huge = Integer::from(1) << 1100u32;
        let x = ExtendedFloat::from_integer(&huge, 0);
        assert!(x.is_finite());
        assert_eq!(x.exponent(), 1101);
        let sq = x.mul(&x);
        assert!(sq.is_finite());
        assert_eq!(sq.div(&x).round_to_integer().unwrap(), huge);
    }

    #[test]
    fn test_mpfr_arithmetic() {
        let two = MpFloat::from_f64(2.0, 200);
        let root = two.sqrt();
        assert_eq!(root.precision_bits(), 200);
        let back = root.mul(&root).sub(&two).abs();
        assert!(back.exponent() < -190);
        assert_eq!(MpFloat::backend(200), NumericBackend::Arbitrary { bits: 200 });
    }

    #[test]
    fn test_mpfr_rounding_and_sign() {
        let x = MpFloat::from_f64(-2.5, 64);
        assert_eq!(x.round_to_integer().unwrap(), -3);
        assert_eq!(x.sign(), -1);
        assert_eq!(x.neg().sign(), 1);
        assert_eq!(MpFloat::zero(64).sign(), 0);
        assert_eq!(MpFloat::zero(64).exponent(), i32::MIN);
        assert_eq!(x.mul_2si(3).to_f64(), -20.0);
        let nan = MpFloat::zero(64).div(&MpFloat::zero(64));
        assert!(nan.round_to_integer().is_none());
        assert!(!(nan.abs() <= MpFloat::one(64)));
    }
}
