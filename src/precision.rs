//! Floating-point backends for Gram-Schmidt data
//!
//! Every backend implements [`FloatNumber`]. The GSO engine and the LLL driver
//! are generic over it; [`crate::dispatch`] picks one at runtime.
//!
//! | backend          | type              | significand |
//! |------------------|-------------------|-------------|
//! | native           | `f64`             | 53          |
//! | extended         | [`ExtendedFloat`] | 64          |
//! | double-double    | [`DoubleDouble`]  | ~106        |
//! | quad-double      | [`QuadDouble`]    | ~212        |
//! | arbitrary (MPFR) | [`MpFloat`]       | configurable|

pub mod double_double;
pub mod mpfr;
pub mod native;
pub mod quad_double;

pub use double_double::DoubleDouble;
pub use mpfr::{ExtendedFloat, MpFloat};
pub use quad_double::QuadDouble;

use crate::core::error::{LatticeError, Result};
use crate::core::types::NumericBackend;
use rug::Integer;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Smallest precision accepted for the arbitrary-precision backend
pub const MIN_ARBITRARY_PRECISION: u32 = 53;

/// Default MPFR precision when nothing was configured
pub const DEFAULT_ARBITRARY_PRECISION: u32 = 256;

/// Arithmetic a GSO backend must provide.
///
/// Values carry their own precision; `prec` arguments only matter for the
/// arbitrary-precision backend and are ignored by the fixed-size ones.
/// Comparisons involving NaN are false, so callers test `!(x <= bound)` when
/// a NaN must count as a failed check.
pub trait FloatNumber: Clone + fmt::Debug + PartialOrd {
    /// Tag of the backend a value of precision `prec` belongs to
    fn backend(prec: u32) -> NumericBackend;

    fn from_integer(value: &Integer, prec: u32) -> Self;
    fn from_f64(value: f64, prec: u32) -> Self;

    fn zero(prec: u32) -> Self {
        Self::from_f64(0.0, prec)
    }

    fn one(prec: u32) -> Self {
        Self::from_f64(1.0, prec)
    }

    fn add(&self, other: &Self) -> Self;
    fn sub(&self, other: &Self) -> Self;
    fn mul(&self, other: &Self) -> Self;
    fn div(&self, other: &Self) -> Self;
    fn sqrt(&self) -> Self;
    fn neg(&self) -> Self;
    fn abs(&self) -> Self;

    /// `self * 2^e`
    fn mul_2si(&self, e: i32) -> Self;

    /// -1, 0 or 1. NaN reports 0.
    fn sign(&self) -> i32;
    fn is_finite(&self) -> bool;

    /// Nearest integer, halfway cases away from zero. `None` if not finite.
    fn round_to_integer(&self) -> Option<Integer>;

    /// Binary exponent `e` with `self = m * 2^e`, `0.5 <= |m| < 1`.
    /// Zero and non-finite values report `i32::MIN`.
    fn exponent(&self) -> i32;

    fn to_f64(&self) -> f64;
    fn precision_bits(&self) -> u32;
}

static DEFAULT_PRECISION: AtomicU32 = AtomicU32::new(DEFAULT_ARBITRARY_PRECISION);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Process-wide configuration of the arbitrary-precision backend.
///
/// `initialize` sets the precision used when a caller asks for MPFR without a
/// bit count; `teardown` restores the built-in default. Engines capture their
/// precision when they are built, so a live engine never sees a change.
/// Changing the setting while reductions are running on other threads is not
/// supported: which value a concurrent resolution observes is unspecified.
pub struct PrecisionManager;

impl PrecisionManager {
    /// Configure the default MPFR precision. Call before any reduction starts.
    pub fn initialize(bits: u32) -> Result<()> {
        if bits < MIN_ARBITRARY_PRECISION || bits > rug::float::prec_max() {
            return Err(LatticeError::invalid_parameters(format!(
                "Precision must be at least {} bits, got {}",
                MIN_ARBITRARY_PRECISION, bits
            )));
        }
        if bits > 16384 {
            log::warn!("Very high precision ({} bits) may cause performance issues", bits);
        }
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            log::warn!("PrecisionManager initialized twice; the new default is {} bits", bits);
        }
        DEFAULT_PRECISION.store(bits, Ordering::SeqCst);
        Ok(())
    }

    /// Restore the built-in default. Call after the last reduction finished.
    pub fn teardown() {
        DEFAULT_PRECISION.store(DEFAULT_ARBITRARY_PRECISION, Ordering::SeqCst);
        INITIALIZED.store(false, Ordering::SeqCst);
    }

    pub fn is_initialized() -> bool {
        INITIALIZED.load(Ordering::SeqCst)
    }

    pub fn default_precision() -> u32 {
        DEFAULT_PRECISION.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_rejects_tiny_precision() {
        assert!(PrecisionManager::initialize(16).is_err());
    }
}
