//! Gram-Schmidt orthogonalization and floating-point LLL reduction
//!
//! This crate provides:
//! - An incremental GSO engine over an exact integer Gram matrix
//! - An L²-style LLL driver with early reduction and the Siegel condition
//! - Five numeric backends: `f64`, a 64-bit extended float, double-double,
//!   quad-double and MPFR at any precision
//! - Runtime backend dispatch and a wrapper that escalates precision when a
//!   backend reports that it cannot keep up
//!
//! # Examples
//!
//! Reduce a basis, letting the wrapper pick the backend:
//! ```rust
//! use lattice_gso::{lll_reduction, IntegerMatrix, LLLParams, Method};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut basis = IntegerMatrix::from_i64_rows(&[
//!     vec![1, 1, 1],
//!     vec![-1, 0, 2],
//!     vec![3, 5, 6],
//! ])?;
//!
//! let outcome = lll_reduction(&mut basis, &LLLParams::default(), Method::Wrapper, None, None)?;
//! println!("Reduced with {} after {} swaps", outcome.backend, outcome.stats.nswaps);
//! # Ok(())
//! # }
//! ```
//!
//! Drive one backend by hand and check the result:
//! ```rust
//! use lattice_gso::{GsoEngine, IntegerMatrix, LLLParams, NumericBackend, Reduction, ReductionFlags};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut basis = IntegerMatrix::from_i64_rows(&[vec![1, 0], vec![7, 1]])?;
//! let mut engine = GsoEngine::new(&mut basis, NumericBackend::DoubleDouble)?;
//! let stats = Reduction::new(&mut engine, LLLParams::default())?.lll(0, 0, None)?;
//! assert!(stats.is_success());
//! assert!(engine.is_reduced(0.99, 0.51, ReductionFlags::default())?);
//! # Ok(())
//! # }
//! ```

pub mod checker;
pub mod core;
pub mod dispatch;
pub mod gso;
pub mod lll;
pub mod precision;
pub mod utils;
pub mod wrapper;

pub use checker::{is_lll_reduced, is_reduced, is_reduced_with};
pub use crate::core::*;
pub use dispatch::{GsoEngine, Reduction};
pub use gso::MatGso;
pub use lll::{LLLParams, LLLReduction, LLL_DEF_DELTA, LLL_DEF_ETA, SIZE_RED_FAILURE_THRESH};
pub use precision::{DoubleDouble, ExtendedFloat, FloatNumber, MpFloat, PrecisionManager, QuadDouble};
pub use wrapper::{
    lll_reduction, proved_precision, reduce_with_escalation, Candidate, Method, WrapperOutcome,
    WrapperPlan,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lll_reduction_2d() {
        let mut basis = IntegerMatrix::from_i64_rows(&[vec![1, 1], vec![1, 0]]).unwrap();
        let outcome =
            lll_reduction(&mut basis, &LLLParams::default(), Method::Fast, None, None).unwrap();
        assert_eq!(outcome.backend, NumericBackend::Native);
        assert!(is_lll_reduced(&basis, LLL_DEF_DELTA, LLL_DEF_ETA, NumericBackend::Native).unwrap());
    }
}
