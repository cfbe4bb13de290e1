//! Backend selection for the GSO engine and the LLL driver
//!
//! [`GsoEngine`] owns exactly one [`MatGso`] instantiation, chosen from a
//! [`NumericBackend`] tag at construction. Every entry point branches once on
//! the variant and then runs fully typed code.

use crate::checker::is_reduced_with;
use crate::core::error::{LatticeError, Result};
use crate::core::matrix::IntegerMatrix;
use crate::core::types::{NumericBackend, ReductionFlags, ReductionStats};
use crate::gso::MatGso;
use crate::lll::{LLLParams, LLLReduction};
use crate::precision::mpfr::EXTENDED_PRECISION;
use crate::precision::{DoubleDouble, ExtendedFloat, FloatNumber, MpFloat, QuadDouble};
use rug::Integer;

enum GsoVariant<'a> {
    Native(MatGso<'a, f64>),
    Extended(MatGso<'a, ExtendedFloat>),
    DoubleDouble(MatGso<'a, DoubleDouble>),
    QuadDouble(MatGso<'a, QuadDouble>),
    Arbitrary(MatGso<'a, MpFloat>),
}

macro_rules! with_variant {
    ($variant:expr, $m:ident => $body:expr) => {
        match $variant {
            GsoVariant::Native($m) => $body,
            GsoVariant::Extended($m) => $body,
            GsoVariant::DoubleDouble($m) => $body,
            GsoVariant::QuadDouble($m) => $body,
            GsoVariant::Arbitrary($m) => $body,
        }
    };
}

/// GSO engine over a borrowed basis with a backend picked at runtime.
pub struct GsoEngine<'a> {
    backend: NumericBackend,
    inner: Option<GsoVariant<'a>>,
}

impl<'a> GsoEngine<'a> {
    pub fn new(basis: &'a mut IntegerMatrix, backend: NumericBackend) -> Result<Self> {
        backend.validate()?;
        log::debug!(
            "Using {} backend ({} bits) for a {}x{} basis",
            backend,
            backend.precision_bits(),
            basis.rows(),
            basis.cols()
        );
        let inner = match backend {
            NumericBackend::Native => GsoVariant::Native(MatGso::new(basis, 53)?),
            NumericBackend::Extended => {
                GsoVariant::Extended(MatGso::new(basis, EXTENDED_PRECISION)?)
            }
            NumericBackend::DoubleDouble => GsoVariant::DoubleDouble(MatGso::new(basis, 106)?),
            NumericBackend::QuadDouble => GsoVariant::QuadDouble(MatGso::new(basis, 212)?),
            NumericBackend::Arbitrary { bits } => GsoVariant::Arbitrary(MatGso::new(basis, bits)?),
        };
        Ok(GsoEngine { backend, inner: Some(inner) })
    }

    pub fn backend(&self) -> NumericBackend {
        self.backend
    }

    /// Drop the GSO data early. Every later call fails with `InvalidState`.
    pub fn release(&mut self) {
        if self.inner.take().is_some() {
            log::debug!("Released {} GSO engine", self.backend);
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    fn variant(&self) -> Result<&GsoVariant<'a>> {
        self.inner
            .as_ref()
            .ok_or_else(|| LatticeError::invalid_state("GSO engine has been released"))
    }

    fn variant_mut(&mut self) -> Result<&mut GsoVariant<'a>> {
        self.inner
            .as_mut()
            .ok_or_else(|| LatticeError::invalid_state("GSO engine has been released"))
    }

    pub fn dimension(&self) -> Result<usize> {
        Ok(with_variant!(self.variant()?, m => m.dimension()))
    }

    pub fn basis(&self) -> Result<&IntegerMatrix> {
        Ok(with_variant!(self.variant()?, m => m.basis()))
    }

    pub fn update_gso_row(&mut self, i: usize, last_j: usize) -> Result<()> {
        with_variant!(self.variant_mut()?, m => m.update_gso_row(i, last_j))
    }

    pub fn update_gso(&mut self, from_row: usize, to_row: usize) -> Result<()> {
        with_variant!(self.variant_mut()?, m => m.update_gso(from_row, to_row))
    }

    pub fn update_gso_all(&mut self) -> Result<()> {
        with_variant!(self.variant_mut()?, m => m.update_gso_all())
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) -> Result<()> {
        with_variant!(self.variant_mut()?, m => m.swap_rows(i, j))
    }

    pub fn move_row(&mut self, old: usize, new: usize) -> Result<()> {
        with_variant!(self.variant_mut()?, m => m.move_row(old, new))
    }

    pub fn row_addmul(&mut self, i: usize, j: usize, x: &Integer) -> Result<()> {
        with_variant!(self.variant_mut()?, m => m.row_addmul(i, j, x))
    }

    pub fn create_row(&mut self) -> Result<()> {
        with_variant!(self.variant_mut()?, m => m.create_row());
        Ok(())
    }

    pub fn remove_last_row(&mut self) -> Result<()> {
        with_variant!(self.variant_mut()?, m => m.remove_last_row())
    }

    /// `mu_ij` rounded to `f64`
    pub fn get_mu(&self, i: usize, j: usize) -> Result<f64> {
        with_variant!(self.variant()?, m => Ok(m.get_mu(i, j)?.to_f64()))
    }

    /// `r_ii` rounded to `f64`; may overflow to infinity for huge entries
    pub fn get_r(&self, i: usize) -> Result<f64> {
        with_variant!(self.variant()?, m => Ok(m.get_r(i)?.to_f64()))
    }

    /// `r_ii` as `(mantissa, exponent)`, exact in range for every backend
    pub fn get_r_exp(&self, i: usize) -> Result<(f64, i32)> {
        with_variant!(self.variant()?, m => {
            let (mantissa, exp) = m.get_r_exp(i)?;
            Ok((mantissa.to_f64(), exp))
        })
    }

    /// Bring the nonzero prefix up to date, then run the reducedness test.
    pub fn is_reduced(&mut self, delta: f64, eta: f64, flags: ReductionFlags) -> Result<bool> {
        with_variant!(self.variant_mut()?, m => {
            let prefix = m.nonzero_prefix();
            m.update_gso(0, prefix)?;
            is_reduced_with(m, delta, eta, flags)
        })
    }
}

/// LLL session over a [`GsoEngine`].
pub struct Reduction<'e, 'a> {
    engine: &'e mut GsoEngine<'a>,
    params: LLLParams,
    stats: ReductionStats,
}

impl<'e, 'a> Reduction<'e, 'a> {
    pub fn new(engine: &'e mut GsoEngine<'a>, params: LLLParams) -> Result<Self> {
        params.validate()?;
        engine.variant()?;
        Ok(Reduction { engine, params, stats: ReductionStats::default() })
    }

    pub fn backend(&self) -> NumericBackend {
        self.engine.backend()
    }

    pub fn stats(&self) -> &ReductionStats {
        &self.stats
    }

    pub fn lll(
        &mut self,
        kappa_min: usize,
        kappa_start: usize,
        kappa_end: Option<usize>,
    ) -> Result<ReductionStats> {
        with_variant!(self.engine.variant_mut()?, m => {
            let mut driver = LLLReduction::new(m, self.params.clone())?;
            let outcome = driver.lll(kappa_min, kappa_start, kappa_end);
            self.stats = driver.stats().clone();
            outcome
        })
    }

    pub fn size_reduction(&mut self, kappa_min: usize, kappa_end: Option<usize>) -> Result<()> {
        with_variant!(self.engine.variant_mut()?, m => {
            let mut driver = LLLReduction::new(m, self.params.clone())?;
            let outcome = driver.size_reduction(kappa_min, kappa_end);
            self.stats = driver.stats().clone();
            outcome
        })
    }
}

/// LLL-reduce the whole `basis` with one backend.
pub fn reduce(
    basis: &mut IntegerMatrix,
    backend: NumericBackend,
    params: &LLLParams,
) -> Result<ReductionStats> {
    params.validate()?;
    let mut engine = GsoEngine::new(basis, backend)?;
    let mut reduction = Reduction::new(&mut engine, params.clone())?;
    reduction.lll(0, 0, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PrecisionFailure;

    fn basis(rows: &[Vec<i64>]) -> IntegerMatrix {
        IntegerMatrix::from_i64_rows(rows).unwrap()
    }

    #[test]
    fn test_every_backend_reduces() {
        let backends = [
            NumericBackend::Native,
            NumericBackend::Extended,
            NumericBackend::DoubleDouble,
            NumericBackend::QuadDouble,
            NumericBackend::Arbitrary { bits: 100 },
        ];
        for backend in backends {
            let mut b = basis(&[vec![1, 1, 1], vec![-1, 0, 2], vec![3, 5, 6]]);
            let mut engine = GsoEngine::new(&mut b, backend).unwrap();
            assert_eq!(engine.backend(), backend);
            let stats = Reduction::new(&mut engine, LLLParams::default())
                .unwrap()
                .lll(0, 0, None)
                .unwrap();
            assert!(stats.is_success(), "backend {}", backend);
            assert!(engine.is_reduced(0.99, 0.51, ReductionFlags::default()).unwrap());
        }
    }

    #[test]
    fn test_accessors_report_f64() {
        let mut b = basis(&[vec![2, 0], vec![1, 3]]);
        let mut engine = GsoEngine::new(&mut b, NumericBackend::DoubleDouble).unwrap();
        assert!(matches!(engine.get_mu(1, 0), Err(LatticeError::InvalidState(_))));
        engine.update_gso_all().unwrap();
        assert_eq!(engine.get_mu(1, 0).unwrap(), 0.5);
        assert_eq!(engine.get_r(1).unwrap(), 9.0);
        assert_eq!(engine.get_r_exp(0).unwrap(), (0.5, 3));
        assert_eq!(engine.dimension().unwrap(), 2);
    }

    #[test]
    fn test_row_operations_pass_through() {
        let mut b = basis(&[vec![1, 0], vec![3, 1]]);
        {
            let mut engine = GsoEngine::new(&mut b, NumericBackend::Native).unwrap();
            engine.row_addmul(1, 0, &Integer::from(-3)).unwrap();
            engine.swap_rows(0, 1).unwrap();
            engine.create_row().unwrap();
            assert_eq!(engine.dimension().unwrap(), 3);
            engine.remove_last_row().unwrap();
            engine.move_row(1, 0).unwrap();
        }
        assert_eq!(b, basis(&[vec![1, 0], vec![0, 1]]));
    }

    #[test]
    fn test_released_engine_is_invalid() {
        let mut b = IntegerMatrix::identity(2);
        let mut engine = GsoEngine::new(&mut b, NumericBackend::QuadDouble).unwrap();
        engine.release();
        assert!(engine.is_released());
        assert!(matches!(engine.update_gso_all(), Err(LatticeError::InvalidState(_))));
        assert!(matches!(engine.get_r(0), Err(LatticeError::InvalidState(_))));
        assert!(Reduction::new(&mut engine, LLLParams::default()).is_err());
        engine.release();
    }

    #[test]
    fn test_invalid_backend_is_rejected() {
        let mut b = IntegerMatrix::identity(2);
        assert!(matches!(
            GsoEngine::new(&mut b, NumericBackend::Arbitrary { bits: 10 }),
            Err(LatticeError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_native_overflow_is_a_gso_failure() {
        let big = Integer::from(1) << 1100u32;
        let mut b = IntegerMatrix::new(vec![
            vec![big.clone() + 1u32, big.clone()],
            vec![big.clone(), big - 1u32],
        ])
        .unwrap();
        let before = b.clone();
        let err = reduce(&mut b, NumericBackend::Native, &LLLParams::default()).unwrap_err();
        assert_eq!(
            err,
            LatticeError::insufficient_precision(NumericBackend::Native, PrecisionFailure::Gso, 0)
        );
        assert_eq!(b, before);
    }

    #[test]
    fn test_reduction_stats_are_kept() {
        let mut b = basis(&[vec![1, 0], vec![5, 1], vec![7, 3]]);
        let mut engine = GsoEngine::new(&mut b, NumericBackend::Extended).unwrap();
        let mut reduction = Reduction::new(&mut engine, LLLParams::default()).unwrap();
        let stats = reduction.lll(0, 0, None).unwrap();
        assert_eq!(reduction.stats(), &stats);
        assert_eq!(stats.zeros, 1);
        assert_eq!(reduction.backend(), NumericBackend::Extended);
    }
}
