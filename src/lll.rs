//! LLL (Lenstra-Lenstra-Lovász) reduction over a floating-point GSO
//!
//! The driver follows the L² scheme: the Gram matrix is exact, the
//! Gram-Schmidt data lives in a backend `F`, and size reduction is a Babai
//! loop that re-derives the row from the exact Gram matrix after every pass.
//! Loss of precision is detected, never ignored, and reported as
//! [`LatticeError::InsufficientPrecision`] so a caller can retry with a
//! stronger backend.

use crate::core::error::{LatticeError, PrecisionFailure, Result};
use crate::core::types::{InterruptFlag, ReductionFlags, ReductionStats, ReductionStatus};
use crate::gso::MatGso;
use crate::precision::FloatNumber;
use rug::Integer;
use serde::{Deserialize, Serialize};

/// Default Lovász parameter
pub const LLL_DEF_DELTA: f64 = 0.99;
/// Default size-reduction parameter
pub const LLL_DEF_ETA: f64 = 0.51;
/// From the third Babai pass on, the largest `mu` exponent of the row must
/// drop by at least this many bits per pass.
pub const SIZE_RED_FAILURE_THRESH: i32 = 5;

/// Parameters for LLL reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLLParams {
    /// Lovász parameter, `0 < delta < 1`, typically 0.99
    pub delta: f64,
    /// Size-reduction parameter, `0.5 <= eta < 1`, typically 0.51
    pub eta: f64,
    #[serde(default)]
    pub flags: ReductionFlags,
    /// Kappa steps before the loop is declared stuck. `None` derives a bound
    /// from the dimension and entry size.
    #[serde(default)]
    pub max_iterations: Option<usize>,
    #[serde(skip)]
    pub interrupt: Option<InterruptFlag>,
}

impl Default for LLLParams {
    fn default() -> Self {
        LLLParams {
            delta: LLL_DEF_DELTA,
            eta: LLL_DEF_ETA,
            flags: ReductionFlags::default(),
            max_iterations: None,
            interrupt: None,
        }
    }
}

impl LLLParams {
    /// Create new LLL parameters with custom delta and eta
    pub fn new(delta: f64, eta: f64) -> Self {
        LLLParams { delta, eta, ..Default::default() }
    }

    pub fn with_flags(mut self, flags: ReductionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(LatticeError::invalid_parameters(format!(
                "Delta must be in (0, 1), got {}",
                self.delta
            )));
        }
        if !(self.eta >= 0.5 && self.eta < 1.0) {
            return Err(LatticeError::invalid_parameters(format!(
                "Eta must be in [0.5, 1), got {}",
                self.eta
            )));
        }
        if self.eta * self.eta >= self.delta {
            log::warn!(
                "eta^2 = {} >= delta = {}: the output carries no length guarantee",
                self.eta * self.eta,
                self.delta
            );
        }
        Ok(())
    }
}

/// Upper bound on kappa steps of a reduction that makes progress: every swap
/// shrinks the integer potential `prod_i r_i^(d-i)` by a factor `delta`.
pub fn default_iteration_limit(d: usize, max_bits: u32, delta: f64) -> usize {
    let dim = d as f64;
    let potential_bits = dim * dim * (2.0 * max_bits as f64 + dim.max(1.0).log2() + 1.0);
    let swaps = potential_bits / (1.0 / delta).log2();
    let limit = dim + 2.0 * swaps;
    if limit.is_finite() && limit < usize::MAX as f64 {
        (limit as usize).max(10_000)
    } else {
        usize::MAX
    }
}

/// LLL driver over one GSO engine.
pub struct LLLReduction<'m, 'a, F: FloatNumber> {
    m: &'m mut MatGso<'a, F>,
    params: LLLParams,
    delta: F,
    eta: F,
    siegel_factor: F,
    stats: ReductionStats,
}

impl<'m, 'a, F: FloatNumber> LLLReduction<'m, 'a, F> {
    /// Validates the parameters before anything touches the basis.
    pub fn new(m: &'m mut MatGso<'a, F>, params: LLLParams) -> Result<Self> {
        params.validate()?;
        let prec = m.precision();
        let delta = F::from_f64(params.delta, prec);
        let eta = F::from_f64(params.eta, prec);
        let siegel_factor = delta.sub(&eta.mul(&eta));
        Ok(LLLReduction {
            m,
            params,
            delta,
            eta,
            siegel_factor,
            stats: ReductionStats::default(),
        })
    }

    pub fn stats(&self) -> &ReductionStats {
        &self.stats
    }

    pub fn params(&self) -> &LLLParams {
        &self.params
    }

    /// Reduce rows `[kappa_min, kappa_end)`; rows in `[kappa_min, kappa_start)`
    /// are assumed reduced already. `kappa_end = None` means the whole basis.
    /// Zero rows found on the way are moved to the end of the window.
    pub fn lll(
        &mut self,
        kappa_min: usize,
        kappa_start: usize,
        kappa_end: Option<usize>,
    ) -> Result<ReductionStats> {
        let end = self.window_end(kappa_min, kappa_end)?;
        if kappa_start > end {
            return Err(LatticeError::invalid_parameters(format!(
                "kappa_start = {} lies beyond kappa_end = {}",
                kappa_start, end
            )));
        }
        self.stats = ReductionStats { status: ReductionStatus::Running, ..Default::default() };
        let outcome = self.run(kappa_min, kappa_start, end);
        self.finish(outcome)?;
        Ok(self.stats.clone())
    }

    /// Size-reduce every row of `[kappa_min, kappa_end)` against all earlier
    /// rows without swapping.
    pub fn size_reduction(&mut self, kappa_min: usize, kappa_end: Option<usize>) -> Result<()> {
        let end = self.window_end(kappa_min, kappa_end)?;
        self.stats = ReductionStats { status: ReductionStatus::Running, ..Default::default() };
        let outcome = (kappa_min..end).try_for_each(|kappa| {
            self.check_interrupt(kappa)?;
            self.babai(kappa, kappa)
        });
        self.stats.final_kappa = end;
        self.finish(outcome)
    }

    fn window_end(&self, kappa_min: usize, kappa_end: Option<usize>) -> Result<usize> {
        let d = self.m.dimension();
        let end = kappa_end.unwrap_or(d);
        if end > d || kappa_min > end {
            return Err(LatticeError::invalid_parameters(format!(
                "Invalid reduction window [{}, {}) for a basis of dimension {}",
                kappa_min, end, d
            )));
        }
        Ok(end)
    }

    fn finish(&mut self, outcome: Result<()>) -> Result<()> {
        match &outcome {
            Ok(()) => self.stats.status = ReductionStatus::Success,
            Err(LatticeError::InsufficientPrecision { kind, .. }) => {
                self.stats.status = ReductionStatus::InsufficientPrecision(*kind)
            }
            Err(LatticeError::Interrupted { .. }) => self.stats.status = ReductionStatus::Interrupted,
            Err(_) => {}
        }
        if let Err(e) = &outcome {
            log::debug!("LLL stopped with backend {}: {}", self.m.backend(), e);
        }
        outcome
    }

    fn run(&mut self, kappa_min: usize, kappa_start: usize, kappa_end: usize) -> Result<()> {
        let verbose = self.params.flags.verbose;
        let d = self.m.dimension();
        let limit = self.params.max_iterations.unwrap_or_else(|| {
            default_iteration_limit(d, self.m.basis().max_bits(), self.params.delta)
        });
        let mut end = kappa_end;
        let mut kappa = kappa_start.max(kappa_min);
        let mut kappa_max = kappa;

        if verbose {
            log::info!(
                "Entering LLL: delta = {}, eta = {}, backend = {}, rows [{}, {})",
                self.params.delta,
                self.params.eta,
                self.m.backend(),
                kappa_min,
                end
            );
        }

        while kappa < end {
            self.stats.final_kappa = kappa;
            self.check_interrupt(kappa)?;
            self.stats.iterations += 1;
            if self.stats.iterations > limit {
                log::warn!("LLL reached {} iterations at kappa = {}", limit, kappa);
                return Err(self.precision_failure(PrecisionFailure::LllLoop, kappa));
            }

            if self.params.flags.early_red
                && kappa.is_power_of_two()
                && kappa > self.stats.last_early_red
            {
                self.early_reduction(kappa, end)?;
            }

            self.babai(kappa, kappa)?;

            if self.m.b_row_is_zero(kappa)? {
                self.m.move_row(kappa, end - 1)?;
                end -= 1;
                self.stats.zeros += 1;
                log::debug!("Zero row at kappa = {}, window shrinks to {}", kappa, end);
                continue;
            }
            self.m.update_gso_row(kappa, kappa)?;

            if kappa == kappa_min || self.lovasz_holds(kappa) {
                kappa += 1;
                if verbose && kappa > kappa_max {
                    kappa_max = kappa;
                    log::info!(
                        "Discovered vector {} / {} ({} swaps, {} iterations)",
                        kappa,
                        end,
                        self.stats.nswaps,
                        self.stats.iterations
                    );
                }
            } else {
                self.m.swap_rows(kappa - 1, kappa)?;
                self.stats.nswaps += 1;
                kappa = (kappa - 1).max(kappa_min + 1);
            }
        }
        self.stats.final_kappa = kappa;

        let summary = format!(
            "End of LLL: {} swaps, {} zero rows, {} iterations",
            self.stats.nswaps, self.stats.zeros, self.stats.iterations
        );
        if verbose {
            log::info!("{}", summary);
        } else {
            log::debug!("{}", summary);
        }
        Ok(())
    }

    /// `r_k >= (delta - mu_{k,k-1}^2) r_{k-1}`, or Siegel's `r_k >= (delta - eta^2) r_{k-1}`.
    fn lovasz_holds(&self, kappa: usize) -> bool {
        let r_prev = self.m.r_ref(kappa - 1, kappa - 1);
        let r_k = self.m.r_ref(kappa, kappa);
        let factor = if self.params.flags.siegel {
            self.siegel_factor.clone()
        } else {
            let mu = self.m.mu_ref(kappa, kappa - 1);
            self.delta.sub(&mu.mul(mu))
        };
        !(r_k < &factor.mul(r_prev))
    }

    /// Size-reduce row `kappa` against rows `[0, n_cols)`.
    fn babai(&mut self, kappa: usize, n_cols: usize) -> Result<()> {
        if n_cols == 0 {
            return Ok(());
        }
        let prec = self.m.precision();
        let mut max_expo = i32::MAX;
        let mut pass = 0usize;
        loop {
            self.m.update_gso_row(kappa, n_cols - 1)?;
            if (0..n_cols).all(|j| self.m.mu_ref(kappa, j).abs() <= self.eta) {
                return Ok(());
            }
            if pass >= 2 {
                let expo = self.m.get_max_mu_exp(kappa, n_cols)?;
                if pass > 2 && expo > max_expo.saturating_sub(SIZE_RED_FAILURE_THRESH) {
                    return Err(self.precision_failure(PrecisionFailure::Babai, kappa));
                }
                max_expo = expo;
            }

            let mut buf: Vec<F> = (0..n_cols).map(|j| self.m.mu_ref(kappa, j).clone()).collect();
            for j in (0..n_cols).rev() {
                if buf[j].abs() <= self.eta {
                    continue;
                }
                let x = buf[j]
                    .round_to_integer()
                    .ok_or_else(|| self.precision_failure(PrecisionFailure::Gso, kappa))?;
                if x == 0 {
                    continue;
                }
                let xf = F::from_integer(&x, prec);
                for l in 0..j {
                    buf[l] = buf[l].sub(&xf.mul(self.m.mu_ref(j, l)));
                }
                self.m.row_addmul(kappa, j, &Integer::from(-&x))?;
            }
            pass += 1;
        }
    }

    /// Size-reduce the rows after `start` against the first `start` rows.
    fn early_reduction(&mut self, start: usize, end: usize) -> Result<()> {
        for i in (start + 1)..end {
            self.babai(i, start)?;
        }
        self.stats.early_reductions += 1;
        self.stats.last_early_red = start;
        if self.params.flags.verbose {
            log::info!("Early reduction of rows [{}, {}) against the first {}", start + 1, end, start);
        }
        Ok(())
    }

    fn check_interrupt(&self, kappa: usize) -> Result<()> {
        match &self.params.interrupt {
            Some(flag) if flag.is_triggered() => {
                log::warn!("LLL interrupted at kappa = {}", kappa);
                Err(LatticeError::Interrupted { kappa })
            }
            _ => Ok(()),
        }
    }

    fn precision_failure(&self, kind: PrecisionFailure, kappa: usize) -> LatticeError {
        LatticeError::insufficient_precision(self.m.backend(), kind, kappa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{is_reduced, is_reduced_with};
    use crate::core::matrix::IntegerMatrix;
    use crate::precision::{DoubleDouble, MpFloat};
    use crate::utils::generators;
    use crate::utils::gram_determinant;

    fn basis(rows: &[Vec<i64>]) -> IntegerMatrix {
        IntegerMatrix::from_i64_rows(rows).unwrap()
    }

    #[test]
    fn test_params_validation() {
        assert!(LLLParams::default().validate().is_ok());
        assert!(LLLParams::new(1.0, 0.51).validate().is_err());
        assert!(LLLParams::new(0.0, 0.51).validate().is_err());
        assert!(LLLParams::new(0.99, 0.49).validate().is_err());
        assert!(LLLParams::new(0.99, 1.0).validate().is_err());
        assert!(LLLParams::new(f64::NAN, 0.51).validate().is_err());
        assert!(LLLParams::new(0.75, 0.5).validate().is_ok());
    }

    #[test]
    fn test_reduces_small_basis() {
        let mut b = basis(&[vec![1, 1, 1], vec![-1, 0, 2], vec![3, 5, 6]]);
        let det = gram_determinant(&b).unwrap();
        {
            let mut m = MatGso::<f64>::new(&mut b, 53).unwrap();
            let mut lll = LLLReduction::new(&mut m, LLLParams::default()).unwrap();
            let stats = lll.lll(0, 0, None).unwrap();
            assert!(stats.is_success());
            assert_eq!(stats.final_kappa, 3);
            assert!(stats.nswaps > 0);
            assert!(is_reduced(&m, LLL_DEF_DELTA, LLL_DEF_ETA).unwrap());
        }
        assert_eq!(gram_determinant(&b).unwrap(), det);
        let shortest = (0..3).map(|i| b.sq_norm(i).unwrap()).min().unwrap();
        assert_eq!(shortest, 1);
    }

    #[test]
    fn test_zero_rows_move_to_the_end() {
        let mut b = basis(&[vec![1, 2, 3], vec![2, 4, 6], vec![3, 5, 7], vec![4, 7, 10]]);
        let mut m = MatGso::<DoubleDouble>::new(&mut b, 106).unwrap();
        let stats = LLLReduction::new(&mut m, LLLParams::default())
            .unwrap()
            .lll(0, 0, None)
            .unwrap();
        assert_eq!(stats.zeros, 2);
        assert_eq!(stats.final_kappa, 2);
        assert!(m.b_row_is_zero(2).unwrap());
        assert!(m.b_row_is_zero(3).unwrap());
        assert!(!m.b_row_is_zero(1).unwrap());
        m.update_gso(0, 2).unwrap();
        assert!(is_reduced(&m, LLL_DEF_DELTA, LLL_DEF_ETA).unwrap());
    }

    #[test]
    fn test_window_leaves_outside_rows_alone() {
        let mut b = basis(&[vec![10, 3, 0], vec![7, 2, 0], vec![100, 51, 7]]);
        let last = b.row(2).unwrap().to_vec();
        {
            let mut m = MatGso::<f64>::new(&mut b, 53).unwrap();
            let mut lll = LLLReduction::new(&mut m, LLLParams::default()).unwrap();
            lll.lll(0, 0, Some(2)).unwrap();
            assert!(lll.lll(0, 3, Some(2)).is_err());
            assert!(lll.lll(0, 0, Some(4)).is_err());
        }
        assert_eq!(b.row(2).unwrap(), &last[..]);
    }

    #[test]
    fn test_siegel_condition_holds_after_siegel_run() {
        let mut b = generators::uniform(12, 20, 7).unwrap();
        let mut m = MatGso::<f64>::new(&mut b, 53).unwrap();
        let params = LLLParams::default().with_flags(ReductionFlags::default().siegel());
        LLLReduction::new(&mut m, params).unwrap().lll(0, 0, None).unwrap();
        let siegel = ReductionFlags::default().siegel();
        assert!(is_reduced_with(&m, LLL_DEF_DELTA, LLL_DEF_ETA, siegel).unwrap());
    }

    #[test]
    fn test_early_reduction_fires() {
        let mut b = generators::uniform(20, 30, 11).unwrap();
        let mut m = MatGso::<MpFloat>::new(&mut b, 120).unwrap();
        let params = LLLParams::default().with_flags(ReductionFlags::default().early_red());
        let stats = LLLReduction::new(&mut m, params).unwrap().lll(0, 0, None).unwrap();
        assert!(stats.early_reduction_fired());
        assert_eq!(stats.last_early_red, 16);
        assert!(is_reduced(&m, LLL_DEF_DELTA, LLL_DEF_ETA).unwrap());
    }

    #[test]
    fn test_interrupt_is_reported() {
        let mut b = generators::uniform(8, 20, 3).unwrap();
        let flag = InterruptFlag::new();
        flag.trigger();
        let mut m = MatGso::<f64>::new(&mut b, 53).unwrap();
        let mut lll = LLLReduction::new(&mut m, LLLParams::default().with_interrupt(flag)).unwrap();
        assert_eq!(lll.lll(0, 0, None), Err(LatticeError::Interrupted { kappa: 0 }));
        assert_eq!(lll.stats().status, ReductionStatus::Interrupted);
    }

    #[test]
    fn test_iteration_limit_is_a_loop_failure() {
        let mut b = generators::uniform(10, 40, 5).unwrap();
        let mut m = MatGso::<f64>::new(&mut b, 53).unwrap();
        let mut lll = LLLReduction::new(&mut m, LLLParams::default().with_max_iterations(3)).unwrap();
        match lll.lll(0, 0, None) {
            Err(LatticeError::InsufficientPrecision { kind, .. }) => assert_eq!(kind, PrecisionFailure::LllLoop),
            other => panic!("expected a loop failure, got {:?}", other),
        }
        assert_eq!(
            lll.stats().status,
            ReductionStatus::InsufficientPrecision(PrecisionFailure::LllLoop)
        );
    }

    #[test]
    fn test_size_reduction_only() {
        let mut b = basis(&[vec![1, 0], vec![7, 1]]);
        {
            let mut m = MatGso::<f64>::new(&mut b, 53).unwrap();
            let mut lll = LLLReduction::new(&mut m, LLLParams::default()).unwrap();
            lll.size_reduction(0, None).unwrap();
            assert_eq!(lll.stats().nswaps, 0);
        }
        assert_eq!(b, basis(&[vec![1, 0], vec![0, 1]]));
    }

    #[test]
    fn test_empty_basis() {
        let mut b = IntegerMatrix::default();
        let mut m = MatGso::<f64>::new(&mut b, 53).unwrap();
        let stats = LLLReduction::new(&mut m, LLLParams::default()).unwrap().lll(0, 0, None).unwrap();
        assert!(stats.is_success());
        assert_eq!(stats.nswaps, 0);
    }

    #[test]
    fn test_default_iteration_limit_grows_with_size() {
        assert_eq!(default_iteration_limit(2, 3, 0.99), 10_000);
        assert!(default_iteration_limit(100, 100, 0.99) > default_iteration_limit(50, 100, 0.99));
    }
}
