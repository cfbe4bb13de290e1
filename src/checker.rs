//! LLL-reducedness test

use crate::core::error::{LatticeError, Result};
use crate::core::matrix::IntegerMatrix;
use crate::core::types::{NumericBackend, ReductionFlags};
use crate::dispatch::GsoEngine;
use crate::gso::MatGso;
use crate::precision::FloatNumber;

fn validate_parameters(delta: f64, eta: f64) -> Result<()> {
    if !(delta > 0.0 && delta < 1.0) {
        return Err(LatticeError::invalid_parameters(format!(
            "Delta must be in (0, 1), got {}",
            delta
        )));
    }
    if !(eta >= 0.5) {
        return Err(LatticeError::invalid_parameters(format!("Eta must be >= 0.5, got {}", eta)));
    }
    Ok(())
}

/// Check the (delta, eta) conditions on the GSO data of `m`.
///
/// Only the rows before the first zero row are tested; a nonzero row after a
/// zero row makes the basis non-reduced. The GSO of that prefix must be up to
/// date, otherwise an `InvalidState` error is returned.
pub fn is_reduced<F: FloatNumber>(m: &MatGso<'_, F>, delta: f64, eta: f64) -> Result<bool> {
    is_reduced_with(m, delta, eta, ReductionFlags::default())
}

/// Same as [`is_reduced`]; with `flags.siegel` the Lovász test is replaced by
/// `r_i >= (delta - eta^2) r_{i-1}`.
pub fn is_reduced_with<F: FloatNumber>(
    m: &MatGso<'_, F>,
    delta: f64,
    eta: f64,
    flags: ReductionFlags,
) -> Result<bool> {
    validate_parameters(delta, eta)?;
    let d = m.dimension();
    let prefix = m.nonzero_prefix();
    for i in prefix..d {
        if !m.b_row_is_zero(i)? {
            log::debug!("Nonzero row {} follows the zero row {}", i, prefix);
            return Ok(false);
        }
    }

    let prec = m.precision();
    let delta = F::from_f64(delta, prec);
    let eta = F::from_f64(eta, prec);
    let siegel_factor = delta.sub(&eta.mul(&eta));

    for i in 0..prefix {
        for j in 0..i {
            if !(m.get_mu(i, j)?.abs() <= eta) {
                log::debug!("Row {} is not size-reduced against row {}", i, j);
                return Ok(false);
            }
        }
        if i == 0 {
            continue;
        }
        let factor = if flags.siegel {
            siegel_factor.clone()
        } else {
            let mu = m.get_mu(i, i - 1)?;
            delta.sub(&mu.mul(&mu))
        };
        if !(m.get_r(i)? >= factor.mul(&m.get_r(i - 1)?)) {
            log::debug!("Lovász condition fails between rows {} and {}", i - 1, i);
            return Ok(false);
        }
    }
    Ok(true)
}

/// Compute the GSO of a copy of `basis` with `backend` and test it.
pub fn is_lll_reduced(
    basis: &IntegerMatrix,
    delta: f64,
    eta: f64,
    backend: NumericBackend,
) -> Result<bool> {
    validate_parameters(delta, eta)?;
    let mut copy = basis.clone();
    let mut engine = GsoEngine::new(&mut copy, backend)?;
    engine.is_reduced(delta, eta, ReductionFlags::default())
}
