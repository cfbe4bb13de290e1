//! Method selection and precision escalation
//!
//! A [`WrapperPlan`] is an ordered list of backends. [`reduce_with_escalation`]
//! runs LLL with each of them in turn and stops at the first one that does not
//! report insufficient precision. A failed attempt leaves the basis partially
//! reduced; the next attempt starts from there, which is fine because every
//! intermediate basis generates the same lattice.

use crate::core::error::{LatticeError, Result};
use crate::core::matrix::IntegerMatrix;
use crate::core::types::{BackendKind, NumericBackend, ReductionFlags, ReductionStats};
use crate::dispatch;
use crate::lll::LLLParams;
use crate::precision::{PrecisionManager, MIN_ARBITRARY_PRECISION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the backend sequence is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Native doubles with early reduction
    Fast,
    /// Extended precision with early reduction
    Heuristic,
    /// MPFR at a precision derived from the dimension
    Proved,
    /// Escalate through the fixed ladder, then MPFR at growing precision
    #[default]
    Wrapper,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Fast => "fast",
            Method::Heuristic => "heuristic",
            Method::Proved => "proved",
            Method::Wrapper => "wrapper",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Method::Fast),
            "heuristic" => Ok(Method::Heuristic),
            "proved" => Ok(Method::Proved),
            "wrapper" | "default" => Ok(Method::Wrapper),
            other => Err(LatticeError::parse_error(format!("Unknown method '{}'", other))),
        }
    }
}

/// One step of a plan. `flags` are added to the caller's flags for that step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub backend: NumericBackend,
    pub flags: ReductionFlags,
}

impl Candidate {
    pub fn new(backend: NumericBackend) -> Self {
        Candidate { backend, flags: ReductionFlags::default() }
    }
}

/// Backends to try, weakest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperPlan {
    pub candidates: Vec<Candidate>,
}

impl WrapperPlan {
    pub fn single(candidate: Candidate) -> Self {
        WrapperPlan { candidates: vec![candidate] }
    }

    /// The default ladder: every fixed backend, then MPFR starting at the
    /// configured default precision and doubling until both the Gram matrix
    /// entries of `basis` fit exactly and the proved precision for its
    /// dimension is reached.
    pub fn ladder(basis: &IntegerMatrix, params: &LLLParams) -> Self {
        let mut candidates: Vec<Candidate> =
            NumericBackend::FIXED_LADDER.iter().map(|b| Candidate::new(*b)).collect();
        let p0 = PrecisionManager::default_precision().max(MIN_ARBITRARY_PRECISION);
        let exact = basis.max_bits().saturating_mul(2).saturating_add(64);
        // no proved precision exists when eta^2 >= delta
        let proved = proved_precision(basis.rows(), params.delta, params.eta).unwrap_or(0);
        let p_max = p0.max(exact).max(proved);
        let mut bits = p0;
        loop {
            candidates.push(Candidate::new(NumericBackend::Arbitrary { bits }));
            if bits >= p_max {
                break;
            }
            bits = bits.saturating_mul(2).min(p_max);
        }
        WrapperPlan { candidates }
    }

    /// Turn caller choices into a plan. Inconsistent combinations are
    /// rejected here, before any reduction starts.
    pub fn resolve(
        method: Method,
        backend: Option<BackendKind>,
        precision: Option<u32>,
        basis: &IntegerMatrix,
        params: &LLLParams,
    ) -> Result<Self> {
        params.validate()?;
        let early_red = ReductionFlags::default().early_red();
        let plan = match method {
            Method::Wrapper => {
                if let Some(kind) = backend {
                    return Err(LatticeError::invalid_parameters(format!(
                        "The wrapper method picks its own backends; got backend {}",
                        kind
                    )));
                }
                if let Some(bits) = precision {
                    return Err(LatticeError::invalid_parameters(format!(
                        "The wrapper method picks its own precision; got {} bits",
                        bits
                    )));
                }
                Self::ladder(basis, params)
            }
            Method::Fast => {
                let backend = backend.unwrap_or(BackendKind::Native).resolve(precision)?;
                Self::single(Candidate { backend, flags: early_red })
            }
            Method::Heuristic => {
                let backend = backend.unwrap_or(BackendKind::Extended).resolve(precision)?;
                Self::single(Candidate { backend, flags: early_red })
            }
            Method::Proved => {
                let backend = match (backend, precision) {
                    (None | Some(BackendKind::Arbitrary), None) => NumericBackend::Arbitrary {
                        bits: proved_precision(basis.rows(), params.delta, params.eta)?,
                    },
                    (kind, bits) => kind.unwrap_or(BackendKind::Arbitrary).resolve(bits)?,
                };
                Self::single(Candidate::new(backend))
            }
        };
        log::debug!(
            "Plan for method {}: {}",
            method,
            plan.candidates.iter().map(|c| c.backend.to_string()).collect::<Vec<_>>().join(" -> ")
        );
        Ok(plan)
    }

    pub fn backends(&self) -> Vec<NumericBackend> {
        self.candidates.iter().map(|c| c.backend).collect()
    }
}

/// Precision sufficient for a provable reduction of a `d`-row basis:
/// `1.6 d log2(rho) + 2 log2(d) + 13` bits with `rho = (1 + eta)^2 / (delta - eta^2)`.
pub fn proved_precision(d: usize, delta: f64, eta: f64) -> Result<u32> {
    let slack = delta - eta * eta;
    if !(slack > 0.0) {
        return Err(LatticeError::invalid_parameters(format!(
            "Proved precision needs eta^2 < delta, got delta = {}, eta = {}",
            delta, eta
        )));
    }
    let rho = (1.0 + eta) * (1.0 + eta) / slack;
    let dim = d.max(1) as f64;
    let bits = (1.6 * dim * rho.log2() + 2.0 * dim.log2() + 13.0).ceil();
    if !(bits < u32::MAX as f64) {
        return Err(LatticeError::invalid_parameters(format!("Dimension {} is too large", d)));
    }
    Ok((bits as u32).max(MIN_ARBITRARY_PRECISION))
}

/// Result of a successful escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperOutcome {
    /// Backend of the successful attempt
    pub backend: NumericBackend,
    /// Every backend tried, in order, the successful one last
    pub attempts: Vec<NumericBackend>,
    pub stats: ReductionStats,
}

/// Try each candidate of `plan` on `basis` until one succeeds.
pub fn reduce_with_escalation(
    basis: &mut IntegerMatrix,
    plan: &WrapperPlan,
    params: &LLLParams,
) -> Result<WrapperOutcome> {
    params.validate()?;
    if plan.candidates.is_empty() {
        return Err(LatticeError::invalid_parameters("Empty wrapper plan"));
    }
    let mut attempts = Vec::with_capacity(plan.candidates.len());
    for candidate in &plan.candidates {
        attempts.push(candidate.backend);
        let mut attempt = params.clone();
        attempt.flags = params.flags.union(candidate.flags);
        match dispatch::reduce(basis, candidate.backend, &attempt) {
            Ok(stats) => {
                log::info!(
                    "LLL succeeded with backend {} after {} attempt(s), {} swaps",
                    candidate.backend,
                    attempts.len(),
                    stats.nswaps
                );
                return Ok(WrapperOutcome { backend: candidate.backend, attempts, stats });
            }
            Err(e) if e.is_insufficient_precision() => {
                log::warn!("{}; trying a stronger backend", e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(LatticeError::ExhaustedEscalation { attempted: attempts })
}

/// Resolve a plan and run it.
pub fn lll_reduction(
    basis: &mut IntegerMatrix,
    params: &LLLParams,
    method: Method,
    backend: Option<BackendKind>,
    precision: Option<u32>,
) -> Result<WrapperOutcome> {
    let plan = WrapperPlan::resolve(method, backend, precision, basis, params)?;
    reduce_with_escalation(basis, &plan, params)
}
