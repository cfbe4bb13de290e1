//! Core types shared by the GSO engine, the LLL driver and the wrapper

use crate::core::error::{LatticeError, PrecisionFailure, Result};
use crate::precision::{PrecisionManager, MIN_ARBITRARY_PRECISION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Floating-point representation used for GSO coefficients.
///
/// The tag is fixed when an engine is built and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericBackend {
    /// IEEE double (53-bit significand)
    Native,
    /// 64-bit significand with a wide exponent range
    Extended,
    /// Unevaluated sum of two doubles (~106 bits)
    DoubleDouble,
    /// Unevaluated sum of four doubles (~212 bits)
    QuadDouble,
    /// MPFR float at a caller-chosen precision
    Arbitrary { bits: u32 },
}

impl NumericBackend {
    /// The default escalation order of the fixed-size backends.
    pub const FIXED_LADDER: [NumericBackend; 4] = [
        NumericBackend::Native,
        NumericBackend::Extended,
        NumericBackend::DoubleDouble,
        NumericBackend::QuadDouble,
    ];

    /// Significand bits carried by this backend
    pub fn precision_bits(&self) -> u32 {
        match self {
            NumericBackend::Native => 53,
            NumericBackend::Extended => 64,
            NumericBackend::DoubleDouble => 106,
            NumericBackend::QuadDouble => 212,
            NumericBackend::Arbitrary { bits } => *bits,
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            NumericBackend::Native => BackendKind::Native,
            NumericBackend::Extended => BackendKind::Extended,
            NumericBackend::DoubleDouble => BackendKind::DoubleDouble,
            NumericBackend::QuadDouble => BackendKind::QuadDouble,
            NumericBackend::Arbitrary { .. } => BackendKind::Arbitrary,
        }
    }

    /// Reject arbitrary precisions MPFR cannot honour or that are weaker than a double.
    pub fn validate(&self) -> Result<()> {
        if let NumericBackend::Arbitrary { bits } = *self {
            if bits < MIN_ARBITRARY_PRECISION || bits > rug::float::prec_max() {
                return Err(LatticeError::invalid_parameters(format!(
                    "Arbitrary precision must be in [{}, {}] bits, got {}",
                    MIN_ARBITRARY_PRECISION,
                    rug::float::prec_max(),
                    bits
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for NumericBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericBackend::Arbitrary { bits } => write!(f, "mpfr:{}", bits),
            other => f.write_str(other.kind().name()),
        }
    }
}

impl FromStr for NumericBackend {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(bits) = s.strip_prefix("mpfr:") {
            let bits: u32 = bits
                .parse()
                .map_err(|e| LatticeError::parse_error(format!("Bad precision '{}': {}", bits, e)))?;
            let backend = NumericBackend::Arbitrary { bits };
            backend.validate()?;
            return Ok(backend);
        }
        BackendKind::from_str(s)?.resolve(None)
    }
}

/// Backend selector as a caller names it, before a bit count is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Native,
    Extended,
    DoubleDouble,
    QuadDouble,
    Arbitrary,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Extended => "extended",
            BackendKind::DoubleDouble => "dd",
            BackendKind::QuadDouble => "qd",
            BackendKind::Arbitrary => "mpfr",
        }
    }

    /// Attach a precision. Only the arbitrary-precision kind accepts one;
    /// without it the process-wide default from [`PrecisionManager`] is used.
    pub fn resolve(self, precision: Option<u32>) -> Result<NumericBackend> {
        let backend = match (self, precision) {
            (BackendKind::Arbitrary, Some(bits)) => NumericBackend::Arbitrary { bits },
            (BackendKind::Arbitrary, None) => NumericBackend::Arbitrary {
                bits: PrecisionManager::default_precision(),
            },
            (kind, Some(bits)) => {
                return Err(LatticeError::invalid_parameters(format!(
                    "A precision ({} bits) can only be given with the mpfr backend, not {}",
                    bits,
                    kind.name()
                )))
            }
            (BackendKind::Native, None) => NumericBackend::Native,
            (BackendKind::Extended, None) => NumericBackend::Extended,
            (BackendKind::DoubleDouble, None) => NumericBackend::DoubleDouble,
            (BackendKind::QuadDouble, None) => NumericBackend::QuadDouble,
        };
        backend.validate()?;
        Ok(backend)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "double" | "d" => Ok(BackendKind::Native),
            "extended" | "long double" | "ld" => Ok(BackendKind::Extended),
            "dd" | "double-double" => Ok(BackendKind::DoubleDouble),
            "qd" | "quad-double" => Ok(BackendKind::QuadDouble),
            "mpfr" | "arbitrary" => Ok(BackendKind::Arbitrary),
            other => Err(LatticeError::parse_error(format!("Unknown backend '{}'", other))),
        }
    }
}

/// Independent options of a reduction session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionFlags {
    /// Log progress at `info` level
    pub verbose: bool,
    /// Opportunistically size-reduce rows ahead of kappa
    pub early_red: bool,
    /// Use Siegel's condition instead of Lovász's
    pub siegel: bool,
}

impl ReductionFlags {
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn early_red(mut self) -> Self {
        self.early_red = true;
        self
    }

    pub fn siegel(mut self) -> Self {
        self.siegel = true;
        self
    }

    pub fn union(self, other: ReductionFlags) -> Self {
        ReductionFlags {
            verbose: self.verbose || other.verbose,
            early_red: self.early_red || other.early_red,
            siegel: self.siegel || other.siegel,
        }
    }
}

/// Terminal (or current) state of a reduction session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReductionStatus {
    #[default]
    NotStarted,
    Running,
    Success,
    InsufficientPrecision(PrecisionFailure),
    Interrupted,
}

/// Statistics of one reduction call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionStats {
    pub status: ReductionStatus,
    /// Value of kappa when the loop stopped
    pub final_kappa: usize,
    /// Number of row swaps
    pub nswaps: usize,
    /// Number of zero rows moved to the end
    pub zeros: usize,
    /// Loop iterations (one per kappa step)
    pub iterations: usize,
    /// Number of early size-reduction passes
    pub early_reductions: usize,
    /// Kappa of the last early size-reduction pass, 0 if none ran
    pub last_early_red: usize,
}

impl ReductionStats {
    pub fn is_success(&self) -> bool {
        self.status == ReductionStatus::Success
    }

    pub fn early_reduction_fired(&self) -> bool {
        self.last_early_red > 0
    }
}

/// Cooperative cancellation flag polled once per kappa step.
///
/// Clones share the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    flag: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
