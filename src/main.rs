//! Command-line interface for GSO-based LLL reduction

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

use lattice_gso::utils::{self, basis_statistics, BasisStatistics};
use lattice_gso::{
    is_lll_reduced, lll_reduction, BackendKind, IntegerMatrix, LLLParams, Method, NumericBackend,
    PrecisionManager, ReductionFlags, ReductionStats,
};

/// LLL reduction with automatic precision escalation
#[derive(Parser, Debug)]
#[clap(name = "lattice-gso")]
#[clap(about = "Floating-point LLL reduction over an exact Gram matrix")]
#[clap(version)]
struct Args {
    /// Input file containing a lattice basis (fplll format); stdin if omitted
    #[clap(short, long)]
    input: Option<PathBuf>,

    /// Output file for results; stdout if omitted
    #[clap(short, long)]
    output: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,

    /// Enable verbose progress reporting
    #[clap(short, long)]
    verbose: bool,

    /// Set logging level (error, warn, info, debug, trace)
    #[clap(long, default_value = "warn")]
    log_level: String,

    /// Output format (plain, json, csv)
    #[clap(long, value_enum, default_value = "plain")]
    format: OutputFormat,

    /// Default MPFR precision when `--backend mpfr` is given without `--precision`
    #[clap(long)]
    default_precision: Option<u32>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// LLL-reduce the input basis
    Lll {
        /// Lovász parameter (0 < delta < 1)
        #[clap(long, default_value = "0.99")]
        delta: f64,

        /// Size-reduction parameter (0.5 <= eta < 1)
        #[clap(long, default_value = "0.51")]
        eta: f64,

        #[clap(long, value_enum, default_value = "wrapper")]
        method: MethodCli,

        /// Floating-point backend; implied by the method when omitted
        #[clap(long, value_enum)]
        backend: Option<BackendCli>,

        /// Precision in bits (mpfr backend only)
        #[clap(long)]
        precision: Option<u32>,

        /// Size-reduce later rows early
        #[clap(long)]
        early_red: bool,

        /// Use Siegel's condition instead of Lovász's
        #[clap(long)]
        siegel: bool,
    },

    /// Check whether the input basis is LLL-reduced
    Check {
        #[clap(long, default_value = "0.99")]
        delta: f64,

        #[clap(long, default_value = "0.51")]
        eta: f64,

        /// Backend used for the GSO of the check
        #[clap(long, value_enum, default_value = "mpfr")]
        backend: BackendCli,

        #[clap(long)]
        precision: Option<u32>,
    },

    /// Generate a test basis
    Gen {
        #[clap(value_enum)]
        kind: GeneratorKind,

        /// Dimension parameter
        #[clap(short, long)]
        dimension: usize,

        /// Entry size (or modulus size) in bits
        #[clap(short, long, default_value = "30")]
        bits: u32,

        /// Number of modular rows of a q-ary basis
        #[clap(short, long, default_value = "1")]
        k: usize,

        #[clap(long, default_value = "0")]
        seed: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Plain,
    Json,
    Csv,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MethodCli {
    Fast,
    Heuristic,
    Proved,
    Wrapper,
}

impl From<MethodCli> for Method {
    fn from(value: MethodCli) -> Self {
        match value {
            MethodCli::Fast => Method::Fast,
            MethodCli::Heuristic => Method::Heuristic,
            MethodCli::Proved => Method::Proved,
            MethodCli::Wrapper => Method::Wrapper,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendCli {
    Native,
    Extended,
    Dd,
    Qd,
    Mpfr,
}

impl From<BackendCli> for BackendKind {
    fn from(value: BackendCli) -> Self {
        match value {
            BackendCli::Native => BackendKind::Native,
            BackendCli::Extended => BackendKind::Extended,
            BackendCli::Dd => BackendKind::DoubleDouble,
            BackendCli::Qd => BackendKind::QuadDouble,
            BackendCli::Mpfr => BackendKind::Arbitrary,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GeneratorKind {
    Uniform,
    Ntrulike,
    Intrel,
    Qary,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_logging(&args)?;

    if let Some(bits) = args.default_precision {
        PrecisionManager::initialize(bits)?;
    }

    let command = args.command.clone();
    let outcome = match command {
        Commands::Lll { delta, eta, method, backend, precision, early_red, siegel } => {
            let flags = ReductionFlags { verbose: args.verbose, early_red, siegel };
            run_lll(&args, LLLParams::new(delta, eta).with_flags(flags), method.into(), backend, precision)
        }
        Commands::Check { delta, eta, backend, precision } => {
            run_check(&args, delta, eta, backend, precision)
        }
        Commands::Gen { kind, dimension, bits, k, seed } => {
            run_generate(&args, kind, dimension, bits, k, seed)
        }
    };

    if PrecisionManager::is_initialized() {
        log::debug!("Restoring the default MPFR precision");
        PrecisionManager::teardown();
    }
    outcome
}

fn run_lll(
    args: &Args,
    params: LLLParams,
    method: Method,
    backend: Option<BackendCli>,
    precision: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut basis = load_input_basis(args)?;
    log::info!(
        "Running LLL on a {}x{} basis with delta={}, eta={}, method={}",
        basis.rows(),
        basis.cols(),
        params.delta,
        params.eta,
        method
    );

    let (outcome, elapsed) = utils::timed("lll", || {
        lll_reduction(&mut basis, &params, method, backend.map(Into::into), precision)
    });
    let outcome = outcome?;
    log::info!("LLL reduction completed in {:.2?} with backend {}", elapsed, outcome.backend);

    let report = LLLReport {
        backend: outcome.backend,
        attempts: outcome.attempts,
        stats: outcome.stats,
        statistics: basis_statistics(&basis)?,
        seconds: elapsed.as_secs_f64(),
    };
    save_result(args, &basis, Some(&report))
}

fn run_check(
    args: &Args,
    delta: f64,
    eta: f64,
    backend: BackendCli,
    precision: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let basis = load_input_basis(args)?;
    let backend = BackendKind::from(backend).resolve(precision)?;
    let reduced = is_lll_reduced(&basis, delta, eta, backend)?;
    log::info!("Checked with backend {}: reduced = {}", backend, reduced);

    let report = CheckReport { reduced, delta, eta, backend };
    let content = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Csv => format!("reduced,delta,eta,backend\n{},{},{},{}\n", reduced, delta, eta, backend),
        OutputFormat::Plain => format!("{}\n", if reduced { "reduced" } else { "not reduced" }),
    };
    write_output(args, &content)
}

fn run_generate(
    args: &Args,
    kind: GeneratorKind,
    dimension: usize,
    bits: u32,
    k: usize,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let basis = match kind {
        GeneratorKind::Uniform => utils::uniform(dimension, bits, seed)?,
        GeneratorKind::Ntrulike => utils::ntrulike(dimension, bits, seed)?,
        GeneratorKind::Intrel => utils::intrel(dimension, bits, seed)?,
        GeneratorKind::Qary => utils::qary(dimension, k, bits, seed)?,
    };
    log::info!("Generated {:?} basis of size {}x{}", kind, basis.rows(), basis.cols());
    save_result(args, &basis, None)
}

fn setup_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    use env_logger::Builder;
    use log::LevelFilter;

    let mut level_filter = match args.log_level.as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    };
    if args.verbose && level_filter < LevelFilter::Info {
        level_filter = LevelFilter::Info;
    }

    let mut builder = Builder::from_default_env();
    builder.filter_level(level_filter);
    builder.try_init()?;
    Ok(())
}

fn load_input_basis(args: &Args) -> Result<IntegerMatrix, Box<dyn std::error::Error>> {
    match &args.input {
        Some(path) => IntegerMatrix::load_from_file(path).map_err(|e| e.into()),
        None => {
            log::debug!("Reading basis from stdin");
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            Ok(IntegerMatrix::from_fplll_format(&content)?)
        }
    }
}

#[derive(Debug, Serialize)]
struct LLLReport {
    backend: NumericBackend,
    attempts: Vec<NumericBackend>,
    stats: ReductionStats,
    statistics: BasisStatistics,
    seconds: f64,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    reduced: bool,
    delta: f64,
    eta: f64,
    backend: NumericBackend,
}

fn save_result(
    args: &Args,
    basis: &IntegerMatrix,
    report: Option<&LLLReport>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = match args.format {
        OutputFormat::Plain => basis.to_fplll_format(),
        OutputFormat::Json => {
            let mut json = serde_json::json!({ "basis": basis.to_json() });
            if let Some(report) = report {
                json["report"] = serde_json::to_value(report)?;
            }
            serde_json::to_string_pretty(&json)?
        }
        OutputFormat::Csv => {
            let mut csv = String::new();
            for row in basis.to_rows() {
                csv.push_str(&row.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(","));
                csv.push('\n');
            }
            csv
        }
    };
    if let (Some(report), OutputFormat::Plain) = (report, args.format) {
        log::info!(
            "{} swaps, {} zero rows, log2 |b_0| = {:.3}, attempts: {:?}",
            report.stats.nswaps,
            report.stats.zeros,
            report.statistics.log2_first_norm,
            report.attempts
        );
    }
    write_output(args, &content)
}

fn write_output(args: &Args, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    match args.output {
        Some(ref path) => std::fs::write(path, content)
            .map_err(|e| format!("Failed to write output to {}: {}", path.display(), e).into()),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}
