//! End-to-end properties of the reduction pipeline

use lattice_gso::dispatch::reduce;
use lattice_gso::utils::{gram_determinant, intrel, ntrulike, qary, uniform};
use lattice_gso::*;
use rug::Integer;

const CHECK_BACKEND: NumericBackend = NumericBackend::Arbitrary { bits: 256 };

fn escalation_basis() -> IntegerMatrix {
    let big = Integer::from(1) << 1100u32;
    IntegerMatrix::new(vec![
        vec![big.clone() + 1u32, big.clone()],
        vec![big.clone(), big - 1u32],
    ])
    .unwrap()
}

#[test]
fn test_success_implies_reduced() {
    let bases = vec![
        uniform(20, 30, 1).unwrap(),
        intrel(10, 60, 2).unwrap(),
        qary(16, 8, 40, 3).unwrap(),
        ntrulike(8, 20, 4).unwrap(),
    ];
    for mut basis in bases {
        let outcome =
            lll_reduction(&mut basis, &LLLParams::default(), Method::Wrapper, None, None).unwrap();
        assert!(outcome.stats.is_success());
        assert!(is_lll_reduced(&basis, LLL_DEF_DELTA, LLL_DEF_ETA, CHECK_BACKEND).unwrap());
    }
}

#[test]
fn test_reduction_is_idempotent() {
    for backend in [NumericBackend::Native, NumericBackend::DoubleDouble, CHECK_BACKEND] {
        let mut basis = uniform(15, 25, 8).unwrap();
        let first = reduce(&mut basis, backend, &LLLParams::default()).unwrap();
        assert!(first.nswaps > 0);
        let reduced = basis.clone();

        let second = reduce(&mut basis, backend, &LLLParams::default()).unwrap();
        assert_eq!(second.nswaps, 0, "backend {}", backend);
        assert_eq!(basis, reduced);
    }
}

#[test]
fn test_lattice_is_preserved() {
    let mut basis = uniform(12, 40, 5).unwrap();
    let before = gram_determinant(&basis).unwrap();
    assert_ne!(before, 0);
    lll_reduction(&mut basis, &LLLParams::default(), Method::Wrapper, None, None).unwrap();
    assert_eq!(gram_determinant(&basis).unwrap(), before);

    // dependent rows end up as zero rows at the end
    let mut deficient = IntegerMatrix::from_i64_rows(&[
        vec![4, 1, 0],
        vec![8, 2, 0],
        vec![3, 9, 7],
    ])
    .unwrap();
    let stats = reduce(&mut deficient, NumericBackend::Native, &LLLParams::default()).unwrap();
    assert_eq!(stats.zeros, 1);
    assert!(deficient.is_row_zero(2).unwrap());
}

#[test]
fn test_random_basis_is_not_reduced() {
    let basis = uniform(20, 30, 77).unwrap();
    assert!(!is_lll_reduced(&basis, LLL_DEF_DELTA, LLL_DEF_ETA, CHECK_BACKEND).unwrap());
}

#[test]
fn test_escalation_past_native() {
    let mut basis = escalation_basis();
    let params = LLLParams::default();
    let plan = WrapperPlan::resolve(Method::Wrapper, None, None, &basis, &params).unwrap();

    let outcome = reduce_with_escalation(&mut basis, &plan, &params).unwrap();
    assert_eq!(outcome.attempts[0], NumericBackend::Native);
    assert_ne!(outcome.backend, NumericBackend::Native);
    assert_eq!(&plan.backends()[..outcome.attempts.len()], &outcome.attempts[..]);
    assert!(is_lll_reduced(&basis, LLL_DEF_DELTA, LLL_DEF_ETA, CHECK_BACKEND).unwrap());
    // the lattice is Z^2
    assert_eq!(gram_determinant(&basis).unwrap(), 1);
}

#[test]
fn test_native_alone_reports_insufficient_precision() {
    let mut basis = escalation_basis();
    let err = reduce(&mut basis, NumericBackend::Native, &LLLParams::default()).unwrap_err();
    assert!(err.is_insufficient_precision());
    assert!(matches!(
        err,
        LatticeError::InsufficientPrecision { kind: PrecisionFailure::Gso, kappa: 0, .. }
    ));
}

#[test]
fn test_invalid_parameters_leave_basis_untouched() {
    let original = uniform(6, 20, 3).unwrap();
    for (delta, eta) in [(1.0, 0.51), (0.0, 0.51), (0.99, 0.4), (f64::NAN, 0.51)] {
        let mut basis = original.clone();
        let err = lll_reduction(&mut basis, &LLLParams::new(delta, eta), Method::Wrapper, None, None)
            .unwrap_err();
        assert!(matches!(err, LatticeError::InvalidParameters(_)));
        assert_eq!(basis, original);
    }

    let mut basis = original.clone();
    let err = lll_reduction(
        &mut basis,
        &LLLParams::default(),
        Method::Wrapper,
        Some(BackendKind::Native),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, LatticeError::InvalidParameters(_)));
    assert_eq!(basis, original);
}

#[test]
fn test_ntrulike_first_vector_is_short() {
    let mut basis = ntrulike(25, 30, 42).unwrap();
    assert_eq!((basis.rows(), basis.cols()), (50, 50));
    let outcome =
        lll_reduction(&mut basis, &LLLParams::default(), Method::Wrapper, None, None).unwrap();
    assert!(outcome.stats.is_success());
    assert!(basis.sq_norm(0).unwrap() < (Integer::from(1) << 42u32));
    assert!(is_lll_reduced(&basis, LLL_DEF_DELTA, LLL_DEF_ETA, CHECK_BACKEND).unwrap());
}

#[test]
fn test_interrupt_is_not_retried() {
    let mut basis = uniform(10, 30, 9).unwrap();
    let flag = InterruptFlag::new();
    flag.trigger();
    let params = LLLParams::default().with_interrupt(flag.clone());
    let err = lll_reduction(&mut basis, &params, Method::Wrapper, None, None).unwrap_err();
    assert_eq!(err, LatticeError::Interrupted { kappa: 0 });

    flag.clear();
    let outcome = lll_reduction(&mut basis, &params, Method::Wrapper, None, None).unwrap();
    assert_eq!(outcome.attempts, vec![NumericBackend::Native]);
}

#[test]
fn test_siegel_and_early_reduction_through_the_engine() {
    let mut basis = uniform(18, 30, 21).unwrap();
    let flags = ReductionFlags::default().siegel().early_red();
    {
        let mut engine = GsoEngine::new(&mut basis, NumericBackend::QuadDouble).unwrap();
        let stats = Reduction::new(&mut engine, LLLParams::default().with_flags(flags))
            .unwrap()
            .lll(0, 0, None)
            .unwrap();
        assert!(stats.early_reduction_fired());
        assert!(engine.is_reduced(LLL_DEF_DELTA, LLL_DEF_ETA, flags).unwrap());
    }
    let mut engine = GsoEngine::new(&mut basis, CHECK_BACKEND).unwrap();
    assert!(engine
        .is_reduced(LLL_DEF_DELTA, LLL_DEF_ETA, ReductionFlags::default().siegel())
        .unwrap());
}

#[test]
fn test_kappa_window_through_the_engine() {
    let mut basis = uniform(8, 20, 13).unwrap();
    let tail: Vec<Vec<Integer>> = basis.to_rows()[5..].to_vec();
    {
        let mut engine = GsoEngine::new(&mut basis, NumericBackend::Extended).unwrap();
        let mut reduction = Reduction::new(&mut engine, LLLParams::default()).unwrap();
        let stats = reduction.lll(0, 0, Some(5)).unwrap();
        assert_eq!(stats.final_kappa, 5);
    }
    assert_eq!(&basis.to_rows()[5..], &tail[..]);

    let prefix = IntegerMatrix::new(basis.to_rows()[..5].to_vec()).unwrap();
    assert!(is_lll_reduced(&prefix, LLL_DEF_DELTA, LLL_DEF_ETA, CHECK_BACKEND).unwrap());

    // resuming from kappa_start = 5 finishes the job
    {
        let mut engine = GsoEngine::new(&mut basis, NumericBackend::Extended).unwrap();
        Reduction::new(&mut engine, LLLParams::default())
            .unwrap()
            .lll(0, 5, None)
            .unwrap();
    }
    assert!(is_lll_reduced(&basis, LLL_DEF_DELTA, LLL_DEF_ETA, CHECK_BACKEND).unwrap());
}

#[test]
fn test_kappa_min_leaves_leading_rows_alone() {
    let mut basis = uniform(8, 20, 13).unwrap();
    let head: Vec<Vec<Integer>> = basis.to_rows()[..2].to_vec();
    {
        let mut engine = GsoEngine::new(&mut basis, CHECK_BACKEND).unwrap();
        let stats = Reduction::new(&mut engine, LLLParams::default())
            .unwrap()
            .lll(2, 2, None)
            .unwrap();
        assert!(stats.is_success());
        assert!(stats.nswaps > 0);
    }
    assert_eq!(&basis.to_rows()[..2], &head[..]);

    let mut engine = GsoEngine::new(&mut basis, CHECK_BACKEND).unwrap();
    engine.update_gso_all().unwrap();
    // rows of the window are size-reduced against every earlier row, including rows 0 and 1
    for i in 2..8 {
        for j in 0..i {
            let mu = engine.get_mu(i, j).unwrap();
            assert!(mu.abs() <= LLL_DEF_ETA, "mu({}, {}) = {}", i, j, mu);
        }
    }
    // the Lovász condition is only enforced inside the window
    for i in 3..8 {
        let mu = engine.get_mu(i, i - 1).unwrap();
        let bound = (LLL_DEF_DELTA - mu * mu) * engine.get_r(i - 1).unwrap();
        assert!(engine.get_r(i).unwrap() >= bound * (1.0 - 1e-12), "row {}", i);
    }
}

#[test]
fn test_reduced_basis_survives_fplll_format() {
    let mut basis = intrel(6, 50, 17).unwrap();
    lll_reduction(&mut basis, &LLLParams::default(), Method::Fast, None, None).unwrap();
    let text = basis.to_fplll_format();
    assert_eq!(IntegerMatrix::from_fplll_format(&text).unwrap(), basis);
    let json = serde_json::to_string(&basis.to_json()).unwrap();
    assert_eq!(IntegerMatrix::from_fplll_format(&json).unwrap(), basis);
    assert_eq!(IntegerMatrix::from_json(&basis.to_json()).unwrap(), basis);
}
