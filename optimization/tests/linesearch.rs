mod common;

use common::Paraboloid;
use nalgebra::DVector;
use optimization::{LineSearch, LineSearchKind, ObjectiveFunctional, TrainingConfig, TrainingError};
use proptest::prelude::*;

fn search(kind: LineSearchKind) -> LineSearch {
    let config = TrainingConfig::builder()
        .with_line_search(kind)
        .with_display(false)
        .build()
        .unwrap();
    LineSearch::from_config(&config)
}

#[test]
fn test_fixed_returns_first_rate() {
    let p = Paraboloid::sum_squares(&[1.0, 1.0]);
    let x = p.parameters();
    let d = -p.gradient();
    let (rate, f) = search(LineSearchKind::Fixed)
        .compute_step(&p, &x, p.evaluation(), &d, 0.7)
        .unwrap();
    assert_eq!(rate, 0.01);
    assert_eq!(f, p.evaluate(&(&x + &d * 0.01)));
}

#[test]
fn test_golden_and_brent_agree() {
    // f(α) = 2 (1 - 2α)², minimum at α = 0.5
    let p = Paraboloid::sum_squares(&[1.0, 1.0]);
    let x = p.parameters();
    let d = -p.gradient();
    let ls = search(LineSearchKind::GoldenSection);
    let (golden, fg) = ls.compute_step(&p, &x, 2.0, &d, 0.01).unwrap();
    let ls = search(LineSearchKind::BrentMethod);
    let (brent, fb) = ls.compute_step(&p, &x, 2.0, &d, 0.01).unwrap();
    let tolerance = ls.training_rate_tolerance;
    assert!((golden - 0.5).abs() <= tolerance);
    assert!((brent - 0.5).abs() <= tolerance);
    assert!((golden - brent).abs() <= tolerance);
    assert!(fg < 1e-5 && fb < 1e-5);
}

#[test]
fn test_non_positive_initial_rate_uses_first_rate() {
    let p = Paraboloid::sum_squares(&[3.0]);
    let x = p.parameters();
    let d = -p.gradient();
    let ls = search(LineSearchKind::BrentMethod);
    let (rate, f) = ls.compute_step(&p, &x, 9.0, &d, -1.0).unwrap();
    assert!((rate - 0.5).abs() <= ls.training_rate_tolerance);
    assert!(f < 9.0);
}

#[test]
fn test_bracket_interior_below_start() {
    let p = Paraboloid::weighted(&[1.0, 10.0], &[1.0, -2.0]);
    let x = p.parameters();
    let d = -p.gradient();
    let f0 = p.evaluation();
    let bracket = search(LineSearchKind::GoldenSection)
        .bracket(&p, &x, f0, &d, 1e-4)
        .unwrap();
    assert!(bracket.interior.1 < f0);
    assert!(bracket.right.0 >= bracket.interior.0);
    assert!(bracket.right.1 >= bracket.interior.1);
}

#[test]
fn test_ascent_direction_cannot_be_bracketed() {
    let p = Paraboloid::sum_squares(&[1.0, 1.0]);
    let x = p.parameters();
    let d = p.gradient();
    for kind in [LineSearchKind::GoldenSection, LineSearchKind::BrentMethod].iter() {
        let result = search(*kind).compute_step(&p, &x, 2.0, &d, 0.01);
        assert!(matches!(
            result,
            Err(TrainingError::BracketingFailed { limit, .. }) if limit == 1e10
        ));
    }
}

#[test]
fn test_warning_is_logged_once() {
    let config = TrainingConfig::builder()
        .with_line_search(LineSearchKind::BrentMethod)
        .with_warning_training_rate(1.0)
        .build()
        .unwrap();
    let ls = LineSearch::from_config(&config);
    // minimum at α = 50, far beyond the warning rate
    let p = Paraboloid::sum_squares(&[1.0]);
    let x = p.parameters();
    let d = DVector::from_element(1, -0.02);
    let mut log = Vec::new();
    let (rate, _) = ls
        .compute_step_logged(&p, &x, 1.0, &d, 0.01, &mut log)
        .unwrap();
    assert!((rate - 50.0).abs() < 0.1);
    let log = String::from_utf8(log).unwrap();
    assert_eq!(log.matches("Warning").count(), 1);
}

proptest! {
    #[test]
    fn bracketing_strategies_never_increase_the_evaluation(
        x in prop::collection::vec(-10.0f64..10.0, 1..6),
        w in prop::collection::vec(0.1f64..20.0, 6),
        initial_rate in 1e-4f64..10.0,
    ) {
        let p = Paraboloid::weighted(&w[..x.len()], &x);
        let start = p.parameters();
        let d = -p.gradient();
        prop_assume!(d.norm() > 1e-8);
        let f0 = p.evaluation();
        for kind in [LineSearchKind::GoldenSection, LineSearchKind::BrentMethod].iter() {
            let (rate, f) = search(*kind).compute_step(&p, &start, f0, &d, initial_rate).unwrap();
            prop_assert!(f <= f0);
            prop_assert!(rate >= 0.0);
            prop_assert_eq!(f, p.evaluate(&(&start + &d * rate)));
        }
    }
}
