mod common;

use std::ops::ControlFlow;

use common::{quiet, Paraboloid};
use nalgebra::{DMatrix, DVector};
use optimization::solver::ConjugateDirectionMethod;
use optimization::{
    ConjugateGradient, EvolutionaryAlgorithm, GradientDescent, HistoryField, NewtonMethod,
    ObjectiveFunctional, Optimizer, QuasiNewtonMethod, StopCondition, TrainingAlgorithm,
    TrainingConfig, TrainingError,
};

fn epochs(n: usize) -> TrainingConfig {
    quiet().to_builder().with_maximum_epochs(n).build().unwrap()
}

#[test]
fn test_newton_single_epoch_reaches_minimum() {
    let mut p = Paraboloid::sum_squares(&[1.0]);
    let f0 = p.evaluation();
    let results = NewtonMethod::new(epochs(1)).train(&mut p).unwrap();
    assert_eq!(results.epochs, 1);
    assert!(results.evaluation < f0);
    assert!(results.evaluation < 1e-5);
    assert_eq!(p.x, results.parameters);
}

#[test]
fn test_gradient_descent_single_epoch_decreases() {
    let mut p = Paraboloid::sum_squares(&[1.0]);
    let f0 = p.evaluation();
    let results = GradientDescent::new(epochs(1)).train(&mut p).unwrap();
    assert_eq!(results.epochs, 1);
    assert!(results.evaluation < f0);
    assert_eq!(p.evaluation(), results.evaluation);
}

#[test]
fn test_zero_epochs_leaves_parameters() {
    let mut p = Paraboloid::sum_squares(&[1.0, -3.0]);
    let results = QuasiNewtonMethod::new(epochs(0)).train(&mut p).unwrap();
    assert_eq!(results.stop_condition, StopCondition::MaximumEpochsReached);
    assert_eq!(results.epochs, 0);
    assert_eq!(p.x, DVector::from_column_slice(&[1.0, -3.0]));
    assert_eq!(results.evaluation, 10.0);
}

#[test]
fn test_monitor_aborts() {
    let mut p = Paraboloid::weighted(&[1.0, 10.0], &[5.0, 5.0]);
    let mut seen = Vec::new();
    let results = GradientDescent::new(epochs(100))
        .train_monitored(&mut p, &mut std::io::sink(), &mut |report| {
            seen.push(report.epoch);
            if report.epoch == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
    assert_eq!(results.stop_condition, StopCondition::UserAbort);
    assert_eq!(results.epochs, 2);
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn test_newton_needs_an_invertible_hessian() {
    let mut p = Paraboloid::sum_squares(&[1.0, 1.0]);
    p.with_hessian = false;
    assert!(matches!(
        NewtonMethod::new(epochs(5)).train(&mut p),
        Err(TrainingError::HessianUnavailable)
    ));
    let mut p = Paraboloid::weighted(&[1.0, 0.0], &[1.0, 1.0]);
    assert!(matches!(
        NewtonMethod::new(epochs(5)).train(&mut p),
        Err(TrainingError::SingularHessian)
    ));
}

/// Reports the Hessian with the wrong sign, so the Newton direction points uphill.
struct UpsideDown(Paraboloid);

impl ObjectiveFunctional for UpsideDown {
    fn parameter_count(&self) -> usize {
        self.0.parameter_count()
    }
    fn parameters(&self) -> DVector<f64> {
        self.0.parameters()
    }
    fn set_parameters(&mut self, parameters: &DVector<f64>) {
        self.0.set_parameters(parameters)
    }
    fn evaluate(&self, parameters: &DVector<f64>) -> f64 {
        self.0.evaluate(parameters)
    }
    fn gradient(&self) -> DVector<f64> {
        self.0.gradient()
    }
    fn hessian(&self) -> Option<DMatrix<f64>> {
        self.0.hessian().map(|h| -h)
    }
}

#[test]
fn test_uphill_direction_falls_back_to_steepest_descent() {
    let mut p = UpsideDown(Paraboloid::weighted(&[1.0, 2.0], &[1.0, 1.0]));
    let gradient = p.gradient();
    let config = epochs(1)
        .to_builder()
        .reserve_history(HistoryField::TrainingDirection)
        .build()
        .unwrap();
    let mut newton = NewtonMethod::new(config);
    let results = newton.train(&mut p).unwrap();
    assert!(results.evaluation < 3.0);
    assert_eq!(newton.history().training_direction().unwrap()[0], -gradient);
}

#[test]
fn test_early_stopping_on_validation_increase() {
    let start = [2.0, 1.0];
    let mut p = Paraboloid::weighted(&[1.0, 3.0], &start);
    p.validation_target = Some(DVector::from_column_slice(&start));
    let config = epochs(3).to_builder().with_early_stopping(true).build().unwrap();
    let results = GradientDescent::new(config.clone()).train(&mut p).unwrap();
    assert_eq!(results.stop_condition, StopCondition::ValidationErrorIncrease);
    assert_eq!(results.epochs, 1);

    p.x = DVector::from_column_slice(&start);
    let config = config.to_builder().with_early_stopping(false).build().unwrap();
    let results = GradientDescent::new(config).train(&mut p).unwrap();
    assert_eq!(results.stop_condition, StopCondition::MaximumEpochsReached);
    assert_eq!(results.epochs, 3);
}

#[test]
fn test_parameters_norm_limit_is_fatal() {
    let mut p = Paraboloid::sum_squares(&[1.0, 1.0]);
    let config = epochs(3)
        .to_builder()
        .with_error_parameters_norm(0.5)
        .build()
        .unwrap();
    assert!(matches!(
        GradientDescent::new(config).train(&mut p),
        Err(TrainingError::ParametersNormTooLarge { limit, .. }) if limit == 0.5
    ));
}

/// Behaves like the wrapped paraboloid until `after` steps were accepted, then reports the
/// gradient with the wrong sign and a zero Hessian.
struct Breaking {
    inner: Paraboloid,
    accepted: usize,
    after: usize,
}

impl Breaking {
    fn new(inner: Paraboloid, after: usize) -> Self {
        Breaking {
            inner,
            accepted: 0,
            after,
        }
    }

    fn broken(&self) -> bool {
        self.accepted >= self.after
    }
}

impl ObjectiveFunctional for Breaking {
    fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }
    fn parameters(&self) -> DVector<f64> {
        self.inner.parameters()
    }
    fn set_parameters(&mut self, parameters: &DVector<f64>) {
        self.accepted += 1;
        self.inner.set_parameters(parameters)
    }
    fn evaluate(&self, parameters: &DVector<f64>) -> f64 {
        self.inner.evaluate(parameters)
    }
    fn gradient(&self) -> DVector<f64> {
        if self.broken() {
            -self.inner.gradient()
        } else {
            self.inner.gradient()
        }
    }
    fn hessian(&self) -> Option<DMatrix<f64>> {
        if self.broken() {
            let n = self.parameter_count();
            Some(DMatrix::zeros(n, n))
        } else {
            self.inner.hessian()
        }
    }
}

#[test]
fn test_failure_mid_run_keeps_last_accepted_parameters() {
    let mut p = Breaking::new(Paraboloid::weighted(&[1.0, 10.0], &[1.0, 1.0]), 2);
    let start = p.parameters();
    let config = epochs(10)
        .to_builder()
        .reserve_history(HistoryField::Parameters)
        .build()
        .unwrap();
    let mut descent = GradientDescent::new(config);
    let result = descent.train(&mut p);
    assert!(
        matches!(result, Err(TrainingError::BracketingFailed { .. })),
        "{:?}",
        result
    );
    let accepted = descent.history().parameters().unwrap();
    assert_eq!(accepted.len(), 2);
    assert_eq!(p.accepted, 2);
    assert_eq!(p.inner.x, accepted[1]);
    assert!(p.inner.evaluate(&p.inner.x) < p.inner.evaluate(&start));
}

#[test]
fn test_newton_ignores_hessian_after_the_last_epoch() {
    let mut p = Breaking::new(Paraboloid::sum_squares(&[1.0, -2.0]), 1);
    let results = NewtonMethod::new(epochs(1)).train(&mut p).unwrap();
    assert_eq!(results.epochs, 1);
    assert_eq!(p.inner.x, results.parameters);
}

#[test]
fn test_parameter_count_mismatch() {
    struct Liar(Paraboloid);
    impl ObjectiveFunctional for Liar {
        fn parameter_count(&self) -> usize {
            3
        }
        fn parameters(&self) -> DVector<f64> {
            self.0.parameters()
        }
        fn set_parameters(&mut self, parameters: &DVector<f64>) {
            self.0.set_parameters(parameters)
        }
        fn evaluate(&self, parameters: &DVector<f64>) -> f64 {
            self.0.evaluate(parameters)
        }
        fn gradient(&self) -> DVector<f64> {
            self.0.gradient()
        }
    }
    let mut p = Liar(Paraboloid::sum_squares(&[1.0, 1.0]));
    assert!(matches!(
        GradientDescent::new(epochs(3)).train(&mut p),
        Err(TrainingError::ParameterCountMismatch {
            expected: 3,
            found: 2
        })
    ));
}

#[test]
fn test_progress_log() {
    let mut p = Paraboloid::weighted(&[1.0, 10.0], &[5.0, 5.0]);
    let config = TrainingConfig::builder()
        .with_maximum_epochs(4)
        .with_display_period(2)
        .with_warning_gradient_norm(1.0)
        .build()
        .unwrap();
    let mut log = Vec::new();
    GradientDescent::new(config.clone())
        .train_with_log(&mut p, &mut log)
        .unwrap();
    let log = String::from_utf8(log).unwrap();
    assert!(log.starts_with("Training with GradientDescent."));
    assert!(log.contains("Warning: gradient norm"));
    assert!(log.contains("Epoch 2;"));
    assert!(log.contains("Epoch 4: Maximum number of epochs reached."));

    let mut silent = Vec::new();
    let config = config.to_builder().with_display(false).build().unwrap();
    GradientDescent::new(config)
        .train_with_log(&mut p, &mut silent)
        .unwrap();
    assert!(silent.is_empty());
}

#[test]
fn test_conjugate_gradient_methods_converge() {
    let config = quiet()
        .to_builder()
        .with_training_rate_tolerance(1e-8)
        .with_gradient_norm_goal(1e-6)
        .with_maximum_epochs(200)
        .build()
        .unwrap();
    for method in [
        ConjugateDirectionMethod::FletcherReeves,
        ConjugateDirectionMethod::PolakRibiere,
        ConjugateDirectionMethod::HestenesStiefel,
    ]
    .iter()
    {
        let mut p = Paraboloid::weighted(&[1.0, 5.0, 25.0], &[1.0, -2.0, 0.5]);
        let results = ConjugateGradient::new(config.clone())
            .with_method(*method)
            .train(&mut p)
            .unwrap();
        assert!(
            results.gradient_norm <= 1e-6 || results.evaluation == 0.0,
            "{}: {}",
            method,
            results
        );
    }
}

#[test]
fn test_beta_is_clamped() {
    let g_old = DVector::from_column_slice(&[1.0, 0.0]);
    let g = DVector::from_column_slice(&[3.0, 0.0]);
    let d = DVector::from_column_slice(&[-1.0, 0.0]);
    assert_eq!(ConjugateDirectionMethod::FletcherReeves.beta(&g_old, &g, &d), 1.0);
    let g = DVector::from_column_slice(&[0.0, 0.5]);
    assert_eq!(ConjugateDirectionMethod::PolakRibiere.beta(&g_old, &g, &d), 0.25);
    let zero = DVector::zeros(2);
    assert_eq!(ConjugateDirectionMethod::PolakRibiere.beta(&zero, &zero, &d), 0.0);
}

#[test]
fn test_evolutionary_algorithm_is_reproducible() {
    let config = quiet()
        .to_builder()
        .with_maximum_epochs(30)
        .reserve_history(HistoryField::MeanEvaluation)
        .reserve_history(HistoryField::Evaluation)
        .build()
        .unwrap();
    let run = || {
        let mut p = Paraboloid::sum_squares(&[1.0, -1.0, 0.5]);
        let mut ea = EvolutionaryAlgorithm::new(config.clone()).with_seed(3);
        let results = ea.train(&mut p).unwrap();
        assert_eq!(p.x, results.parameters);
        (results, ea.history().clone())
    };
    let (first, history) = run();
    let (second, _) = run();
    assert_eq!(first.stop_condition, StopCondition::MaximumEpochsReached);
    assert_eq!(first.epochs, 30);
    assert_eq!(first.parameters, second.parameters);
    assert!(first.evaluation <= 2.25);
    assert_eq!(history.len(HistoryField::MeanEvaluation), 30);
    // elitism keeps the best individual
    let best = history.evaluation().unwrap();
    assert!(best.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn test_algorithm_from_class_trains() {
    let mut algorithm = TrainingAlgorithm::from_class("ConjugateGradient").unwrap();
    algorithm.configure(epochs(5));
    let mut p = Paraboloid::weighted(&[1.0, 4.0], &[1.0, 1.0]);
    let results = algorithm.train(&mut p).unwrap();
    assert!(results.evaluation < 5.0);
    assert_eq!(algorithm.name(), "ConjugateGradient");
}
