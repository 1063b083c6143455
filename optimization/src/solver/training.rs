use std::io::Write;
use std::ops::ControlFlow;
use std::time::Instant;

use na::{DMatrix, DVector};
use nalgebra as na;

use super::{EpochReport, TrainingResults};
use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::history::TrainingHistory;
use crate::linesearch::LineSearch;
use crate::stopping::{StopCondition, StoppingCriteria};
use crate::ObjectiveFunctional;

/// How a gradient-based algorithm turns the gradient into a training direction.
pub(crate) trait DirectionRule {
    fn initialize<P: ObjectiveFunctional + ?Sized>(&mut self, pro: &P) -> Result<()>;

    fn direction<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        pro: &P,
        gradient: &DVector<f64>,
        epoch: usize,
    ) -> Result<DVector<f64>>;

    /// Called after a step was accepted and the parameters were written back to `pro`.
    fn update<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        _pro: &P,
        _direction: &DVector<f64>,
        _increment: &DVector<f64>,
        _old_gradient: &DVector<f64>,
        _gradient: &DVector<f64>,
    ) -> Result<()> {
        Ok(())
    }

    fn inverse_hessian(&self) -> Option<&DMatrix<f64>> {
        None
    }
}

pub(crate) fn check_parameter_count(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(TrainingError::ParameterCountMismatch { expected, found });
    }
    Ok(())
}

pub(crate) fn check_parameters_norm(
    config: &TrainingConfig,
    norm: f64,
    log: &mut dyn Write,
) -> Result<()> {
    if norm > config.error_parameters_norm() {
        return Err(TrainingError::ParametersNormTooLarge {
            norm,
            limit: config.error_parameters_norm(),
        });
    }
    if norm > config.warning_parameters_norm() {
        trainlog!(
            log,
            config.display(),
            "Warning: parameters norm {} is above {}.",
            norm,
            config.warning_parameters_norm()
        );
    }
    Ok(())
}

fn check_gradient_norm(config: &TrainingConfig, norm: f64, log: &mut dyn Write) -> Result<()> {
    if norm > config.error_gradient_norm() {
        return Err(TrainingError::GradientNormTooLarge {
            norm,
            limit: config.error_gradient_norm(),
        });
    }
    if norm > config.warning_gradient_norm() {
        trainlog!(
            log,
            config.display(),
            "Warning: gradient norm {} is above {}.",
            norm,
            config.warning_gradient_norm()
        );
    }
    Ok(())
}

/// The shared loop: direction, line search, accept, record, stop.
pub(crate) fn train_along<P, D>(
    name: &str,
    config: &TrainingConfig,
    rule: &mut D,
    pro: &mut P,
    history: &mut TrainingHistory,
    log: &mut dyn Write,
    monitor: &mut dyn FnMut(&EpochReport) -> ControlFlow<()>,
) -> Result<TrainingResults>
where
    P: ObjectiveFunctional + ?Sized,
    D: DirectionRule,
{
    let start = Instant::now();
    let display = config.display();
    let criteria = StoppingCriteria::from_config(config);
    let ls = LineSearch::from_config(config);
    *history = TrainingHistory::new(config.reserve(), Some(config.maximum_epochs()));

    let n = pro.parameter_count();
    let mut parameters = pro.parameters();
    check_parameter_count(n, parameters.len())?;
    let mut evaluation = pro.evaluate(&parameters);
    let mut gradient = pro.gradient();
    check_parameter_count(n, gradient.len())?;
    let mut validation_error = pro.validation_error();
    rule.initialize(&*pro)?;

    trainlog!(log, display, "Training with {}.", name);
    trainlog!(log, display, "initial evaluation" => evaluation);

    if config.maximum_epochs() == 0 {
        let condition = StopCondition::MaximumEpochsReached;
        trainlog!(log, display, "Epoch 0: {}", condition);
        return Ok(TrainingResults {
            stop_condition: condition,
            epochs: 0,
            gradient_norm: gradient.norm(),
            parameters,
            evaluation,
            elapsed: start.elapsed(),
        });
    }

    let mut training_rate = config.first_training_rate();
    let mut epoch = 0;
    loop {
        check_parameters_norm(config, parameters.norm(), log)?;
        check_gradient_norm(config, gradient.norm(), log)?;

        let mut direction = rule.direction(&*pro, &gradient, epoch)?;
        // not a descent direction, fall back to steepest descent
        if direction.dot(&gradient) >= 0.0 {
            direction = -&gradient;
        }

        let initial_rate = if epoch == 0 || training_rate <= 0.0 {
            config.first_training_rate()
        } else {
            training_rate
        };
        let (rate, new_evaluation) = if direction.iter().all(|d| *d == 0.0) {
            (0.0, evaluation)
        } else {
            ls.compute_step_logged(&*pro, &parameters, evaluation, &direction, initial_rate, log)?
        };
        training_rate = rate;

        let increment = &direction * rate;
        let new_parameters = &parameters + &increment;
        pro.set_parameters(&new_parameters);
        let new_gradient = pro.gradient();
        rule.update(&*pro, &direction, &increment, &gradient, &new_gradient)?;

        let previous_evaluation = evaluation;
        parameters = new_parameters;
        evaluation = new_evaluation;
        gradient = new_gradient;
        epoch += 1;
        let elapsed = start.elapsed();
        let new_validation_error = pro.validation_error();

        history.push_parameters(&parameters);
        history.push_evaluation(evaluation, new_validation_error);
        history.push_gradient(&gradient);
        history.push_inverse_hessian(rule.inverse_hessian());
        history.push_step(&direction, rate);
        history.push_elapsed_time(elapsed.as_secs_f64());

        let gradient_norm = gradient.norm();
        let mut stop = criteria.evaluate(
            epoch,
            elapsed,
            increment.norm(),
            evaluation,
            Some(previous_evaluation),
            gradient_norm,
        );
        if stop.is_none() && config.early_stopping() {
            if let (Some(old), Some(new)) = (validation_error, new_validation_error) {
                if new > old {
                    stop = Some(StopCondition::ValidationErrorIncrease);
                }
            }
        }
        validation_error = new_validation_error;

        let report = EpochReport {
            epoch,
            evaluation,
            gradient_norm,
            parameters_norm: parameters.norm(),
            training_rate: rate,
            elapsed,
        };
        if stop.is_none() && monitor(&report).is_break() {
            stop = Some(StopCondition::UserAbort);
        }

        if let Some(condition) = stop {
            trainlog!(log, display, "Epoch {}: {}", epoch, condition);
            trainlog!(log, display, "final evaluation" => evaluation);
            trainlog!(log, display, "final gradient norm" => gradient_norm);
            return Ok(TrainingResults {
                stop_condition: condition,
                epochs: epoch,
                parameters,
                evaluation,
                gradient_norm,
                elapsed,
            });
        }

        if epoch % config.display_period() == 0 {
            trainlog!(
                log,
                display,
                "Epoch {}; evaluation: {}; gradient norm: {}; training rate: {}",
                epoch,
                evaluation,
                gradient_norm,
                rate
            );
        }
    }
}
