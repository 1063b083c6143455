//! One-dimensional minimization along a training direction.
mod bracketing;
mod brent;
mod fixed;
mod golden;

use std::io::Write;

use na::DVector;
use nalgebra as na;

use crate::config::{LineSearchKind, TrainingConfig};
use crate::error::Result;
use crate::ObjectiveFunctional;

pub use bracketing::Bracket;

/// Settings of the step-length search, taken from a [`TrainingConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearch {
    pub kind: LineSearchKind,
    pub bracketing_factor: f64,
    pub first_training_rate: f64,
    pub training_rate_tolerance: f64,
    pub warning_training_rate: f64,
    pub error_training_rate: f64,
    pub display: bool,
}

impl LineSearch {
    pub fn from_config(config: &TrainingConfig) -> Self {
        LineSearch {
            kind: config.line_search(),
            bracketing_factor: config.bracketing_factor(),
            first_training_rate: config.first_training_rate(),
            training_rate_tolerance: config.training_rate_tolerance(),
            warning_training_rate: config.warning_training_rate(),
            error_training_rate: config.error_training_rate(),
            display: config.display(),
        }
    }

    /// Training rate and the evaluation it gives, `f(x + rate * direction)`.
    ///
    /// `evaluation` is `f(x)`. Bracketing strategies never return an evaluation above it.
    pub fn compute_step<P: ObjectiveFunctional + ?Sized>(
        &self,
        pro: &P,
        current: &DVector<f64>,
        evaluation: f64,
        direction: &DVector<f64>,
        initial_rate: f64,
    ) -> Result<(f64, f64)> {
        self.compute_step_logged(
            pro,
            current,
            evaluation,
            direction,
            initial_rate,
            &mut std::io::sink(),
        )
    }

    /// Same as [`LineSearch::compute_step`], warnings go to `log`.
    pub fn compute_step_logged<P: ObjectiveFunctional + ?Sized>(
        &self,
        pro: &P,
        current: &DVector<f64>,
        evaluation: f64,
        direction: &DVector<f64>,
        initial_rate: f64,
        log: &mut dyn Write,
    ) -> Result<(f64, f64)> {
        let line = Line {
            pro,
            current,
            direction,
        };
        let initial_rate = if initial_rate.is_finite() && initial_rate > 0.0 {
            initial_rate
        } else {
            self.first_training_rate
        };
        match self.kind {
            LineSearchKind::Fixed => Ok(fixed::step(self, &line)),
            LineSearchKind::GoldenSection => {
                let bracket = self.bracket_with(&line, evaluation, initial_rate, log)?;
                Ok(golden::step(self, &line, evaluation, &bracket))
            }
            LineSearchKind::BrentMethod => {
                let bracket = self.bracket_with(&line, evaluation, initial_rate, log)?;
                Ok(brent::step(self, &line, evaluation, &bracket))
            }
        }
    }

    /// Interval `[0, right]` holding a minimum along `direction`.
    pub fn bracket<P: ObjectiveFunctional + ?Sized>(
        &self,
        pro: &P,
        current: &DVector<f64>,
        evaluation: f64,
        direction: &DVector<f64>,
        initial_rate: f64,
    ) -> Result<Bracket> {
        let line = Line {
            pro,
            current,
            direction,
        };
        self.bracket_with(&line, evaluation, initial_rate, &mut std::io::sink())
    }

    fn bracket_with<P: ObjectiveFunctional + ?Sized>(
        &self,
        line: &Line<P>,
        evaluation: f64,
        initial_rate: f64,
        log: &mut dyn Write,
    ) -> Result<Bracket> {
        bracketing::bracket(self, line, evaluation, initial_rate, log)
    }
}

/// The objective restricted to `current + rate * direction`.
pub(crate) struct Line<'a, P: ObjectiveFunctional + ?Sized> {
    pro: &'a P,
    current: &'a DVector<f64>,
    direction: &'a DVector<f64>,
}

impl<'a, P: ObjectiveFunctional + ?Sized> Line<'a, P> {
    #[inline]
    fn at(&self, rate: f64) -> f64 {
        self.pro.evaluate(&(self.current + self.direction * rate))
    }
}

/// Lowest evaluation among `(rate, evaluation)` points; earlier points win ties, NaN never wins.
fn best_of(points: &[(f64, f64)]) -> (f64, f64) {
    let mut best = points[0];
    for p in points.iter().skip(1) {
        if p.1 < best.1 || best.1.is_nan() {
            best = *p;
        }
    }
    best
}
