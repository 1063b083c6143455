use std::io::Write;
use std::ops::ControlFlow;

use na::{DMatrix, DVector};
use nalgebra as na;

use super::training::{train_along, DirectionRule};
use super::{EpochReport, Optimizer, TrainingResults};
use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::history::TrainingHistory;
use crate::ObjectiveFunctional;

/// Newton's method, direction `-H^-1 g` with the true Hessian of the objective.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewtonMethod {
    config: TrainingConfig,
    history: TrainingHistory,
}

impl NewtonMethod {
    pub fn new(config: TrainingConfig) -> Self {
        NewtonMethod {
            config,
            history: TrainingHistory::default(),
        }
    }
}

/// Inverse Hessian at the start point of the latest direction. The Hessian of the final
/// accepted point is never requested.
#[derive(Default)]
struct NewtonDirection {
    inverse_hessian: Option<DMatrix<f64>>,
}

fn inverse_hessian_of<P: ObjectiveFunctional + ?Sized>(p: &P) -> Result<DMatrix<f64>> {
    match p.inverse_hessian() {
        Some(h) => Ok(h),
        None if p.hessian().is_some() => Err(TrainingError::SingularHessian),
        None => Err(TrainingError::HessianUnavailable),
    }
}

impl DirectionRule for NewtonDirection {
    fn initialize<P: ObjectiveFunctional + ?Sized>(&mut self, _p: &P) -> Result<()> {
        self.inverse_hessian = None;
        Ok(())
    }

    fn direction<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        p: &P,
        g: &DVector<f64>,
        _epoch: usize,
    ) -> Result<DVector<f64>> {
        let h = inverse_hessian_of(p)?;
        let direction = -(&h * g);
        self.inverse_hessian = Some(h);
        Ok(direction)
    }

    fn inverse_hessian(&self) -> Option<&DMatrix<f64>> {
        self.inverse_hessian.as_ref()
    }
}

impl Optimizer for NewtonMethod {
    fn name(&self) -> &'static str {
        "NewtonMethod"
    }

    fn config(&self) -> &TrainingConfig {
        &self.config
    }

    fn configure(&mut self, config: TrainingConfig) {
        self.config = config;
    }

    fn history(&self) -> &TrainingHistory {
        &self.history
    }

    fn train_monitored<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        p: &mut P,
        log: &mut dyn Write,
        monitor: &mut dyn FnMut(&EpochReport) -> ControlFlow<()>,
    ) -> Result<TrainingResults> {
        train_along(
            self.name(),
            &self.config,
            &mut NewtonDirection::default(),
            p,
            &mut self.history,
            log,
            monitor,
        )
    }
}
