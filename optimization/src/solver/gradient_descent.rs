use std::io::Write;
use std::ops::ControlFlow;

use na::DVector;
use nalgebra as na;

use super::training::{train_along, DirectionRule};
use super::{EpochReport, Optimizer, TrainingResults};
use crate::config::TrainingConfig;
use crate::error::Result;
use crate::history::TrainingHistory;
use crate::ObjectiveFunctional;

/// Steepest descent: the training direction is minus the gradient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientDescent {
    config: TrainingConfig,
    history: TrainingHistory,
}

impl GradientDescent {
    pub fn new(config: TrainingConfig) -> Self {
        GradientDescent {
            config,
            history: TrainingHistory::default(),
        }
    }
}

struct SteepestDescent;

impl DirectionRule for SteepestDescent {
    fn initialize<P: ObjectiveFunctional + ?Sized>(&mut self, _pro: &P) -> Result<()> {
        Ok(())
    }

    fn direction<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        _pro: &P,
        gradient: &DVector<f64>,
        _epoch: usize,
    ) -> Result<DVector<f64>> {
        Ok(-gradient)
    }
}

impl Optimizer for GradientDescent {
    fn name(&self) -> &'static str {
        "GradientDescent"
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
        pro: &mut P,
        log: &mut dyn Write,
        monitor: &mut dyn FnMut(&EpochReport) -> ControlFlow<()>,
    ) -> Result<TrainingResults> {
        train_along(
            self.name(),
            &self.config,
            &mut SteepestDescent,
            pro,
            &mut self.history,
            log,
            monitor,
        )
    }
}
