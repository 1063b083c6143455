use std::fmt;
use std::io::Write;
use std::ops::ControlFlow;
use std::str::FromStr;

use na::DVector;
use nalgebra as na;

use super::training::{train_along, DirectionRule};
use super::{EpochReport, Optimizer, TrainingResults};
use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::history::TrainingHistory;
use crate::persist::TagDocument;
use crate::ObjectiveFunctional;

/// Formula for the conjugacy coefficient β.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConjugateDirectionMethod {
    /// `β = gᵀg / g_oldᵀg_old`
    FletcherReeves,
    /// `β = gᵀ(g - g_old) / g_oldᵀg_old`
    PolakRibiere,
    /// `β = gᵀ(g - g_old) / d_oldᵀ(g - g_old)`
    HestenesStiefel,
}

impl Default for ConjugateDirectionMethod {
    fn default() -> Self {
        ConjugateDirectionMethod::PolakRibiere
    }
}

impl fmt::Display for ConjugateDirectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ConjugateDirectionMethod::FletcherReeves => "FletcherReeves",
            ConjugateDirectionMethod::PolakRibiere => "PolakRibiere",
            ConjugateDirectionMethod::HestenesStiefel => "HestenesStiefel",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ConjugateDirectionMethod {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "FletcherReeves" => Ok(ConjugateDirectionMethod::FletcherReeves),
            "PolakRibiere" => Ok(ConjugateDirectionMethod::PolakRibiere),
            "HestenesStiefel" => Ok(ConjugateDirectionMethod::HestenesStiefel),
            other => Err(TrainingError::InvalidValue {
                tag: "TrainingDirectionMethod".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl ConjugateDirectionMethod {
    /// β clamped to `[0, 1]`; zero when the formula is undefined.
    pub fn beta(
        &self,
        old_gradient: &DVector<f64>,
        gradient: &DVector<f64>,
        old_direction: &DVector<f64>,
    ) -> f64 {
        let beta = match self {
            ConjugateDirectionMethod::FletcherReeves => {
                gradient.norm_squared() / old_gradient.norm_squared()
            }
            ConjugateDirectionMethod::PolakRibiere => {
                gradient.dot(&(gradient - old_gradient)) / old_gradient.norm_squared()
            }
            ConjugateDirectionMethod::HestenesStiefel => {
                let y = gradient - old_gradient;
                gradient.dot(&y) / old_direction.dot(&y)
            }
        };
        if beta.is_finite() {
            beta.max(0.0).min(1.0)
        } else {
            0.0
        }
    }
}

/// Nonlinear conjugate gradient, restarted with steepest descent every `parameter_count`
/// epochs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConjugateGradient {
    config: TrainingConfig,
    history: TrainingHistory,
    method: ConjugateDirectionMethod,
}

impl ConjugateGradient {
    pub fn new(config: TrainingConfig) -> Self {
        ConjugateGradient {
            config,
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: ConjugateDirectionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn method(&self) -> ConjugateDirectionMethod {
        self.method
    }
}

struct Conjugacy {
    method: ConjugateDirectionMethod,
    restart: usize,
    // direction and gradient of the previous epoch
    previous: Option<(DVector<f64>, DVector<f64>)>,
}

impl DirectionRule for Conjugacy {
    fn initialize<P: ObjectiveFunctional + ?Sized>(&mut self, p: &P) -> Result<()> {
        self.restart = p.parameter_count().max(1);
        self.previous = None;
        Ok(())
    }

    fn direction<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        _p: &P,
        g: &DVector<f64>,
        epoch: usize,
    ) -> Result<DVector<f64>> {
        match &self.previous {
            Some((old_direction, old_gradient)) if epoch % self.restart != 0 => {
                let beta = self.method.beta(old_gradient, g, old_direction);
                Ok(old_direction * beta - g)
            }
            _ => Ok(-g),
        }
    }

    fn update<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        _p: &P,
        direction: &DVector<f64>,
        _increment: &DVector<f64>,
        old_gradient: &DVector<f64>,
        _gradient: &DVector<f64>,
    ) -> Result<()> {
        self.previous = Some((direction.clone(), old_gradient.clone()));
        Ok(())
    }
}

impl Optimizer for ConjugateGradient {
    fn name(&self) -> &'static str {
        "ConjugateGradient"
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
        let mut rule = Conjugacy {
            method: self.method,
            restart: 1,
            previous: None,
        };
        train_along(
            self.name(),
            &self.config,
            &mut rule,
            p,
            &mut self.history,
            log,
            monitor,
        )
    }

    fn write_settings(&self, doc: &mut TagDocument) {
        doc.push("TrainingDirectionMethod", self.method);
    }

    fn read_settings(&mut self, doc: &TagDocument) -> Result<()> {
        if let Some(method) = doc.value("TrainingDirectionMethod")? {
            self.method = method;
        }
        Ok(())
    }
}
