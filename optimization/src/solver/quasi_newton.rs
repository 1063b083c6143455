use std::fmt;
use std::io::Write;
use std::ops::ControlFlow;
use std::str::FromStr;

use na::{DMatrix, DVector};
use nalgebra as na;

use super::training::{train_along, DirectionRule};
use super::{EpochReport, Optimizer, TrainingResults};
use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::history::TrainingHistory;
use crate::persist::TagDocument;
use crate::ObjectiveFunctional;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InverseHessianApproximationMethod {
    Dfp,
    Bfgs,
}

impl Default for InverseHessianApproximationMethod {
    fn default() -> Self {
        InverseHessianApproximationMethod::Bfgs
    }
}

impl fmt::Display for InverseHessianApproximationMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InverseHessianApproximationMethod::Dfp => write!(f, "DFP"),
            InverseHessianApproximationMethod::Bfgs => write!(f, "BFGS"),
        }
    }
}

impl FromStr for InverseHessianApproximationMethod {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "DFP" => Ok(InverseHessianApproximationMethod::Dfp),
            "BFGS" => Ok(InverseHessianApproximationMethod::Bfgs),
            other => Err(TrainingError::InvalidValue {
                tag: "InverseHessianApproximationMethod".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl InverseHessianApproximationMethod {
    pub fn update(
        &self,
        old: &DMatrix<f64>,
        parameters_increment: &DVector<f64>,
        gradient_increment: &DVector<f64>,
    ) -> DMatrix<f64> {
        match self {
            InverseHessianApproximationMethod::Dfp => {
                dfp_inverse_hessian(old, parameters_increment, gradient_increment)
            }
            InverseHessianApproximationMethod::Bfgs => {
                bfgs_inverse_hessian(old, parameters_increment, gradient_increment)
            }
        }
    }
}

#[inline]
fn negligible(value: f64, scale: f64) -> bool {
    !value.is_finite() || value.abs() <= f64::EPSILON * scale
}

/// Davidon-Fletcher-Powell update. Returns `old` unchanged when a denominator vanishes.
pub fn dfp_inverse_hessian(
    old: &DMatrix<f64>,
    dx: &DVector<f64>,
    dg: &DVector<f64>,
) -> DMatrix<f64> {
    let dx_dg = dx.dot(dg);
    let h_dg = old * dg;
    let dg_h_dg = dg.dot(&h_dg);
    if negligible(dx_dg, dx.norm() * dg.norm()) || negligible(dg_h_dg, dg.norm() * h_dg.norm()) {
        return old.clone();
    }
    let dg_h = dg.transpose() * old;
    old + dx * dx.transpose() / dx_dg - (&h_dg * dg_h) / dg_h_dg
}

/// Broyden-Fletcher-Goldfarb-Shanno update. Returns `old` unchanged when `dx·dg` vanishes.
pub fn bfgs_inverse_hessian(
    old: &DMatrix<f64>,
    dx: &DVector<f64>,
    dg: &DVector<f64>,
) -> DMatrix<f64> {
    let dx_dg = dx.dot(dg);
    if negligible(dx_dg, dx.norm() * dg.norm()) {
        return old.clone();
    }
    let h_dg = old * dg;
    let dg_h = dg.transpose() * old;
    let dg_h_dg = dg.dot(&h_dg);
    let dx_dxt = dx * dx.transpose();
    old + dx_dxt * ((1.0 + dg_h_dg / dx_dg) / dx_dg)
        - (dx * dg_h + h_dg * dx.transpose()) / dx_dg
}

/// Quasi-Newton method, the inverse Hessian is approximated from gradient differences
/// starting from the identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuasiNewtonMethod {
    config: TrainingConfig,
    history: TrainingHistory,
    method: InverseHessianApproximationMethod,
}

impl QuasiNewtonMethod {
    pub fn new(config: TrainingConfig) -> Self {
        QuasiNewtonMethod {
            config,
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: InverseHessianApproximationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn method(&self) -> InverseHessianApproximationMethod {
        self.method
    }
}

struct Approximation {
    method: InverseHessianApproximationMethod,
    inverse_hessian: DMatrix<f64>,
}

impl DirectionRule for Approximation {
    fn initialize<P: ObjectiveFunctional + ?Sized>(&mut self, p: &P) -> Result<()> {
        let n = p.parameter_count();
        self.inverse_hessian = DMatrix::identity(n, n);
        Ok(())
    }

    fn direction<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        _p: &P,
        g: &DVector<f64>,
        _epoch: usize,
    ) -> Result<DVector<f64>> {
        Ok(-(&self.inverse_hessian * g))
    }

    fn update<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        _p: &P,
        _direction: &DVector<f64>,
        increment: &DVector<f64>,
        old_gradient: &DVector<f64>,
        gradient: &DVector<f64>,
    ) -> Result<()> {
        let dg = gradient - old_gradient;
        self.inverse_hessian = self.method.update(&self.inverse_hessian, increment, &dg);
        Ok(())
    }

    fn inverse_hessian(&self) -> Option<&DMatrix<f64>> {
        Some(&self.inverse_hessian)
    }
}

impl Optimizer for QuasiNewtonMethod {
    fn name(&self) -> &'static str {
        "QuasiNewtonMethod"
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
        let mut rule = Approximation {
            method: self.method,
            inverse_hessian: DMatrix::zeros(0, 0),
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
        doc.push("InverseHessianApproximationMethod", self.method);
    }

    fn read_settings(&mut self, doc: &TagDocument) -> Result<()> {
        if let Some(method) = doc.value("InverseHessianApproximationMethod")? {
            self.method = method;
        }
        Ok(())
    }
}
