use na::{DMatrix, DVector};
use nalgebra as na;

#[macro_use]
mod mymacro;

pub mod config;
pub mod error;
pub mod history;
pub mod linesearch;
pub mod persist;
pub mod solver;
pub mod stopping;

pub use config::{
    HistoryField, HistoryReservation, LineSearchKind, TrainingConfig, TrainingConfigBuilder,
};
pub use error::{Result, TrainingError};
pub use history::TrainingHistory;
pub use linesearch::{Bracket, LineSearch};
pub use persist::TagDocument;
pub use solver::{
    ConjugateDirectionMethod, ConjugateGradient, EpochReport, EvolutionaryAlgorithm,
    GradientDescent, InverseHessianApproximationMethod, NewtonMethod, Optimizer,
    QuasiNewtonMethod, TrainingAlgorithm, TrainingResults,
};
pub use stopping::{StopCondition, StoppingCriteria};

/// The function being minimized, together with the parameters it is defined over.
///
/// The optimizers only ever hold a mutable borrow of an implementor for the duration of one
/// `train` call; the parameter vector is written back after every accepted step.
pub trait ObjectiveFunctional {
    fn parameter_count(&self) -> usize;

    fn parameters(&self) -> DVector<f64>;

    fn set_parameters(&mut self, parameters: &DVector<f64>);

    /// Evaluation at `parameters` without touching the stored ones.
    fn evaluate(&self, parameters: &DVector<f64>) -> f64;

    fn evaluation(&self) -> f64 {
        self.evaluate(&self.parameters())
    }

    /// Gradient at the stored parameters.
    fn gradient(&self) -> DVector<f64>;

    fn hessian(&self) -> Option<DMatrix<f64>> {
        None
    }

    fn inverse_hessian(&self) -> Option<DMatrix<f64>> {
        self.hessian().and_then(|h| h.try_inverse())
    }

    /// Error on held-out data, used by early stopping.
    fn validation_error(&self) -> Option<f64> {
        None
    }
}

impl<T: ObjectiveFunctional + ?Sized> ObjectiveFunctional for Box<T> {
    fn parameter_count(&self) -> usize {
        (**self).parameter_count()
    }
    fn parameters(&self) -> DVector<f64> {
        (**self).parameters()
    }
    fn set_parameters(&mut self, parameters: &DVector<f64>) {
        (**self).set_parameters(parameters)
    }
    fn evaluate(&self, parameters: &DVector<f64>) -> f64 {
        (**self).evaluate(parameters)
    }
    fn evaluation(&self) -> f64 {
        (**self).evaluation()
    }
    fn gradient(&self) -> DVector<f64> {
        (**self).gradient()
    }
    fn hessian(&self) -> Option<DMatrix<f64>> {
        (**self).hessian()
    }
    fn inverse_hessian(&self) -> Option<DMatrix<f64>> {
        (**self).inverse_hessian()
    }
    fn validation_error(&self) -> Option<f64> {
        (**self).validation_error()
    }
}
