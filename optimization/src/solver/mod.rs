//! Training algorithms.
//!
//! The gradient-based ones share [`training::train_along`], which runs the
//! direction / line search / accept / record / stop loop and asks a [`training::DirectionRule`]
//! for the direction of each epoch.
mod conjugate_gradient;
mod evolutionary;
mod gradient_descent;
mod newton;
mod quasi_newton;
mod training;

use std::fmt;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;

use na::DVector;
use nalgebra as na;

use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::history::TrainingHistory;
use crate::persist::TagDocument;
use crate::stopping::StopCondition;
use crate::ObjectiveFunctional;

pub use conjugate_gradient::{ConjugateDirectionMethod, ConjugateGradient};
pub use evolutionary::{
    EvolutionaryAlgorithm, FitnessAssignmentMethod, MutationMethod, RecombinationMethod,
    SelectionMethod,
};
pub use gradient_descent::GradientDescent;
pub use newton::NewtonMethod;
pub use quasi_newton::{
    bfgs_inverse_hessian, dfp_inverse_hessian, InverseHessianApproximationMethod,
    QuasiNewtonMethod,
};

/// Outcome of one `train` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingResults {
    pub stop_condition: StopCondition,
    /// Completed epochs (generations for the evolutionary algorithm).
    pub epochs: usize,
    pub parameters: DVector<f64>,
    pub evaluation: f64,
    pub gradient_norm: f64,
    pub elapsed: Duration,
}

impl fmt::Display for TrainingResults {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.stop_condition)?;
        writeln!(f, "epochs : {}", self.epochs)?;
        writeln!(f, "evaluation : {}", self.evaluation)?;
        writeln!(f, "gradient norm : {}", self.gradient_norm)?;
        writeln!(f, "parameters norm : {}", self.parameters.norm())?;
        write!(f, "elapsed : {:?}", self.elapsed)
    }
}

/// State handed to the epoch callback of [`Optimizer::train_monitored`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub evaluation: f64,
    pub gradient_norm: f64,
    pub parameters_norm: f64,
    pub training_rate: f64,
    pub elapsed: Duration,
}

pub trait Optimizer {
    fn name(&self) -> &'static str;

    fn config(&self) -> &TrainingConfig;

    fn configure(&mut self, config: TrainingConfig);

    /// History of the last `train` call.
    fn history(&self) -> &TrainingHistory;

    /// Runs to a stop condition or a fatal error. `pro` is borrowed exclusively for the whole
    /// run and holds the last accepted parameters afterwards, also when an error is returned.
    /// `monitor` is called after every epoch; `ControlFlow::Break` stops with
    /// [`StopCondition::UserAbort`].
    fn train_monitored<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        pro: &mut P,
        log: &mut dyn Write,
        monitor: &mut dyn FnMut(&EpochReport) -> ControlFlow<()>,
    ) -> Result<TrainingResults>;

    fn train_with_log<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        pro: &mut P,
        log: &mut dyn Write,
    ) -> Result<TrainingResults> {
        self.train_monitored(pro, log, &mut |_| ControlFlow::Continue(()))
    }

    /// Trains with progress written to standard output.
    fn train<P: ObjectiveFunctional + ?Sized>(&mut self, pro: &mut P) -> Result<TrainingResults> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.train_with_log(pro, &mut handle)
    }

    /// Algorithm specific settings, on top of the configuration tags.
    fn write_settings(&self, _doc: &mut TagDocument) {}

    fn read_settings(&mut self, _doc: &TagDocument) -> Result<()> {
        Ok(())
    }

    fn to_document(&self) -> TagDocument {
        let mut doc = TagDocument::new("TrainingAlgorithm", Some(self.name()));
        self.config().write_tags(&mut doc);
        self.write_settings(&mut doc);
        doc
    }

    /// Loads every recognized tag of `doc`; the configuration is replaced only when all of it
    /// is valid.
    fn read_document(&mut self, doc: &TagDocument) -> Result<()> {
        let config = self.config().read_tags(doc)?;
        self.read_settings(doc)?;
        self.configure(config);
        Ok(())
    }

    fn save<Q: AsRef<Path>>(&self, path: Q) -> Result<()> {
        self.to_document().save(path)
    }
}

/// The closed family of training algorithms.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingAlgorithm {
    GradientDescent(GradientDescent),
    NewtonMethod(NewtonMethod),
    QuasiNewtonMethod(QuasiNewtonMethod),
    ConjugateGradient(ConjugateGradient),
    EvolutionaryAlgorithm(EvolutionaryAlgorithm),
}

macro_rules! dispatch {
    ($self:expr, $alg:ident => $body:expr) => {
        match $self {
            TrainingAlgorithm::GradientDescent($alg) => $body,
            TrainingAlgorithm::NewtonMethod($alg) => $body,
            TrainingAlgorithm::QuasiNewtonMethod($alg) => $body,
            TrainingAlgorithm::ConjugateGradient($alg) => $body,
            TrainingAlgorithm::EvolutionaryAlgorithm($alg) => $body,
        }
    };
}

impl TrainingAlgorithm {
    /// Default-configured algorithm for a class name as written in saved documents.
    pub fn from_class(class: &str) -> Result<Self> {
        match class {
            "GradientDescent" => Ok(GradientDescent::default().into()),
            "NewtonMethod" => Ok(NewtonMethod::default().into()),
            "QuasiNewtonMethod" => Ok(QuasiNewtonMethod::default().into()),
            "ConjugateGradient" => Ok(ConjugateGradient::default().into()),
            "EvolutionaryAlgorithm" => Ok(EvolutionaryAlgorithm::default().into()),
            other => Err(TrainingError::UnknownClass(other.to_string())),
        }
    }

    pub fn from_document(doc: &TagDocument) -> Result<Self> {
        let class = doc.class().ok_or_else(|| TrainingError::MalformedFile {
            line: 1,
            reason: "declaration has no class".to_string(),
        })?;
        let mut algorithm = Self::from_class(class)?;
        algorithm.read_document(doc)?;
        Ok(algorithm)
    }

    pub fn load<Q: AsRef<Path>>(path: Q) -> Result<Self> {
        Self::from_document(&TagDocument::load(path)?)
    }
}

impl Optimizer for TrainingAlgorithm {
    fn name(&self) -> &'static str {
        dispatch!(self, alg => alg.name())
    }

    fn config(&self) -> &TrainingConfig {
        dispatch!(self, alg => alg.config())
    }

    fn configure(&mut self, config: TrainingConfig) {
        dispatch!(self, alg => alg.configure(config))
    }

    fn history(&self) -> &TrainingHistory {
        dispatch!(self, alg => alg.history())
    }

    fn train_monitored<P: ObjectiveFunctional + ?Sized>(
        &mut self,
        pro: &mut P,
        log: &mut dyn Write,
        monitor: &mut dyn FnMut(&EpochReport) -> ControlFlow<()>,
    ) -> Result<TrainingResults> {
        dispatch!(self, alg => alg.train_monitored(pro, log, monitor))
    }

    fn write_settings(&self, doc: &mut TagDocument) {
        dispatch!(self, alg => alg.write_settings(doc))
    }

    fn read_settings(&mut self, doc: &TagDocument) -> Result<()> {
        dispatch!(self, alg => alg.read_settings(doc))
    }
}

macro_rules! impl_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for TrainingAlgorithm {
                fn from(alg: $variant) -> Self {
                    TrainingAlgorithm::$variant(alg)
                }
            }
        )*
    };
}

impl_from!(
    GradientDescent,
    NewtonMethod,
    QuasiNewtonMethod,
    ConjugateGradient,
    EvolutionaryAlgorithm
);
