//! Per-epoch training history. Only reserved columns are allocated; the others stay `None`.
use std::path::Path;

use na::{DMatrix, DVector};
use nalgebra as na;

use crate::config::{HistoryField, HistoryReservation};
use crate::error::Result;
use crate::persist::TagDocument;

// upper bound for the up-front reservation, longer runs just grow
const MAX_PRESIZE: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingHistory {
    parameters: Option<Vec<DVector<f64>>>,
    parameters_norm: Option<Vec<f64>>,
    evaluation: Option<Vec<f64>>,
    validation_error: Option<Vec<f64>>,
    gradient: Option<Vec<DVector<f64>>>,
    gradient_norm: Option<Vec<f64>>,
    inverse_hessian: Option<Vec<DMatrix<f64>>>,
    training_direction: Option<Vec<DVector<f64>>>,
    training_rate: Option<Vec<f64>>,
    elapsed_time: Option<Vec<f64>>,
    mean_evaluation: Option<Vec<f64>>,
    standard_deviation_evaluation: Option<Vec<f64>>,
}

fn column<T>(reserve: &HistoryReservation, field: HistoryField, size: usize) -> Option<Vec<T>> {
    if reserve.is_reserved(field) {
        Some(Vec::with_capacity(size))
    } else {
        None
    }
}

#[inline]
fn push<T, F: FnOnce() -> T>(column: &mut Option<Vec<T>>, value: F) {
    if let Some(c) = column {
        c.push(value());
    }
}

impl TrainingHistory {
    /// Allocates the reserved columns, pre-sized for `epochs` entries when the length is known.
    pub fn new(reserve: &HistoryReservation, epochs: Option<usize>) -> Self {
        let size = epochs.unwrap_or(0).min(MAX_PRESIZE);
        TrainingHistory {
            parameters: column(reserve, HistoryField::Parameters, size),
            parameters_norm: column(reserve, HistoryField::ParametersNorm, size),
            evaluation: column(reserve, HistoryField::Evaluation, size),
            validation_error: column(reserve, HistoryField::ValidationError, size),
            gradient: column(reserve, HistoryField::Gradient, size),
            gradient_norm: column(reserve, HistoryField::GradientNorm, size),
            inverse_hessian: column(reserve, HistoryField::InverseHessian, size),
            training_direction: column(reserve, HistoryField::TrainingDirection, size),
            training_rate: column(reserve, HistoryField::TrainingRate, size),
            elapsed_time: column(reserve, HistoryField::ElapsedTime, size),
            mean_evaluation: column(reserve, HistoryField::MeanEvaluation, size),
            standard_deviation_evaluation: column(
                reserve,
                HistoryField::StandardDeviationEvaluation,
                size,
            ),
        }
    }

    pub fn is_reserved(&self, field: HistoryField) -> bool {
        match field {
            HistoryField::Parameters => self.parameters.is_some(),
            HistoryField::ParametersNorm => self.parameters_norm.is_some(),
            HistoryField::Evaluation => self.evaluation.is_some(),
            HistoryField::ValidationError => self.validation_error.is_some(),
            HistoryField::Gradient => self.gradient.is_some(),
            HistoryField::GradientNorm => self.gradient_norm.is_some(),
            HistoryField::InverseHessian => self.inverse_hessian.is_some(),
            HistoryField::TrainingDirection => self.training_direction.is_some(),
            HistoryField::TrainingRate => self.training_rate.is_some(),
            HistoryField::ElapsedTime => self.elapsed_time.is_some(),
            HistoryField::MeanEvaluation => self.mean_evaluation.is_some(),
            HistoryField::StandardDeviationEvaluation => {
                self.standard_deviation_evaluation.is_some()
            }
        }
    }

    /// Number of entries recorded for `field`, zero when not reserved.
    pub fn len(&self, field: HistoryField) -> usize {
        fn n<T>(c: &Option<Vec<T>>) -> usize {
            c.as_ref().map_or(0, Vec::len)
        }
        match field {
            HistoryField::Parameters => n(&self.parameters),
            HistoryField::ParametersNorm => n(&self.parameters_norm),
            HistoryField::Evaluation => n(&self.evaluation),
            HistoryField::ValidationError => n(&self.validation_error),
            HistoryField::Gradient => n(&self.gradient),
            HistoryField::GradientNorm => n(&self.gradient_norm),
            HistoryField::InverseHessian => n(&self.inverse_hessian),
            HistoryField::TrainingDirection => n(&self.training_direction),
            HistoryField::TrainingRate => n(&self.training_rate),
            HistoryField::ElapsedTime => n(&self.elapsed_time),
            HistoryField::MeanEvaluation => n(&self.mean_evaluation),
            HistoryField::StandardDeviationEvaluation => n(&self.standard_deviation_evaluation),
        }
    }

    pub fn parameters(&self) -> Option<&[DVector<f64>]> {
        self.parameters.as_deref()
    }
    pub fn parameters_norm(&self) -> Option<&[f64]> {
        self.parameters_norm.as_deref()
    }
    pub fn evaluation(&self) -> Option<&[f64]> {
        self.evaluation.as_deref()
    }
    pub fn validation_error(&self) -> Option<&[f64]> {
        self.validation_error.as_deref()
    }
    pub fn gradient(&self) -> Option<&[DVector<f64>]> {
        self.gradient.as_deref()
    }
    pub fn gradient_norm(&self) -> Option<&[f64]> {
        self.gradient_norm.as_deref()
    }
    pub fn inverse_hessian(&self) -> Option<&[DMatrix<f64>]> {
        self.inverse_hessian.as_deref()
    }
    pub fn training_direction(&self) -> Option<&[DVector<f64>]> {
        self.training_direction.as_deref()
    }
    pub fn training_rate(&self) -> Option<&[f64]> {
        self.training_rate.as_deref()
    }
    /// Seconds since the start of training.
    pub fn elapsed_time(&self) -> Option<&[f64]> {
        self.elapsed_time.as_deref()
    }
    pub fn mean_evaluation(&self) -> Option<&[f64]> {
        self.mean_evaluation.as_deref()
    }
    pub fn standard_deviation_evaluation(&self) -> Option<&[f64]> {
        self.standard_deviation_evaluation.as_deref()
    }

    pub(crate) fn push_parameters(&mut self, parameters: &DVector<f64>) {
        push(&mut self.parameters, || parameters.clone());
        push(&mut self.parameters_norm, || parameters.norm());
    }

    pub(crate) fn push_evaluation(&mut self, evaluation: f64, validation_error: Option<f64>) {
        push(&mut self.evaluation, || evaluation);
        if let Some(v) = validation_error {
            push(&mut self.validation_error, || v);
        }
    }

    pub(crate) fn push_gradient(&mut self, gradient: &DVector<f64>) {
        push(&mut self.gradient, || gradient.clone());
        push(&mut self.gradient_norm, || gradient.norm());
    }

    pub(crate) fn push_inverse_hessian(&mut self, inverse_hessian: Option<&DMatrix<f64>>) {
        if let Some(h) = inverse_hessian {
            push(&mut self.inverse_hessian, || h.clone());
        }
    }

    pub(crate) fn push_step(&mut self, direction: &DVector<f64>, training_rate: f64) {
        push(&mut self.training_direction, || direction.clone());
        push(&mut self.training_rate, || training_rate);
    }

    pub(crate) fn push_elapsed_time(&mut self, seconds: f64) {
        push(&mut self.elapsed_time, || seconds);
    }

    pub(crate) fn push_population(&mut self, mean: f64, standard_deviation: f64) {
        push(&mut self.mean_evaluation, || mean);
        push(&mut self.standard_deviation_evaluation, || standard_deviation);
    }

    /// One `<FieldHistory>` element per reserved column, one line per epoch.
    pub fn to_document(&self) -> TagDocument {
        let mut doc = TagDocument::new("TrainingHistory", None);
        for field in HistoryField::ALL.iter() {
            if let Some(lines) = self.lines(*field) {
                doc.push(&format!("{}History", field.name()), lines.join("\n"));
            }
        }
        doc
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_document().save(path)
    }

    fn lines(&self, field: HistoryField) -> Option<Vec<String>> {
        fn scalars(c: &Option<Vec<f64>>) -> Option<Vec<String>> {
            c.as_ref().map(|v| v.iter().map(f64::to_string).collect())
        }
        fn vectors(c: &Option<Vec<DVector<f64>>>) -> Option<Vec<String>> {
            c.as_ref()
                .map(|v| v.iter().map(|x| join(x.iter())).collect())
        }
        match field {
            HistoryField::Parameters => vectors(&self.parameters),
            HistoryField::ParametersNorm => scalars(&self.parameters_norm),
            HistoryField::Evaluation => scalars(&self.evaluation),
            HistoryField::ValidationError => scalars(&self.validation_error),
            HistoryField::Gradient => vectors(&self.gradient),
            HistoryField::GradientNorm => scalars(&self.gradient_norm),
            // row-major
            HistoryField::InverseHessian => self
                .inverse_hessian
                .as_ref()
                .map(|v| v.iter().map(|m| join(m.transpose().iter())).collect()),
            HistoryField::TrainingDirection => vectors(&self.training_direction),
            HistoryField::TrainingRate => scalars(&self.training_rate),
            HistoryField::ElapsedTime => scalars(&self.elapsed_time),
            HistoryField::MeanEvaluation => scalars(&self.mean_evaluation),
            HistoryField::StandardDeviationEvaluation => {
                scalars(&self.standard_deviation_evaluation)
            }
        }
    }
}

fn join<'a, I: Iterator<Item = &'a f64>>(values: I) -> String {
    values
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
