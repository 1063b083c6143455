#![allow(dead_code)]
use nalgebra::{DMatrix, DVector};
use optimization::{ObjectiveFunctional, TrainingConfig};

/// `f(x) = Σ w_i x_i²`
pub struct Paraboloid {
    pub weights: DVector<f64>,
    pub x: DVector<f64>,
    pub with_hessian: bool,
    /// Validation error is `|x - target|²` when set.
    pub validation_target: Option<DVector<f64>>,
}

impl Paraboloid {
    pub fn sum_squares(x: &[f64]) -> Self {
        Self::weighted(&vec![1.0; x.len()], x)
    }

    pub fn weighted(weights: &[f64], x: &[f64]) -> Self {
        Paraboloid {
            weights: DVector::from_column_slice(weights),
            x: DVector::from_column_slice(x),
            with_hessian: true,
            validation_target: None,
        }
    }
}

impl ObjectiveFunctional for Paraboloid {
    fn parameter_count(&self) -> usize {
        self.x.len()
    }
    fn parameters(&self) -> DVector<f64> {
        self.x.clone()
    }
    fn set_parameters(&mut self, parameters: &DVector<f64>) {
        self.x = parameters.clone();
    }
    fn evaluate(&self, x: &DVector<f64>) -> f64 {
        x.component_mul(x).dot(&self.weights)
    }
    fn gradient(&self) -> DVector<f64> {
        self.x.component_mul(&self.weights) * 2.0
    }
    fn hessian(&self) -> Option<DMatrix<f64>> {
        if self.with_hessian {
            Some(DMatrix::from_diagonal(&(&self.weights * 2.0)))
        } else {
            None
        }
    }
    fn validation_error(&self) -> Option<f64> {
        self.validation_target
            .as_ref()
            .map(|t| (&self.x - t).norm_squared())
    }
}

/// Default configuration without progress output.
pub fn quiet() -> TrainingConfig {
    TrainingConfig::builder()
        .with_display(false)
        .build()
        .unwrap()
}
