use na::{DMatrix, DVector};
use nalgebra as na;
use optimization::{ObjectiveFunctional, Result, TrainingError};

/// `f(x) = xᵀAx + bᵀx` with symmetric `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadratic {
    a: DMatrix<f64>,
    b: DVector<f64>,
    x: DVector<f64>,
}

impl Quadratic {
    /// Parameters start at zero. `a` is symmetrized.
    pub fn new(a: DMatrix<f64>, b: DVector<f64>) -> Result<Self> {
        let n = b.len();
        if a.nrows() != n || a.ncols() != n {
            return Err(TrainingError::ParameterCountMismatch {
                expected: n,
                found: a.nrows().max(a.ncols()),
            });
        }
        let a = (&a + a.transpose()) * 0.5;
        Ok(Quadratic {
            a,
            b,
            x: DVector::zeros(n),
        })
    }

    /// `xᵀx` starting from the all-ones vector.
    pub fn sum_squares(n: usize) -> Self {
        Quadratic {
            a: DMatrix::identity(n, n),
            b: DVector::zeros(n),
            x: DVector::from_element(n, 1.0),
        }
    }

    pub fn with_parameters(mut self, x: DVector<f64>) -> Result<Self> {
        if x.len() != self.b.len() {
            return Err(TrainingError::ParameterCountMismatch {
                expected: self.b.len(),
                found: x.len(),
            });
        }
        self.x = x;
        Ok(self)
    }
}

impl ObjectiveFunctional for Quadratic {
    fn parameter_count(&self) -> usize {
        self.b.len()
    }

    fn parameters(&self) -> DVector<f64> {
        self.x.clone()
    }

    fn set_parameters(&mut self, parameters: &DVector<f64>) {
        self.x.copy_from(parameters);
    }

    fn evaluate(&self, x: &DVector<f64>) -> f64 {
        x.dot(&(&self.a * x)) + self.b.dot(x)
    }

    fn gradient(&self) -> DVector<f64> {
        &self.a * &self.x * 2.0 + &self.b
    }

    fn hessian(&self) -> Option<DMatrix<f64>> {
        Some(&self.a * 2.0)
    }
}
