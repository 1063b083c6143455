use na::{DMatrix, DVector};
use nalgebra as na;

use optimization::ObjectiveFunctional;

/// `f(x) = Σ (1 - x_i)² + 100 (x_{i+1} - x_i²)²`, minimum 0 at the all-ones vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Rosenbrock {
    x: DVector<f64>,
}

impl Rosenbrock {
    /// Starts from the classic `(-1.2, 1, -1.2, 1, ...)`. At least two dimensions.
    pub fn new(n: usize) -> Self {
        let n = n.max(2);
        Rosenbrock {
            x: DVector::from_fn(n, |i, _| if i % 2 == 0 { -1.2 } else { 1.0 }),
        }
    }
}

impl ObjectiveFunctional for Rosenbrock {
    fn parameter_count(&self) -> usize {
        self.x.len()
    }

    fn parameters(&self) -> DVector<f64> {
        self.x.clone()
    }

    fn set_parameters(&mut self, parameters: &DVector<f64>) {
        self.x.copy_from(parameters);
    }

    fn evaluate(&self, x: &DVector<f64>) -> f64 {
        (0..x.len() - 1)
            .map(|i| (1.0 - x[i]).powi(2) + 100.0 * (x[i + 1] - x[i] * x[i]).powi(2))
            .sum()
    }

    fn gradient(&self) -> DVector<f64> {
        let x = &self.x;
        let mut g = DVector::zeros(x.len());
        for i in 0..x.len() - 1 {
            let r = x[i + 1] - x[i] * x[i];
            g[i] += -2.0 * (1.0 - x[i]) - 400.0 * x[i] * r;
            g[i + 1] += 200.0 * r;
        }
        g
    }

    fn hessian(&self) -> Option<DMatrix<f64>> {
        let x = &self.x;
        let n = x.len();
        let mut h = DMatrix::zeros(n, n);
        for i in 0..n - 1 {
            h[(i, i)] += 2.0 + 1200.0 * x[i] * x[i] - 400.0 * x[i + 1];
            h[(i, i + 1)] -= 400.0 * x[i];
            h[(i + 1, i)] -= 400.0 * x[i];
            h[(i + 1, i + 1)] += 200.0;
        }
        Some(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stationary_at_ones() {
        let mut r = Rosenbrock::new(4);
        r.set_parameters(&DVector::from_element(4, 1.0));
        assert_eq!(r.evaluation(), 0.0);
        assert_eq!(r.gradient().norm(), 0.0);
    }

    #[test]
    fn gradient_matches_central_differences() {
        let r = Rosenbrock::new(3);
        let x = r.parameters();
        let g = r.gradient();
        let h = 1e-6;
        for i in 0..3 {
            let mut e = DVector::zeros(3);
            e[i] = h;
            let fd = (r.evaluate(&(&x + &e)) - r.evaluate(&(&x - &e))) / (2.0 * h);
            assert!((fd - g[i]).abs() < 1e-4 * g[i].abs().max(1.0));
        }
    }
}
