use na::{DMatrix, DVector};
use nalgebra as na;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use optimization::ObjectiveFunctional;

// share of the samples held out for validation
const VALIDATION_SHARE: f64 = 0.2;
const NOISE: f64 = 0.05;

/// Single layer linear perceptron `y = Wx + b` trained for mean squared error with optional
/// weight decay `λ‖θ‖²`.
///
/// Parameters are stored neuron by neuron: the input weights of output `o` followed by its
/// bias.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPerceptron {
    inputs: usize,
    outputs: usize,
    // design matrices carry a trailing column of ones for the bias
    training_inputs: DMatrix<f64>,
    training_targets: DMatrix<f64>,
    validation_inputs: DMatrix<f64>,
    validation_targets: DMatrix<f64>,
    weight_decay: f64,
    parameters: DVector<f64>,
}

impl LinearPerceptron {
    /// Samples a random linear map and `samples` noisy input/target pairs from it. A fifth
    /// of the samples is kept for the validation error.
    pub fn synthetic(inputs: usize, outputs: usize, samples: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = samples.max(2);
        let truth = DMatrix::from_fn(inputs + 1, outputs, |_, _| rng.gen_range(-1.0..1.0));
        let x = DMatrix::from_fn(samples, inputs + 1, |_, j| {
            if j == inputs {
                1.0
            } else {
                rng.gen_range(-1.0..1.0)
            }
        });
        let noise = DMatrix::from_fn(samples, outputs, |_, _| {
            let e: f64 = StandardNormal.sample(&mut rng);
            NOISE * e
        });
        let t = &x * &truth + noise;

        let validation = ((samples as f64 * VALIDATION_SHARE) as usize).max(1);
        let training = samples - validation;
        let parameters =
            DVector::from_fn((inputs + 1) * outputs, |_, _| rng.gen_range(-0.5..0.5));
        LinearPerceptron {
            inputs,
            outputs,
            training_inputs: x.rows(0, training).into_owned(),
            training_targets: t.rows(0, training).into_owned(),
            validation_inputs: x.rows(training, validation).into_owned(),
            validation_targets: t.rows(training, validation).into_owned(),
            weight_decay: 0.0,
            parameters,
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    fn weights(&self, parameters: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.inputs + 1, self.outputs, parameters.as_slice())
    }

    fn mean_squared_error(x: &DMatrix<f64>, t: &DMatrix<f64>, w: &DMatrix<f64>) -> f64 {
        (x * w - t).norm_squared() / x.nrows() as f64
    }
}

impl ObjectiveFunctional for LinearPerceptron {
    fn parameter_count(&self) -> usize {
        (self.inputs + 1) * self.outputs
    }

    fn parameters(&self) -> DVector<f64> {
        self.parameters.clone()
    }

    fn set_parameters(&mut self, parameters: &DVector<f64>) {
        self.parameters.copy_from(parameters);
    }

    fn evaluate(&self, parameters: &DVector<f64>) -> f64 {
        let w = self.weights(parameters);
        Self::mean_squared_error(&self.training_inputs, &self.training_targets, &w)
            + self.weight_decay * parameters.norm_squared()
    }

    fn gradient(&self) -> DVector<f64> {
        let x = &self.training_inputs;
        let w = self.weights(&self.parameters);
        let residual = x * &w - &self.training_targets;
        let g = x.transpose() * residual * (2.0 / x.nrows() as f64) + w * (2.0 * self.weight_decay);
        DVector::from_column_slice(g.as_slice())
    }

    /// Block diagonal, one `(inputs + 1)²` block per output neuron.
    fn hessian(&self) -> Option<DMatrix<f64>> {
        let x = &self.training_inputs;
        let m = self.inputs + 1;
        let block = x.transpose() * x * (2.0 / x.nrows() as f64)
            + DMatrix::identity(m, m) * (2.0 * self.weight_decay);
        let n = self.parameter_count();
        let mut h = DMatrix::zeros(n, n);
        for o in 0..self.outputs {
            h.slice_mut((o * m, o * m), (m, m)).copy_from(&block);
        }
        Some(h)
    }

    fn validation_error(&self) -> Option<f64> {
        let w = self.weights(&self.parameters);
        Some(Self::mean_squared_error(
            &self.validation_inputs,
            &self.validation_targets,
            &w,
        ))
    }
}
