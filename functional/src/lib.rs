//! Objective functionals to train against: closed-form test functions and a linear
//! perceptron over synthetic data.
mod perceptron;
mod quadratic;
mod rosenbrock;

pub use perceptron::LinearPerceptron;
pub use quadratic::Quadratic;
pub use rosenbrock::Rosenbrock;
