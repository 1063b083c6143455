use std::path::{Path, PathBuf};

use functional::{LinearPerceptron, Quadratic, Rosenbrock};
use optimization::{
    ConjugateGradient, EvolutionaryAlgorithm, GradientDescent, HistoryReservation,
    LineSearchKind, NewtonMethod, ObjectiveFunctional, Optimizer, QuasiNewtonMethod, Result,
    TrainingAlgorithm, TrainingConfig, TrainingResults,
};

// samples per perceptron input
const SAMPLES_PER_INPUT: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ProblemKind {
    SumSquares,
    Rosenbrock,
    Perceptron,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum AlgorithmKind {
    GradientDescent,
    Newton,
    QuasiNewton,
    ConjugateGradient,
    Evolutionary,
}

/// What the command line asked for.
pub struct Settings {
    pub problem: ProblemKind,
    pub dimension: usize,
    pub algorithm: AlgorithmKind,
    pub line_search: Option<LineSearchKind>,
    pub max_epochs: Option<usize>,
    pub gradient_norm_goal: f64,
    pub seed: u64,
    pub config: Option<PathBuf>,
    /// Where to write the training algorithm document after setup.
    pub save_config: Option<PathBuf>,
    /// Where to write the history; every field is recorded when set.
    pub history: Option<PathBuf>,
    pub quiet: bool,
}

/// Builds the scenario, saves its configuration, trains and saves the history.
pub fn execute(settings: &Settings) -> Result<TrainingResults> {
    let mut scenario = Scenario::new(settings)?;
    if let Some(path) = &settings.save_config {
        scenario.save_config(path)?;
    }
    let results = scenario.run()?;
    if let Some(path) = &settings.history {
        scenario.save_history(path)?;
    }
    Ok(results)
}

/// One objective and the algorithm that trains it.
pub struct Scenario {
    problem: Box<dyn ObjectiveFunctional>,
    algorithm: TrainingAlgorithm,
}

impl Scenario {
    pub fn new(settings: &Settings) -> Result<Self> {
        let problem = build_problem(settings.problem, settings.dimension, settings.seed);
        let mut algorithm = match &settings.config {
            Some(path) => TrainingAlgorithm::load(path)?,
            None => {
                let config = TrainingConfig::builder()
                    .with_gradient_norm_goal(settings.gradient_norm_goal)
                    .build()?;
                build_algorithm(settings.algorithm, config, settings.seed)
            }
        };

        let mut builder = algorithm.config().to_builder();
        if let Some(kind) = settings.line_search {
            builder = builder.with_line_search(kind);
        }
        if let Some(epochs) = settings.max_epochs {
            builder = builder.with_maximum_epochs(epochs);
        }
        if settings.history.is_some() {
            builder = builder.with_history(HistoryReservation::all());
        }
        if settings.quiet {
            builder = builder.with_display(false);
        }
        algorithm.configure(builder.build()?);

        Ok(Scenario { problem, algorithm })
    }

    pub fn run(&mut self) -> Result<TrainingResults> {
        self.algorithm.train(&mut self.problem)
    }

    pub fn save_config(&self, path: &Path) -> Result<()> {
        self.algorithm.save(path)
    }

    pub fn save_history(&self, path: &Path) -> Result<()> {
        self.algorithm.history().save(path)
    }
}

fn build_problem(kind: ProblemKind, dimension: usize, seed: u64) -> Box<dyn ObjectiveFunctional> {
    match kind {
        ProblemKind::SumSquares => Box::new(Quadratic::sum_squares(dimension)),
        ProblemKind::Rosenbrock => Box::new(Rosenbrock::new(dimension)),
        ProblemKind::Perceptron => Box::new(LinearPerceptron::synthetic(
            dimension,
            1,
            SAMPLES_PER_INPUT * dimension.max(1),
            seed,
        )),
    }
}

fn build_algorithm(kind: AlgorithmKind, config: TrainingConfig, seed: u64) -> TrainingAlgorithm {
    match kind {
        AlgorithmKind::GradientDescent => GradientDescent::new(config).into(),
        AlgorithmKind::Newton => NewtonMethod::new(config).into(),
        AlgorithmKind::QuasiNewton => QuasiNewtonMethod::new(config).into(),
        AlgorithmKind::ConjugateGradient => ConjugateGradient::new(config).into(),
        AlgorithmKind::Evolutionary => EvolutionaryAlgorithm::new(config).with_seed(seed).into(),
    }
}
