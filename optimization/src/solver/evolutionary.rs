use std::fmt;
use std::io::Write;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::time::Instant;

use na::DVector;
use nalgebra as na;
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};

use super::training::{check_parameter_count, check_parameters_norm};
use super::{EpochReport, Optimizer, TrainingResults};
use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::history::TrainingHistory;
use crate::persist::TagDocument;
use crate::stopping::{StopCondition, StoppingCriteria};
use crate::ObjectiveFunctional;

macro_rules! named_enum {
    ($name:ident, $tag:literal, $default:ident, [$($variant:ident),+]) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                let name = match self {
                    $($name::$variant => stringify!($variant)),+
                };
                write!(f, "{}", name)
            }
        }

        impl FromStr for $name {
            type Err = TrainingError;

            fn from_str(s: &str) -> Result<Self> {
                let s = s.trim();
                $(
                    if s == stringify!($variant) {
                        return Ok($name::$variant);
                    }
                )+
                Err(TrainingError::InvalidValue {
                    tag: $tag.to_string(),
                    value: s.to_string(),
                })
            }
        }
    };
}

named_enum!(FitnessAssignmentMethod, "FitnessAssignmentMethod", LinearRanking, [LinearRanking]);
named_enum!(
    SelectionMethod,
    "SelectionMethod",
    RouletteWheel,
    [RouletteWheel, StochasticUniversalSampling]
);
named_enum!(RecombinationMethod, "RecombinationMethod", Intermediate, [Intermediate, Line]);
named_enum!(MutationMethod, "MutationMethod", Normal, [Normal, Uniform]);

/// Population based search. Needs only evaluations of the objective, no derivatives and no
/// line search.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionaryAlgorithm {
    config: TrainingConfig,
    history: TrainingHistory,
    population_size: usize,
    fitness_assignment: FitnessAssignmentMethod,
    selection: SelectionMethod,
    recombination: RecombinationMethod,
    mutation: MutationMethod,
    selective_pressure: f64,
    recombination_size: f64,
    mutation_rate: f64,
    mutation_range: f64,
    initialization_range: f64,
    elitism: bool,
    seed: Option<u64>,
}

impl Default for EvolutionaryAlgorithm {
    fn default() -> Self {
        EvolutionaryAlgorithm {
            config: TrainingConfig::default(),
            history: TrainingHistory::default(),
            population_size: 20,
            fitness_assignment: FitnessAssignmentMethod::default(),
            selection: SelectionMethod::default(),
            recombination: RecombinationMethod::default(),
            mutation: MutationMethod::default(),
            selective_pressure: 1.5,
            recombination_size: 0.25,
            mutation_rate: 0.1,
            mutation_range: 0.1,
            initialization_range: 1.0,
            elitism: true,
            seed: None,
        }
    }
}

fn invalid(field: &'static str, value: f64, reason: &'static str) -> TrainingError {
    TrainingError::InvalidConfig {
        field,
        value,
        reason,
    }
}

impl EvolutionaryAlgorithm {
    pub fn new(config: TrainingConfig) -> Self {
        EvolutionaryAlgorithm {
            config,
            ..Default::default()
        }
    }

    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }
    pub fn with_fitness_assignment(mut self, method: FitnessAssignmentMethod) -> Self {
        self.fitness_assignment = method;
        self
    }
    pub fn with_selection(mut self, method: SelectionMethod) -> Self {
        self.selection = method;
        self
    }
    pub fn with_recombination(mut self, method: RecombinationMethod) -> Self {
        self.recombination = method;
        self
    }
    pub fn with_mutation(mut self, method: MutationMethod) -> Self {
        self.mutation = method;
        self
    }
    pub fn with_selective_pressure(mut self, pressure: f64) -> Self {
        self.selective_pressure = pressure;
        self
    }
    pub fn with_recombination_size(mut self, size: f64) -> Self {
        self.recombination_size = size;
        self
    }
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }
    pub fn with_mutation_range(mut self, range: f64) -> Self {
        self.mutation_range = range;
        self
    }
    pub fn with_initialization_range(mut self, range: f64) -> Self {
        self.initialization_range = range;
        self
    }
    pub fn with_elitism(mut self, elitism: bool) -> Self {
        self.elitism = elitism;
        self
    }
    /// Fixed seed for reproducible runs; without one the thread RNG is used.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }
    pub fn selection(&self) -> SelectionMethod {
        self.selection
    }
    pub fn recombination(&self) -> RecombinationMethod {
        self.recombination
    }
    pub fn mutation(&self) -> MutationMethod {
        self.mutation
    }
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn validate(&self) -> Result<()> {
        if self.population_size < 4 || self.population_size % 2 != 0 {
            return Err(invalid(
                "population_size",
                self.population_size as f64,
                "must be even and at least 4",
            ));
        }
        if !(1.0..=2.0).contains(&self.selective_pressure) {
            return Err(invalid(
                "selective_pressure",
                self.selective_pressure,
                "must lie in [1, 2]",
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(invalid(
                "mutation_rate",
                self.mutation_rate,
                "must lie in [0, 1]",
            ));
        }
        let ranges = [
            ("recombination_size", self.recombination_size),
            ("mutation_range", self.mutation_range),
            ("initialization_range", self.initialization_range),
        ];
        for (field, value) in ranges.iter() {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(invalid(*field, *value, "must be non-negative and finite"));
            }
        }
        Ok(())
    }

    /// Linear ranking, the best individual gets `selective_pressure`, the worst
    /// `2 - selective_pressure`. NaN evaluations rank last.
    fn fitness(&self, evaluations: &[f64]) -> Vec<f64> {
        let size = evaluations.len();
        let mut order: Vec<usize> = (0..size).collect();
        order.sort_by(|a, b| rank_key(evaluations[*a]).total_cmp(&rank_key(evaluations[*b])));
        let sp = self.selective_pressure;
        let mut fitness = vec![0.0; size];
        match self.fitness_assignment {
            FitnessAssignmentMethod::LinearRanking => {
                for (position, i) in order.iter().enumerate() {
                    let rank = (size - 1 - position) as f64;
                    fitness[*i] = 2.0 - sp + 2.0 * (sp - 1.0) * rank / (size - 1) as f64;
                }
            }
        }
        fitness
    }

    fn select(&self, fitness: &[f64], count: usize, rng: &mut dyn RngCore) -> Vec<usize> {
        let total: f64 = fitness.iter().sum();
        let mut cumulative = Vec::with_capacity(fitness.len());
        let mut sum = 0.0;
        for f in fitness {
            sum += f;
            cumulative.push(sum);
        }
        let pick = |pointer: f64| {
            cumulative
                .iter()
                .position(|c| *c >= pointer)
                .unwrap_or(fitness.len() - 1)
        };
        match self.selection {
            SelectionMethod::RouletteWheel => (0..count)
                .map(|_| pick(rng.gen::<f64>() * total))
                .collect(),
            SelectionMethod::StochasticUniversalSampling => {
                let step = total / count as f64;
                let start = rng.gen::<f64>() * step;
                (0..count).map(|k| pick(start + k as f64 * step)).collect()
            }
        }
    }

    fn recombine(
        &self,
        father: &DVector<f64>,
        mother: &DVector<f64>,
        rng: &mut dyn RngCore,
    ) -> DVector<f64> {
        let d = self.recombination_size;
        match self.recombination {
            RecombinationMethod::Intermediate => DVector::from_iterator(
                father.len(),
                father
                    .iter()
                    .zip(mother.iter())
                    .map(|(f, m)| f + rng.gen_range(-d..=1.0 + d) * (m - f)),
            ),
            RecombinationMethod::Line => {
                let a = rng.gen_range(-d..=1.0 + d);
                father + (mother - father) * a
            }
        }
    }

    fn mutate(
        &self,
        individual: &mut DVector<f64>,
        normal: &Normal<f64>,
        rng: &mut dyn RngCore,
    ) {
        let range = self.mutation_range;
        for gene in individual.iter_mut() {
            if rng.gen::<f64>() < self.mutation_rate {
                *gene += match self.mutation {
                    MutationMethod::Normal => normal.sample(rng),
                    MutationMethod::Uniform => rng.gen_range(-range..=range),
                };
            }
        }
    }
}

fn rank_key(evaluation: f64) -> f64 {
    if evaluation.is_nan() {
        f64::INFINITY
    } else {
        evaluation
    }
}

fn best_index(evaluations: &[f64]) -> usize {
    let mut best = 0;
    for (i, e) in evaluations.iter().enumerate() {
        if rank_key(*e) < rank_key(evaluations[best]) {
            best = i;
        }
    }
    best
}

fn mean_and_deviation(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

impl Optimizer for EvolutionaryAlgorithm {
    fn name(&self) -> &'static str {
        "EvolutionaryAlgorithm"
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
        self.validate()?;
        let start = Instant::now();
        let config = self.config.clone();
        let display = config.display();
        let criteria = StoppingCriteria::from_config(&config);
        self.history = TrainingHistory::new(config.reserve(), Some(config.maximum_epochs()));
        let normal = Normal::new(0.0, self.mutation_range)
            .map_err(|_| invalid("mutation_range", self.mutation_range, "not a deviation"))?;
        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(thread_rng()),
        };

        let n = p.parameter_count();
        let origin = p.parameters();
        check_parameter_count(n, origin.len())?;

        let r = self.initialization_range;
        let mut population = Vec::with_capacity(self.population_size);
        population.push(origin.clone());
        for _ in 1..self.population_size {
            let noise = DVector::from_fn(n, |_, _| rng.gen_range(-r..=r));
            population.push(&origin + noise);
        }
        let mut evaluations: Vec<f64> = population.iter().map(|x| p.evaluate(x)).collect();
        let mut best = best_index(&evaluations);
        let mut validation_error = p.validation_error();

        trainlog!(log, display, "Training with {}.", self.name());
        trainlog!(log, display, "initial best evaluation" => evaluations[best]);

        let mut generation = 0;
        let mut stop = if config.maximum_epochs() == 0 {
            Some(StopCondition::MaximumEpochsReached)
        } else {
            None
        };
        while stop.is_none() {
            let fitness = self.fitness(&evaluations);
            let selected = self.select(&fitness, self.population_size / 2, &mut *rng);

            let mut offspring = Vec::with_capacity(self.population_size);
            if self.elitism {
                offspring.push(population[best].clone());
            }
            while offspring.len() < self.population_size {
                let father = selected[rng.gen_range(0..selected.len())];
                let mother = selected[rng.gen_range(0..selected.len())];
                let mut child = self.recombine(&population[father], &population[mother], &mut *rng);
                self.mutate(&mut child, &normal, &mut *rng);
                offspring.push(child);
            }
            population = offspring;
            evaluations = population.iter().map(|x| p.evaluate(x)).collect();
            best = best_index(&evaluations);

            let champion = &population[best];
            check_parameters_norm(&config, champion.norm(), log)?;
            p.set_parameters(champion);
            generation += 1;
            let elapsed = start.elapsed();
            let evaluation = evaluations[best];
            let new_validation_error = p.validation_error();
            let (mean, deviation) = mean_and_deviation(&evaluations);

            self.history.push_parameters(champion);
            self.history.push_evaluation(evaluation, new_validation_error);
            self.history.push_population(mean, deviation);
            self.history.push_elapsed_time(elapsed.as_secs_f64());

            stop = criteria.evaluate(
                generation,
                elapsed,
                f64::INFINITY,
                evaluation,
                None,
                f64::INFINITY,
            );
            if stop.is_none() && config.early_stopping() {
                if let (Some(old), Some(new)) = (validation_error, new_validation_error) {
                    if new > old {
                        stop = Some(StopCondition::ValidationErrorIncrease);
                    }
                }
            }
            validation_error = new_validation_error;

            let report = EpochReport {
                epoch: generation,
                evaluation,
                gradient_norm: f64::INFINITY,
                parameters_norm: champion.norm(),
                training_rate: 0.0,
                elapsed,
            };
            if stop.is_none() && monitor(&report).is_break() {
                stop = Some(StopCondition::UserAbort);
            }

            if stop.is_none() && generation % config.display_period() == 0 {
                trainlog!(
                    log,
                    display,
                    "Generation {}; best evaluation: {}; mean evaluation: {}; standard deviation: {}",
                    generation,
                    evaluation,
                    mean,
                    deviation
                );
            }
        }

        let parameters = population[best].clone();
        p.set_parameters(&parameters);
        let evaluation = evaluations[best];
        let gradient_norm = p.gradient().norm();
        // loop only exits with a condition
        let stop_condition = stop.unwrap_or(StopCondition::MaximumEpochsReached);
        trainlog!(log, display, "Generation {}: {}", generation, stop_condition);
        trainlog!(log, display, "final evaluation" => evaluation);
        Ok(TrainingResults {
            stop_condition,
            epochs: generation,
            parameters,
            evaluation,
            gradient_norm,
            elapsed: start.elapsed(),
        })
    }

    fn write_settings(&self, doc: &mut TagDocument) {
        doc.push("PopulationSize", self.population_size);
        doc.push("FitnessAssignmentMethod", self.fitness_assignment);
        doc.push("SelectionMethod", self.selection);
        doc.push("RecombinationMethod", self.recombination);
        doc.push("MutationMethod", self.mutation);
        doc.push("SelectivePressure", self.selective_pressure);
        doc.push("RecombinationSize", self.recombination_size);
        doc.push("MutationRate", self.mutation_rate);
        doc.push("MutationRange", self.mutation_range);
        doc.push("InitializationRange", self.initialization_range);
        doc.push_flag("Elitism", self.elitism);
        if let Some(seed) = self.seed {
            doc.push("Seed", seed);
        }
    }

    fn read_settings(&mut self, doc: &TagDocument) -> Result<()> {
        let mut s = self.clone();
        if let Some(v) = doc.value("PopulationSize")? {
            s.population_size = v;
        }
        if let Some(v) = doc.value("FitnessAssignmentMethod")? {
            s.fitness_assignment = v;
        }
        if let Some(v) = doc.value("SelectionMethod")? {
            s.selection = v;
        }
        if let Some(v) = doc.value("RecombinationMethod")? {
            s.recombination = v;
        }
        if let Some(v) = doc.value("MutationMethod")? {
            s.mutation = v;
        }
        if let Some(v) = doc.value("SelectivePressure")? {
            s.selective_pressure = v;
        }
        if let Some(v) = doc.value("RecombinationSize")? {
            s.recombination_size = v;
        }
        if let Some(v) = doc.value("MutationRate")? {
            s.mutation_rate = v;
        }
        if let Some(v) = doc.value("MutationRange")? {
            s.mutation_range = v;
        }
        if let Some(v) = doc.value("InitializationRange")? {
            s.initialization_range = v;
        }
        if let Some(v) = doc.flag("Elitism")? {
            s.elitism = v;
        }
        if let Some(v) = doc.value("Seed")? {
            s.seed = Some(v);
        }
        s.validate()?;
        *self = s;
        Ok(())
    }
}
