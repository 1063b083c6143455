use std::fmt;
use std::time::Duration;

use crate::config::TrainingConfig;

/// Why a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    MinimumParameterIncrement,
    EvaluationGoalReached,
    ObjectiveImprovementBelowMinimum,
    GradientNormGoalReached,
    MaximumEpochsReached,
    MaximumTimeReached,
    ValidationErrorIncrease,
    UserAbort,
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match self {
            StopCondition::MinimumParameterIncrement => "Minimum parameters increment norm reached.",
            StopCondition::EvaluationGoalReached => "Evaluation goal reached.",
            StopCondition::ObjectiveImprovementBelowMinimum => {
                "Minimum evaluation improvement reached."
            }
            StopCondition::GradientNormGoalReached => "Gradient norm goal reached.",
            StopCondition::MaximumEpochsReached => "Maximum number of epochs reached.",
            StopCondition::MaximumTimeReached => "Maximum training time reached.",
            StopCondition::ValidationErrorIncrease => "Validation error increased.",
            StopCondition::UserAbort => "Training aborted by the user.",
        };
        write!(f, "{}", message)
    }
}

/// Thresholds checked once per epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct StoppingCriteria {
    pub minimum_parameters_increment_norm: f64,
    pub evaluation_goal: f64,
    pub minimum_evaluation_improvement: f64,
    pub gradient_norm_goal: f64,
    pub maximum_epochs: usize,
    /// Seconds.
    pub maximum_time: f64,
}

impl StoppingCriteria {
    pub fn from_config(config: &TrainingConfig) -> Self {
        StoppingCriteria {
            minimum_parameters_increment_norm: config.minimum_parameters_increment_norm(),
            evaluation_goal: config.evaluation_goal(),
            minimum_evaluation_improvement: config.minimum_evaluation_improvement(),
            gradient_norm_goal: config.gradient_norm_goal(),
            maximum_epochs: config.maximum_epochs(),
            maximum_time: config.maximum_time(),
        }
    }

    /// First matching condition, in this order: parameters increment, evaluation goal,
    /// evaluation improvement (only with a previous evaluation), gradient norm goal, epochs,
    /// time.
    pub fn evaluate(
        &self,
        epoch: usize,
        elapsed: Duration,
        parameters_increment_norm: f64,
        evaluation: f64,
        previous_evaluation: Option<f64>,
        gradient_norm: f64,
    ) -> Option<StopCondition> {
        if parameters_increment_norm <= self.minimum_parameters_increment_norm {
            return Some(StopCondition::MinimumParameterIncrement);
        }
        if evaluation <= self.evaluation_goal {
            return Some(StopCondition::EvaluationGoalReached);
        }
        if let Some(previous) = previous_evaluation {
            if previous - evaluation < self.minimum_evaluation_improvement {
                return Some(StopCondition::ObjectiveImprovementBelowMinimum);
            }
        }
        if gradient_norm <= self.gradient_norm_goal {
            return Some(StopCondition::GradientNormGoalReached);
        }
        if epoch >= self.maximum_epochs {
            return Some(StopCondition::MaximumEpochsReached);
        }
        if elapsed.as_secs_f64() >= self.maximum_time {
            return Some(StopCondition::MaximumTimeReached);
        }
        None
    }
}
