//! Training configuration shared by every algorithm.
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, TrainingError};
use crate::persist::TagDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearchKind {
    Fixed,
    GoldenSection,
    BrentMethod,
}

impl fmt::Display for LineSearchKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            LineSearchKind::Fixed => "Fixed",
            LineSearchKind::GoldenSection => "GoldenSection",
            LineSearchKind::BrentMethod => "BrentMethod",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LineSearchKind {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Fixed" => Ok(LineSearchKind::Fixed),
            "GoldenSection" => Ok(LineSearchKind::GoldenSection),
            "BrentMethod" => Ok(LineSearchKind::BrentMethod),
            other => Err(TrainingError::InvalidValue {
                tag: "LineSearch".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Per-epoch quantities that can be recorded in a [`crate::TrainingHistory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HistoryField {
    Parameters,
    ParametersNorm,
    Evaluation,
    ValidationError,
    Gradient,
    GradientNorm,
    InverseHessian,
    TrainingDirection,
    TrainingRate,
    ElapsedTime,
    MeanEvaluation,
    StandardDeviationEvaluation,
}

impl HistoryField {
    pub const ALL: [HistoryField; 12] = [
        HistoryField::Parameters,
        HistoryField::ParametersNorm,
        HistoryField::Evaluation,
        HistoryField::ValidationError,
        HistoryField::Gradient,
        HistoryField::GradientNorm,
        HistoryField::InverseHessian,
        HistoryField::TrainingDirection,
        HistoryField::TrainingRate,
        HistoryField::ElapsedTime,
        HistoryField::MeanEvaluation,
        HistoryField::StandardDeviationEvaluation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HistoryField::Parameters => "Parameters",
            HistoryField::ParametersNorm => "ParametersNorm",
            HistoryField::Evaluation => "Evaluation",
            HistoryField::ValidationError => "ValidationError",
            HistoryField::Gradient => "Gradient",
            HistoryField::GradientNorm => "GradientNorm",
            HistoryField::InverseHessian => "InverseHessian",
            HistoryField::TrainingDirection => "TrainingDirection",
            HistoryField::TrainingRate => "TrainingRate",
            HistoryField::ElapsedTime => "ElapsedTime",
            HistoryField::MeanEvaluation => "MeanEvaluation",
            HistoryField::StandardDeviationEvaluation => "StandardDeviationEvaluation",
        }
    }

    fn reserve_tag(&self) -> String {
        format!("Reserve{}History", self.name())
    }
}

/// Which history columns get allocated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryReservation(BTreeSet<HistoryField>);

impl HistoryReservation {
    pub fn all() -> Self {
        HistoryReservation(HistoryField::ALL.iter().copied().collect())
    }

    pub fn reserve(&mut self, field: HistoryField, reserved: bool) {
        if reserved {
            self.0.insert(field);
        } else {
            self.0.remove(&field);
        }
    }

    pub fn with(mut self, field: HistoryField) -> Self {
        self.reserve(field, true);
        self
    }

    pub fn is_reserved(&self, field: HistoryField) -> bool {
        self.0.contains(&field)
    }

    pub fn reserved(&self) -> impl Iterator<Item = HistoryField> + '_ {
        self.0.iter().copied()
    }
}

/// Scalars steering a training run. Built through [`TrainingConfigBuilder`], which validates.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    line_search: LineSearchKind,
    bracketing_factor: f64,
    first_training_rate: f64,
    training_rate_tolerance: f64,

    warning_parameters_norm: f64,
    warning_gradient_norm: f64,
    warning_training_rate: f64,
    error_parameters_norm: f64,
    error_gradient_norm: f64,
    error_training_rate: f64,

    minimum_parameters_increment_norm: f64,
    minimum_evaluation_improvement: f64,
    evaluation_goal: f64,
    gradient_norm_goal: f64,
    maximum_epochs: usize,
    maximum_time: f64,
    early_stopping: bool,

    reserve: HistoryReservation,
    display: bool,
    display_period: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            line_search: LineSearchKind::BrentMethod,
            bracketing_factor: 1.5,
            first_training_rate: 1.0e-2,
            training_rate_tolerance: 1.0e-3,

            warning_parameters_norm: 1.0e6,
            warning_gradient_norm: 1.0e6,
            warning_training_rate: 1.0e6,
            error_parameters_norm: 1.0e10,
            error_gradient_norm: 1.0e10,
            error_training_rate: 1.0e10,

            minimum_parameters_increment_norm: 0.0,
            minimum_evaluation_improvement: 0.0,
            evaluation_goal: 0.0,
            gradient_norm_goal: 0.0,
            maximum_epochs: 1000,
            maximum_time: 1000.0,
            early_stopping: false,

            reserve: HistoryReservation::default(),
            display: true,
            display_period: 10,
        }
    }
}

impl TrainingConfig {
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder {
            config: TrainingConfig::default(),
        }
    }

    /// Starts a builder from this configuration.
    pub fn to_builder(&self) -> TrainingConfigBuilder {
        TrainingConfigBuilder {
            config: self.clone(),
        }
    }

    pub fn line_search(&self) -> LineSearchKind {
        self.line_search
    }
    pub fn bracketing_factor(&self) -> f64 {
        self.bracketing_factor
    }
    pub fn first_training_rate(&self) -> f64 {
        self.first_training_rate
    }
    pub fn training_rate_tolerance(&self) -> f64 {
        self.training_rate_tolerance
    }
    pub fn warning_parameters_norm(&self) -> f64 {
        self.warning_parameters_norm
    }
    pub fn warning_gradient_norm(&self) -> f64 {
        self.warning_gradient_norm
    }
    pub fn warning_training_rate(&self) -> f64 {
        self.warning_training_rate
    }
    pub fn error_parameters_norm(&self) -> f64 {
        self.error_parameters_norm
    }
    pub fn error_gradient_norm(&self) -> f64 {
        self.error_gradient_norm
    }
    pub fn error_training_rate(&self) -> f64 {
        self.error_training_rate
    }
    pub fn minimum_parameters_increment_norm(&self) -> f64 {
        self.minimum_parameters_increment_norm
    }
    pub fn minimum_evaluation_improvement(&self) -> f64 {
        self.minimum_evaluation_improvement
    }
    pub fn evaluation_goal(&self) -> f64 {
        self.evaluation_goal
    }
    pub fn gradient_norm_goal(&self) -> f64 {
        self.gradient_norm_goal
    }
    pub fn maximum_epochs(&self) -> usize {
        self.maximum_epochs
    }
    /// Seconds.
    pub fn maximum_time(&self) -> f64 {
        self.maximum_time
    }
    pub fn early_stopping(&self) -> bool {
        self.early_stopping
    }
    pub fn reserve(&self) -> &HistoryReservation {
        &self.reserve
    }
    pub fn display(&self) -> bool {
        self.display
    }
    pub fn display_period(&self) -> usize {
        self.display_period
    }

    fn validate(&self) -> Result<()> {
        if !self.bracketing_factor.is_finite() || self.bracketing_factor <= 1.0 {
            return Err(TrainingError::InvalidConfig {
                field: "bracketing_factor",
                value: self.bracketing_factor,
                reason: "must be finite and greater than one",
            });
        }
        check_positive("first_training_rate", self.first_training_rate)?;
        check_positive("training_rate_tolerance", self.training_rate_tolerance)?;

        check_non_negative("warning_parameters_norm", self.warning_parameters_norm)?;
        check_non_negative("warning_gradient_norm", self.warning_gradient_norm)?;
        check_non_negative("warning_training_rate", self.warning_training_rate)?;
        check_non_negative("error_parameters_norm", self.error_parameters_norm)?;
        check_non_negative("error_gradient_norm", self.error_gradient_norm)?;
        check_non_negative("error_training_rate", self.error_training_rate)?;

        check_non_negative(
            "minimum_parameters_increment_norm",
            self.minimum_parameters_increment_norm,
        )?;
        check_non_negative(
            "minimum_evaluation_improvement",
            self.minimum_evaluation_improvement,
        )?;
        check_non_negative("evaluation_goal", self.evaluation_goal)?;
        check_non_negative("gradient_norm_goal", self.gradient_norm_goal)?;
        check_non_negative("maximum_time", self.maximum_time)?;

        if self.display_period == 0 {
            return Err(TrainingError::InvalidConfig {
                field: "display_period",
                value: 0.0,
                reason: "must be at least one epoch",
            });
        }
        Ok(())
    }

    pub(crate) fn write_tags(&self, doc: &mut TagDocument) {
        doc.push("LineSearch", self.line_search);
        doc.push("BracketingFactor", self.bracketing_factor);
        doc.push("FirstTrainingRate", self.first_training_rate);
        doc.push("TrainingRateTolerance", self.training_rate_tolerance);
        doc.push("WarningParametersNorm", self.warning_parameters_norm);
        doc.push("WarningGradientNorm", self.warning_gradient_norm);
        doc.push("WarningTrainingRate", self.warning_training_rate);
        doc.push("ErrorParametersNorm", self.error_parameters_norm);
        doc.push("ErrorGradientNorm", self.error_gradient_norm);
        doc.push("ErrorTrainingRate", self.error_training_rate);
        doc.push(
            "MinimumParametersIncrementNorm",
            self.minimum_parameters_increment_norm,
        );
        doc.push(
            "MinimumEvaluationImprovement",
            self.minimum_evaluation_improvement,
        );
        doc.push("EvaluationGoal", self.evaluation_goal);
        doc.push("GradientNormGoal", self.gradient_norm_goal);
        doc.push("MaximumEpochsNumber", self.maximum_epochs);
        doc.push("MaximumTime", self.maximum_time);
        doc.push_flag("EarlyStopping", self.early_stopping);
        for field in HistoryField::ALL.iter() {
            doc.push_flag(&field.reserve_tag(), self.reserve.is_reserved(*field));
        }
        doc.push_flag("Display", self.display);
        doc.push("DisplayPeriod", self.display_period);
    }

    /// Overrides the fields present in `doc`, then validates.
    pub(crate) fn read_tags(&self, doc: &TagDocument) -> Result<TrainingConfig> {
        let mut c = self.clone();
        if let Some(v) = doc.value("LineSearch")? {
            c.line_search = v;
        }
        read_f64(doc, "BracketingFactor", &mut c.bracketing_factor)?;
        read_f64(doc, "FirstTrainingRate", &mut c.first_training_rate)?;
        read_f64(doc, "TrainingRateTolerance", &mut c.training_rate_tolerance)?;
        read_f64(doc, "WarningParametersNorm", &mut c.warning_parameters_norm)?;
        read_f64(doc, "WarningGradientNorm", &mut c.warning_gradient_norm)?;
        read_f64(doc, "WarningTrainingRate", &mut c.warning_training_rate)?;
        read_f64(doc, "ErrorParametersNorm", &mut c.error_parameters_norm)?;
        read_f64(doc, "ErrorGradientNorm", &mut c.error_gradient_norm)?;
        read_f64(doc, "ErrorTrainingRate", &mut c.error_training_rate)?;
        read_f64(
            doc,
            "MinimumParametersIncrementNorm",
            &mut c.minimum_parameters_increment_norm,
        )?;
        read_f64(
            doc,
            "MinimumEvaluationImprovement",
            &mut c.minimum_evaluation_improvement,
        )?;
        read_f64(doc, "EvaluationGoal", &mut c.evaluation_goal)?;
        read_f64(doc, "GradientNormGoal", &mut c.gradient_norm_goal)?;
        if let Some(v) = doc.value("MaximumEpochsNumber")? {
            c.maximum_epochs = v;
        }
        read_f64(doc, "MaximumTime", &mut c.maximum_time)?;
        if let Some(v) = doc.flag("EarlyStopping")? {
            c.early_stopping = v;
        }
        for field in HistoryField::ALL.iter() {
            if let Some(v) = doc.flag(&field.reserve_tag())? {
                c.reserve.reserve(*field, v);
            }
        }
        if let Some(v) = doc.flag("Display")? {
            c.display = v;
        }
        if let Some(v) = doc.value("DisplayPeriod")? {
            c.display_period = v;
        }
        c.validate()?;
        Ok(c)
    }

    pub fn to_document(&self) -> TagDocument {
        let mut doc = TagDocument::new("TrainingConfig", Some("TrainingConfig"));
        self.write_tags(&mut doc);
        doc
    }

    pub fn from_document(doc: &TagDocument) -> Result<TrainingConfig> {
        TrainingConfig::default().read_tags(doc)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_document().save(path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<TrainingConfig> {
        Self::from_document(&TagDocument::load(path)?)
    }
}

impl fmt::Display for TrainingConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_document())
    }
}

impl FromStr for TrainingConfig {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_document(&TagDocument::parse(s)?)
    }
}

#[derive(Debug, Clone)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    pub fn with_line_search(mut self, kind: LineSearchKind) -> Self {
        self.config.line_search = kind;
        self
    }
    pub fn with_bracketing_factor(mut self, factor: f64) -> Self {
        self.config.bracketing_factor = factor;
        self
    }
    pub fn with_first_training_rate(mut self, rate: f64) -> Self {
        self.config.first_training_rate = rate;
        self
    }
    pub fn with_training_rate_tolerance(mut self, tolerance: f64) -> Self {
        self.config.training_rate_tolerance = tolerance;
        self
    }
    pub fn with_warning_parameters_norm(mut self, norm: f64) -> Self {
        self.config.warning_parameters_norm = norm;
        self
    }
    pub fn with_warning_gradient_norm(mut self, norm: f64) -> Self {
        self.config.warning_gradient_norm = norm;
        self
    }
    pub fn with_warning_training_rate(mut self, rate: f64) -> Self {
        self.config.warning_training_rate = rate;
        self
    }
    pub fn with_error_parameters_norm(mut self, norm: f64) -> Self {
        self.config.error_parameters_norm = norm;
        self
    }
    pub fn with_error_gradient_norm(mut self, norm: f64) -> Self {
        self.config.error_gradient_norm = norm;
        self
    }
    pub fn with_error_training_rate(mut self, rate: f64) -> Self {
        self.config.error_training_rate = rate;
        self
    }
    pub fn with_minimum_parameters_increment_norm(mut self, norm: f64) -> Self {
        self.config.minimum_parameters_increment_norm = norm;
        self
    }
    pub fn with_minimum_evaluation_improvement(mut self, improvement: f64) -> Self {
        self.config.minimum_evaluation_improvement = improvement;
        self
    }
    pub fn with_evaluation_goal(mut self, goal: f64) -> Self {
        self.config.evaluation_goal = goal;
        self
    }
    pub fn with_gradient_norm_goal(mut self, goal: f64) -> Self {
        self.config.gradient_norm_goal = goal;
        self
    }
    pub fn with_maximum_epochs(mut self, epochs: usize) -> Self {
        self.config.maximum_epochs = epochs;
        self
    }
    /// Seconds.
    pub fn with_maximum_time(mut self, seconds: f64) -> Self {
        self.config.maximum_time = seconds;
        self
    }
    pub fn with_early_stopping(mut self, early_stopping: bool) -> Self {
        self.config.early_stopping = early_stopping;
        self
    }
    pub fn with_history(mut self, reserve: HistoryReservation) -> Self {
        self.config.reserve = reserve;
        self
    }
    pub fn reserve_history(mut self, field: HistoryField) -> Self {
        self.config.reserve.reserve(field, true);
        self
    }
    pub fn with_display(mut self, display: bool) -> Self {
        self.config.display = display;
        self
    }
    pub fn with_display_period(mut self, period: usize) -> Self {
        self.config.display_period = period;
        self
    }

    pub fn build(self) -> Result<TrainingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn read_f64(doc: &TagDocument, tag: &str, target: &mut f64) -> Result<()> {
    if let Some(v) = doc.value(tag)? {
        *target = v;
    }
    Ok(())
}

fn check_number(field: &'static str, value: f64) -> Result<()> {
    if value.is_nan() {
        return Err(TrainingError::InvalidConfig {
            field,
            value,
            reason: "must be a number",
        });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<()> {
    check_number(field, value)?;
    if value < 0.0 {
        return Err(TrainingError::InvalidConfig {
            field,
            value,
            reason: "must be non-negative",
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<()> {
    check_number(field, value)?;
    if value <= 0.0 || value.is_infinite() {
        return Err(TrainingError::InvalidConfig {
            field,
            value,
            reason: "must be positive and finite",
        });
    }
    Ok(())
}
