use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrainingError>;

/// Fatal conditions. Normal stop conditions are not errors, see [`crate::StopCondition`].
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("invalid configuration: {field} = {value} ({reason})")]
    InvalidConfig {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("unable to bracket a minimum: training rate {training_rate} exceeds the error training rate {limit}")]
    BracketingFailed { training_rate: f64, limit: f64 },

    #[error("parameters norm {norm} exceeds the error parameters norm {limit}")]
    ParametersNormTooLarge { norm: f64, limit: f64 },

    #[error("gradient norm {norm} exceeds the error gradient norm {limit}")]
    GradientNormTooLarge { norm: f64, limit: f64 },

    #[error("the objective functional provides no Hessian")]
    HessianUnavailable,

    #[error("the Hessian of the objective functional is singular")]
    SingularHessian,

    #[error("parameter vector has {found} entries, the objective functional expects {expected}")]
    ParameterCountMismatch { expected: usize, found: usize },

    #[error("malformed file at line {line}: {reason}")]
    MalformedFile { line: usize, reason: String },

    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedTag { expected: String, found: String },

    #[error("invalid value '{value}' for <{tag}>")]
    InvalidValue { tag: String, value: String },

    #[error("unknown class '{0}'")]
    UnknownClass(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
