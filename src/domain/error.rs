// Error taxonomy for the graphing engine
use thiserror::Error;

/// Malformed expression text. Always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Empty expression")]
    Empty,

    #[error("Operator '{operator}' needs {needed} operands, stack holds {available}")]
    StackUnderflow {
        operator: String,
        needed: usize,
        available: usize,
    },

    #[error("Expression '{expression}' leaves {count} operands on the stack")]
    LeftoverOperands { expression: String, count: usize },

    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("Invalid token '{0}'")]
    InvalidToken(String),

    #[error("Invalid suffix '{suffix}' on '{token}'")]
    InvalidSuffix { token: String, suffix: String },

    #[error("Invalid color '{0}'")]
    InvalidColor(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphingError {
    #[error("Cannot parse expression: {0}")]
    Parse(#[from] ParseError),

    #[error("Expression uses undefined metric '{metric}', available are: {available}")]
    Resolution { metric: String, available: String },

    #[error("Metric '{metric}' has no {scalar} value")]
    MissingScalar { metric: String, scalar: &'static str },

    #[error("Broken graphing definition: {0}")]
    ConfigIntegrity(String),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),
}

impl GraphingError {
    /// True for errors caused by absent data rather than broken input or
    /// broken definitions.
    pub fn is_missing_data(&self) -> bool {
        matches!(
            self,
            GraphingError::Resolution { .. } | GraphingError::MissingScalar { .. }
        )
    }
}
