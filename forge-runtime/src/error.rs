//! Error types for the Forge runtime

use thiserror::Error;

/// An error raised while executing a unit
///
/// The `Display` form is what a failed run shows to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("NameError: name '{0}' is not defined")]
    NameError(String),

    #[error("TypeError: {0}")]
    TypeError(String),

    #[error("ValueError: {0}")]
    ValueError(String),

    #[error("IndexError: {0}")]
    IndexError(String),

    #[error("MemoryError: {0}")]
    MemoryError(String),

    #[error("ZeroDivisionError: {0}")]
    ZeroDivisionError(String),

    #[error("RecursionError: maximum call depth of {0} exceeded")]
    RecursionError(usize),

    #[error("InputCancelled: the pending input request was cancelled")]
    InputCancelled,

    #[error("EOFError: {0}")]
    InputUnavailable(String),

    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    #[error("Runtime is not loaded")]
    NotLoaded,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl From<forge_core::Error> for RuntimeError {
    fn from(err: forge_core::Error) -> Self {
        RuntimeError::SyntaxError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            RuntimeError::NameError("x".into()).to_string(),
            "NameError: name 'x' is not defined"
        );
        assert_eq!(
            RuntimeError::RecursionError(200).to_string(),
            "RecursionError: maximum call depth of 200 exceeded"
        );
    }

    #[test]
    fn test_from_core_error() {
        let err: RuntimeError = forge_core::parse("let = 1;").unwrap_err().into();
        assert!(err.to_string().starts_with("SyntaxError: Parse error at 1:5"));
    }
}
