//! Error types for the Forge front-end

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Collection of multiple errors for error recovery
#[derive(Debug, Clone, Default)]
pub struct Errors {
    errors: Vec<Error>,
}

impl Errors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error to the collection
    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Ok if no errors were collected, otherwise the first one
    pub fn into_result<T>(self, value: T) -> Result<T> {
        match self.errors.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(value),
        }
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Found {} error(s):", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "\n[{}] {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        let mut errors = Errors::new();
        errors.push(error);
        errors
    }
}

impl IntoIterator for Errors {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Lexical error during tokenization
    LexError { message: String, line: usize, col: usize },

    /// Syntax error during parsing
    ParseError { message: String, line: usize, col: usize },

    /// The rewritten unit could not be produced
    RewriteError { message: String },

    /// I/O error
    IoError { message: String },

    /// Configuration (forge.toml) error
    Config(String),
}

impl Error {
    /// Source position, when the error carries one
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            Error::LexError { line, col, .. } | Error::ParseError { line, col, .. } => {
                Some((*line, *col))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LexError { message, line, col } => {
                write!(f, "Lex error at {}:{}: {}", line, col, message)
            }
            Error::ParseError { message, line, col } => {
                write!(f, "Parse error at {}:{}: {}", line, col, message)
            }
            Error::RewriteError { message } => write!(f, "Rewrite error: {}", message),
            Error::IoError { message } => write!(f, "I/O error: {}", message),
            Error::Config(message) => write!(f, "Config error: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError {
            message: err.to_string(),
        }
    }
}
