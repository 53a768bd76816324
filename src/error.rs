//! Errors raised while loading or running a TrafCOD program.

use std::fmt;
use thiserror::Error;

/// A position in the program text, 1-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Location {
    /// The line number.
    pub line: usize,
    /// The column within the line.
    pub column: usize,
}

impl Location {
    /// Creates a new location.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The same line, at another column.
    pub(crate) fn at_column(self, column: usize) -> Self {
        Self { column, ..self }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Which half of a variable's activation logic a rule defines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleHalf {
    Start,
    End,
}

impl fmt::Display for RuleHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleHalf::Start => f.write_str("start"),
            RuleHalf::End => f.write_str("end"),
        }
    }
}

/// Errors raised by the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed program text.
    #[error("syntax error at {location}: {message}")]
    Syntax { location: Location, message: String },

    /// A variable received a second start rule or end rule.
    #[error("conflicting {half} rules for {variable} at {location} (first defined at {first})")]
    DuplicateRule {
        variable: String,
        half: RuleHalf,
        first: Location,
        location: Location,
    },

    /// The program does not fit the intersection it controls.
    #[error("configuration error: {0}")]
    Config(String),

    /// A rule could not be evaluated.
    #[error("cannot evaluate rule `{rule}`: {source}")]
    Evaluation {
        rule: String,
        #[source]
        source: EvalError,
    },

    /// The controller stopped after an earlier evaluation error.
    #[error("controller {controller} was halted by an earlier evaluation error")]
    Halted { controller: String },
}

impl Error {
    pub(crate) fn syntax(location: Location, message: impl Into<String>) -> Self {
        Error::Syntax {
            location,
            message: message.into(),
        }
    }
}

/// Errors raised while evaluating an expression.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("missing operand at end of expression")]
    MissingOperand,
    #[error("operand expected")]
    OperandExpected,
    #[error("missing binary operator")]
    MissingOperator,
    #[error("missing closing parenthesis")]
    MissingCloseParen,
    #[error("too many closing parentheses")]
    UnbalancedCloseParen,
    #[error("expression nested too deeply")]
    TooDeeplyNested,
}

pub type Result<T> = std::result::Result<T, Error>;
