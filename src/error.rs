//! Error taxonomy for the backend, per `SPEC_FULL.md` §7. Every fatal case
//! names the offending function and, where applicable, the instruction or
//! label involved. "Run out of colors" is deliberately absent: it is
//! handled by palette extension in [`crate::regalloc`], not reported as an
//! error.

use thiserror::Error;

/// Failures raised while compiling a single function's IR to assembly.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum BackendError {
    /// A jump, in or out of a block, whose target label does not resolve
    /// to any block in the function.
    #[error("function `{function}`: jump target `{label}` does not resolve to any block")]
    UnresolvedJumpTarget { function: String, label: String },

    /// A malformed instruction sequence the CFG builder cannot place into
    /// a block (currently unreachable given the closed `Instruction` sum
    /// type, but kept so structural errors have somewhere to go).
    #[error("function `{function}`: malformed instruction at position {index}")]
    MalformedInstruction { function: String, index: usize },

    /// LVN found an operand it expected to already carry a value number
    /// but does not — a front-end contract break, not a user error.
    #[error("function `{function}`: local value numbering invariant violated on `{var}`")]
    LvnInvariantViolation { function: String, var: String },
}

/// Failures raised while parsing the on-disk textual IR interchange format
/// (see [`crate::textir`]).
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("{0}")]
    Grammar(#[from] Box<pest::error::Error<crate::textir::Rule>>),

    #[error("invalid integer literal `{literal}`")]
    InvalidInt {
        literal: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(#[from] util::ParseEnumError),

    #[error("function chunk does not start with a label")]
    MissingFunctionLabel,

    #[error("opcode `{opcode}` is missing an operand")]
    MissingOperand { opcode: String },
}

impl From<pest::error::Error<crate::textir::Rule>> for ParseError {
    fn from(err: pest::error::Error<crate::textir::Rule>) -> Self {
        ParseError::Grammar(Box::new(err))
    }
}
