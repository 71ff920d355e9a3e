//! Error types for table generation and dispatch simulation

use thiserror::Error;

use crate::catalog::{Operation, Scope, Width};
use crate::ordering::{MemoryOrder, Semantics};

/// Generation-time defects. None of these are recoverable; they mean the
/// literal tables or the generator itself are wrong.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("no native {kind} instruction with {sem} semantics for {width}-bit operands")]
    UnsupportedLeaf {
        kind: &'static str,
        sem: Semantics,
        width: Width,
    },

    #[error("invalid axis catalog: {0}")]
    InvalidCatalog(String),

    #[error("malformed ladder for {operation} ({scope}): {reason}")]
    MalformedLadder {
        operation: Operation,
        scope: Scope,
        reason: String,
    },

    #[error("duplicate generation entry `{0}`")]
    DuplicateEntry(String),

    #[error("generated unit does not parse: {0}")]
    MalformedUnit(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What the emitted dispatch traps on. The simulator reports it instead of
/// executing anything.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DispatchFault {
    #[error("unrecognized memory order value {0}")]
    Unrecognized(i32),

    #[error("memory order {0} is not valid for this operation")]
    Unsupported(MemoryOrder),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SimFault {
    #[error(transparent)]
    Dispatch(#[from] DispatchFault),

    #[error("entry `{entry}` is not a {expected} entry")]
    WrongEntry { entry: String, expected: &'static str },
}
