//! Error type shared by evaluation, restore and configuration loading.
//!
//! Structural edge cases (self-loops, duplicate links, layer-inverted links) and
//! mutations that find nothing to act on are *not* errors: they are resolved by
//! [`LinkPolicy`](crate::graph::LinkPolicy) or skipped silently by the
//! [`Evolver`](crate::evolver::Evolver).

use thiserror::Error;

/// Errors reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NeatError {
    /// A slice passed to evaluation does not match the network arity.
    #[error("dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch {
        /// Length required by the graph.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// Text handed to the codec does not follow the genome grammar.
    #[error("corrupt genome encoding: {0}")]
    CorruptFormat(String),

    /// Mutation tunables out of their valid domain.
    #[error("invalid evolver configuration: {0}")]
    InvalidConfig(String),

    /// Layer-dependent work was requested while a batch edit is still open.
    #[error("graph has an open batch edit; layers are stale until it closes")]
    BatchInProgress,
}

impl NeatError {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptFormat(message.into())
    }
}
