//! CSI error types.
//!
//! All errors in the `cfscsi` crate are represented by the [`CsiError`] enum.
//! Each variant maps onto exactly one orchestrator status code through
//! [`CsiError::code`], so the hosting RPC layer never has to inspect messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status codes understood by the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StatusCode {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    Internal,
    Unavailable,
}

/// Unified error type for CSI operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone)]
pub enum CsiError {
    /// The caller supplied an invalid argument or asked for an unsupported
    /// capability.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The CFS master could not be reached or returned something unusable.
    #[error("cluster unavailable: {0}")]
    Unavailable(String),

    /// The mount target is missing or nothing is mounted there.
    #[error("not found: {0}")]
    NotFound(String),

    /// The cluster already holds a volume by the requested name.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Mount client, process, filesystem or cluster-side rejection.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CsiError {
    /// Create a [`CsiError::Unavailable`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn unavailable<E: std::fmt::Display>(e: E) -> Self {
        Self::Unavailable(e.to_string())
    }

    /// Create a [`CsiError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    /// Status code the orchestrator should see for this error.
    pub fn code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::InvalidArgument,
            Self::Unavailable(_) => StatusCode::Unavailable,
            Self::NotFound(_) => StatusCode::NotFound,
            Self::AlreadyExists(_) => StatusCode::AlreadyExists,
            Self::Internal(_) => StatusCode::Internal,
        }
    }
}
