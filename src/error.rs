//! Crate-wide error taxonomy.
//!
//! Anything that can be diagnosed locally (bad configuration, an unknown
//! mutation operator, a malformed problem) is a variant of [`EsError`].
//! Top-level application code composes these under [`ExecResult`], a plain
//! [`eyre::Result`] for readable chained context at the program boundary.

use thiserror::Error;

/// Top-level result type for binary entry points, matching `main`'s need for
/// a single chainable error type with readable `Display`/`Debug` output.
pub type ExecResult<T> = eyre::Result<T>;

#[derive(Debug, Error)]
pub enum EsError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown mutation operator: {0}")]
    UnknownMutationOp(u32),

    #[error("problem error: {0}")]
    Problem(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by a [`crate::transport::Transport`] implementation.
///
/// The transport layer itself (framing, authentication, retry/backoff) is
/// out of scope for this crate; only the shape of its failures matters here.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("server unreachable after retries: {0}")]
    Unreachable(String),

    #[error("malformed payload: {0}")]
    Codec(String),
}
