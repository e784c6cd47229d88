//! Typed error hierarchy for kubectl-allctx.
//!
//! Two enums cover the two halves of a run:
//! - `AllctxError`: everything that decides the exit status of the process
//! - `TaskError`: why a single context's command failed

use thiserror::Error;

/// Errors that end a run. All variants except `TasksFailed` and `Cancelled`
/// are raised before any command is dispatched.
#[derive(Debug, Error)]
pub enum AllctxError {
    #[error("{0}")]
    Argument(String),

    #[error("failed to get contexts: {0}")]
    Provider(String),

    #[error("invalid pattern {token:?}: {reason}")]
    InvalidPattern { token: String, reason: String },

    #[error("query matched no contexts from kubeconfig")]
    NoMatch,

    #[error("user refused execution")]
    PromptRefused,

    #[error("prompt canceled")]
    PromptCancelled,

    #[error("{failed} of {dispatched} command(s) failed")]
    TasksFailed { failed: usize, dispatched: usize },

    #[error("interrupted after dispatching {dispatched} of {total} command(s)")]
    Cancelled { dispatched: usize, total: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one context's command. Never fatal to sibling tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("exit status {0}")]
    Exit(i32),

    #[error("terminated by signal")]
    Signal,

    #[error("canceled")]
    Cancelled,

    #[error("task aborted: {0}")]
    Aborted(String),
}
