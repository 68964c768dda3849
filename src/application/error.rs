//! Application-level errors (wraps domain errors)

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::RemoteError;

/// Remote step of the submission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Persist,
    Parse,
    FetchTree,
    FetchTrace,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Persist => "save code",
            Stage::Parse => "run parser",
            Stage::FetchTree => "fetch tree document",
            Stage::FetchTrace => "fetch trace document",
        };
        f.write_str(name)
    }
}

/// Result document fetched after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Tree,
    Trace,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Tree => f.write_str("tree"),
            Document::Trace => f.write_str("trace"),
        }
    }
}

/// Application errors wrap domain errors and add pipeline context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("Please enter some code first!")]
    Validation,

    #[error("failed to {stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: RemoteError,
    },

    #[error("{document} document is not valid JSON: {source}")]
    Parse {
        document: Document,
        #[source]
        source: serde_json::Error,
    },

    #[error("{stage} timed out after {}s", after.as_secs_f64())]
    Timeout { stage: Stage, after: Duration },

    #[error("submission cancelled")]
    Cancelled,

    #[error("a submission is already in progress")]
    Busy,

    #[error("render failed: {message}")]
    Render { message: String },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    /// Pipeline stage the error belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ApplicationError::Stage { stage, .. } | ApplicationError::Timeout { stage, .. } => Some(*stage),
            ApplicationError::Parse {
                document: Document::Tree,
                ..
            } => Some(Stage::FetchTree),
            ApplicationError::Parse {
                document: Document::Trace,
                ..
            } => Some(Stage::FetchTrace),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
