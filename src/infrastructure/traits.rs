//! I/O boundary traits for testability
//!
//! These traits abstract the parser service and the display surface,
//! allowing the pipeline to be tested with in-memory implementations.

use std::io;

use async_trait::async_trait;

use crate::domain::Diagram;
use crate::infrastructure::error::RemoteError;

/// Remote parser service: source store, parser trigger and result documents.
#[async_trait]
pub trait ParserBackend: Send + Sync {
    /// Persist the submitted source. The response body is ignored.
    async fn save_code(&self, code: &str) -> Result<(), RemoteError>;

    /// Run the parser. Success means both result documents were rewritten.
    async fn run_parser(&self) -> Result<(), RemoteError>;

    /// Raw tree document text.
    async fn fetch_tree(&self) -> Result<String, RemoteError>;

    /// Raw trace document text.
    async fn fetch_trace(&self) -> Result<String, RemoteError>;

    /// Plain-text sample source used to pre-populate the input.
    async fn fetch_sample(&self) -> Result<String, RemoteError>;
}

/// Where diagrams are shown.
///
/// `replace` clears whatever is displayed and draws the new diagram.
/// On error the previous content must still be intact.
pub trait DiagramSurface: Send + Sync {
    fn replace(&self, diagram: &Diagram) -> io::Result<()>;
}
