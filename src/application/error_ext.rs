//! Error conversion helpers for remote calls
//!
//! Provides extension traits that tag a remote failure with its pipeline stage.

use crate::application::{ApplicationError, ApplicationResult, Stage};
use crate::infrastructure::RemoteError;

/// Extension trait for converting remote results to `ApplicationResult` with stage context.
pub trait RemoteResultExt<T> {
    /// Attribute a remote error to a pipeline stage.
    ///
    /// # Example
    /// ```ignore
    /// backend.run_parser().await.at_stage(Stage::Parse)?;
    /// ```
    fn at_stage(self, stage: Stage) -> ApplicationResult<T>;
}

impl<T> RemoteResultExt<T> for Result<T, RemoteError> {
    fn at_stage(self, stage: Stage) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::Stage { stage, source })
    }
}
