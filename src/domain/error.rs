//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the tree model.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A node in the tree document carries an empty `name`.
    ///
    /// `path` is the child-index path from the root, e.g. `[0, 2]`.
    #[error("tree node at {path:?} has an empty label")]
    EmptyLabel { path: Vec<usize> },
}
