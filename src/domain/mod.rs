//! Domain layer: tree model, classification and layout
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod classify;
pub mod document;
pub mod error;
pub mod interaction;
pub mod layout;

pub use arena::{SyntaxNode, SyntaxTree};
pub use classify::{classify, Fill, NodeCategory};
pub use document::{TraceDocument, TreeDocument};
pub use error::DomainError;
pub use interaction::{HoverState, LabelAnchor, PointerEvent, Stroke};
pub use layout::{Diagram, LayoutConfig, LayoutEdge, LayoutNode, Link, Margin, TreeLayoutEngine};
