//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (ParserBackend, DiagramSurface)
//! but are themselves concrete structs, not traits.

mod sample;
mod status;
mod submission;

pub use sample::SampleLoader;
pub use status::{Severity, Status, StatusListener, StatusReporter};
pub use submission::{Outcome, Phase, Rendered, SubmissionController, TriggerState};
