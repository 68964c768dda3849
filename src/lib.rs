//! astviz: submit source to a parser service and render the resulting AST
//! as a tidy-tree SVG diagram.
//!
//! Layers, innermost first:
//! - [`domain`]: tree model, node classification, layout (pure, no I/O)
//! - [`application`]: submission pipeline, status line, sample loading
//! - [`infrastructure`]: HTTP backend, SVG surface, DI container
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
