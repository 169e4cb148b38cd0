//! `replitex` substitutes text across a directory tree: inside file names,
//! folder names and file contents.
//!
//! It provides the core logic for the `replitex` command-line tool but can
//! also be used as a standalone library. The main components are:
//!
//! - `matcher`: literal, optionally case-sensitive and whole-word matching.
//! - `ignore_policy`: keywords, paths and extensions that exempt entries.
//! - `codec`: decoding file content with an ordered list of encodings.
//! - `engine`: runs one of three modes (in place, sibling copy, tree copy),
//!   either for real or as a preview, and reports through `events`.
//! - `preview`: the records describing every action a run takes.
//! - `config`: building a `Configuration` from flags and YAML files.
//!
//! A run is strictly sequential and happens on a single background thread.
//! The caller listens on an event channel and may request cancellation.

pub mod cli;
pub mod codec;
pub mod config;
pub mod effects;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ignore_policy;
mod in_place;
pub mod matcher;
pub mod output_formatter;
pub mod preview;
mod sibling_copy;
pub mod traversal;
mod tree_copy;
pub mod unique_name;

// Re-export main types for easier access by library users.
pub use config::{Configuration, Mode};
pub use engine::{Engine, RunHandle, RunState, start};
pub use errors::{Error, Result};
pub use events::{CancellationToken, Event, EventSink};
pub use output_formatter::{OutputFormat, OutputFormatter};
pub use preview::{MatchRecord, PreviewSimulator};
