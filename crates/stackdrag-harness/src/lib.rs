#![forbid(unsafe_code)]

//! Scenario replay for `stackdrag-core`.
//!
//! Wires the coordinator to the in-memory folder fixtures, a JSON scenario
//! format, config file loading, and a `tracing-subscriber` formatter.

pub mod cli;
pub mod error;
pub mod replay;
pub mod scenario;

pub use cli::run_from_env;
pub use error::{HarnessError, Result};
pub use replay::{DragReport, ReplayReport, replay};
pub use scenario::Scenario;
