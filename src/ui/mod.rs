//! UI module for refresh status output
//!
//! Renders one line per channel subdirectory: an `indicatif` spinner while a
//! refresh is in flight, with automatic fallback to plain lines in
//! CI/non-interactive environments.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, section, step_ok, step_warn_hint, subdir_status};
pub use progress::{status_prefix, RefreshProgress, PREFIX_LENGTH};
