//! Plain-text reports for terminals and logs.
pub mod trace;

pub use trace::{format_summary, format_tree};
