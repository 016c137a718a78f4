//! Rule declarations and the registry that owns them.
pub mod registry;
pub mod rule;
pub mod types;

pub use registry::Registry;
pub use rule::{ComputeFn, Rule, RuleBuilder};
pub use types::{RuleInfo, SearchField, DEFAULT_SEARCH_FIELDS};
