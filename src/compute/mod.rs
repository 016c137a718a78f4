//! Resolution sessions and their memoized results.
pub mod engine;
pub mod ledger;

pub use engine::Resolver;
pub use ledger::Ledger;
