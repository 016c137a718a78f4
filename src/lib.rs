//! Derived-value resolution: named rules that compute new arrays from base
//! values or from other rules, resolved on demand with memoization, cycle
//! detection and precise diagnostics.
//!
//! A [`Registry`] owns the rules. A [`Resolver`] binds a registry to one
//! pool of base values (a [`Dataset`] or any [`BasePool`]) and computes
//! derived values depth first, caching each result for the life of the
//! session.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod diagnostics;
pub mod display;
pub mod payload;
pub mod standard;
pub mod store;

pub use analysis::{DependencyNode, DependencyStatus, DependencyTree};
pub use compute::Resolver;
pub use config::{ConfigError, DisplayConfig};
pub use diagnostics::{ComputeError, Reason, RegistryError, ResolveError, Signature, Status, UnavailableDependency};
pub use payload::{BaseNames, BasePool, DType, DataArray, Dataset, DependencyPool, Metadata, Values};
pub use standard::register_standard_rules;
pub use store::{Registry, Rule, RuleBuilder, RuleInfo, SearchField};
