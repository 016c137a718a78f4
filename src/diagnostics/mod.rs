//! Status and error types consumed by callers for reporting.
pub mod error;
pub mod status;

pub use error::{ComputeError, RegistryError, ResolveError, UnavailableDependency};
pub use status::{Reason, Signature, Status};
