//! Error types shared by the registry, the graph queries and the resolver.
use thiserror::Error;

/// Errors raised while maintaining the rule registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("derived variable \"{name}\" is already registered")]
    DuplicateName { name: String },
    #[error("no derived variable named \"{name}\" is registered")]
    NotFound { name: String },
    /// A rule declaration is malformed. This is a programming error on the
    /// caller side, never a data error.
    #[error("invalid rule definition: {reason}")]
    InvalidRule { reason: String },
}

/// A derived dependency that could not be produced, with the first line of
/// the inner failure attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailableDependency {
    pub name: String,
    pub reason: String,
}

/// Errors raised by `Resolver::resolve` and the evaluation planner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("\"{name}\" is neither a base value nor a registered derived variable")]
    UnknownVariable { name: String },

    #[error("{}", describe_missing(.name, .missing_base, .unavailable_derived))]
    MissingDependency {
        name: String,
        missing_base: Vec<String>,
        unavailable_derived: Vec<UnavailableDependency>,
    },

    /// `path` holds the resolving stack at detection time followed by the
    /// name that was revisited.
    #[error("circular dependency detected for variable \"{name}\"; path: {}", .path.join(" -> "))]
    CyclicDependency { name: String, path: Vec<String> },

    #[error("error computing derived variable \"{name}\": {message}")]
    ComputationFailure { name: String, message: String },
}

impl ResolveError {
    /// First line of the rendered message, used when nesting one failure
    /// inside another.
    pub fn summary(&self) -> String {
        self.to_string().lines().next().unwrap_or_default().to_string()
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, ResolveError::CyclicDependency { .. })
    }
}

fn describe_missing(name: &str, missing_base: &[String], unavailable: &[UnavailableDependency]) -> String {
    if unavailable.is_empty() {
        return format!(
            "derived variable \"{}\" cannot be computed. Missing dependencies: {:?}",
            name, missing_base
        );
    }

    let mut parts = Vec::with_capacity(2);
    if !missing_base.is_empty() {
        parts.push(format!("missing base dependencies: {:?}", missing_base));
    }
    let derived: Vec<String> = unavailable
        .iter()
        .map(|dep| format!("{} (reason: {})", dep.name, dep.reason))
        .collect();
    parts.push(format!("unavailable derived dependencies: [{}]", derived.join(", ")));

    format!(
        "cannot compute derived variable \"{}\". Failed to resolve dependencies: {}",
        name,
        parts.join("; ")
    )
}

/// The error a rule's compute function reports. The resolver wraps it into
/// `ResolveError::ComputationFailure`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    #[error("dependency \"{0}\" was not provided to the computation")]
    MissingInput(String),
    #[error("\"{name}\" has dtype {actual}, expected {expected}")]
    DTypeMismatch { name: String, expected: String, actual: String },
    #[error("shape mismatch: {lhs:?} vs {rhs:?}")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },
    #[error("{0}")]
    Message(String),
}

impl ComputeError {
    pub fn msg(message: impl Into<String>) -> Self {
        ComputeError::Message(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_base_only_lists_flat_names() {
        let err = ResolveError::MissingDependency {
            name: "P".into(),
            missing_base: vec!["pressure".into()],
            unavailable_derived: vec![],
        };
        assert_eq!(
            err.to_string(),
            "derived variable \"P\" cannot be computed. Missing dependencies: [\"pressure\"]"
        );
    }

    #[test]
    fn test_combined_message_names_both_kinds() {
        let err = ResolveError::MissingDependency {
            name: "rh".into(),
            missing_base: vec!["air_pressure".into()],
            unavailable_derived: vec![UnavailableDependency {
                name: "mixing_ratio".into(),
                reason: "no specific_humidity".into(),
            }],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing base dependencies: [\"air_pressure\"]"), "Msg: {}", msg);
        assert!(msg.contains("mixing_ratio (reason: no specific_humidity)"), "Msg: {}", msg);
    }

    #[test]
    fn test_cycle_message_renders_path() {
        let err = ResolveError::CyclicDependency {
            name: "A".into(),
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert!(err.is_cycle());
        assert_eq!(err.summary(), "circular dependency detected for variable \"A\"; path: A -> B -> A");
    }
}
