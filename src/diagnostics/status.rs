//! Serializable reports describing what a session can compute.
use serde::Serialize;

/// Why a name is not computable against the current pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    NotRegistered,
    /// At least one reachable base name is absent and no cycle was reached.
    Deps,
    Cycle,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::NotRegistered => "not_registered",
            Reason::Deps => "deps",
            Reason::Cycle => "cycle",
        }
    }
}

/// Computability of one name, evaluated fresh against a base pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub computable: bool,
    /// Sorted and deduplicated. Always empty when `computable` is true.
    pub missing: Vec<String>,
    pub reason: Option<Reason>,
}

impl Status {
    pub fn computable() -> Self {
        Self { computable: true, missing: Vec::new(), reason: None }
    }

    pub fn not_registered() -> Self {
        Self { computable: false, missing: Vec::new(), reason: Some(Reason::NotRegistered) }
    }
}

/// What the output of a rule is expected to look like, before computing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    /// `None` when neither a hint nor the pool can tell.
    pub dims: Option<Vec<String>>,
    pub dtype: Option<String>,
    /// True when a direct base dependency is backed by a deferred graph.
    pub deferred: bool,
}

impl Signature {
    pub fn dims_str(&self) -> String {
        match &self.dims {
            Some(dims) => format!("({})", dims.join(", ")),
            None => "(...)".to_string(),
        }
    }

    pub fn dtype_str(&self) -> &str {
        self.dtype.as_deref().unwrap_or("unknown")
    }
}
