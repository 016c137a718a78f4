//! Rule declarations: a name, the names it depends on, and how to compute it.
use crate::diagnostics::{ComputeError, RegistryError};
use crate::payload::{DType, DataArray, DependencyPool, Metadata};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Computes a rule's payload from its resolved dependencies.
pub type ComputeFn = Arc<dyn Fn(&DependencyPool) -> Result<DataArray, ComputeError> + Send + Sync>;

/// Dependencies are kept inline; most rules have one to three.
pub type Dependencies = SmallVec<[String; 4]>;

/// An immutable derivation rule.
///
/// Dependencies are plain names, bound lazily: they may refer to base values
/// or to rules registered later.
#[derive(Clone)]
pub struct Rule {
    name: String,
    dependencies: Dependencies,
    func: ComputeFn,
    description: String,
    metadata: Metadata,
    formula: Option<String>,
    standard_name: Option<String>,
    long_name: Option<String>,
    output_dims_hint: Option<Vec<String>>,
    output_dtype_hint: Option<DType>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Rule {
    pub fn builder<D, F>(name: impl Into<String>, dependencies: impl IntoIterator<Item = D>, func: F) -> RuleBuilder
    where
        D: Into<String>,
        F: Fn(&DependencyPool) -> Result<DataArray, ComputeError> + Send + Sync + 'static,
    {
        RuleBuilder {
            name: name.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            func: Arc::new(func),
            description: None,
            metadata: Metadata::new(),
            formula: None,
            standard_name: None,
            long_name: None,
            output_dims_hint: None,
            output_dtype_hint: None,
        }
    }

    /// Shorthand for a rule without descriptive fields.
    pub fn new<D, F>(name: impl Into<String>, dependencies: impl IntoIterator<Item = D>, func: F) -> Result<Self, RegistryError>
    where
        D: Into<String>,
        F: Fn(&DependencyPool) -> Result<DataArray, ComputeError> + Send + Sync + 'static,
    {
        Self::builder(name, dependencies, func).build()
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn dependencies(&self) -> &[String] { &self.dependencies }
    pub fn description(&self) -> &str { &self.description }
    pub fn metadata(&self) -> &Metadata { &self.metadata }
    pub fn formula(&self) -> Option<&str> { self.formula.as_deref() }
    pub fn standard_name(&self) -> Option<&str> { self.standard_name.as_deref() }
    pub fn long_name(&self) -> Option<&str> { self.long_name.as_deref() }
    pub fn output_dims_hint(&self) -> Option<&[String]> { self.output_dims_hint.as_deref() }
    pub fn output_dtype_hint(&self) -> Option<DType> { self.output_dtype_hint }

    /// Runs the compute function. Does not validate its output; the resolver does.
    pub fn compute(&self, pool: &DependencyPool) -> Result<DataArray, ComputeError> {
        (self.func)(pool)
    }
}

pub struct RuleBuilder {
    name: String,
    dependencies: Dependencies,
    func: ComputeFn,
    description: Option<String>,
    metadata: Metadata,
    formula: Option<String>,
    standard_name: Option<String>,
    long_name: Option<String>,
    output_dims_hint: Option<Vec<String>>,
    output_dtype_hint: Option<DType>,
}

impl RuleBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn standard_name(mut self, standard_name: impl Into<String>) -> Self {
        self.standard_name = Some(standard_name.into());
        self
    }

    pub fn long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = Some(long_name.into());
        self
    }

    pub fn dims_hint<D: Into<String>>(mut self, dims: impl IntoIterator<Item = D>) -> Self {
        self.output_dims_hint = Some(dims.into_iter().map(Into::into).collect());
        self
    }

    pub fn dtype_hint(mut self, dtype: DType) -> Self {
        self.output_dtype_hint = Some(dtype);
        self
    }

    /// Validates the declaration and folds the descriptive fields into the
    /// metadata map without overriding explicit attributes.
    pub fn build(self) -> Result<Rule, RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidRule { reason: "rule name must be a non-empty string".into() });
        }
        if let Some(pos) = self.dependencies.iter().position(|d| d.trim().is_empty()) {
            return Err(RegistryError::InvalidRule {
                reason: format!("dependency #{} of \"{}\" is an empty name", pos, self.name),
            });
        }

        let mut metadata = self.metadata;
        if let Some(sn) = &self.standard_name {
            metadata.entry("standard_name".into()).or_insert_with(|| sn.clone().into());
        }
        if let Some(ln) = &self.long_name {
            metadata.entry("long_name".into()).or_insert_with(|| ln.clone().into());
        }
        if let Some(dtype) = self.output_dtype_hint {
            metadata.entry("_expected_dtype".into()).or_insert_with(|| dtype.to_string().into());
        }

        Ok(Rule {
            description: self.description.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            dependencies: self.dependencies,
            func: self.func,
            metadata,
            formula: self.formula,
            standard_name: self.standard_name,
            long_name: self.long_name,
            output_dims_hint: self.output_dims_hint,
            output_dtype_hint: self.output_dtype_hint,
        })
    }
}
