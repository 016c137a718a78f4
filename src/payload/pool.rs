//! Lookup contracts for base values, and the concrete pools the crate ships.
use super::array::DataArray;
use crate::diagnostics::ComputeError;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Existence check for base names. Graph queries only need this.
pub trait BaseNames {
    fn contains_base(&self, name: &str) -> bool;
}

/// A pool of base values, looked up by exact name.
pub trait BasePool: BaseNames {
    fn get_base(&self, name: &str) -> Option<Arc<DataArray>>;

    /// Base names in a stable order, for reporting.
    fn base_names(&self) -> Vec<String>;
}

impl BaseNames for HashSet<String> {
    fn contains_base(&self, name: &str) -> bool { self.contains(name) }
}

impl BaseNames for BTreeSet<String> {
    fn contains_base(&self, name: &str) -> bool { self.contains(name) }
}

impl<S: AsRef<str>> BaseNames for [S] {
    fn contains_base(&self, name: &str) -> bool {
        self.iter().any(|s| s.as_ref() == name)
    }
}

impl<S: AsRef<str>> BaseNames for Vec<S> {
    fn contains_base(&self, name: &str) -> bool { self.as_slice().contains_base(name) }
}

impl BaseNames for HashMap<String, Arc<DataArray>> {
    fn contains_base(&self, name: &str) -> bool { self.contains_key(name) }
}

impl BasePool for HashMap<String, Arc<DataArray>> {
    fn get_base(&self, name: &str) -> Option<Arc<DataArray>> { self.get(name).cloned() }

    fn base_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keys().cloned().collect();
        names.sort();
        names
    }
}

/// A collection of named data variables and coordinates. Both count as
/// base values.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    variables: BTreeMap<String, Arc<DataArray>>,
    coords: BTreeMap<String, Arc<DataArray>>,
}

impl Dataset {
    pub fn new() -> Self { Self::default() }

    /// Stores `array` under `name`, overwriting its own name.
    pub fn insert_variable(&mut self, name: impl Into<String>, array: DataArray) -> &mut Self {
        let name = name.into();
        self.variables.insert(name.clone(), Arc::new(array.named(name)));
        self
    }

    pub fn insert_coord(&mut self, name: impl Into<String>, array: DataArray) -> &mut Self {
        let name = name.into();
        self.coords.insert(name.clone(), Arc::new(array.named(name)));
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, array: DataArray) -> Self {
        self.insert_variable(name, array);
        self
    }

    pub fn with_coord(mut self, name: impl Into<String>, array: DataArray) -> Self {
        self.insert_coord(name, array);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<DataArray>> {
        self.variables.remove(name).or_else(|| self.coords.remove(name))
    }

    pub fn len(&self) -> usize { self.variables.len() + self.coords.len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl BaseNames for Dataset {
    fn contains_base(&self, name: &str) -> bool {
        self.variables.contains_key(name) || self.coords.contains_key(name)
    }
}

impl BasePool for Dataset {
    fn get_base(&self, name: &str) -> Option<Arc<DataArray>> {
        self.variables.get(name).or_else(|| self.coords.get(name)).cloned()
    }

    /// Variables first, then coordinates.
    fn base_names(&self) -> Vec<String> {
        self.variables.keys().chain(self.coords.keys()).cloned().collect()
    }
}

/// The inputs handed to a rule's compute function: one entry per declared
/// dependency.
#[derive(Debug, Clone, Default)]
pub struct DependencyPool {
    entries: BTreeMap<String, Arc<DataArray>>,
}

impl DependencyPool {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, name: impl Into<String>, value: Arc<DataArray>) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Result<&DataArray, ComputeError> {
        self.entries
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| ComputeError::MissingInput(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool { self.entries.contains_key(name) }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn names(&self) -> impl Iterator<Item = &str> { self.entries.keys().map(String::as_str) }
}

impl<S: Into<String>> FromIterator<(S, DataArray)> for DependencyPool {
    fn from_iter<I: IntoIterator<Item = (S, DataArray)>>(iter: I) -> Self {
        let entries = iter.into_iter().map(|(k, v)| (k.into(), Arc::new(v))).collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_exposes_variables_and_coords() {
        let ds = Dataset::new()
            .with_variable("temperature", DataArray::from_vec("x", vec![280.0]))
            .with_coord("x", DataArray::from_vec("x", vec![0.0]));

        assert!(ds.contains_base("temperature"));
        assert!(ds.contains_base("x"));
        assert!(!ds.contains_base("pressure"));
        assert_eq!(ds.get_base("temperature").unwrap().name.as_deref(), Some("temperature"));
        assert_eq!(ds.base_names(), vec!["temperature".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_name_sets_answer_exact_lookups_only() {
        let names = vec!["air_temperature", "air_pressure"];
        assert!(names.contains_base("air_pressure"));
        assert!(!names.contains_base("air"));

        let set: BTreeSet<String> = ["a".to_string()].into_iter().collect();
        assert!(set.contains_base("a"));
    }

    #[test]
    fn test_dependency_pool_reports_absent_inputs() {
        let pool: DependencyPool = [("a", DataArray::scalar(1.0))].into_iter().collect();
        assert_eq!(pool.get("a").unwrap().item().unwrap(), 1.0);
        assert_eq!(pool.get("b").unwrap_err(), ComputeError::MissingInput("b".into()));
    }
}
