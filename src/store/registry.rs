use super::rule::Rule;
use super::types::{RuleInfo, SearchField};
use crate::analysis::{computability, topology, DependencyTree};
use crate::diagnostics::{RegistryError, ResolveError, Status};
use crate::payload::BaseNames;
use log::debug;
use std::collections::BTreeMap;

/// The set of known rules, keyed by unique name.
///
/// Constructed explicitly and passed by reference to every resolver. Hosts
/// that share one registry across threads wrap it in a lock; a resolver
/// borrows it immutably, so no mutation can overlap a resolution.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    rules: BTreeMap<String, Rule>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// A registry pre-populated with the built-in meteorological rules.
    pub fn with_standard_rules() -> Self {
        let mut registry = Self::new();
        crate::standard::register_standard_rules(&mut registry);
        registry
    }

    pub fn len(&self) -> usize { self.rules.len() }
    pub fn is_empty(&self) -> bool { self.rules.is_empty() }
    pub fn contains(&self, name: &str) -> bool { self.rules.contains_key(name) }

    /// Fails without touching the stored rule when `rule.name()` is taken.
    pub fn register(&mut self, rule: Rule) -> Result<(), RegistryError> {
        if self.rules.contains_key(rule.name()) {
            return Err(RegistryError::DuplicateName { name: rule.name().to_string() });
        }
        debug!("registering derived variable '{}' <- {:?}", rule.name(), rule.dependencies());
        self.rules.insert(rule.name().to_string(), rule);
        Ok(())
    }

    /// Dependents of the removed rule are not checked; they simply become
    /// non-computable.
    pub fn unregister(&mut self, name: &str) -> Result<Rule, RegistryError> {
        let rule = self
            .rules
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound { name: name.to_string() })?;
        debug!("unregistered derived variable '{}'", name);
        Ok(rule)
    }

    pub fn get(&self, name: &str) -> Option<&Rule> { self.rules.get(name) }

    /// Like `get`, for callers where absence is an error.
    pub fn require(&self, name: &str) -> Result<&Rule, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::NotFound { name: name.to_string() })
    }

    /// All rules, sorted by name.
    pub fn list_all(&self) -> Vec<&Rule> { self.rules.values().collect() }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.rules.keys().map(String::as_str) }

    /// Drops every rule. Meant for test isolation.
    pub fn clear(&mut self) { self.rules.clear(); }

    pub fn metadata(&self, name: &str) -> Option<RuleInfo> { self.get(name).map(RuleInfo::from) }

    /// Rules where any of `fields` contains `keyword`, ignoring case. Each rule
    /// appears at most once, in name order.
    pub fn search(&self, keyword: &str, fields: &[SearchField]) -> Vec<RuleInfo> {
        let needle = keyword.to_lowercase();
        self.rules
            .values()
            .filter(|rule| fields.iter().any(|f| f.matches(rule, &needle)))
            .map(RuleInfo::from)
            .collect()
    }

    // --- Graph Queries ---

    pub fn is_computable(&self, name: &str, available: &(impl BaseNames + ?Sized + Sync)) -> bool {
        computability::is_computable(self, name, available)
    }

    pub fn computable_closure(&self, available: &(impl BaseNames + ?Sized + Sync)) -> Vec<String> {
        computability::computable_closure(self, available)
    }

    pub fn status(&self, name: &str, available: &(impl BaseNames + ?Sized + Sync)) -> Status {
        computability::status(self, name, available)
    }

    pub fn dependency_tree(
        &self,
        name: &str,
        recursive: bool,
        available: &(impl BaseNames + ?Sized + Sync),
    ) -> Result<DependencyTree, RegistryError> {
        topology::dependency_tree(self, name, recursive, available)
    }

    pub fn evaluation_plan(&self, name: &str, available: &(impl BaseNames + ?Sized + Sync)) -> Result<Vec<String>, ResolveError> {
        topology::evaluation_plan(self, name, available)
    }
}
