//! ledger.rs
//! Memoized payloads for one resolution session.

use crate::payload::DataArray;
use std::collections::HashMap;
use std::sync::Arc;

/// Results computed by a resolver. Entries are final: only an explicit
/// `clear` or `invalidate` removes them.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    values: HashMap<String, Arc<DataArray>>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    #[inline(always)]
    pub fn get(&self, name: &str) -> Option<&Arc<DataArray>> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool { self.values.contains_key(name) }

    /// Keeps an existing entry; a name is stored once per session.
    pub fn insert(&mut self, name: impl Into<String>, value: Arc<DataArray>) -> Arc<DataArray> {
        self.values.entry(name.into()).or_insert(value).clone()
    }

    pub fn invalidate<'n>(&mut self, names: impl IntoIterator<Item = &'n str>) {
        for name in names {
            self.values.remove(name);
        }
    }

    pub fn clear(&mut self) { self.values.clear(); }

    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Cached names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
