//! A synchronous, single-threaded resolution engine.
use crate::analysis::{computability, topology, DependencyTree};
use crate::compute::ledger::Ledger;
use crate::diagnostics::{ComputeError, RegistryError, ResolveError, Signature, Status, UnavailableDependency};
use crate::payload::{BasePool, DataArray, DependencyPool};
use crate::store::{Registry, Rule};
use log::{debug, trace, warn};
use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A resolution session bound to one pool of base values.
///
/// Derived values are computed on demand, dependencies first, and kept in the
/// session's ledger for its whole lifetime. The resolver borrows the registry,
/// so the registry cannot change while a session is alive. Concurrent use
/// needs one resolver per thread.
pub struct Resolver<'r, P: BasePool + ?Sized> {
    registry: &'r Registry,
    pool: &'r P,
    ledger: Ledger,
    /// Rule names currently being resolved, outermost first.
    stack: Vec<String>,
}

impl<'r, P: BasePool + ?Sized> Resolver<'r, P> {
    pub fn new(registry: &'r Registry, pool: &'r P) -> Self {
        Self { registry, pool, ledger: Ledger::new(), stack: Vec::new() }
    }

    pub fn registry(&self) -> &'r Registry { self.registry }
    pub fn pool(&self) -> &'r P { self.pool }

    /// Computes (or returns the cached) payload of the derived variable `name`.
    ///
    /// Base values are not resolved through here: a name that is only present
    /// in the pool is an `UnknownVariable`.
    pub fn resolve(&mut self, name: &str) -> Result<Arc<DataArray>, ResolveError> {
        self.stack.clear();
        self.resolve_inner(name)
    }

    fn resolve_inner(&mut self, name: &str) -> Result<Arc<DataArray>, ResolveError> {
        if let Some(hit) = self.ledger.get(name) {
            trace!("cache hit for '{}'", name);
            return Ok(hit.clone());
        }

        if self.stack.iter().any(|n| n == name) {
            let mut path = self.stack.clone();
            path.push(name.to_string());
            return Err(ResolveError::CyclicDependency { name: name.to_string(), path });
        }

        let registry = self.registry;
        let rule = registry
            .get(name)
            .ok_or_else(|| ResolveError::UnknownVariable { name: name.to_string() })?;

        // Single exit point below: the frame is popped on success and on
        // every error path alike.
        self.stack.push(name.to_string());
        let result = self.evaluate(rule);
        self.stack.pop();

        let payload = result?;
        debug!("computed derived variable '{}'", name);
        Ok(self.ledger.insert(name, payload))
    }

    fn evaluate(&mut self, rule: &'r Rule) -> Result<Arc<DataArray>, ResolveError> {
        let name = rule.name();
        let mut inputs = DependencyPool::new();
        let mut missing_base = Vec::new();
        let mut unavailable_derived = Vec::new();
        let mut graph_failure = false;
        let mut upstream_failure = None;

        // Every dependency is visited so the diagnostic lists all of them.
        let mut seen = HashSet::new();
        for dep in rule.dependencies() {
            if !seen.insert(dep.as_str()) {
                continue;
            }
            if let Some(value) = self.pool.get_base(dep) {
                trace!("'{}': base dependency '{}'", name, dep);
                inputs.insert(dep.as_str(), value);
            } else if self.registry.contains(dep) {
                trace!("'{}': resolving derived dependency '{}'", name, dep);
                match self.resolve_inner(dep) {
                    Ok(value) => inputs.insert(dep.as_str(), value),
                    Err(err) if err.is_cycle() => return Err(err),
                    Err(err) => {
                        unavailable_derived.push(UnavailableDependency { name: dep.clone(), reason: err.summary() });
                        match err {
                            ResolveError::ComputationFailure { .. } => {
                                upstream_failure.get_or_insert(err);
                            }
                            _ => graph_failure = true,
                        }
                    }
                }
            } else {
                missing_base.push(dep.clone());
            }
        }

        if graph_failure || !missing_base.is_empty() {
            return Err(ResolveError::MissingDependency {
                name: name.to_string(),
                missing_base,
                unavailable_derived,
            });
        }
        // The graph is satisfiable but an upstream compute function failed.
        if let Some(err) = upstream_failure {
            return Err(err);
        }

        // A panicking compute function fails this rule only; the stack is
        // still popped by the caller.
        let computed = catch_unwind(AssertUnwindSafe(|| rule.compute(&inputs)))
            .unwrap_or_else(|payload| Err(ComputeError::msg(format!("compute function panicked: {}", panic_message(&*payload)))));
        let output = computed.map_err(|e| {
            warn!("computation of '{}' failed: {}", name, e);
            ResolveError::ComputationFailure { name: name.to_string(), message: e.to_string() }
        })?;

        self.finalize(rule, output).map(Arc::new)
    }

    /// Checks the returned payload, merges metadata (payload keys win) and
    /// stamps the rule name on it.
    fn finalize(&self, rule: &Rule, mut output: DataArray) -> Result<DataArray, ResolveError> {
        let name = rule.name();
        let failure = |message: String| {
            warn!("derived variable '{}' returned an invalid payload: {}", name, message);
            ResolveError::ComputationFailure { name: name.to_string(), message }
        };

        output
            .check_shape()
            .map_err(|msg| failure(format!("computation returned a malformed payload: {}", msg)))?;
        if let Some(expected) = rule.output_dtype_hint() {
            if output.dtype() != expected {
                return Err(failure(format!(
                    "computation returned an unexpected payload type: expected {}, got {}",
                    expected,
                    output.dtype()
                )));
            }
        }

        let mut attrs = rule.metadata().clone();
        attrs.append(&mut output.attrs);
        output.attrs = attrs;
        if output.name.as_deref() != Some(name) {
            output.name = Some(name.to_string());
        }
        Ok(output)
    }

    // --- Cache ---

    pub fn clear_cache(&mut self) { self.ledger.clear(); }

    pub fn invalidate<'n>(&mut self, names: impl IntoIterator<Item = &'n str>) {
        self.ledger.invalidate(names);
    }

    pub fn cached(&self, name: &str) -> Option<Arc<DataArray>> { self.ledger.get(name).cloned() }
    pub fn is_cached(&self, name: &str) -> bool { self.ledger.contains(name) }
    pub fn cache_len(&self) -> usize { self.ledger.len() }
    pub fn cached_names(&self) -> Vec<&str> { self.ledger.names() }

    // --- Queries against the bound pool ---

    /// Whether `resolve(name)` can succeed graph-wise. `name` is evaluated as
    /// a rule even when the pool holds a base value of the same name, so this
    /// agrees with `status` and `list_computable`.
    pub fn is_computable(&self, name: &str) -> bool {
        computability::rule_computable(self.registry, name, self.pool)
    }

    pub fn status(&self, name: &str) -> Status {
        computability::status(self.registry, name, self.pool)
    }

    pub fn list_computable(&self) -> Vec<String>
    where
        P: Sync,
    {
        computability::computable_closure(self.registry, self.pool)
    }

    pub fn dependency_tree(&self, name: &str, recursive: bool) -> Result<DependencyTree, RegistryError> {
        topology::dependency_tree(self.registry, name, recursive, self.pool)
    }

    pub fn evaluation_plan(&self, name: &str) -> Result<Vec<String>, ResolveError> {
        topology::evaluation_plan(self.registry, name, self.pool)
    }

    /// The dims, dtype and deferral of `name`'s output, inferred without
    /// computing it.
    pub fn expected_signature(&self, name: &str) -> Result<Signature, RegistryError> {
        let rule = self.registry.require(name)?;
        let computable = self.status(name).computable;

        let mut inferred_dims = BTreeSet::new();
        let mut deferred = false;
        if computable {
            for dep in rule.dependencies() {
                if let Some(base) = self.pool.get_base(dep) {
                    deferred |= base.deferred;
                    inferred_dims.extend(base.dims.iter().cloned());
                }
            }
        }

        let dims = match rule.output_dims_hint() {
            Some(hint) => Some(hint.to_vec()),
            None if !inferred_dims.is_empty() => Some(inferred_dims.into_iter().collect()),
            None => None,
        };
        Ok(Signature { dims, dtype: rule.output_dtype_hint().map(|d| d.to_string()), deferred })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
