//! Computability checks: can a name be produced from a given set of base names?
use super::Path;
use crate::diagnostics::{Reason, Status};
use crate::payload::BaseNames;
use crate::store::{Registry, Rule};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

/// True when `name` is a present base name, or a registered rule whose
/// dependencies are all computable without revisiting a rule on the current
/// path. Cycles make a name non-computable; they are not errors here.
pub fn is_computable<N>(registry: &Registry, name: &str, available: &N) -> bool
where
    N: BaseNames + ?Sized,
{
    available.contains_base(name) || rule_computable(registry, name, available)
}

/// Like `is_computable`, but `name` itself is always evaluated as a rule, even
/// when a base value of the same name is present. This is what `resolve` and
/// `status` do with a registered name.
pub fn rule_computable<N>(registry: &Registry, name: &str, available: &N) -> bool
where
    N: BaseNames + ?Sized,
{
    let Some(rule) = registry.get(name) else {
        return false;
    };
    let mut walk = Walk { registry, available, memo: HashMap::new() };
    walk.visit(rule, Path::root())
}

/// Every registered rule name that `resolve` can produce, in lexicographic
/// order.
///
/// Rules are checked independently of each other, so the scan is spread
/// over the rayon pool.
pub fn computable_closure<N>(registry: &Registry, available: &N) -> Vec<String>
where
    N: BaseNames + ?Sized + Sync,
{
    let names: Vec<&str> = registry.names().collect();
    let mut computable: Vec<String> = names
        .par_iter()
        .filter(|name| rule_computable(registry, name, available))
        .map(|name| name.to_string())
        .collect();
    computable.sort();
    computable
}

/// Depth-first walk with a per-call memo of finished rules.
///
/// A rule is memoized only once all its dependencies are settled. Reaching a
/// name on the current path means that name and the one being visited lie on
/// a cycle of required dependencies, so `false` holds on every path and is
/// safe to memoize too.
struct Walk<'a, N: ?Sized> {
    registry: &'a Registry,
    available: &'a N,
    memo: HashMap<&'a str, bool>,
}

impl<'a, N: BaseNames + ?Sized> Walk<'a, N> {
    fn visit(&mut self, rule: &'a Rule, path: Path<'_>) -> bool {
        let name = rule.name();
        if let Some(&known) = self.memo.get(name) {
            return known;
        }
        if path.contains(name) {
            return false;
        }
        let registry = self.registry;
        let met = path.with(name, |path| {
            rule.dependencies().iter().all(|dep| {
                self.available.contains_base(dep)
                    || registry.get(dep).is_some_and(|dep_rule| self.visit(dep_rule, path))
            })
        });
        self.memo.insert(name, met);
        met
    }
}

/// Computability with the reason it fails, matching what the resolver would do.
pub fn status<N>(registry: &Registry, name: &str, available: &N) -> Status
where
    N: BaseNames + ?Sized,
{
    let Some(rule) = registry.get(name) else {
        return Status::not_registered();
    };

    let mut walk = StatusWalk { registry, available, memo: HashMap::new(), missing: BTreeSet::new(), cycle: false };
    if walk.visit(rule, Path::root()) {
        return Status::computable();
    }

    Status {
        computable: false,
        missing: walk.missing.into_iter().collect(),
        reason: Some(if walk.cycle { Reason::Cycle } else { Reason::Deps }),
    }
}

/// Visits every dependency (no short-circuit) so all missing names are
/// collected, and notes whether any cycle is reachable. A memoized rule was
/// fully explored on its first visit, so its missing names and cycles are
/// already recorded.
struct StatusWalk<'a, N: ?Sized> {
    registry: &'a Registry,
    available: &'a N,
    memo: HashMap<&'a str, bool>,
    missing: BTreeSet<String>,
    cycle: bool,
}

impl<'a, N: BaseNames + ?Sized> StatusWalk<'a, N> {
    fn visit(&mut self, rule: &'a Rule, path: Path<'_>) -> bool {
        let name = rule.name();
        if let Some(&known) = self.memo.get(name) {
            return known;
        }
        if path.contains(name) {
            self.cycle = true;
            return false;
        }

        let registry = self.registry;
        let met = path.with(name, |path| {
            let mut all_met = true;
            for dep in rule.dependencies() {
                if self.available.contains_base(dep) {
                    continue;
                }
                let dep_met = match registry.get(dep) {
                    Some(dep_rule) => self.visit(dep_rule, path),
                    None => {
                        self.missing.insert(dep.clone());
                        false
                    }
                };
                all_met &= dep_met;
            }
            all_met
        });
        self.memo.insert(name, met);
        met
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::DataArray;
    use crate::store::Rule;
    use rstest::rstest;

    fn rule(name: &str, deps: &[&str]) -> Rule {
        Rule::new(name, deps.iter().copied(), |_| Ok(DataArray::scalar(0.0))).unwrap()
    }

    fn registry(rules: &[(&str, &[&str])]) -> Registry {
        let mut reg = Registry::new();
        for (name, deps) in rules {
            reg.register(rule(name, deps)).unwrap();
        }
        reg
    }

    #[rstest]
    #[case(&["temperature", "pressure"], true)]
    #[case(&["temperature"], false)]
    #[case(&[], false)]
    fn test_direct_rule_computability(#[case] base: &[&str], #[case] expected: bool) {
        let reg = registry(&[("theta", &["temperature", "pressure"])]);
        assert_eq!(reg.is_computable("theta", base), expected);
    }

    #[test]
    fn test_base_names_are_computable_without_rules() {
        let reg = Registry::new();
        assert!(reg.is_computable("temperature", &["temperature"][..]));
        assert!(!reg.is_computable("pressure", &["temperature"][..]));
    }

    #[test]
    fn test_cycle_is_not_computable_and_reported_for_both_names() {
        let reg = registry(&[("A", &["B"]), ("B", &["A"])]);
        let base: [&str; 0] = [];
        assert!(!reg.is_computable("A", &base[..]));

        for name in ["A", "B"] {
            let status = reg.status(name, &base[..]);
            assert!(!status.computable);
            assert_eq!(status.reason, Some(Reason::Cycle), "for {}", name);
        }
    }

    #[test]
    fn test_cycle_reachable_downstream_is_reported() {
        let reg = registry(&[("X", &["A", "q"]), ("A", &["B"]), ("B", &["A"])]);
        let status = reg.status("X", &["q"][..]);
        assert_eq!(status.reason, Some(Reason::Cycle));
    }

    #[test]
    fn test_base_value_shadowing_breaks_a_cycle() {
        let reg = registry(&[("A", &["B"]), ("B", &["A"])]);
        assert!(reg.is_computable("A", &["B"][..]));
        assert_eq!(reg.status("A", &["B"][..]), Status::computable());
    }

    #[test]
    fn test_status_collects_every_missing_name() {
        let reg = registry(&[("C", &["B", "z"]), ("B", &["x", "y"])]);
        let status = reg.status("C", &["y"][..]);
        assert!(!status.computable);
        assert_eq!(status.reason, Some(Reason::Deps));
        assert_eq!(status.missing, vec!["x".to_string(), "z".to_string()]);
    }

    #[test]
    fn test_status_of_unregistered_name() {
        let reg = Registry::new();
        let status = reg.status("nope", &["nope"][..]);
        assert_eq!(status.reason, Some(Reason::NotRegistered));
        assert!(!status.computable);
    }

    #[test]
    fn test_sibling_branches_share_a_name_without_false_cycles() {
        // Diamond: D needs B and C, both need A.
        let reg = registry(&[("D", &["B", "C"]), ("B", &["A"]), ("C", &["A"]), ("A", &["base"])]);
        assert!(reg.is_computable("D", &["base"][..]));
        assert_eq!(reg.status("D", &["base"][..]), Status::computable());
    }

    #[test]
    fn test_closure_is_sorted_and_skips_unsatisfied_rules() {
        let reg = registry(&[
            ("zeta", &["a"]),
            ("alpha", &["a"]),
            ("chained", &["alpha"]),
            ("needs_b", &["b"]),
            ("loop", &["loop"]),
        ]);
        let base: std::collections::HashSet<String> = ["a".to_string()].into_iter().collect();
        assert_eq!(reg.computable_closure(&base), vec!["alpha", "chained", "zeta"]);
    }

    /// `L_i` and `M_i` both need `L_{i-1}` and `M_{i-1}`: every level doubles
    /// the number of paths to the bottom.
    fn ladder(depth: usize) -> Registry {
        let mut reg = Registry::new();
        reg.register(rule("L0", &["base"])).unwrap();
        reg.register(rule("M0", &["base"])).unwrap();
        for i in 1..=depth {
            let (l, m) = (format!("L{}", i - 1), format!("M{}", i - 1));
            reg.register(rule(&format!("L{}", i), &[l.as_str(), m.as_str()])).unwrap();
            reg.register(rule(&format!("M{}", i), &[l.as_str(), m.as_str()])).unwrap();
        }
        reg
    }

    #[test]
    fn test_deep_diamond_ladder_is_checked_in_linear_time() {
        let reg = ladder(40);
        let started = std::time::Instant::now();

        assert!(reg.is_computable("L40", &["base"][..]));
        assert_eq!(reg.status("L40", &["base"][..]), Status::computable());
        assert_eq!(reg.computable_closure(&["base"][..]).len(), 82);

        let status = reg.status("M40", &["other"][..]);
        assert_eq!(status.reason, Some(Reason::Deps));
        assert_eq!(status.missing, vec!["base".to_string()]);
        assert!(!reg.is_computable("M40", &["other"][..]));

        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_cycle_below_a_shared_node_is_still_reported() {
        // `shared` is finished through `left` before `right` reaches it again.
        let reg = registry(&[
            ("top", &["left", "right"]),
            ("left", &["shared"]),
            ("right", &["shared"]),
            ("shared", &["loop_a"]),
            ("loop_a", &["loop_b"]),
            ("loop_b", &["loop_a"]),
        ]);
        let status = reg.status("top", &["x"][..]);
        assert_eq!(status.reason, Some(Reason::Cycle));
        assert!(!reg.is_computable("top", &["x"][..]));
    }

    #[test]
    fn test_registered_name_present_in_pool_is_listed_only_if_its_rule_works() {
        // `x` is both a base value and a rule that needs the absent `y`.
        let reg = registry(&[("x", &["y"]), ("uses_x", &["x"])]);
        let base = ["x"];

        assert!(reg.is_computable("x", &base[..]));
        assert!(!rule_computable(&reg, "x", &base[..]));
        assert!(!reg.status("x", &base[..]).computable);
        // Dependents read `x` from the pool.
        assert!(rule_computable(&reg, "uses_x", &base[..]));
        assert_eq!(reg.computable_closure(&base[..]), vec!["uses_x"]);
    }
}
