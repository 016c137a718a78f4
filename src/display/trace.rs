use crate::analysis::{DependencyNode, DependencyStatus, DependencyTree};
use crate::compute::Resolver;
use crate::config::DisplayConfig;
use crate::diagnostics::{Reason, Status};
use crate::payload::BasePool;
use std::fmt::Write;

/// Renders a dependency tree with one line per node.
///
/// ```text
/// DEPENDENCY TREE for 'smr': Saturation mixing ratio.
/// --------------------------------------------------
/// |-- air_pressure [base, missing]
/// `-- svp [derived]
///    `-- air_temperature [base, present]
/// ```
pub fn format_tree(tree: &DependencyTree) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "DEPENDENCY TREE for '{}': {}", tree.name, tree.description);
    let _ = writeln!(output, "--------------------------------------------------");
    if tree.dependencies.is_empty() {
        let _ = writeln!(output, "`-- (no dependencies)");
    }
    trace_children(&mut output, "", &tree.dependencies);
    output
}

fn trace_children(output: &mut String, prefix: &str, children: &[DependencyNode]) {
    let stem = build_child_stem(prefix);
    for (i, child) in children.iter().enumerate() {
        let connector = if i == children.len() - 1 { "`--" } else { "|--" };
        let full_prefix = format!("{}{}", stem, connector);
        let _ = writeln!(output, "{} {} [{}]", full_prefix, child.name, status_label(child.status));
        if let Some(grandchildren) = &child.dependencies {
            trace_children(output, &full_prefix, grandchildren);
        }
    }
}

fn status_label(status: DependencyStatus) -> &'static str {
    match status {
        DependencyStatus::BasePresent => "base, present",
        DependencyStatus::BaseMissing => "base, missing",
        DependencyStatus::Derived => "derived",
        DependencyStatus::CycleDetected => "cycle detected",
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}

/// One line per registered rule, with its expected signature and whether it
/// can be computed from the resolver's pool.
pub fn format_summary<P>(resolver: &Resolver<'_, P>, config: &DisplayConfig) -> String
where
    P: BasePool + ?Sized,
{
    let registry = resolver.registry();
    let mut output = String::new();
    let header = "Derived variables";
    let _ = writeln!(output, "{}", header);
    let _ = writeln!(output, "{}", "-".repeat(header.len()));

    let base = resolver.pool().base_names();
    let shown = &base[..base.len().min(config.max_listed_base_names)];
    let ellipsis = if base.len() > shown.len() { "..." } else { "" };
    let _ = writeln!(
        output,
        "Base variables (first {}): {:?}{}",
        config.max_listed_base_names, shown, ellipsis
    );
    let _ = writeln!(output);

    if registry.is_empty() {
        let _ = writeln!(output, "  No derived variables registered.");
        return output;
    }

    let _ = writeln!(output, "Registered derived variables ({} registered):", registry.len());
    let mut listed = 0;
    for rule in registry.list_all() {
        let status = resolver.status(rule.name());
        if config.show_computable_only && !status.computable {
            continue;
        }
        listed += 1;

        let signature = match resolver.expected_signature(rule.name()) {
            Ok(sig) => format!("{} {}{}", sig.dims_str(), sig.dtype_str(), if sig.deferred { " deferred" } else { "" }),
            Err(_) => "(...) unknown".to_string(),
        };
        let _ = writeln!(
            output,
            "  - {} {}: {} ({})",
            rule.name(),
            signature,
            rule.description(),
            status_text(&status)
        );
    }
    if listed == 0 {
        let _ = writeln!(output, "  No computable derived variables for this pool.");
    }
    output
}

fn status_text(status: &Status) -> String {
    if status.computable {
        return "computable".to_string();
    }
    match status.reason {
        Some(Reason::Cycle) => format!("unavailable (reason: {})", Reason::Cycle.as_str()),
        _ if !status.missing.is_empty() => format!("unavailable (missing: {:?})", status.missing),
        Some(reason) => format!("unavailable (reason: {})", reason.as_str()),
        None => "unavailable (reason: unknown)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{DataArray, Dataset};
    use crate::store::{Registry, Rule};

    fn rule(name: &str, deps: &[&str], description: &str) -> Rule {
        Rule::builder(name, deps.iter().copied(), |_| Ok(DataArray::scalar(0.0)))
            .description(description)
            .build()
            .unwrap()
    }

    fn humidity_registry() -> Registry {
        let mut reg = Registry::new();
        reg.register(rule("smr", &["air_pressure", "svp"], "Saturation mixing ratio.")).unwrap();
        reg.register(rule("svp", &["air_temperature"], "Saturation vapour pressure.")).unwrap();
        reg.register(rule("loop", &["loop"], "Refers to itself.")).unwrap();
        reg
    }

    fn pool() -> Dataset {
        Dataset::new().with_variable("air_temperature", DataArray::from_vec("time", vec![280.0, 281.0]))
    }

    #[test]
    fn test_tree_uses_connectors_and_nests_children() {
        let reg = humidity_registry();
        let tree = reg.dependency_tree("smr", true, &pool()).unwrap();
        let expected = "\
DEPENDENCY TREE for 'smr': Saturation mixing ratio.
--------------------------------------------------
|-- air_pressure [base, missing]
`-- svp [derived]
   `-- air_temperature [base, present]
";
        assert_eq!(format_tree(&tree), expected);
    }

    #[test]
    fn test_tree_marks_cycles() {
        let reg = humidity_registry();
        let tree = reg.dependency_tree("loop", true, &pool()).unwrap();
        assert!(format_tree(&tree).ends_with("`-- loop [cycle detected]\n"));
    }

    #[test]
    fn test_summary_lists_every_rule_with_status() {
        let reg = humidity_registry();
        let ds = pool();
        let resolver = Resolver::new(&reg, &ds);
        let text = format_summary(&resolver, &DisplayConfig::default());

        assert!(text.starts_with("Derived variables\n-----------------\n"));
        assert!(text.contains("Base variables (first 5): [\"air_temperature\"]\n"));
        assert!(text.contains("  - svp (time) unknown: Saturation vapour pressure. (computable)"), "{}", text);
        assert!(text.contains("  - smr (...) unknown: Saturation mixing ratio. (unavailable (missing: [\"air_pressure\"]))"));
        assert!(text.contains("  - loop (...) unknown: Refers to itself. (unavailable (reason: cycle))"));
    }

    #[test]
    fn test_summary_honours_config() {
        let reg = humidity_registry();
        let ds = pool()
            .with_variable("a", DataArray::scalar(1.0))
            .with_variable("b", DataArray::scalar(1.0));
        let resolver = Resolver::new(&reg, &ds);
        let config = DisplayConfig { show_computable_only: true, max_listed_base_names: 2 };
        let text = format_summary(&resolver, &config);

        assert!(text.contains("Base variables (first 2): [\"a\", \"air_temperature\"]...\n"), "{}", text);
        assert!(text.contains("  - svp"));
        assert!(!text.contains("  - smr"));
        assert!(!text.contains("  - loop"));
    }

    #[test]
    fn test_summary_of_empty_registry() {
        let reg = Registry::new();
        let ds = Dataset::new();
        let text = format_summary(&Resolver::new(&reg, &ds), &DisplayConfig::default());
        assert!(text.ends_with("  No derived variables registered.\n"));
    }
}
