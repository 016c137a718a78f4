//! Pure graph queries over the registry. Nothing here runs a compute function.
pub mod computability;
pub mod topology;

pub use topology::{DependencyNode, DependencyStatus, DependencyTree};

/// The rule names on the current recursion path, as a persistent list.
///
/// Extending a path never mutates it: `with` links a new frame on the stack
/// and hands the callee the longer path, so sibling branches each see exactly
/// their own ancestors.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Path<'a> {
    link: Option<&'a Link<'a>>,
}

#[derive(Debug)]
struct Link<'a> {
    name: &'a str,
    parent: Path<'a>,
}

impl<'a> Path<'a> {
    pub(crate) fn root() -> Self { Self { link: None } }

    pub(crate) fn contains(self, name: &str) -> bool {
        self.iter().any(|n| n == name)
    }

    pub(crate) fn with<R>(self, name: &str, f: impl FnOnce(Path<'_>) -> R) -> R {
        let link = Link { name, parent: self };
        f(Path { link: Some(&link) })
    }

    /// Root first.
    pub(crate) fn to_vec(self) -> Vec<String> {
        let mut names: Vec<String> = self.iter().map(str::to_string).collect();
        names.reverse();
        names
    }

    fn iter(self) -> impl Iterator<Item = &'a str> {
        std::iter::successors(self.link, |link| link.parent.link).map(|link| link.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_paths_do_not_leak() {
        let root = Path::root();
        root.with("a", |a| {
            a.with("b", |ab| {
                assert!(ab.contains("a"));
                assert!(ab.contains("b"));
                assert_eq!(ab.to_vec(), vec!["a", "b"]);
            });
            a.with("c", |ac| {
                assert!(!ac.contains("b"));
                assert_eq!(ac.to_vec(), vec!["a", "c"]);
            });
            assert!(!a.contains("c"));
        });
        assert!(!root.contains("a"));
    }
}
