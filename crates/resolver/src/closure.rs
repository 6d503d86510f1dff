//! Dependency closure over Debian package records

use repofetch_repository::DebIndex;
use repofetch_types::ResolvedPackage;
use std::collections::{BTreeSet, VecDeque};

/// Outcome of a closure walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureResult {
    /// Required packages that have a record, sorted by name
    pub resolved: Vec<ResolvedPackage>,
    /// Required names with no record in any repository, sorted
    pub unknown: Vec<String>,
}

/// Compute every package reachable from `requested` through `Depends`
///
/// The required set doubles as the visited set, so cyclic dependency
/// graphs terminate. Names without a record stay required but produce no
/// resolved entry.
#[must_use]
pub fn resolve_closure(requested: &[String], index: &DebIndex) -> ClosureResult {
    let mut required: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = requested.iter().cloned().collect();

    while let Some(name) = queue.pop_front() {
        if required.contains(&name) {
            continue;
        }
        if let Some(record) = index.get(&name) {
            queue.extend(
                record
                    .depends
                    .iter()
                    .filter(|dep| !required.contains(*dep) && **dep != name)
                    .cloned(),
            );
        }
        required.insert(name);
    }

    let mut result = ClosureResult::default();
    for name in required {
        match index.get(&name) {
            Some(record) => result.resolved.push(record.to_resolved()),
            None => result.unknown.push(name),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use repofetch_types::PackageRecord;

    fn record(name: &str, deps: &[&str]) -> PackageRecord {
        PackageRecord::new(name, "http://x/")
            .with_depends(deps.iter().map(ToString::to_string).collect())
            .with_artifact(format!("pool/{name}.deb"))
    }

    fn names(result: &ClosureResult) -> Vec<&str> {
        result.resolved.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_cyclic_graph_terminates() {
        let mut index = DebIndex::new();
        index.insert(record("A", &["B", "C"]));
        index.insert(record("B", &["C"]));
        index.insert(record("C", &["A"]));

        let result = resolve_closure(&["A".to_string()], &index);
        assert_eq!(names(&result), vec!["A", "B", "C"]);
        assert!(result.unknown.is_empty());
    }

    #[test]
    fn test_output_sorted_regardless_of_input_order() {
        let mut index = DebIndex::new();
        index.insert(record("zeta", &["alpha"]));
        index.insert(record("alpha", &[]));
        index.insert(record("mid", &["zeta"]));

        let result = resolve_closure(&["mid".to_string(), "zeta".to_string()], &index);
        assert_eq!(names(&result), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_unknown_dependencies_dropped_silently() {
        let mut index = DebIndex::new();
        index.insert(record("app", &["libc6", "util"]));
        index.insert(record("util", &[]));

        let result = resolve_closure(&["app".to_string()], &index);
        assert_eq!(names(&result), vec!["app", "util"]);
        assert_eq!(result.unknown, vec!["libc6"]);
    }

    #[test]
    fn test_resolved_urls() {
        let mut index = DebIndex::new();
        index.insert(record("a", &[]));
        let result = resolve_closure(&["a".to_string()], &index);
        assert_eq!(
            result.resolved[0].download_url.as_deref(),
            Some("http://x/pool/a.deb")
        );
        assert_eq!(result.resolved[0].local_filename.as_deref(), Some("a.deb"));
    }
}
