//! Dependency resolution
//!
//! Turns a requested set of artifact names into a [`ResolutionPlan`]: the
//! requested artifacts plus everything they transitively read through
//! `attr_deps`, ordered so that every artifact comes after its
//! dependencies.
//!
//! The walk is iterative over registry indices with a three-colour mark
//! per node. Roots and children are visited in ascending name order, so
//! the same request always produces the same plan.

use crate::error::{CacheError, CacheResult};
use crate::registry::Registry;
use tracing::debug;

/// Ordered list of canonical artifact names to acquire
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPlan {
    order: Vec<String>,
}

impl ResolutionPlan {
    /// Names in acquisition order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of an artifact in the plan
    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }
}

impl<'a> IntoIterator for &'a ResolutionPlan {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// One node on the explicit traversal stack
struct Frame {
    node: usize,
    children: Vec<usize>,
    next: usize,
}

/// Compute the acquisition order for a set of requested artifacts.
///
/// Fails with `UnknownArtifact` if a requested or referenced name is not
/// in the registry and with `CyclicDependency` if the walk meets a node
/// that is still on the stack. Errors never yield a partial plan.
pub fn plan<I, S>(registry: &Registry, requested: I) -> CacheResult<ResolutionPlan>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut roots = Vec::new();
    for name in requested {
        let name = name.as_ref();
        let index = registry
            .index_of(name)
            .ok_or_else(|| CacheError::UnknownArtifact(name.to_string()))?;
        roots.push(index);
    }
    sort_by_name(registry, &mut roots);

    let mut marks = vec![Mark::Unvisited; registry.len()];
    let mut order = Vec::new();

    for root in roots {
        if marks[root] == Mark::Unvisited {
            walk(registry, root, &mut marks, &mut order)?;
        }
    }

    debug!("Resolution plan: {}", order.join(", "));
    Ok(ResolutionPlan { order })
}

fn walk(
    registry: &Registry,
    root: usize,
    marks: &mut [Mark],
    order: &mut Vec<String>,
) -> CacheResult<()> {
    marks[root] = Mark::Visiting;
    let mut stack = vec![frame(registry, root)?];

    loop {
        let Some(top) = stack.last_mut() else {
            break;
        };
        let node = top.node;
        let child = top.children.get(top.next).copied();
        top.next += 1;

        match child {
            Some(child) => match marks[child] {
                Mark::Unvisited => {
                    marks[child] = Mark::Visiting;
                    stack.push(frame(registry, child)?);
                }
                Mark::Visiting => return Err(cycle(registry, &stack, child)),
                Mark::Visited => {}
            },
            None => {
                stack.pop();
                marks[node] = Mark::Visited;
                order.push(registry.at(node).name.clone());
            }
        }
    }

    Ok(())
}

fn frame(registry: &Registry, node: usize) -> CacheResult<Frame> {
    let mut children = Vec::new();
    for dep in &registry.at(node).attr_deps {
        let index = registry
            .index_of(dep)
            .ok_or_else(|| CacheError::UnknownArtifact(dep.clone()))?;
        children.push(index);
    }
    sort_by_name(registry, &mut children);
    Ok(Frame {
        node,
        children,
        next: 0,
    })
}

/// Path from the first occurrence of `back_to` on the stack, closed on itself
fn cycle(registry: &Registry, stack: &[Frame], back_to: usize) -> CacheError {
    let start = stack
        .iter()
        .position(|f| f.node == back_to)
        .unwrap_or_default();
    let mut path: Vec<String> = stack[start..]
        .iter()
        .map(|f| registry.at(f.node).name.clone())
        .collect();
    path.push(registry.at(back_to).name.clone());
    CacheError::CyclicDependency { path }
}

fn sort_by_name(registry: &Registry, nodes: &mut Vec<usize>) {
    nodes.sort_by(|a, b| registry.at(*a).name.cmp(&registry.at(*b).name));
    nodes.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Descriptor;

    /// Build a registry from `(name, attr_deps)` pairs
    fn registry(entries: &[(&str, &[&str])]) -> Registry {
        let body: Vec<String> = entries
            .iter()
            .map(|(name, deps)| {
                let deps: Vec<String> = deps.iter().map(|d| format!("\"{}\"", d)).collect();
                format!(
                    r#""{name}": {{"deps": {{"attr_deps": [{}]}}, "file": {{"url": "u/", "name": "{name}.json", "fingerprint": ""}}}}"#,
                    deps.join(", ")
                )
            })
            .collect();
        let json = format!("{{{}}}", body.join(", "));
        Registry::from_descriptor(Descriptor::parse(&json).unwrap()).unwrap()
    }

    fn assert_deps_first(registry: &Registry, plan: &ResolutionPlan) {
        for name in plan {
            let at = plan.position(name).unwrap();
            for dep in &registry.lookup(name).unwrap().attr_deps {
                let dep_at = plan.position(dep).expect("dependency planned");
                assert!(dep_at < at, "{} must come before {}", dep, name);
            }
        }
    }

    #[test]
    fn empty_request_yields_empty_plan() {
        let reg = registry(&[("a", &[])]);
        let plan = plan(&reg, Vec::<String>::new()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn linear_chain_orders_dependencies_first() {
        let reg = registry(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        let plan = plan(&reg, ["c"]).unwrap();
        assert_eq!(plan.names(), &["a", "b", "c"]);
    }

    #[test]
    fn diamond_is_planned_once_with_name_tie_break() {
        let reg = registry(&[
            ("top", &["right", "left"]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("base", &[]),
        ]);
        let plan = plan(&reg, ["top"]).unwrap();
        assert_eq!(plan.names(), &["base", "left", "right", "top"]);
    }

    #[test]
    fn duplicates_and_overlapping_requests_are_deduplicated() {
        let reg = registry(&[("b", &["a"]), ("a", &[])]);
        let plan = plan(&reg, ["b", "a", "b"]).unwrap();
        assert_eq!(plan.names(), &["a", "b"]);
    }

    #[test]
    fn plan_is_deterministic() {
        let reg = Registry::builtin().unwrap();
        let all: Vec<&str> = reg.all().collect();
        let mut reversed = all.clone();
        reversed.reverse();

        let first = plan(&reg, &all).unwrap();
        let second = plan(&reg, &reversed).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), reg.len());
        assert_deps_first(&reg, &first);
    }

    #[test]
    fn every_single_request_respects_dependencies() {
        let reg = Registry::builtin().unwrap();
        for name in reg.all() {
            let plan = plan(&reg, [name]).unwrap();
            assert_eq!(plan.names().last().map(String::as_str), Some(name));
            assert_deps_first(&reg, &plan);
        }
    }

    #[test]
    fn alias_is_planned_under_canonical_name() {
        let reg = Registry::builtin().unwrap();
        let plan = plan(&reg, ["rr_full_reactions"]).unwrap();
        assert_eq!(plan.names(), &["deprecatedRID_rid", "template_reactions"]);
    }

    #[test]
    fn two_node_cycle_is_reported_with_path() {
        let reg = registry(&[("a", &["b"]), ("b", &["a"])]);
        let err = plan(&reg, ["a"]).unwrap_err();
        match err {
            CacheError::CyclicDependency { path } => assert_eq!(path, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cycle_path_starts_at_reentry_point() {
        let reg = registry(&[("x", &["y"]), ("y", &["z"]), ("z", &["y"])]);
        let err = plan(&reg, ["x"]).unwrap_err();
        match err {
            CacheError::CyclicDependency { path } => assert_eq!(path, vec!["y", "z", "y"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let reg = registry(&[("a", &["a"])]);
        assert!(matches!(
            plan(&reg, ["a"]),
            Err(CacheError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn unknown_requested_name_errors() {
        let reg = registry(&[("a", &[])]);
        assert!(matches!(
            plan(&reg, ["ghost"]),
            Err(CacheError::UnknownArtifact(name)) if name == "ghost"
        ));
    }

    #[test]
    fn unknown_referenced_name_errors() {
        let reg = registry(&[("a", &["ghost"])]);
        assert!(matches!(
            plan(&reg, ["a"]),
            Err(CacheError::UnknownArtifact(name)) if name == "ghost"
        ));
    }
}
