//! Instance paths rebuilt from traversal callbacks.

use std::fmt;

use super::{walk, Visitor};
use crate::node::Node;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub name: &'static str,
    pub index: Option<usize>,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.name, i),
            None => f.write_str(self.name),
        }
    }
}

/// Location of a node inside a document, e.g. `ConceptMap.group[2].element[0]`.
///
/// The first segment is the root's type name; [`NodePath::relative`] renders the path
/// without it (`group[2].element[0]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: Vec<PathSegment>,
}

impl NodePath {
    pub fn root(type_name: &'static str) -> Self {
        Self {
            segments: vec![PathSegment {
                name: type_name,
                index: None,
            }],
        }
    }

    pub fn push(&mut self, name: &'static str, index: Option<usize>) {
        self.segments.push(PathSegment { name, index });
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn child(&self, name: &'static str, index: Option<usize>) -> Self {
        let mut out = self.clone();
        out.push(name, index);
        out
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn relative(&self) -> String {
        join(self.segments.iter().skip(1))
    }
}

fn join<'a>(segments: impl Iterator<Item = &'a PathSegment>) -> String {
    let mut out = String::new();
    for (i, segment) in segments.enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&segment.to_string());
    }
    out
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(self.segments.iter()))
    }
}

/// Keeps a [`NodePath`] in step with `visit_start` / `visit_end`.
///
/// Embed it in a visitor and forward both hooks; [`PathTracker::current`] is then the
/// path of the node being visited.
#[derive(Debug, Default)]
pub struct PathTracker {
    path: NodePath,
}

impl PathTracker {
    pub fn enter(&mut self, name: &'static str, index: Option<usize>) {
        self.path.push(name, index);
    }

    pub fn exit(&mut self) {
        self.path.pop();
    }

    pub fn current(&self) -> &NodePath {
        &self.path
    }
}

/// Paths of every node (primitives included) in traversal order.
pub fn node_paths(root: &dyn Node) -> Vec<NodePath> {
    struct Collector {
        tracker: PathTracker,
        paths: Vec<NodePath>,
    }

    impl<'t> Visitor<'t> for Collector {
        fn visit_start(&mut self, name: &'static str, index: Option<usize>, _node: &'t dyn Node) {
            self.tracker.enter(name, index);
            self.paths.push(self.tracker.current().clone());
        }

        fn visit_end(&mut self, _name: &'static str, _index: Option<usize>, _node: &'t dyn Node) {
            self.tracker.exit();
        }
    }

    let mut collector = Collector {
        tracker: PathTracker::default(),
        paths: Vec::new(),
    };
    walk(root, &mut collector);
    collector.paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_indexed_segments() {
        let mut path = NodePath::root("ConceptMap");
        path.push("group", Some(2));
        path.push("element", Some(0));
        let target = path.child("target", Some(1)).child("code", None);
        assert_eq!(path.to_string(), "ConceptMap.group[2].element[0]");
        assert_eq!(target.relative(), "group[2].element[0].target[1].code");
    }
}
