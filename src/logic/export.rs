//! Tree exports: nested mapping, directed graph, DOT text and outline.

use crate::error::Result;
use crate::logic::tree::{Branch, BranchKey, ConfigTree};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Nested mapping of one branch; `children` recurse, `parents` are ids.
pub fn branch_to_value<T: Serialize>(tree: &ConfigTree<T>, branch: &Branch<T>) -> Result<Value> {
    let children = tree
        .children(branch.key())
        .into_iter()
        .map(|child| branch_to_value(tree, child))
        .collect::<Result<Vec<_>>>()?;
    let parents: Vec<&str> = tree.parents(branch.key()).iter().map(|p| p.id()).collect();
    Ok(json!({
        "name": branch.name(),
        "id": branch.id(),
        "stored_data": serde_json::to_value(branch.stored_data())?,
        "children": children,
        "parents": parents,
    }))
}

/// `{root, branches}`, or an empty mapping for a tree without root.
pub fn tree_to_value<T: Serialize>(tree: &ConfigTree<T>) -> Result<Value> {
    let Some(root) = tree.root() else {
        return Ok(Value::Object(Map::new()));
    };
    let branches = tree
        .all_branches()
        .iter()
        .map(|branch| branch_to_value(tree, branch))
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({
        "root": branch_to_value(tree, root)?,
        "branches": branches,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportCounts {
    pub branches: usize,
    pub edges: usize,
}

/// Branch and edge counts recovered from a [`tree_to_value`] export.
pub fn export_counts(value: &Value) -> ExportCounts {
    let branches = value
        .get("branches")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let edges = branches
        .iter()
        .filter_map(|branch| branch.get("children").and_then(Value::as_array))
        .map(Vec::len)
        .sum();
    ExportCounts {
        branches: branches.len(),
        edges,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub name: String,
    pub id: String,
    pub stored_data: Value,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == self.id {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

/// Edge weight of [`to_graph`], always pointing from parent to child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChildLink;

impl fmt::Display for ChildLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("child")
    }
}

/// One node per registered branch, one edge per parent -> child link.
pub fn to_graph<T: Serialize>(tree: &ConfigTree<T>) -> Result<DiGraph<GraphNode, ChildLink>> {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<&BranchKey, NodeIndex> = HashMap::new();
    for branch in tree.all_branches() {
        let index = graph.add_node(GraphNode {
            name: branch.name().to_string(),
            id: branch.id().to_string(),
            stored_data: serde_json::to_value(branch.stored_data())?,
        });
        nodes.insert(branch.key(), index);
    }
    for branch in tree.all_branches() {
        let parent = nodes[branch.key()];
        for child in branch.children() {
            if let Some(&child) = nodes.get(child) {
                graph.add_edge(parent, child, ChildLink);
            }
        }
    }
    Ok(graph)
}

pub fn to_dot<T: Serialize>(tree: &ConfigTree<T>) -> Result<String> {
    let graph = to_graph(tree)?;
    Ok(format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel])))
}

/// Indented outline from the root; a shared ancestor appears under each of
/// its children.
pub fn render_outline<T>(tree: &ConfigTree<T>, indent: usize) -> String {
    let mut out = String::new();
    if let Some(root) = tree.root() {
        write_outline(tree, root, 0, indent, &mut out);
    }
    out
}

fn write_outline<T>(
    tree: &ConfigTree<T>,
    branch: &Branch<T>,
    depth: usize,
    indent: usize,
    out: &mut String,
) {
    out.push_str(&" ".repeat(depth * indent));
    out.push_str(branch.name());
    if branch.name() != branch.id() {
        out.push_str(&format!(" [{}]", branch.id()));
    }
    out.push('\n');
    for child in tree.children(branch.key()) {
        write_outline(tree, child, depth + 1, indent, out);
    }
}
