//! Bidirectional branch tree.
//!
//! Branches live in one registry owned by [`ConfigTree`]; links between them
//! are stored on both ends as [`BranchKey`]s, so a parent never holds a strong
//! reference to a child or the other way round. Every link operation goes
//! through the tree, which keeps the two directions in step.

use crate::diagnostics::{Finding, SharedDiagnostics};
use crate::error::{AdaptorError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Identity of a branch: `(name, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BranchKey {
    pub name: String,
    pub id: String,
}

impl BranchKey {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.id)
    }
}

#[derive(Debug, Clone)]
pub struct Branch<T> {
    key: BranchKey,
    stored_data: T,
    children: Vec<BranchKey>,
    parents: Vec<BranchKey>,
}

impl<T> Branch<T> {
    pub fn new(name: impl Into<String>, id: impl Into<String>, stored_data: T) -> Self {
        Self {
            key: BranchKey::new(name, id),
            stored_data,
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn key(&self) -> &BranchKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn id(&self) -> &str {
        &self.key.id
    }

    pub fn stored_data(&self) -> &T {
        &self.stored_data
    }

    pub fn children(&self) -> &[BranchKey] {
        &self.children
    }

    pub fn parents(&self) -> &[BranchKey] {
        &self.parents
    }

    fn matches(&self, name: &str, id: &str) -> bool {
        self.key.name == name && self.key.id == id
    }
}

/// Equality by `(id, name)`, not by payload or links.
impl<T> PartialEq for Branch<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Branch<T> {}

pub struct ConfigTree<T> {
    root: Option<BranchKey>,
    branches: Vec<Branch<T>>,
    diagnostics: SharedDiagnostics,
}

impl<T> ConfigTree<T> {
    pub fn new(root: Option<Branch<T>>, diagnostics: SharedDiagnostics) -> Self {
        let mut tree = Self {
            root: None,
            branches: Vec::new(),
            diagnostics,
        };
        if let Some(root) = root {
            tree.root = Some(root.key.clone());
            tree.branches.push(root);
        }
        tree
    }

    pub fn root(&self) -> Option<&Branch<T>> {
        self.root.as_ref().and_then(|key| self.branch(key))
    }

    pub fn branch(&self, key: &BranchKey) -> Option<&Branch<T>> {
        self.position(key).map(|index| &self.branches[index])
    }

    pub fn contains(&self, key: &BranchKey) -> bool {
        self.position(key).is_some()
    }

    /// Registered branches in insertion order.
    pub fn all_branches(&self) -> &[Branch<T>] {
        &self.branches
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Number of parent -> child links.
    pub fn edge_count(&self) -> usize {
        self.branches.iter().map(|branch| branch.children.len()).sum()
    }

    fn position(&self, key: &BranchKey) -> Option<usize> {
        self.branches
            .iter()
            .position(|branch| branch.matches(&key.name, &key.id))
    }

    fn require(&self, key: &BranchKey) -> Result<usize> {
        self.position(key).ok_or_else(|| AdaptorError::BranchNotFound {
            name: key.name.clone(),
            id: key.id.clone(),
        })
    }

    /// Adds `branch` under `parent`, or as the new root when `parent` is
    /// `None`.
    ///
    /// A new root resets the tree: every registered branch is dropped. Under a
    /// parent the link is made first; if a branch with the same `(name, id)`
    /// is already registered it keeps its place and payload, `branch` is
    /// discarded and a [`Finding::DuplicateBranch`] is reported.
    ///
    /// Returns the key the branch is registered under.
    pub fn add_branch(&mut self, parent: Option<&BranchKey>, branch: Branch<T>) -> Result<BranchKey> {
        let key = branch.key.clone();
        let Some(parent) = parent else {
            if let Some(previous) = self.root.take() {
                self.diagnostics.report(Finding::ReplacingRoot {
                    previous: previous.to_string(),
                });
            }
            self.branches.clear();
            self.root = Some(key.clone());
            self.branches.push(Branch {
                children: Vec::new(),
                parents: Vec::new(),
                ..branch
            });
            return Ok(key);
        };

        self.require(parent)?;
        if self.contains(&key) {
            self.link(parent, &key)?;
            self.diagnostics.report(Finding::DuplicateBranch {
                name: key.name.clone(),
                id: key.id.clone(),
            });
            return Ok(key);
        }

        self.branches.push(Branch {
            children: Vec::new(),
            parents: Vec::new(),
            ..branch
        });
        if let Err(error) = self.link(parent, &key) {
            self.branches.pop();
            return Err(error);
        }
        Ok(key)
    }

    /// Links `parent -> child` on both ends. Linking twice is a no-op; a link
    /// that would close a cycle is refused.
    pub fn link(&mut self, parent: &BranchKey, child: &BranchKey) -> Result<()> {
        let parent_index = self.require(parent)?;
        let child_index = self.require(child)?;
        if self.branches[parent_index].children.contains(child) {
            return Ok(());
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(AdaptorError::TreeCycle {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        self.branches[parent_index].children.push(child.clone());
        self.branches[child_index].parents.push(parent.clone());
        Ok(())
    }

    /// Removes the `parent -> child` link on both ends.
    pub fn unlink(&mut self, parent: &BranchKey, child: &BranchKey) -> bool {
        let (Some(parent_index), Some(child_index)) = (self.position(parent), self.position(child))
        else {
            return false;
        };
        let before = self.branches[parent_index].children.len();
        self.branches[parent_index].children.retain(|key| key != child);
        self.branches[child_index].parents.retain(|key| key != parent);
        before != self.branches[parent_index].children.len()
    }

    /// Whether `descendant` can be reached from `ancestor` through children.
    pub fn is_ancestor(&self, ancestor: &BranchKey, descendant: &BranchKey) -> bool {
        let mut stack = vec![ancestor.clone()];
        let mut seen = HashSet::new();
        while let Some(key) = stack.pop() {
            if !seen.insert(key.clone()) {
                continue;
            }
            let Some(branch) = self.branch(&key) else {
                continue;
            };
            for child in &branch.children {
                if child == descendant {
                    return true;
                }
                stack.push(child.clone());
            }
        }
        false
    }

    /// Unregisters one branch and every link touching it. Its children stay
    /// registered; they only lose this parent.
    pub fn remove_branch(&mut self, key: &BranchKey) -> Option<Branch<T>> {
        let Some(index) = self.position(key) else {
            self.diagnostics.report(Finding::BranchNotFound {
                name: key.name.clone(),
                id: key.id.clone(),
            });
            return None;
        };
        let mut removed = self.branches.remove(index);
        for branch in &mut self.branches {
            branch.children.retain(|child| child != key);
            branch.parents.retain(|parent| parent != key);
        }
        removed.children.clear();
        removed.parents.clear();
        if self.root.as_ref() == Some(key) {
            self.root = None;
        }
        Some(removed)
    }

    pub fn children(&self, key: &BranchKey) -> Vec<&Branch<T>> {
        self.branch(key)
            .map(|branch| branch.children.iter().filter_map(|k| self.branch(k)).collect())
            .unwrap_or_default()
    }

    pub fn parents(&self, key: &BranchKey) -> Vec<&Branch<T>> {
        self.branch(key)
            .map(|branch| branch.parents.iter().filter_map(|k| self.branch(k)).collect())
            .unwrap_or_default()
    }

    pub fn find(&self, predicate: impl Fn(&Branch<T>) -> bool) -> Vec<&Branch<T>> {
        self.branches.iter().filter(|branch| predicate(branch)).collect()
    }

    pub fn branches_by_id(&self, id: &str) -> Vec<&Branch<T>> {
        self.find(|branch| branch.id() == id)
    }

    /// Names are not unique; every match is returned.
    pub fn branches_by_name(&self, name: &str) -> Vec<&Branch<T>> {
        self.find(|branch| branch.name() == name)
    }

    pub fn get_unique(&self, name: &str, id: &str) -> Option<&Branch<T>> {
        let matches = self.find(|branch| branch.matches(name, id));
        if matches.len() > 1 {
            self.diagnostics.report(Finding::AmbiguousBranch {
                name: name.to_string(),
                id: id.to_string(),
                count: matches.len(),
            });
        }
        if matches.is_empty() {
            self.diagnostics.report(Finding::BranchNotFound {
                name: name.to_string(),
                id: id.to_string(),
            });
        }
        matches.into_iter().next()
    }
}

impl<T: PartialEq> ConfigTree<T> {
    pub fn branches_by_data(&self, data: &T) -> Vec<&Branch<T>> {
        self.find(|branch| branch.stored_data() == data)
    }
}

impl<T> fmt::Debug for ConfigTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigTree")
            .field("root", &self.root)
            .field("branches", &self.branches.iter().map(Branch::key).collect::<Vec<_>>())
            .finish()
    }
}
