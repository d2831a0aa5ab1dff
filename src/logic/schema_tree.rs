use crate::diagnostics::{Finding, SharedDiagnostics};
use crate::error::{AdaptorError, Result};
use crate::logic::tree::{Branch, BranchKey, ConfigTree};
use crate::store::{ClassObjectManager, NamedObject, OksClass, OksClassHandler};
use std::rc::Rc;

/// Id given to the root branch unless the settings say otherwise.
pub const ROOT_BRANCH_ID: &str = "root";

/// Inheritance ancestry of one class: the root branch holds the class, each
/// child branch one of its superclasses, keyed by class name.
#[derive(Debug)]
pub struct OksSchemaTree {
    tree: ConfigTree<OksClass>,
}

impl OksSchemaTree {
    pub fn build(
        handler: &OksClassHandler,
        leaf: &OksClass,
        diagnostics: SharedDiagnostics,
    ) -> Result<Self> {
        Self::build_with_root_id(handler, leaf, ROOT_BRANCH_ID, diagnostics)
    }

    pub fn build_with_root_id(
        handler: &OksClassHandler,
        leaf: &OksClass,
        root_id: &str,
        diagnostics: SharedDiagnostics,
    ) -> Result<Self> {
        // Fails with InheritanceCycle before any branch is made
        leaf.all_super_classes()?;

        let root = Branch::new(leaf.name()?, root_id, leaf.clone());
        let root_key = root.key().clone();
        let mut schema_tree = Self {
            tree: ConfigTree::new(Some(root), Rc::clone(&diagnostics)),
        };
        schema_tree.expand(handler, &root_key, leaf, &diagnostics)?;
        log::debug!(
            "Built schema tree for '{}': {} branches, {} edges",
            root_key.name,
            schema_tree.tree.len(),
            schema_tree.tree.edge_count()
        );
        Ok(schema_tree)
    }

    fn expand(
        &mut self,
        handler: &OksClassHandler,
        parent: &BranchKey,
        class: &OksClass,
        diagnostics: &SharedDiagnostics,
    ) -> Result<()> {
        for super_name in class.super_classes()? {
            let super_class = match handler.get_obj(&super_name) {
                Ok(super_class) => super_class,
                Err(AdaptorError::ObjectNotFound(_)) => {
                    diagnostics.report(Finding::MissingSuperclass {
                        class_name: parent.name.clone(),
                        superclass: super_name,
                    });
                    continue;
                }
                Err(error) => return Err(error),
            };

            let key = BranchKey::new(super_name.clone(), super_name.clone());
            let walked = self.tree.contains(&key);
            self.tree.add_branch(
                Some(parent),
                Branch::new(super_name.clone(), super_name, super_class.clone()),
            )?;
            if !walked {
                self.expand(handler, &key, &super_class, diagnostics)?;
            }
        }
        Ok(())
    }

    pub fn tree(&self) -> &ConfigTree<OksClass> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ConfigTree<OksClass> {
        &mut self.tree
    }

    pub fn into_tree(self) -> ConfigTree<OksClass> {
        self.tree
    }
}
