use crate::model::Id;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Data object record owned by the conffwk database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    /// Native identity; stable across renames
    pub uid: Id,
    pub class_name: String,
    /// Object id within its class
    pub name: String,
    pub file: String,
    pub attributes: BTreeMap<String, Value>,
    /// Relationship targets by native identity
    pub relationships: BTreeMap<String, Vec<Id>>,
}

impl DataObject {
    pub fn new(
        uid: Id,
        class_name: impl Into<String>,
        name: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            uid,
            class_name: class_name.into(),
            name: name.into(),
            file: file.into(),
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// `name@class`, the usual way objects are quoted in messages.
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.name, self.class_name)
    }

    pub fn references(&self, uid: &Id) -> bool {
        self.relationships
            .values()
            .any(|targets| targets.iter().any(|target| target == uid))
    }

    /// Drops every relationship entry pointing at `uid`.
    pub fn forget(&mut self, uid: &Id) {
        for targets in self.relationships.values_mut() {
            targets.retain(|target| target != uid);
        }
    }
}
