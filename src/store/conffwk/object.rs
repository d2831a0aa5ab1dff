use crate::diagnostics::{Finding, SharedDiagnostics};
use crate::error::{AdaptorError, Result};
use crate::model::{Attributes, DataObject, Id, NameList};
use crate::store::accessor::unsupported;
use crate::store::conffwk::{ConffwkDatabase, Slot};
use crate::store::{
    upgrade, EngineHandle, NamedObject, NamedObjectLifecycle, NamedObjectManager, ObjectHandler,
    ObjectLifecycle, ObjectManager, ObjectModifier,
};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

/// Names every data object answers to besides its schema attributes.
const BUILTIN_FIELDS: &[&str] = &["id", "name", "class_name"];

/// Wrapper around one data object.
#[derive(Clone)]
pub struct ConffwkObject {
    database: Weak<RefCell<ConffwkDatabase>>,
    uid: Id,
    diagnostics: SharedDiagnostics,
}

impl ConffwkObject {
    pub fn wrap(
        database: &EngineHandle<ConffwkDatabase>,
        uid: &str,
        diagnostics: SharedDiagnostics,
    ) -> Result<Self> {
        if !database.borrow().contains(uid) {
            return Err(AdaptorError::StaleObject(format!("object #{}", uid)));
        }
        Ok(Self {
            database: Rc::downgrade(database),
            uid: uid.to_string(),
            diagnostics,
        })
    }

    pub fn uid(&self) -> &Id {
        &self.uid
    }

    pub(crate) fn belongs_to(&self, database: &EngineHandle<ConffwkDatabase>) -> bool {
        Weak::ptr_eq(&self.database, &Rc::downgrade(database))
    }

    fn with_object<R>(&self, f: impl FnOnce(&ConffwkDatabase, &DataObject) -> R) -> Result<R> {
        let database = upgrade(&self.database)?;
        let database = database.borrow();
        if !database.is_loaded() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        let object = database
            .object(&self.uid)
            .ok_or_else(|| AdaptorError::StaleObject(format!("object #{}", self.uid)))?;
        Ok(f(&database, object))
    }

    pub fn class_name(&self) -> Result<String> {
        self.with_object(|_, object| object.class_name.clone())
    }

    pub fn file(&self) -> Result<String> {
        self.with_object(|_, object| object.file.clone())
    }

    /// `id@class`.
    pub fn full_name(&self) -> Result<String> {
        self.with_object(|_, object| object.full_name())
    }

    pub fn record(&self) -> Result<DataObject> {
        self.with_object(|_, object| object.clone())
    }

    fn slot(&self, name: &str) -> Result<(String, Option<Slot>)> {
        self.with_object(|database, object| {
            (
                format!("'{}'", object.full_name()),
                database.slot(&object.class_name, name),
            )
        })
    }
}

impl NamedObject for ConffwkObject {
    fn name(&self) -> Result<String> {
        self.with_object(|_, object| object.name.clone())
    }
}

impl ObjectModifier for ConffwkObject {
    fn get_attr(&self, name: &str) -> Result<Value> {
        match name {
            "id" | "name" => return Ok(json!(self.name()?)),
            "class_name" => return Ok(json!(self.class_name()?)),
            _ => {}
        }
        let (owner, slot) = self.slot(name)?;
        let database = upgrade(&self.database)?;
        let database = database.borrow();
        match slot {
            Some(Slot::Attribute(def)) => database.attribute_value(&self.uid, &def),
            Some(Slot::Relationship(def)) => database.relationship_value(&self.uid, &def),
            None => Err(unsupported(&self.diagnostics, &owner, name)),
        }
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        let (owner, slot) = self.slot(name)?;
        if BUILTIN_FIELDS.contains(&name) {
            // Read-only here; ids change through the handler's rename
            return Err(unsupported(&self.diagnostics, &owner, name));
        }
        let database = upgrade(&self.database)?;
        let mut database = database.borrow_mut();
        match slot {
            Some(Slot::Attribute(def)) => database.set_attribute_value(&self.uid, &def, value),
            Some(Slot::Relationship(def)) => database.set_relationship_targets(&self.uid, &def, value),
            None => Err(unsupported(&self.diagnostics, &owner, name)),
        }
    }
}

impl PartialEq for ConffwkObject {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.database, &other.database) && self.uid == other.uid
    }
}

impl Eq for ConffwkObject {}

impl fmt::Debug for ConffwkObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.full_name().unwrap_or_else(|_| "<stale>".to_string());
        f.debug_struct("ConffwkObject")
            .field("uid", &self.uid)
            .field("name", &name)
            .finish()
    }
}

impl Serialize for ConffwkObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let record = self.record().map_err(serde::ser::Error::custom)?;
        json!({
            "class": record.class_name,
            "id": record.name,
            "attributes": record.attributes,
        })
        .serialize(serializer)
    }
}

/// Named-addressed handler over the data database.
pub struct ConffwkObjectHandler {
    database: EngineHandle<ConffwkDatabase>,
    diagnostics: SharedDiagnostics,
}

impl ConffwkObjectHandler {
    pub fn new(database: EngineHandle<ConffwkDatabase>, diagnostics: SharedDiagnostics) -> Self {
        Self {
            database,
            diagnostics,
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.database.borrow().is_loaded() {
            Ok(())
        } else {
            Err(AdaptorError::ConfigurationNotLoaded)
        }
    }

    fn wrap(&self, uid: &str) -> Result<ConffwkObject> {
        ConffwkObject::wrap(&self.database, uid, Rc::clone(&self.diagnostics))
    }

    fn ensure_local(&self, obj: &ConffwkObject) -> Result<()> {
        if obj.belongs_to(&self.database) {
            return Ok(());
        }
        Err(AdaptorError::ObjectNotFound(format!(
            "'{}' in this configuration",
            obj.full_name()?
        )))
    }
}

impl ObjectHandler for ConffwkObjectHandler {
    type Object = ConffwkObject;
}

impl NamedObjectManager for ConffwkObjectHandler {
    fn get_obj(&self, class_name: &str, object_name: &str) -> Result<ConffwkObject> {
        self.ensure_loaded()?;
        let uid = self
            .database
            .borrow()
            .find(class_name, object_name)
            .map(|object| object.uid.clone())
            .ok_or_else(|| AdaptorError::object_not_found(class_name, object_name))?;
        self.wrap(&uid)
    }
}

impl ObjectManager for ConffwkObjectHandler {
    /// Objects of each named class, subclasses included.
    fn get_all_obj(&self, filter: Option<NameList>) -> Result<Vec<ConffwkObject>> {
        self.ensure_loaded()?;
        let uids: Vec<Id> = {
            let database = self.database.borrow();
            match filter {
                None => database
                    .all_objects()
                    .iter()
                    .map(|object| object.uid.clone())
                    .collect(),
                Some(names) => {
                    let mut seen = HashSet::new();
                    let mut uids = Vec::new();
                    for class_name in names.unique() {
                        if database.schema().find_class(class_name).is_none() {
                            return Err(AdaptorError::class_not_found(class_name));
                        }
                        for object in database.objects_of(class_name) {
                            if seen.insert(object.uid.clone()) {
                                uids.push(object.uid.clone());
                            }
                        }
                    }
                    uids
                }
            }
        };
        uids.iter().map(|uid| self.wrap(uid)).collect()
    }
}

impl ObjectLifecycle for ConffwkObjectHandler {
    /// Imports a copy of `obj`, which may come from another database.
    fn add(&self, obj: &ConffwkObject) -> Result<ConffwkObject> {
        self.ensure_loaded()?;
        let source = upgrade(&obj.database)?;
        let snapshot = source
            .borrow()
            .snapshot(obj.uid())
            .ok_or_else(|| AdaptorError::StaleObject(format!("object #{}", obj.uid())))?;
        let uid = self.database.borrow_mut().insert_copy(&snapshot)?;
        self.wrap(&uid)
    }

    fn delete(&self, obj: &ConffwkObject) -> Result<()> {
        self.ensure_loaded()?;
        self.ensure_local(obj)?;
        self.database.borrow_mut().destroy(obj.uid())?;
        Ok(())
    }

    /// In-place rename; `obj` stays valid.
    fn rename(&self, obj: &ConffwkObject, new_name: &str) -> Result<ConffwkObject> {
        self.ensure_loaded()?;
        self.ensure_local(obj)?;
        self.database.borrow_mut().rename(obj.uid(), new_name)?;
        Ok(obj.clone())
    }
}

impl NamedObjectLifecycle for ConffwkObjectHandler {
    /// Creates the object and applies `attributes`; if any value is rejected
    /// the object is destroyed again.
    fn create(
        &self,
        class_name: &str,
        object_name: &str,
        attributes: &Attributes,
    ) -> Result<ConffwkObject> {
        self.ensure_loaded()?;
        let uid = self.database.borrow_mut().create(class_name, object_name)?;
        let obj = self.wrap(&uid)?;

        for (key, value) in attributes {
            let known = self.database.borrow().slot(class_name, key).is_some();
            if !known {
                self.diagnostics.report(Finding::IgnoredParameter {
                    owner: format!("'{}@{}'", object_name, class_name),
                    key: key.clone(),
                });
                continue;
            }
            if let Err(error) = obj.set_attr(key, value.clone()) {
                self.database.borrow_mut().destroy(&uid)?;
                return Err(error);
            }
        }
        Ok(obj)
    }
}
