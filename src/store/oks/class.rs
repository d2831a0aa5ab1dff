use crate::diagnostics::{Finding, SharedDiagnostics};
use crate::error::{AdaptorError, Result};
use crate::model::{Attributes, ClassDef, Id, NameList, PropertyKind};
use crate::store::accessor::{read_field, write_field, ClassField, FieldSet};
use crate::store::oks::{ClassSnapshot, OksKernel, OksPropertyHandler};
use crate::store::{
    upgrade, ClassObjectLifecycle, ClassObjectManager, EngineHandle, NamedObject, ObjectHandler,
    ObjectLifecycle, ObjectManager, ObjectModifier,
};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Wrapper around one kernel class.
#[derive(Clone)]
pub struct OksClass {
    kernel: Weak<RefCell<OksKernel>>,
    id: Id,
    diagnostics: SharedDiagnostics,
}

/// What a class looks like from outside, used for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub description: String,
    pub is_abstract: bool,
    pub file: String,
    pub super_classes: Vec<String>,
}

impl OksClass {
    /// Fails with `StructuralType` when `id` is not a class.
    pub fn wrap(kernel: &EngineHandle<OksKernel>, id: &str, diagnostics: SharedDiagnostics) -> Result<Self> {
        match kernel.borrow().item(id) {
            Some(item) if item.as_class().is_some() => {}
            Some(item) => {
                return Err(AdaptorError::StructuralType {
                    expected: "class",
                    found: item.kind_name(),
                })
            }
            None => return Err(AdaptorError::StaleObject(format!("class #{}", id))),
        }
        Ok(Self {
            kernel: Rc::downgrade(kernel),
            id: id.to_string(),
            diagnostics,
        })
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub(crate) fn kernel(&self) -> Result<EngineHandle<OksKernel>> {
        upgrade(&self.kernel)
    }

    pub(crate) fn belongs_to(&self, kernel: &EngineHandle<OksKernel>) -> bool {
        Weak::ptr_eq(&self.kernel, &Rc::downgrade(kernel))
    }

    fn with_class<R>(&self, f: impl FnOnce(&ClassDef) -> R) -> Result<R> {
        let kernel = self.kernel()?;
        let kernel = kernel.borrow();
        if !kernel.is_loaded() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        let class = kernel
            .class(&self.id)
            .ok_or_else(|| AdaptorError::StaleObject(format!("class #{}", self.id)))?;
        Ok(f(class))
    }

    fn with_class_mut<R>(&self, f: impl FnOnce(&mut ClassDef) -> R) -> Result<R> {
        let kernel = self.kernel()?;
        let mut kernel = kernel.borrow_mut();
        if !kernel.is_loaded() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        let class = kernel
            .class_mut(&self.id)
            .ok_or_else(|| AdaptorError::StaleObject(format!("class #{}", self.id)))?;
        Ok(f(class))
    }

    /// False once the class was destroyed or its schema unloaded.
    pub fn is_alive(&self) -> bool {
        self.with_class(|_| ()).is_ok()
    }

    pub fn description(&self) -> Result<String> {
        self.with_class(|class| class.description.clone())
    }

    pub fn is_abstract(&self) -> Result<bool> {
        self.with_class(|class| class.is_abstract)
    }

    pub fn file(&self) -> Result<String> {
        self.with_class(|class| class.file.clone())
    }

    pub fn super_classes(&self) -> Result<Vec<String>> {
        self.with_class(|class| class.super_classes.clone())
    }

    pub fn all_super_classes(&self) -> Result<Vec<String>> {
        let name = self.name()?;
        let kernel = self.kernel()?;
        let supers = kernel.borrow().all_super_classes(&name)?;
        Ok(supers)
    }

    pub fn sub_classes(&self) -> Result<Vec<String>> {
        let name = self.name()?;
        let kernel = self.kernel()?;
        let subs = kernel.borrow().direct_sub_classes(&name);
        Ok(subs)
    }

    /// Refuses superclasses that already inherit from this class.
    fn check_acyclic(&self, super_classes: &[&str]) -> Result<()> {
        let class_name = self.name()?;
        let kernel = self.kernel()?;
        let kernel = kernel.borrow();
        match super_classes
            .iter()
            .find(|name| kernel.is_kind_of(name, &class_name))
        {
            Some(name) => Err(AdaptorError::InheritanceCycle(format!(
                "'{}' already inherits from '{}'",
                name, class_name
            ))),
            None => Ok(()),
        }
    }

    pub fn add_super_class(&self, name: &str) -> Result<()> {
        self.check_acyclic(&[name])?;
        self.with_class_mut(|class| {
            if !class.has_super_class(name) {
                class.super_classes.push(name.to_string());
            }
        })
    }

    pub fn remove_super_class(&self, name: &str) -> Result<bool> {
        self.with_class_mut(|class| {
            let before = class.super_classes.len();
            class.super_classes.retain(|super_class| super_class != name);
            before != class.super_classes.len()
        })
    }

    pub fn summary(&self) -> Result<ClassSummary> {
        self.with_class(|class| ClassSummary {
            name: class.name.clone(),
            description: class.description.clone(),
            is_abstract: class.is_abstract,
            file: class.file.clone(),
            super_classes: class.super_classes.clone(),
        })
    }

    pub(crate) fn snapshot(&self) -> Result<ClassSnapshot> {
        let kernel = self.kernel()?;
        let snapshot = kernel.borrow().snapshot_class(&self.id);
        snapshot.ok_or_else(|| AdaptorError::StaleObject(format!("class #{}", self.id)))
    }

    fn property_handler(&self, kind: PropertyKind) -> OksPropertyHandler {
        OksPropertyHandler::new(self.kernel.clone(), self.id.clone(), kind, Rc::clone(&self.diagnostics))
    }

    pub fn attributes(&self) -> OksPropertyHandler {
        self.property_handler(PropertyKind::Attribute)
    }

    pub fn relationships(&self) -> OksPropertyHandler {
        self.property_handler(PropertyKind::Relationship)
    }

    pub fn methods(&self) -> OksPropertyHandler {
        self.property_handler(PropertyKind::Method)
    }

    fn owner_label(class: &ClassDef) -> String {
        format!("class '{}'", class.name)
    }
}

impl NamedObject for OksClass {
    fn name(&self) -> Result<String> {
        self.with_class(|class| class.name.clone())
    }
}

impl ObjectModifier for OksClass {
    fn get_attr(&self, name: &str) -> Result<Value> {
        let diagnostics = Rc::clone(&self.diagnostics);
        self.with_class(|class| {
            read_field::<ClassField>(&diagnostics, &Self::owner_label(class), class, name)
        })?
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        if name == ClassField::SuperClasses.name() {
            let names: Vec<&str> = match &value {
                Value::String(single) => vec![single.as_str()],
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            self.check_acyclic(&names)?;
        }
        let diagnostics = Rc::clone(&self.diagnostics);
        self.with_class_mut(|class| {
            let owner = Self::owner_label(class);
            write_field::<ClassField>(&diagnostics, &owner, class, name, value)
        })?
    }
}

impl PartialEq for OksClass {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.kernel, &other.kernel) && self.id == other.id
    }
}

impl Eq for OksClass {}

impl fmt::Debug for OksClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name().unwrap_or_else(|_| "<stale>".to_string());
        f.debug_struct("OksClass")
            .field("id", &self.id)
            .field("name", &name)
            .finish()
    }
}

impl Serialize for OksClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let summary = self.summary().map_err(serde::ser::Error::custom)?;
        summary.serialize(serializer)
    }
}

/// Class-addressed handler over the schema kernel.
pub struct OksClassHandler {
    kernel: EngineHandle<OksKernel>,
    diagnostics: SharedDiagnostics,
}

impl OksClassHandler {
    pub fn new(kernel: EngineHandle<OksKernel>, diagnostics: SharedDiagnostics) -> Self {
        Self {
            kernel,
            diagnostics,
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.kernel.borrow().is_loaded() {
            Ok(())
        } else {
            Err(AdaptorError::ConfigurationNotLoaded)
        }
    }

    fn wrap(&self, id: &str) -> Result<OksClass> {
        OksClass::wrap(&self.kernel, id, Rc::clone(&self.diagnostics))
    }

    fn ensure_local(&self, obj: &OksClass) -> Result<()> {
        if obj.belongs_to(&self.kernel) {
            return Ok(());
        }
        Err(AdaptorError::ObjectNotFound(format!(
            "class '{}' in this configuration",
            obj.name()?
        )))
    }
}

impl ObjectHandler for OksClassHandler {
    type Object = OksClass;
}

impl ClassObjectManager for OksClassHandler {
    fn get_obj(&self, class_name: &str) -> Result<OksClass> {
        self.ensure_loaded()?;
        let id = self
            .kernel
            .borrow()
            .find_class(class_name)
            .map(|class| class.id.clone())
            .ok_or_else(|| AdaptorError::class_not_found(class_name))?;
        self.wrap(&id)
    }
}

impl ObjectManager for OksClassHandler {
    fn get_all_obj(&self, filter: Option<NameList>) -> Result<Vec<OksClass>> {
        self.ensure_loaded()?;
        match filter {
            None => {
                let ids: Vec<Id> = self
                    .kernel
                    .borrow()
                    .classes()
                    .iter()
                    .map(|class| class.id.clone())
                    .collect();
                ids.iter().map(|id| self.wrap(id)).collect()
            }
            Some(names) => names
                .unique()
                .into_iter()
                .map(|name| self.get_obj(name))
                .collect(),
        }
    }
}

impl ObjectLifecycle for OksClassHandler {
    /// Structural copy of `obj` (which may live in another kernel) under its own name.
    fn add(&self, obj: &OksClass) -> Result<OksClass> {
        self.ensure_loaded()?;
        let snapshot = obj.snapshot()?;
        let name = snapshot.class.name.clone();
        let id = self.kernel.borrow_mut().insert_class_copy(&snapshot, &name)?;
        self.wrap(&id)
    }

    fn delete(&self, obj: &OksClass) -> Result<()> {
        self.ensure_loaded()?;
        self.ensure_local(obj)?;
        self.kernel.borrow_mut().destroy_class(obj.id())?;
        Ok(())
    }

    /// Copies the class under `new_name` and destroys the original; `obj`
    /// is stale afterwards.
    fn rename(&self, obj: &OksClass, new_name: &str) -> Result<OksClass> {
        self.ensure_loaded()?;
        self.ensure_local(obj)?;
        let snapshot = obj.snapshot()?;
        let old_name = snapshot.class.name.clone();
        if old_name == new_name {
            return Ok(obj.clone());
        }
        if new_name.trim().is_empty() {
            return Err(AdaptorError::invalid_value("name", "name must not be empty"));
        }

        let id = {
            let mut kernel = self.kernel.borrow_mut();
            let id = kernel.insert_class_copy(&snapshot, new_name)?;
            kernel.destroy_class(obj.id())?;
            kernel.rename_class_references(&old_name, new_name);
            id
        };
        log::debug!("Renamed class '{}' to '{}'", old_name, new_name);
        self.wrap(&id)
    }
}

impl ClassObjectLifecycle for OksClassHandler {
    fn create(&self, class_name: &str, attributes: &Attributes) -> Result<OksClass> {
        self.ensure_loaded()?;
        if class_name.trim().is_empty() {
            return Err(AdaptorError::invalid_value("name", "class name must not be empty"));
        }

        let mut description = String::new();
        let mut is_abstract = false;
        let mut transient = false;
        for (key, value) in attributes {
            match key.as_str() {
                "description" => {
                    description = value
                        .as_str()
                        .ok_or_else(|| AdaptorError::invalid_value(key, "expected a string"))?
                        .to_string()
                }
                "is_abstract" => {
                    is_abstract = value
                        .as_bool()
                        .ok_or_else(|| AdaptorError::invalid_value(key, "expected a boolean"))?
                }
                "transient" => {
                    transient = value
                        .as_bool()
                        .ok_or_else(|| AdaptorError::invalid_value(key, "expected a boolean"))?
                }
                _ => self.diagnostics.report(Finding::IgnoredParameter {
                    owner: format!("class '{}'", class_name),
                    key: key.clone(),
                }),
            }
        }

        let id = self
            .kernel
            .borrow_mut()
            .create_class(class_name, &description, is_abstract, transient)?;
        self.wrap(&id)
    }
}
