use crate::diagnostics::{Finding, SharedDiagnostics};
use crate::error::{AdaptorError, Result};
use crate::model::{
    AttributeDef, Attributes, Cardinality, Id, MethodDef, NameList, PropertyKind, RelationshipDef,
    SchemaItem,
};
use crate::store::accessor::{
    check_known, read_field, write_field, AttributeField, MethodField, RelationshipField,
};
use crate::store::oks::OksKernel;
use crate::store::{upgrade, NamedObject, ObjectHandler, ObjectLifecycle, ObjectManager, ObjectModifier};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Wrapper around one attribute, relationship or method record, seen
/// through the class it was obtained from.
#[derive(Clone)]
pub struct OksProperty {
    kernel: Weak<RefCell<OksKernel>>,
    id: Id,
    owner: Id,
    kind: PropertyKind,
    diagnostics: SharedDiagnostics,
}

impl OksProperty {
    fn wrap(
        kernel: &Weak<RefCell<OksKernel>>,
        id: &str,
        owner: &str,
        diagnostics: SharedDiagnostics,
    ) -> Result<Self> {
        let engine = upgrade(kernel)?;
        let kind = match engine.borrow().item(id) {
            Some(item) => item.property_kind().ok_or(AdaptorError::StructuralType {
                expected: "property",
                found: item.kind_name(),
            })?,
            None => return Err(AdaptorError::StaleObject(format!("property #{}", id))),
        };
        Ok(Self {
            kernel: kernel.clone(),
            id: id.to_string(),
            owner: owner.to_string(),
            kind,
            diagnostics,
        })
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Class the wrapper was obtained through.
    pub fn owner_id(&self) -> &Id {
        &self.owner
    }

    fn with_item<R>(&self, f: impl FnOnce(&SchemaItem) -> R) -> Result<R> {
        let kernel = upgrade(&self.kernel)?;
        let kernel = kernel.borrow();
        if !kernel.is_loaded() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        let item = kernel
            .item(&self.id)
            .ok_or_else(|| AdaptorError::StaleObject(format!("{} #{}", self.kind, self.id)))?;
        Ok(f(item))
    }

    fn with_item_mut<R>(&self, f: impl FnOnce(&mut SchemaItem) -> R) -> Result<R> {
        let kernel = upgrade(&self.kernel)?;
        let mut kernel = kernel.borrow_mut();
        if !kernel.is_loaded() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        let item = kernel
            .item_mut(&self.id)
            .ok_or_else(|| AdaptorError::StaleObject(format!("{} #{}", self.kind, self.id)))?;
        Ok(f(item))
    }

    pub fn definition(&self) -> Result<SchemaItem> {
        self.with_item(SchemaItem::clone)
    }

    pub fn as_attribute(&self) -> Result<AttributeDef> {
        match self.definition()? {
            SchemaItem::Attribute(attribute) => Ok(attribute),
            other => Err(AdaptorError::StructuralType {
                expected: "attribute",
                found: other.kind_name(),
            }),
        }
    }

    pub fn as_relationship(&self) -> Result<RelationshipDef> {
        match self.definition()? {
            SchemaItem::Relationship(relationship) => Ok(relationship),
            other => Err(AdaptorError::StructuralType {
                expected: "relationship",
                found: other.kind_name(),
            }),
        }
    }

    pub fn as_method(&self) -> Result<MethodDef> {
        match self.definition()? {
            SchemaItem::Method(method) => Ok(method),
            other => Err(AdaptorError::StructuralType {
                expected: "method",
                found: other.kind_name(),
            }),
        }
    }

    fn label(kind: PropertyKind, name: &str) -> String {
        format!("{} '{}'", kind, name)
    }

    fn check_known_for_kind(&self, owner: &str, name: &str) {
        match self.kind {
            PropertyKind::Attribute => check_known::<AttributeField>(&self.diagnostics, owner, name),
            PropertyKind::Relationship => {
                check_known::<RelationshipField>(&self.diagnostics, owner, name)
            }
            PropertyKind::Method => check_known::<MethodField>(&self.diagnostics, owner, name),
        }
    }
}

impl NamedObject for OksProperty {
    fn name(&self) -> Result<String> {
        self.with_item(|item| item.name().to_string())
    }
}

impl ObjectModifier for OksProperty {
    fn get_attr(&self, name: &str) -> Result<Value> {
        let diagnostics = Rc::clone(&self.diagnostics);
        self.with_item(|item| {
            let owner = Self::label(self.kind, item.name());
            match item {
                SchemaItem::Attribute(def) => read_field::<AttributeField>(&diagnostics, &owner, def, name),
                SchemaItem::Relationship(def) => {
                    read_field::<RelationshipField>(&diagnostics, &owner, def, name)
                }
                SchemaItem::Method(def) => read_field::<MethodField>(&diagnostics, &owner, def, name),
                SchemaItem::Class(_) => Err(AdaptorError::StructuralType {
                    expected: "property",
                    found: "class",
                }),
            }
        })?
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        // Renames go through the kernel so the owning class keeps unique names
        if name == "name" {
            let current = self.name()?;
            self.check_known_for_kind(&Self::label(self.kind, &current), name);
            let new_name = value
                .as_str()
                .ok_or_else(|| AdaptorError::invalid_value(name, "expected a string"))?;
            let kernel = upgrade(&self.kernel)?;
            kernel.borrow_mut().rename_property(&self.owner, &self.id, new_name)?;
            return Ok(());
        }

        let diagnostics = Rc::clone(&self.diagnostics);
        let kind = self.kind;
        self.with_item_mut(|item| {
            let owner = Self::label(kind, item.name());
            match item {
                SchemaItem::Attribute(def) => {
                    write_field::<AttributeField>(&diagnostics, &owner, def, name, value)
                }
                SchemaItem::Relationship(def) => {
                    write_field::<RelationshipField>(&diagnostics, &owner, def, name, value)
                }
                SchemaItem::Method(def) => write_field::<MethodField>(&diagnostics, &owner, def, name, value),
                SchemaItem::Class(_) => Err(AdaptorError::StructuralType {
                    expected: "property",
                    found: "class",
                }),
            }
        })?
    }
}

impl PartialEq for OksProperty {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.kernel, &other.kernel) && self.id == other.id
    }
}

impl fmt::Debug for OksProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name().unwrap_or_else(|_| "<stale>".to_string());
        f.debug_struct("OksProperty")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("name", &name)
            .finish()
    }
}

/// Manages one kind of property on one class.
#[derive(Clone)]
pub struct OksPropertyHandler {
    kernel: Weak<RefCell<OksKernel>>,
    class_id: Id,
    kind: PropertyKind,
    diagnostics: SharedDiagnostics,
}

impl OksPropertyHandler {
    pub fn new(
        kernel: Weak<RefCell<OksKernel>>,
        class_id: Id,
        kind: PropertyKind,
        diagnostics: SharedDiagnostics,
    ) -> Self {
        Self {
            kernel,
            class_id,
            kind,
            diagnostics,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    fn wrap(&self, id: &str) -> Result<OksProperty> {
        OksProperty::wrap(&self.kernel, id, &self.class_id, Rc::clone(&self.diagnostics))
    }

    fn owner_label(&self, kernel: &OksKernel) -> String {
        kernel
            .class(&self.class_id)
            .map(|class| format!("class '{}'", class.name))
            .unwrap_or_else(|| format!("class #{}", self.class_id))
    }

    fn loaded_kernel(&self) -> Result<Rc<RefCell<OksKernel>>> {
        let kernel = upgrade(&self.kernel)?;
        if !kernel.borrow().is_loaded() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        if kernel.borrow().class(&self.class_id).is_none() {
            return Err(AdaptorError::StaleObject(format!("class #{}", self.class_id)));
        }
        Ok(kernel)
    }

    /// Own property first, then inherited; `None` when nothing matches.
    pub fn get(&self, name: &str) -> Result<Option<OksProperty>> {
        let kernel = self.loaded_kernel()?;
        let found = kernel.borrow().find_property(&self.class_id, self.kind, name);
        match found {
            Some(id) => self.wrap(&id).map(Some),
            None => {
                let owner = self.owner_label(&kernel.borrow());
                self.diagnostics.report(Finding::PropertyNotFound {
                    owner,
                    property: name.to_string(),
                });
                Ok(None)
            }
        }
    }

    /// Properties declared directly on the class.
    pub fn get_all(&self) -> Result<Vec<OksProperty>> {
        let kernel = self.loaded_kernel()?;
        let ids: Vec<Id> = kernel
            .borrow()
            .direct_properties(&self.class_id, self.kind)
            .iter()
            .map(|item| item.id().clone())
            .collect();
        ids.iter().map(|id| self.wrap(id)).collect()
    }

    /// Own and inherited properties; a name shadowed by the class is listed once.
    pub fn get_all_inherited(&self) -> Result<Vec<OksProperty>> {
        let kernel = self.loaded_kernel()?;
        let ids: Vec<Id> = kernel
            .borrow()
            .all_properties(&self.class_id, self.kind)?
            .iter()
            .map(|item| item.id().clone())
            .collect();
        ids.iter().map(|id| self.wrap(id)).collect()
    }

    pub fn create(&self, name: &str, attributes: &Attributes) -> Result<OksProperty> {
        let kernel = self.loaded_kernel()?;
        if name.trim().is_empty() {
            return Err(AdaptorError::invalid_value("name", "property name must not be empty"));
        }
        let owner = format!("{} '{}'", self.kind, name);

        let (item, parent) = match self.kind {
            PropertyKind::Attribute => {
                self.ignore_all(&owner, attributes);
                (SchemaItem::Attribute(AttributeDef::new(name)), None)
            }
            PropertyKind::Method => {
                self.ignore_all(&owner, attributes);
                (SchemaItem::Method(MethodDef::new(name)), None)
            }
            PropertyKind::Relationship => {
                let (relationship, parent) = self.relationship_from(name, &owner, attributes)?;
                (SchemaItem::Relationship(relationship), parent)
            }
        };

        let id = {
            let mut kernel = kernel.borrow_mut();
            let parent_id = match &parent {
                Some(parent) => {
                    let parent_id = kernel
                        .find_class(parent)
                        .map(|class| class.id.clone())
                        .ok_or_else(|| AdaptorError::class_not_found(parent))?;
                    (parent_id != self.class_id).then_some(parent_id)
                }
                None => None,
            };
            if let Some(parent_id) = &parent_id {
                kernel.check_free_name(parent_id, self.kind, name)?;
            }
            let id = kernel.create_property(&self.class_id, item)?;
            if let Some(parent_id) = parent_id {
                kernel.attach_property(&parent_id, &id)?;
            }
            id
        };
        self.wrap(&id)
    }

    fn ignore_all(&self, owner: &str, attributes: &Attributes) {
        for key in attributes.keys() {
            self.diagnostics.report(Finding::IgnoredParameter {
                owner: owner.to_string(),
                key: key.clone(),
            });
        }
    }

    fn relationship_from(
        &self,
        name: &str,
        owner: &str,
        attributes: &Attributes,
    ) -> Result<(RelationshipDef, Option<String>)> {
        let text = |key: &str, value: &Value| -> Result<String> {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| AdaptorError::invalid_value(key, "expected a string"))
        };
        let flag = |key: &str, value: &Value| -> Result<bool> {
            value
                .as_bool()
                .ok_or_else(|| AdaptorError::invalid_value(key, "expected a boolean"))
        };
        let cardinality = |key: &str, value: &Value| -> Result<Cardinality> {
            Cardinality::from_value(value).map_err(|reason| AdaptorError::invalid_value(key, reason))
        };

        let mut relationship = RelationshipDef::new(name, "");
        let mut parent = None;
        for (key, value) in attributes {
            match key.as_str() {
                "type" => relationship.class_type = text(key, value)?,
                "low_cardinality_constraint" => relationship.low_cardinality = cardinality(key, value)?,
                "high_cardinality_constraint" => {
                    relationship.high_cardinality = cardinality(key, value)?
                }
                "is_composite" => relationship.is_composite = flag(key, value)?,
                "is_exclusive" => relationship.is_exclusive = flag(key, value)?,
                "is_dependent" => relationship.is_dependent = flag(key, value)?,
                "description" => relationship.description = text(key, value)?,
                "parent" => {
                    if !value.is_null() {
                        parent = Some(text(key, value)?);
                    }
                }
                _ => self.diagnostics.report(Finding::IgnoredParameter {
                    owner: owner.to_string(),
                    key: key.clone(),
                }),
            }
        }
        Ok((relationship, parent))
    }

    /// Finds `old_name` and renames the record in place.
    pub fn rename_by_name(&self, old_name: &str, new_name: &str) -> Result<OksProperty> {
        let property = self.get(old_name)?.ok_or_else(|| {
            AdaptorError::ObjectNotFound(format!("{} '{}'", self.kind, old_name))
        })?;
        self.rename(&property, new_name)
    }

    fn check_kind(&self, property: &OksProperty) -> Result<()> {
        if property.kind() == self.kind {
            return Ok(());
        }
        Err(AdaptorError::StructuralType {
            expected: self.kind.as_str(),
            found: property.kind().as_str(),
        })
    }
}

impl ObjectHandler for OksPropertyHandler {
    type Object = OksProperty;
}

impl ObjectManager for OksPropertyHandler {
    fn get_all_obj(&self, filter: Option<NameList>) -> Result<Vec<OksProperty>> {
        match filter {
            None => self.get_all(),
            Some(names) => names
                .unique()
                .into_iter()
                .map(|name| {
                    self.get(name)?.ok_or_else(|| {
                        AdaptorError::ObjectNotFound(format!("{} '{}'", self.kind, name))
                    })
                })
                .collect(),
        }
    }
}

impl ObjectLifecycle for OksPropertyHandler {
    /// Attaches an existing record; one from another kernel is copied in.
    fn add(&self, property: &OksProperty) -> Result<OksProperty> {
        self.check_kind(property)?;
        let kernel = self.loaded_kernel()?;
        let id = if Weak::ptr_eq(&property.kernel, &self.kernel) {
            kernel.borrow_mut().attach_property(&self.class_id, property.id())?;
            property.id().clone()
        } else {
            let definition = property.definition()?;
            kernel.borrow_mut().import_property(&self.class_id, &definition)?
        };
        self.wrap(&id)
    }

    /// Detaches the record from this class; it is destroyed once no class holds it.
    fn delete(&self, property: &OksProperty) -> Result<()> {
        self.check_kind(property)?;
        let kernel = self.loaded_kernel()?;
        kernel.borrow_mut().detach_property(&self.class_id, property.id())?;
        Ok(())
    }

    fn rename(&self, property: &OksProperty, new_name: &str) -> Result<OksProperty> {
        self.check_kind(property)?;
        let kernel = self.loaded_kernel()?;
        kernel
            .borrow_mut()
            .rename_property(&self.class_id, property.id(), new_name)?;
        self.wrap(property.id())
    }
}

impl fmt::Debug for OksPropertyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OksPropertyHandler")
            .field("class_id", &self.class_id)
            .field("kind", &self.kind)
            .finish()
    }
}
