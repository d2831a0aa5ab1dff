//! In-process schema kernel.
//!
//! Owns every class and property record of the loaded schema files in one
//! id-keyed arena. Classes are indexed by name; properties belong to classes
//! through the id lists on [`ClassDef`] and may be shared between classes.

use crate::error::{AdaptorError, Result};
use crate::model::document::{
    AttributeElement, ClassElement, ImplementationElement, IncludeElement, InfoElement,
    MethodElement, RelationshipElement, SchemaDocument, SuperClassElement,
};
use crate::model::{
    generate_id, AttributeDef, Cardinality, ClassDef, DataType, Id, IntegerFormat, MethodDef,
    MethodImplementation, PropertyKind, RelationshipDef, SaveRecord, SchemaItem,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
struct SchemaFile {
    /// Include paths as written in the file
    includes: Vec<String>,
    message: String,
}

/// Detached copy of a class and its properties, used to clone classes
/// within a kernel or across kernels.
#[derive(Debug, Clone)]
pub struct ClassSnapshot {
    pub class: ClassDef,
    pub properties: Vec<SchemaItem>,
}

#[derive(Debug, Default)]
pub struct OksKernel {
    items: HashMap<Id, SchemaItem>,
    class_index: BTreeMap<String, Id>,
    files: BTreeMap<String, SchemaFile>,
    active_file: Option<String>,
    history: Vec<SaveRecord>,
}

/// Resolves an include path against the directory of the including file.
pub(crate) fn resolve_include(base: &str, include: &str) -> String {
    let include_path = Path::new(include);
    if include_path.is_absolute() {
        return include.to_string();
    }
    match Path::new(base).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            dir.join(include_path).to_string_lossy().into_owned()
        }
        _ => include.to_string(),
    }
}

pub(crate) fn read_file(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|source| AdaptorError::Io {
        path: path.to_string(),
        source,
    })
}

pub(crate) fn write_file(path: &str, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| AdaptorError::Io {
        path: path.to_string(),
        source,
    })
}

fn format_error(path: &str, reason: String) -> AdaptorError {
    AdaptorError::Format {
        path: path.to_string(),
        reason,
    }
}

impl OksKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        !self.files.is_empty()
    }

    /// File new classes are created in.
    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_deref()
    }

    pub fn schema_files(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    pub fn is_file_loaded(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn history(&self) -> &[SaveRecord] {
        &self.history
    }

    /// Loads a schema file and everything it includes. Nothing is registered
    /// unless every file parses and no class name clashes.
    pub fn load_schema(&mut self, path: &str) -> Result<()> {
        let mut documents = Vec::new();
        self.read_tree(path, &mut documents)?;

        let mut incoming = HashSet::new();
        let mut parsed = Vec::new();
        for (file, document) in documents {
            let mut classes = Vec::new();
            for element in document.classes {
                if self.class_index.contains_key(&element.name) || !incoming.insert(element.name.clone()) {
                    return Err(AdaptorError::DuplicateObject(format!(
                        "class '{}' (loading '{}')",
                        element.name, file
                    )));
                }
                classes.push(class_from_element(element, &file)?);
            }
            let includes = document.includes.into_iter().map(|i| i.path).collect();
            parsed.push((file, includes, classes));
        }

        for (file, includes, classes) in parsed {
            for (class, properties) in classes {
                for property in properties {
                    self.items.insert(property.id().clone(), property);
                }
                self.class_index.insert(class.name.clone(), class.id.clone());
                self.items.insert(class.id.clone(), SchemaItem::Class(class));
            }
            log::debug!("Loaded schema file '{}'", file);
            self.files.insert(
                file,
                SchemaFile {
                    includes,
                    message: String::new(),
                },
            );
        }

        self.active_file = Some(path.to_string());
        Ok(())
    }

    fn read_tree(&self, path: &str, documents: &mut Vec<(String, SchemaDocument)>) -> Result<()> {
        if self.files.contains_key(path) || documents.iter().any(|(file, _)| file == path) {
            return Ok(());
        }
        let text = read_file(path)?;
        let document = SchemaDocument::from_xml(&text, path)?;
        let includes: Vec<String> = document
            .includes
            .iter()
            .map(|include| resolve_include(path, &include.path))
            .collect();
        documents.push((path.to_string(), document));
        for include in includes {
            self.read_tree(&include, documents)?;
        }
        Ok(())
    }

    /// Unloads one schema file and its classes. Returns false if it was not loaded.
    pub fn close_schema(&mut self, path: &str) -> bool {
        if self.files.remove(path).is_none() {
            return false;
        }
        let doomed: Vec<Id> = self
            .classes()
            .into_iter()
            .filter(|class| class.file == path)
            .map(|class| class.id.clone())
            .collect();
        for id in doomed {
            self.remove_class(&id);
        }
        if self.active_file.as_deref() == Some(path) {
            self.active_file = self.files.keys().next().cloned();
        }
        true
    }

    pub fn close_all_schema(&mut self) {
        self.items.clear();
        self.class_index.clear();
        self.files.clear();
        self.active_file = None;
    }

    /// Writes every loaded schema file, including files that only exist
    /// because a class was moved to them.
    pub fn save_all_schema(&mut self, message: &str) -> Result<Vec<SaveRecord>> {
        if !self.is_loaded() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }

        let class_files: Vec<String> = self.classes().iter().map(|c| c.file.clone()).collect();
        for file in class_files {
            self.files.entry(file).or_default();
        }

        let saved_at = chrono::Utc::now().to_rfc3339();
        let paths: Vec<String> = self.files.keys().cloned().collect();
        let mut records = Vec::new();
        for path in paths {
            let document = self.document_for(&path, message, &saved_at);
            let text = document.to_xml(&path)?;
            write_file(&path, &text)?;

            let record = SaveRecord::new(&path, &text, message, &saved_at, document.classes.len());
            log::info!("Saved schema file '{}' ({})", path, &record.digest[..12]);
            if let Some(file) = self.files.get_mut(&path) {
                file.message = message.to_string();
            }
            self.history.push(record.clone());
            records.push(record);
        }
        Ok(records)
    }

    fn document_for(&self, path: &str, message: &str, saved_at: &str) -> SchemaDocument {
        let includes = self
            .files
            .get(path)
            .map(|file| file.includes.clone())
            .unwrap_or_default();
        let classes = self
            .classes()
            .into_iter()
            .filter(|class| class.file == path)
            .map(|class| self.class_to_element(class))
            .collect();

        SchemaDocument {
            info: Some(InfoElement {
                message: message.to_string(),
                saved_at: saved_at.to_string(),
            }),
            includes: includes
                .into_iter()
                .map(|path| IncludeElement { path })
                .collect(),
            classes,
        }
    }

    fn class_to_element(&self, class: &ClassDef) -> ClassElement {
        let properties = |kind: PropertyKind| -> Vec<&SchemaItem> {
            class
                .property_ids(kind)
                .iter()
                .filter_map(|id| self.items.get(id))
                .collect()
        };

        ClassElement {
            name: class.name.clone(),
            description: class.description.clone(),
            is_abstract: class.is_abstract,
            transient: class.transient,
            super_classes: class
                .super_classes
                .iter()
                .map(|name| SuperClassElement { name: name.clone() })
                .collect(),
            attributes: properties(PropertyKind::Attribute)
                .into_iter()
                .filter_map(|item| match item {
                    SchemaItem::Attribute(attribute) => Some(AttributeElement {
                        name: attribute.name.clone(),
                        description: attribute.description.clone(),
                        data_type: attribute.data_type.as_str().to_string(),
                        range: attribute.range.clone(),
                        init_value: attribute.init_value.clone(),
                        is_multi_value: attribute.is_multi_value,
                        is_not_null: attribute.is_not_null,
                        format: match attribute.format {
                            IntegerFormat::Dec => String::new(),
                            other => other.as_str().to_string(),
                        },
                    }),
                    _ => None,
                })
                .collect(),
            relationships: properties(PropertyKind::Relationship)
                .into_iter()
                .filter_map(|item| match item {
                    SchemaItem::Relationship(relationship) => Some(RelationshipElement {
                        name: relationship.name.clone(),
                        description: relationship.description.clone(),
                        class_type: relationship.class_type.clone(),
                        low_cardinality: relationship.low_cardinality.as_str().to_string(),
                        high_cardinality: relationship.high_cardinality.as_str().to_string(),
                        is_composite: relationship.is_composite,
                        is_exclusive: relationship.is_exclusive,
                        is_dependent: relationship.is_dependent,
                    }),
                    _ => None,
                })
                .collect(),
            methods: properties(PropertyKind::Method)
                .into_iter()
                .filter_map(|item| match item {
                    SchemaItem::Method(method) => Some(MethodElement {
                        name: method.name.clone(),
                        description: method.description.clone(),
                        implementations: method
                            .implementations
                            .iter()
                            .map(|i| ImplementationElement {
                                language: i.language.clone(),
                                prototype: i.prototype.clone(),
                                body: i.body.clone(),
                            })
                            .collect(),
                    }),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn item(&self, id: &str) -> Option<&SchemaItem> {
        self.items.get(id)
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut SchemaItem> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn class(&self, id: &str) -> Option<&ClassDef> {
        self.items.get(id).and_then(SchemaItem::as_class)
    }

    pub fn class_mut(&mut self, id: &str) -> Option<&mut ClassDef> {
        self.items.get_mut(id).and_then(SchemaItem::as_class_mut)
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassDef> {
        self.class_index.get(name).and_then(|id| self.class(id))
    }

    /// All classes ordered by name.
    pub fn classes(&self) -> Vec<&ClassDef> {
        self.class_index
            .values()
            .filter_map(|id| self.class(id))
            .collect()
    }

    pub fn create_class(
        &mut self,
        name: &str,
        description: &str,
        is_abstract: bool,
        transient: bool,
    ) -> Result<Id> {
        let file = self
            .active_file
            .clone()
            .ok_or(AdaptorError::ConfigurationNotLoaded)?;
        if self.class_index.contains_key(name) {
            return Err(AdaptorError::DuplicateObject(format!("class '{}'", name)));
        }

        let mut class = ClassDef::new(name, file);
        class.description = description.to_string();
        class.is_abstract = is_abstract;
        class.transient = transient;
        let id = class.id.clone();
        self.class_index.insert(name.to_string(), id.clone());
        self.items.insert(id.clone(), SchemaItem::Class(class));
        Ok(id)
    }

    pub fn snapshot_class(&self, id: &str) -> Option<ClassSnapshot> {
        let class = self.class(id)?;
        let properties = [
            PropertyKind::Attribute,
            PropertyKind::Relationship,
            PropertyKind::Method,
        ]
        .iter()
        .flat_map(|kind| class.property_ids(*kind).iter())
        .filter_map(|id| self.items.get(id).cloned())
        .collect();
        Some(ClassSnapshot {
            class: class.clone(),
            properties,
        })
    }

    /// Inserts a structural copy of `snapshot` named `name`; every property
    /// is duplicated under a fresh id.
    pub fn insert_class_copy(&mut self, snapshot: &ClassSnapshot, name: &str) -> Result<Id> {
        if self.class_index.contains_key(name) {
            return Err(AdaptorError::DuplicateObject(format!("class '{}'", name)));
        }

        let mut class = snapshot.class.clone();
        class.id = generate_id();
        class.name = name.to_string();
        class.super_classes.retain(|super_class| super_class != name);
        class.attributes.clear();
        class.relationships.clear();
        class.methods.clear();
        if !self.files.contains_key(&class.file) {
            class.file = self
                .active_file
                .clone()
                .ok_or(AdaptorError::ConfigurationNotLoaded)?;
        }

        for property in &snapshot.properties {
            let copy = property.duplicate();
            if let Some(kind) = copy.property_kind() {
                class.property_ids_mut(kind).push(copy.id().clone());
                self.items.insert(copy.id().clone(), copy);
            }
        }

        let id = class.id.clone();
        self.class_index.insert(class.name.clone(), id.clone());
        self.items.insert(id.clone(), SchemaItem::Class(class));
        Ok(id)
    }

    /// Destroys a class. Properties no other class uses go with it.
    pub fn destroy_class(&mut self, id: &str) -> Result<ClassDef> {
        self.remove_class(id)
            .ok_or_else(|| AdaptorError::StaleObject(format!("class #{}", id)))
    }

    fn remove_class(&mut self, id: &str) -> Option<ClassDef> {
        let class = match self.items.remove(id) {
            Some(SchemaItem::Class(class)) => class,
            Some(other) => {
                self.items.insert(id.to_string(), other);
                return None;
            }
            None => return None,
        };
        self.class_index.remove(&class.name);

        let still_used: HashSet<&Id> = self
            .items
            .values()
            .filter_map(SchemaItem::as_class)
            .flat_map(|other| {
                other
                    .attributes
                    .iter()
                    .chain(other.relationships.iter())
                    .chain(other.methods.iter())
            })
            .collect();
        let orphans: Vec<Id> = class
            .attributes
            .iter()
            .chain(class.relationships.iter())
            .chain(class.methods.iter())
            .filter(|property| !still_used.contains(property))
            .cloned()
            .collect();
        for property in orphans {
            self.items.remove(&property);
        }
        Some(class)
    }

    /// Re-points superclass lists and relationship class types after a rename.
    pub fn rename_class_references(&mut self, old_name: &str, new_name: &str) {
        for item in self.items.values_mut() {
            match item {
                SchemaItem::Class(class) => {
                    for super_class in class.super_classes.iter_mut() {
                        if super_class == old_name {
                            *super_class = new_name.to_string();
                        }
                    }
                }
                SchemaItem::Relationship(relationship) if relationship.class_type == old_name => {
                    relationship.class_type = new_name.to_string();
                }
                _ => {}
            }
        }
    }

    pub fn direct_super_classes(&self, name: &str) -> Vec<String> {
        self.find_class(name)
            .map(|class| class.super_classes.clone())
            .unwrap_or_default()
    }

    /// Transitive superclasses, nearest first, without duplicates.
    pub fn all_super_classes(&self, name: &str) -> Result<Vec<String>> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<String> = self.direct_super_classes(name).into();
        while let Some(current) = queue.pop_front() {
            if current == name {
                return Err(AdaptorError::InheritanceCycle(name.to_string()));
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            queue.extend(self.direct_super_classes(&current));
            result.push(current);
        }
        Ok(result)
    }

    pub fn direct_sub_classes(&self, name: &str) -> Vec<String> {
        self.classes()
            .into_iter()
            .filter(|class| class.has_super_class(name))
            .map(|class| class.name.clone())
            .collect()
    }

    /// Transitive subclasses, nearest first.
    pub fn all_sub_classes(&self, name: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut queue: VecDeque<String> = self.direct_sub_classes(name).into();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            queue.extend(self.direct_sub_classes(&current));
            result.push(current);
        }
        result
    }

    pub fn is_kind_of(&self, name: &str, ancestor: &str) -> bool {
        name == ancestor
            || self
                .all_super_classes(name)
                .map(|supers| supers.iter().any(|s| s == ancestor))
                .unwrap_or(false)
    }

    pub fn direct_properties(&self, class_id: &str, kind: PropertyKind) -> Vec<&SchemaItem> {
        self.class(class_id)
            .map(|class| {
                class
                    .property_ids(kind)
                    .iter()
                    .filter_map(|id| self.items.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Own properties first, then inherited ones; a name is reported once.
    pub fn all_properties(&self, class_id: &str, kind: PropertyKind) -> Result<Vec<&SchemaItem>> {
        let class = self
            .class(class_id)
            .ok_or_else(|| AdaptorError::StaleObject(format!("class #{}", class_id)))?;
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let lineage = std::iter::once(class.name.clone()).chain(self.all_super_classes(&class.name)?);
        for name in lineage {
            let Some(owner) = self.find_class(&name) else {
                continue;
            };
            for item in self.direct_properties(&owner.id, kind) {
                if seen.insert(item.name().to_string()) {
                    result.push(item);
                }
            }
        }
        Ok(result)
    }

    /// Looks in the class itself, then in its superclasses.
    pub fn find_property(&self, class_id: &str, kind: PropertyKind, name: &str) -> Option<Id> {
        self.all_properties(class_id, kind)
            .ok()?
            .into_iter()
            .find(|item| item.name() == name)
            .map(|item| item.id().clone())
    }

    fn owner_label(&self, class_id: &str) -> String {
        self.class(class_id)
            .map(|class| format!("class '{}'", class.name))
            .unwrap_or_else(|| format!("class #{}", class_id))
    }

    /// Classes whose id lists hold `property_id`.
    pub fn holders(&self, property_id: &str, kind: PropertyKind) -> Vec<Id> {
        self.items
            .values()
            .filter_map(SchemaItem::as_class)
            .filter(|class| class.property_ids(kind).iter().any(|id| id == property_id))
            .map(|class| class.id.clone())
            .collect()
    }

    pub(crate) fn check_free_name(&self, class_id: &str, kind: PropertyKind, name: &str) -> Result<()> {
        if self
            .direct_properties(class_id, kind)
            .iter()
            .any(|item| item.name() == name)
        {
            return Err(AdaptorError::DuplicateObject(format!(
                "{} '{}' of {}",
                kind,
                name,
                self.owner_label(class_id)
            )));
        }
        Ok(())
    }

    pub fn create_property(&mut self, class_id: &str, item: SchemaItem) -> Result<Id> {
        let kind = item.property_kind().ok_or(AdaptorError::StructuralType {
            expected: "property",
            found: "class",
        })?;
        if self.class(class_id).is_none() {
            return Err(AdaptorError::StaleObject(format!("class #{}", class_id)));
        }
        self.check_free_name(class_id, kind, item.name())?;

        let id = item.id().clone();
        self.items.insert(id.clone(), item);
        if let Some(class) = self.class_mut(class_id) {
            class.property_ids_mut(kind).push(id.clone());
        }
        Ok(id)
    }

    /// Inserts a property record coming from another kernel and attaches it.
    pub fn import_property(&mut self, class_id: &str, item: &SchemaItem) -> Result<Id> {
        self.create_property(class_id, item.duplicate())
    }

    pub fn attach_property(&mut self, class_id: &str, property_id: &str) -> Result<()> {
        let (kind, name) = match self.items.get(property_id) {
            Some(item) => match item.property_kind() {
                Some(kind) => (kind, item.name().to_string()),
                None => {
                    return Err(AdaptorError::StructuralType {
                        expected: "property",
                        found: "class",
                    })
                }
            },
            None => return Err(AdaptorError::StaleObject(format!("property #{}", property_id))),
        };
        self.check_free_name(class_id, kind, &name)?;
        let class = self
            .class_mut(class_id)
            .ok_or_else(|| AdaptorError::StaleObject(format!("class #{}", class_id)))?;
        class.property_ids_mut(kind).push(property_id.to_string());
        Ok(())
    }

    /// Detaches the record from one class. A record no class holds any
    /// more is destroyed.
    pub fn detach_property(&mut self, class_id: &str, property_id: &str) -> Result<()> {
        let kind = self
            .items
            .get(property_id)
            .and_then(SchemaItem::property_kind)
            .ok_or_else(|| AdaptorError::StaleObject(format!("property #{}", property_id)))?;
        let label = self.owner_label(class_id);
        let class = self
            .class_mut(class_id)
            .ok_or_else(|| AdaptorError::StaleObject(format!("class #{}", class_id)))?;
        let ids = class.property_ids_mut(kind);
        let before = ids.len();
        ids.retain(|id| id != property_id);
        if ids.len() == before {
            return Err(AdaptorError::ObjectNotFound(format!(
                "{} #{} in {}",
                kind, property_id, label
            )));
        }
        if self.holders(property_id, kind).is_empty() {
            self.items.remove(property_id);
        }
        Ok(())
    }

    pub fn rename_property(&mut self, class_id: &str, property_id: &str, new_name: &str) -> Result<()> {
        let kind = self
            .items
            .get(property_id)
            .and_then(SchemaItem::property_kind)
            .ok_or_else(|| AdaptorError::StaleObject(format!("property #{}", property_id)))?;
        if new_name.trim().is_empty() {
            return Err(AdaptorError::invalid_value("name", "name must not be empty"));
        }
        let unchanged = self.items.get(property_id).map(|item| item.name() == new_name);
        if unchanged == Some(true) {
            return Ok(());
        }
        // The record may be inherited or shared; every holder must stay unique
        let mut owners = self.holders(property_id, kind);
        if !owners.iter().any(|owner| owner == class_id) {
            owners.push(class_id.to_string());
        }
        for owner in &owners {
            self.check_free_name(owner, kind, new_name)?;
        }
        if let Some(item) = self.items.get_mut(property_id) {
            item.set_name(new_name);
        }
        Ok(())
    }
}

fn class_from_element(element: ClassElement, file: &str) -> Result<(ClassDef, Vec<SchemaItem>)> {
    let mut class = ClassDef::new(element.name, file);
    class.description = element.description;
    class.is_abstract = element.is_abstract;
    class.transient = element.transient;
    class.super_classes = element.super_classes.into_iter().map(|s| s.name).collect();

    let mut properties = Vec::new();
    for attribute in element.attributes {
        let data_type = DataType::parse(&attribute.data_type).ok_or_else(|| {
            format_error(
                file,
                format!("attribute '{}' has unknown type '{}'", attribute.name, attribute.data_type),
            )
        })?;
        let format = if attribute.format.is_empty() {
            IntegerFormat::Dec
        } else {
            IntegerFormat::parse(&attribute.format).ok_or_else(|| {
                format_error(file, format!("attribute '{}' has unknown format '{}'", attribute.name, attribute.format))
            })?
        };
        let mut def = AttributeDef::new(attribute.name);
        def.description = attribute.description;
        def.data_type = data_type;
        def.range = attribute.range;
        def.init_value = attribute.init_value;
        def.is_multi_value = attribute.is_multi_value;
        def.is_not_null = attribute.is_not_null;
        def.format = format;
        class.attributes.push(def.id.clone());
        properties.push(SchemaItem::Attribute(def));
    }

    for relationship in element.relationships {
        let cardinality = |text: &str| {
            Cardinality::parse(text).ok_or_else(|| {
                format_error(
                    file,
                    format!("relationship '{}' has unknown cardinality '{}'", relationship.name, text),
                )
            })
        };
        let mut def = RelationshipDef::new(relationship.name.clone(), relationship.class_type.clone());
        def.description = relationship.description.clone();
        def.low_cardinality = cardinality(&relationship.low_cardinality)?;
        def.high_cardinality = cardinality(&relationship.high_cardinality)?;
        def.is_composite = relationship.is_composite;
        def.is_exclusive = relationship.is_exclusive;
        def.is_dependent = relationship.is_dependent;
        class.relationships.push(def.id.clone());
        properties.push(SchemaItem::Relationship(def));
    }

    for method in element.methods {
        let mut def = MethodDef::new(method.name);
        def.description = method.description;
        for implementation in method.implementations {
            def.add_implementation(MethodImplementation {
                language: implementation.language,
                prototype: implementation.prototype,
                body: implementation.body,
            });
        }
        class.methods.push(def.id.clone());
        properties.push(SchemaItem::Method(def));
    }

    Ok((class, properties))
}
