//! In-process data database.
//!
//! Data files hold objects addressed by `(class, id)`. Every data file names
//! the schema files it is typed against through `include` entries ending in
//! `schema.xml`; those are loaded into an embedded [`OksKernel`]. Objects are
//! stored under a generated native uid so that renames keep references intact.

use crate::error::{AdaptorError, Result};
use crate::model::document::{
    AttrElement, DataDocument, DataElement, IncludeElement, InfoElement, ObjectElement, RefElement,
    RelElement,
};
use crate::model::{
    generate_id, AttributeDef, ConfigType, DataObject, Id, PropertyKind, RelationshipDef,
    SaveRecord, SchemaItem,
};
use crate::store::oks::kernel::{read_file, resolve_include, write_file};
use crate::store::oks::OksKernel;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Default)]
struct DataFile {
    includes: Vec<String>,
    message: String,
}

/// Schema definition behind an attribute name of a data object.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Attribute(AttributeDef),
    Relationship(RelationshipDef),
}

/// A data object together with its references spelled as `(class, id)`,
/// so it can be re-created in another database.
#[derive(Debug, Clone)]
pub struct ObjectSnapshot {
    pub object: DataObject,
    pub references: BTreeMap<String, Vec<(String, String)>>,
}

#[derive(Debug, Default)]
pub struct ConffwkDatabase {
    schema: OksKernel,
    objects: HashMap<Id, DataObject>,
    index: BTreeMap<(String, String), Id>,
    files: BTreeMap<String, DataFile>,
    active_file: Option<String>,
    history: Vec<SaveRecord>,
}

fn format_error(path: &str, reason: String) -> AdaptorError {
    AdaptorError::Format {
        path: path.to_string(),
        reason,
    }
}

fn is_schema_include(path: &str) -> bool {
    ConfigType::Schema.matches_name(path)
}

impl ConffwkDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn schema(&self) -> &OksKernel {
        &self.schema
    }

    pub fn data_files(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    pub fn history(&self) -> &[SaveRecord] {
        &self.history
    }

    /// Loads a data file, the data files it includes and the schema they
    /// are typed against.
    pub fn load(&mut self, path: &str) -> Result<()> {
        let mut documents = Vec::new();
        let mut schemas = Vec::new();
        self.read_tree(path, &mut documents, &mut schemas)?;

        for schema in schemas {
            if !self.schema.is_file_loaded(&schema) {
                self.schema.load_schema(&schema)?;
            }
        }

        // First pass: objects and attributes; references need every object
        let mut staged: Vec<(DataObject, Vec<RelElement>)> = Vec::new();
        let mut staged_index: BTreeMap<(String, String), Id> = BTreeMap::new();
        for (file, document) in &documents {
            for element in &document.objects {
                let key = (element.class_name.clone(), element.id.clone());
                if self.index.contains_key(&key) || staged_index.contains_key(&key) {
                    return Err(AdaptorError::DuplicateObject(format!(
                        "'{}@{}' (loading '{}')",
                        element.id, element.class_name, file
                    )));
                }
                let object = self.object_from_element(element, file)?;
                staged_index.insert(key, object.uid.clone());
                staged.push((object, element.relationships.clone()));
            }
        }

        let mut resolved = Vec::new();
        for (mut object, relationships) in staged {
            for relationship in relationships {
                let mut targets = Vec::new();
                for target in &relationship.targets {
                    let uid = self
                        .resolve_reference(&target.class_name, &target.id, &staged_index)
                        .ok_or_else(|| {
                            format_error(
                                &object.file,
                                format!(
                                    "'{}' of '{}' points to unknown object '{}@{}'",
                                    relationship.name,
                                    object.full_name(),
                                    target.id,
                                    target.class_name
                                ),
                            )
                        })?;
                    targets.push(uid);
                }
                object.relationships.insert(relationship.name, targets);
            }
            resolved.push(object);
        }

        for object in resolved {
            self.index.insert(
                (object.class_name.clone(), object.name.clone()),
                object.uid.clone(),
            );
            self.objects.insert(object.uid.clone(), object);
        }
        for (file, document) in documents {
            log::debug!("Loaded data file '{}'", file);
            self.files.insert(
                file,
                DataFile {
                    includes: document.includes.into_iter().map(|i| i.path).collect(),
                    message: String::new(),
                },
            );
        }
        self.active_file = Some(path.to_string());
        Ok(())
    }

    fn read_tree(
        &self,
        path: &str,
        documents: &mut Vec<(String, DataDocument)>,
        schemas: &mut Vec<String>,
    ) -> Result<()> {
        if self.files.contains_key(path) || documents.iter().any(|(file, _)| file == path) {
            return Ok(());
        }
        let text = read_file(path)?;
        let document = DataDocument::from_xml(&text, path)?;
        let includes: Vec<String> = document
            .includes
            .iter()
            .map(|include| resolve_include(path, &include.path))
            .collect();
        documents.push((path.to_string(), document));
        for include in includes {
            if is_schema_include(&include) {
                if !schemas.contains(&include) {
                    schemas.push(include);
                }
            } else {
                self.read_tree(&include, documents, schemas)?;
            }
        }
        Ok(())
    }

    fn resolve_reference(
        &self,
        class_name: &str,
        name: &str,
        staged: &BTreeMap<(String, String), Id>,
    ) -> Option<Id> {
        let key = (class_name.to_string(), name.to_string());
        if let Some(uid) = staged.get(&key).or_else(|| self.index.get(&key)) {
            return Some(uid.clone());
        }
        staged
            .iter()
            .chain(self.index.iter())
            .find(|((class, id), _)| id == name && self.schema.is_kind_of(class, class_name))
            .map(|(_, uid)| uid.clone())
    }

    fn object_from_element(&self, element: &ObjectElement, file: &str) -> Result<DataObject> {
        let layout = self
            .attribute_layout(&element.class_name)
            .map_err(|_| format_error(file, format!("class '{}' is not defined", element.class_name)))?;
        let mut object = self.new_object(&element.class_name, &element.id, file)?;

        for attr in &element.attributes {
            let def = layout.iter().find(|def| def.name == attr.name).ok_or_else(|| {
                format_error(
                    file,
                    format!("class '{}' has no attribute '{}'", element.class_name, attr.name),
                )
            })?;
            let parse = |text: &str| {
                def.data_type.parse_text(text).map_err(|reason| {
                    format_error(file, format!("attribute '{}' of '{}@{}': {}", attr.name, element.id, element.class_name, reason))
                })
            };
            let value = if def.is_multi_value {
                let values = attr
                    .values
                    .iter()
                    .map(|data| parse(&data.value))
                    .collect::<Result<Vec<_>>>()?;
                Value::Array(values)
            } else {
                match &attr.value {
                    Some(text) => parse(text)?,
                    None => def.data_type.default_value(),
                }
            };
            object.attributes.insert(attr.name.clone(), value);
        }
        Ok(object)
    }

    /// Fresh object with every attribute at its initial value.
    fn new_object(&self, class_name: &str, name: &str, file: &str) -> Result<DataObject> {
        let mut object = DataObject::new(generate_id(), class_name, name, file);
        for def in self.attribute_layout(class_name)? {
            let value = if def.is_multi_value {
                json!([])
            } else if def.init_value.is_empty() {
                def.data_type.default_value()
            } else {
                def.data_type
                    .parse_text(&def.init_value)
                    .unwrap_or_else(|_| def.data_type.default_value())
            };
            object.attributes.insert(def.name.clone(), value);
        }
        for def in self.relationship_layout(class_name)? {
            object.relationships.insert(def.name.clone(), Vec::new());
        }
        Ok(object)
    }

    pub fn unload(&mut self) {
        self.objects.clear();
        self.index.clear();
        self.files.clear();
        self.active_file = None;
        self.schema.close_all_schema();
    }

    /// Writes every loaded data file.
    pub fn commit(&mut self, message: &str) -> Result<Vec<SaveRecord>> {
        if !self.is_loaded() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        let saved_at = chrono::Utc::now().to_rfc3339();
        let paths: Vec<String> = self.files.keys().cloned().collect();
        let mut records = Vec::new();
        for path in paths {
            let document = self.document_for(&path, message, &saved_at);
            let text = document.to_xml(&path)?;
            write_file(&path, &text)?;

            let record = SaveRecord::new(&path, &text, message, &saved_at, document.objects.len());
            log::info!("Committed data file '{}' ({})", path, &record.digest[..12]);
            if let Some(file) = self.files.get_mut(&path) {
                file.message = message.to_string();
            }
            self.history.push(record.clone());
            records.push(record);
        }
        Ok(records)
    }

    fn document_for(&self, path: &str, message: &str, saved_at: &str) -> DataDocument {
        let includes = self
            .files
            .get(path)
            .map(|file| file.includes.clone())
            .unwrap_or_default();
        let objects = self
            .all_objects()
            .into_iter()
            .filter(|object| object.file == path)
            .map(|object| self.object_to_element(object))
            .collect();

        DataDocument {
            info: Some(InfoElement {
                message: message.to_string(),
                saved_at: saved_at.to_string(),
            }),
            includes: includes
                .into_iter()
                .map(|path| IncludeElement { path })
                .collect(),
            objects,
        }
    }

    fn object_to_element(&self, object: &DataObject) -> ObjectElement {
        let layout = self.attribute_layout(&object.class_name).unwrap_or_default();
        let attributes = object
            .attributes
            .iter()
            .map(|(name, value)| {
                let data_type = layout
                    .iter()
                    .find(|def| &def.name == name)
                    .map(|def| def.data_type)
                    .unwrap_or_default();
                match value {
                    Value::Array(items) => AttrElement {
                        name: name.clone(),
                        value: None,
                        values: items
                            .iter()
                            .map(|item| DataElement {
                                value: data_type.format_value(item),
                            })
                            .collect(),
                    },
                    single => AttrElement {
                        name: name.clone(),
                        value: Some(data_type.format_value(single)),
                        values: Vec::new(),
                    },
                }
            })
            .collect();
        let relationships = object
            .relationships
            .iter()
            .map(|(name, targets)| RelElement {
                name: name.clone(),
                targets: targets
                    .iter()
                    .filter_map(|uid| self.objects.get(uid))
                    .map(|target| RefElement {
                        class_name: target.class_name.clone(),
                        id: target.name.clone(),
                    })
                    .collect(),
            })
            .collect();

        ObjectElement {
            class_name: object.class_name.clone(),
            id: object.name.clone(),
            attributes,
            relationships,
        }
    }

    fn layout(&self, class_name: &str, kind: PropertyKind) -> Result<Vec<SchemaItem>> {
        let class = self
            .schema
            .find_class(class_name)
            .ok_or_else(|| AdaptorError::class_not_found(class_name))?;
        Ok(self
            .schema
            .all_properties(&class.id, kind)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Attributes of the class including inherited ones.
    pub fn attribute_layout(&self, class_name: &str) -> Result<Vec<AttributeDef>> {
        Ok(self
            .layout(class_name, PropertyKind::Attribute)?
            .into_iter()
            .filter_map(|item| match item {
                SchemaItem::Attribute(def) => Some(def),
                _ => None,
            })
            .collect())
    }

    pub fn relationship_layout(&self, class_name: &str) -> Result<Vec<RelationshipDef>> {
        Ok(self
            .layout(class_name, PropertyKind::Relationship)?
            .into_iter()
            .filter_map(|item| match item {
                SchemaItem::Relationship(def) => Some(def),
                _ => None,
            })
            .collect())
    }

    pub fn slot(&self, class_name: &str, name: &str) -> Option<Slot> {
        if let Some(def) = self
            .attribute_layout(class_name)
            .ok()?
            .into_iter()
            .find(|def| def.name == name)
        {
            return Some(Slot::Attribute(def));
        }
        self.relationship_layout(class_name)
            .ok()?
            .into_iter()
            .find(|def| def.name == name)
            .map(Slot::Relationship)
    }

    pub fn object(&self, uid: &str) -> Option<&DataObject> {
        self.objects.get(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.objects.contains_key(uid)
    }

    /// Exact class first, then objects of any subclass with that id.
    pub fn find(&self, class_name: &str, name: &str) -> Option<&DataObject> {
        let key = (class_name.to_string(), name.to_string());
        if let Some(uid) = self.index.get(&key) {
            return self.objects.get(uid);
        }
        self.index
            .iter()
            .find(|((class, id), _)| id == name && self.schema.is_kind_of(class, class_name))
            .and_then(|(_, uid)| self.objects.get(uid))
    }

    /// Every object, ordered by class then id.
    pub fn all_objects(&self) -> Vec<&DataObject> {
        self.index
            .values()
            .filter_map(|uid| self.objects.get(uid))
            .collect()
    }

    /// Objects of `class_name` and of its subclasses.
    pub fn objects_of(&self, class_name: &str) -> Vec<&DataObject> {
        self.all_objects()
            .into_iter()
            .filter(|object| self.schema.is_kind_of(&object.class_name, class_name))
            .collect()
    }

    fn check_creatable(&self, class_name: &str, name: &str) -> Result<()> {
        let class = self
            .schema
            .find_class(class_name)
            .ok_or_else(|| AdaptorError::class_not_found(class_name))?;
        if class.is_abstract {
            return Err(AdaptorError::invalid_value(
                "class",
                format!("class '{}' is abstract", class_name),
            ));
        }
        if name.trim().is_empty() {
            return Err(AdaptorError::invalid_value("id", "object id must not be empty"));
        }
        if self
            .index
            .contains_key(&(class_name.to_string(), name.to_string()))
        {
            return Err(AdaptorError::DuplicateObject(format!("'{}@{}'", name, class_name)));
        }
        Ok(())
    }

    pub fn create(&mut self, class_name: &str, name: &str) -> Result<Id> {
        self.check_creatable(class_name, name)?;
        let file = self
            .active_file
            .clone()
            .ok_or(AdaptorError::ConfigurationNotLoaded)?;
        let object = self.new_object(class_name, name, &file)?;
        let uid = object.uid.clone();
        self.index
            .insert((class_name.to_string(), name.to_string()), uid.clone());
        self.objects.insert(uid.clone(), object);
        Ok(uid)
    }

    /// Removes the object and every reference to it.
    pub fn destroy(&mut self, uid: &str) -> Result<DataObject> {
        let object = self
            .objects
            .remove(uid)
            .ok_or_else(|| AdaptorError::StaleObject(format!("object #{}", uid)))?;
        self.index
            .remove(&(object.class_name.clone(), object.name.clone()));
        let uid = uid.to_string();
        for other in self.objects.values_mut() {
            if other.references(&uid) {
                other.forget(&uid);
            }
        }
        Ok(object)
    }

    /// In-place rename; references follow because they hold the uid.
    pub fn rename(&mut self, uid: &str, new_name: &str) -> Result<()> {
        let (class_name, old_name) = self
            .objects
            .get(uid)
            .map(|object| (object.class_name.clone(), object.name.clone()))
            .ok_or_else(|| AdaptorError::StaleObject(format!("object #{}", uid)))?;
        if old_name == new_name {
            return Ok(());
        }
        if new_name.trim().is_empty() {
            return Err(AdaptorError::invalid_value("id", "object id must not be empty"));
        }
        let new_key = (class_name.clone(), new_name.to_string());
        if self.index.contains_key(&new_key) {
            return Err(AdaptorError::DuplicateObject(format!("'{}@{}'", new_name, class_name)));
        }
        self.index.remove(&(class_name, old_name));
        self.index.insert(new_key, uid.to_string());
        if let Some(object) = self.objects.get_mut(uid) {
            object.name = new_name.to_string();
        }
        Ok(())
    }

    pub fn snapshot(&self, uid: &str) -> Option<ObjectSnapshot> {
        let object = self.objects.get(uid)?;
        let references = object
            .relationships
            .iter()
            .map(|(name, targets)| {
                let keys = targets
                    .iter()
                    .filter_map(|target| self.objects.get(target))
                    .map(|target| (target.class_name.clone(), target.name.clone()))
                    .collect();
                (name.clone(), keys)
            })
            .collect();
        Some(ObjectSnapshot {
            object: object.clone(),
            references,
        })
    }

    /// Re-creates a snapshot here under a new uid; references must resolve locally.
    pub fn insert_copy(&mut self, snapshot: &ObjectSnapshot) -> Result<Id> {
        let source = &snapshot.object;
        self.check_creatable(&source.class_name, &source.name)?;
        let file = if self.files.contains_key(&source.file) {
            source.file.clone()
        } else {
            self.active_file
                .clone()
                .ok_or(AdaptorError::ConfigurationNotLoaded)?
        };

        let mut object = self.new_object(&source.class_name, &source.name, &file)?;
        for (name, value) in &source.attributes {
            if object.attributes.contains_key(name) {
                object.attributes.insert(name.clone(), value.clone());
            }
        }
        let local = BTreeMap::new();
        for (name, keys) in &snapshot.references {
            if !object.relationships.contains_key(name) {
                continue;
            }
            let mut targets = Vec::new();
            for (class_name, id) in keys {
                let uid = self
                    .resolve_reference(class_name, id, &local)
                    .ok_or_else(|| AdaptorError::object_not_found(class_name, id))?;
                targets.push(uid);
            }
            object.relationships.insert(name.clone(), targets);
        }

        let uid = object.uid.clone();
        self.index
            .insert((object.class_name.clone(), object.name.clone()), uid.clone());
        self.objects.insert(uid.clone(), object);
        Ok(uid)
    }

    pub fn attribute_value(&self, uid: &str, def: &AttributeDef) -> Result<Value> {
        let object = self
            .objects
            .get(uid)
            .ok_or_else(|| AdaptorError::StaleObject(format!("object #{}", uid)))?;
        Ok(object.attributes.get(&def.name).cloned().unwrap_or_else(|| {
            if def.is_multi_value {
                json!([])
            } else {
                def.data_type.default_value()
            }
        }))
    }

    /// Validates against type, multiplicity and range before storing.
    pub fn set_attribute_value(&mut self, uid: &str, def: &AttributeDef, value: Value) -> Result<()> {
        if !self.objects.contains_key(uid) {
            return Err(AdaptorError::StaleObject(format!("object #{}", uid)));
        }
        let check = |item: &Value| -> std::result::Result<Value, String> {
            let coerced = def.data_type.coerce(item)?;
            def.data_type.check_range(&coerced, &def.range)?;
            Ok(coerced)
        };
        let stored = if def.is_multi_value {
            let items = value
                .as_array()
                .ok_or_else(|| AdaptorError::invalid_value(&def.name, "expected a list of values"))?;
            let coerced = items
                .iter()
                .map(check)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|reason| AdaptorError::invalid_value(&def.name, reason))?;
            Value::Array(coerced)
        } else {
            check(&value).map_err(|reason| AdaptorError::invalid_value(&def.name, reason))?
        };

        if let Some(object) = self.objects.get_mut(uid) {
            object.attributes.insert(def.name.clone(), stored);
        }
        Ok(())
    }

    /// Targets as `{class, id}` maps; a list for multi-valued relationships.
    pub fn relationship_value(&self, uid: &str, def: &RelationshipDef) -> Result<Value> {
        let object = self
            .objects
            .get(uid)
            .ok_or_else(|| AdaptorError::StaleObject(format!("object #{}", uid)))?;
        let targets: Vec<Value> = object
            .relationships
            .get(&def.name)
            .map(|targets| {
                targets
                    .iter()
                    .filter_map(|target| self.objects.get(target))
                    .map(|target| json!({"class": target.class_name, "id": target.name}))
                    .collect()
            })
            .unwrap_or_default();
        if def.is_multi_value() {
            Ok(Value::Array(targets))
        } else {
            Ok(targets.into_iter().next().unwrap_or(Value::Null))
        }
    }

    pub fn set_relationship_targets(
        &mut self,
        uid: &str,
        def: &RelationshipDef,
        value: Value,
    ) -> Result<()> {
        if !self.objects.contains_key(uid) {
            return Err(AdaptorError::StaleObject(format!("object #{}", uid)));
        }
        let requested = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            single => vec![single],
        };
        if !def.is_multi_value() && requested.len() > 1 {
            return Err(AdaptorError::invalid_value(
                &def.name,
                "relationship holds a single object",
            ));
        }

        let mut targets = Vec::new();
        let mut seen = HashSet::new();
        for item in &requested {
            let class_name = item.get("class").and_then(Value::as_str);
            let id = item.get("id").and_then(Value::as_str);
            let (Some(class_name), Some(id)) = (class_name, id) else {
                return Err(AdaptorError::invalid_value(
                    &def.name,
                    format!("expected {{\"class\": .., \"id\": ..}}, got {}", item),
                ));
            };
            let target = self
                .find(class_name, id)
                .ok_or_else(|| AdaptorError::object_not_found(class_name, id))?;
            if !def.class_type.is_empty() && !self.schema.is_kind_of(&target.class_name, &def.class_type) {
                return Err(AdaptorError::invalid_value(
                    &def.name,
                    format!("'{}' is not a '{}'", target.full_name(), def.class_type),
                ));
            }
            if seen.insert(target.uid.clone()) {
                targets.push(target.uid.clone());
            }
        }

        if let Some(object) = self.objects.get_mut(uid) {
            object.relationships.insert(def.name.clone(), targets);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SCHEMA: &str = r#"<oks-schema>
  <class name="Resource" is-abstract="true">
    <attribute name="enabled" type="bool" init-value="true"/>
  </class>
  <class name="Host">
    <superclass name="Resource"/>
    <attribute name="cores" type="u16" range="1..512" init-value="4"/>
    <attribute name="tags" type="string" is-multi-value="true"/>
  </class>
  <class name="Application">
    <superclass name="Resource"/>
    <relationship name="runs_on" class-type="Host" low-cc="one" high-cc="one"/>
  </class>
</oks-schema>"#;

    const DATA: &str = r#"<oks-data>
  <include path="hosts.schema.xml"/>
  <obj class="Host" id="np04-srv-001">
    <attr name="cores" val="64"/>
    <attr name="tags"><data val="daq"/><data val="readout"/></attr>
  </obj>
  <obj class="Application" id="ru-01">
    <rel name="runs_on"><ref class="Host" id="np04-srv-001"/></rel>
  </obj>
</oks-data>"#;

    fn load() -> (tempfile::TempDir, ConffwkDatabase, String) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("hosts.schema.xml"), SCHEMA).unwrap();
        let data = dir.path().join("session.data.xml");
        fs::write(&data, DATA).unwrap();
        let path = data.to_string_lossy().into_owned();
        let mut database = ConffwkDatabase::new();
        database.load(&path).unwrap();
        (dir, database, path)
    }

    #[test]
    fn test_load_types_values_and_resolves_references() {
        let (_dir, database, path) = load();
        assert!(database.data_files().contains(&path.as_str()));
        let host = database.find("Host", "np04-srv-001").unwrap();
        assert_eq!(host.attributes["cores"], json!(64));
        assert_eq!(host.attributes["tags"], json!(["daq", "readout"]));
        assert_eq!(host.attributes["enabled"], json!(true));

        let app = database.find("Application", "ru-01").unwrap();
        assert_eq!(app.relationships["runs_on"], vec![host.uid.clone()]);
        assert_eq!(database.objects_of("Resource").len(), 2);
        assert!(database.find("Resource", "ru-01").is_some());
    }

    #[test]
    fn test_create_rejects_abstract_and_duplicates() {
        let (_dir, mut database, _path) = load();
        assert!(matches!(
            database.create("Resource", "r"),
            Err(AdaptorError::InvalidValue { .. })
        ));
        assert!(matches!(
            database.create("Host", "np04-srv-001"),
            Err(AdaptorError::DuplicateObject(_))
        ));
        assert!(matches!(
            database.create("Nope", "x"),
            Err(AdaptorError::ObjectNotFound(_))
        ));

        let uid = database.create("Host", "np04-srv-002").unwrap();
        assert_eq!(database.object(&uid).unwrap().attributes["cores"], json!(4));
    }

    #[test]
    fn test_attribute_validation() {
        let (_dir, mut database, _path) = load();
        let uid = database.find("Host", "np04-srv-001").unwrap().uid.clone();
        let Some(Slot::Attribute(cores)) = database.slot("Host", "cores") else {
            panic!("cores is an attribute");
        };

        assert!(database.set_attribute_value(&uid, &cores, json!(600)).is_err());
        assert!(database.set_attribute_value(&uid, &cores, json!("many")).is_err());
        database.set_attribute_value(&uid, &cores, json!(128)).unwrap();
        assert_eq!(database.attribute_value(&uid, &cores).unwrap(), json!(128));
    }

    #[test]
    fn test_destroy_strips_references_and_rename_keeps_them() {
        let (_dir, mut database, _path) = load();
        let host = database.find("Host", "np04-srv-001").unwrap().uid.clone();
        let app = database.find("Application", "ru-01").unwrap().uid.clone();
        let Some(Slot::Relationship(runs_on)) = database.slot("Application", "runs_on") else {
            panic!("runs_on is a relationship");
        };

        database.rename(&host, "np04-srv-009").unwrap();
        assert_eq!(
            database.relationship_value(&app, &runs_on).unwrap(),
            json!({"class": "Host", "id": "np04-srv-009"})
        );

        database.destroy(&host).unwrap();
        assert_eq!(database.relationship_value(&app, &runs_on).unwrap(), Value::Null);
    }

    #[test]
    fn test_commit_round_trip() {
        let (_dir, mut database, path) = load();
        database.create("Host", "np04-srv-003").unwrap();
        let records = database.commit("add host").unwrap();
        assert_eq!(records.len(), 1);

        let mut reloaded = ConffwkDatabase::new();
        reloaded.load(&path).unwrap();
        assert_eq!(reloaded.all_objects().len(), 3);
        let host = reloaded.find("Host", "np04-srv-001").unwrap();
        assert_eq!(host.attributes["tags"], json!(["daq", "readout"]));
        let app = reloaded.find("Application", "ru-01").unwrap();
        assert_eq!(app.relationships["runs_on"], vec![host.uid.clone()]);
    }
}
