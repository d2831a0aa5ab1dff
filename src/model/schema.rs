use crate::model::{generate_id, Cardinality, DataType, Id, PropertyKind};
use serde::{Deserialize, Serialize};

/// Schema class record owned by the kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub is_abstract: bool,
    pub transient: bool,
    /// Schema file the class is stored in
    pub file: String,
    /// Direct superclasses by name, in declaration order
    pub super_classes: Vec<String>,
    pub attributes: Vec<Id>,
    pub relationships: Vec<Id>,
    pub methods: Vec<Id>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            description: String::new(),
            is_abstract: false,
            transient: false,
            file: file.into(),
            super_classes: Vec::new(),
            attributes: Vec::new(),
            relationships: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn property_ids(&self, kind: PropertyKind) -> &Vec<Id> {
        match kind {
            PropertyKind::Attribute => &self.attributes,
            PropertyKind::Relationship => &self.relationships,
            PropertyKind::Method => &self.methods,
        }
    }

    pub fn property_ids_mut(&mut self, kind: PropertyKind) -> &mut Vec<Id> {
        match kind {
            PropertyKind::Attribute => &mut self.attributes,
            PropertyKind::Relationship => &mut self.relationships,
            PropertyKind::Method => &mut self.methods,
        }
    }

    pub fn has_super_class(&self, name: &str) -> bool {
        self.super_classes.iter().any(|super_class| super_class == name)
    }
}

/// Display base for integer attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegerFormat {
    #[default]
    Dec,
    Hex,
    Oct,
}

impl IntegerFormat {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "dec" => Some(IntegerFormat::Dec),
            "hex" => Some(IntegerFormat::Hex),
            "oct" => Some(IntegerFormat::Oct),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegerFormat::Dec => "dec",
            IntegerFormat::Hex => "hex",
            IntegerFormat::Oct => "oct",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub data_type: DataType,
    /// Allowed values: `low..high` for numbers, comma separated tokens for enums
    pub range: String,
    pub init_value: String,
    pub is_multi_value: bool,
    pub is_not_null: bool,
    pub format: IntegerFormat,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            description: String::new(),
            data_type: DataType::default(),
            range: String::new(),
            init_value: String::new(),
            is_multi_value: false,
            is_not_null: false,
            format: IntegerFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDef {
    pub id: Id,
    pub name: String,
    pub description: String,
    /// Name of the class the relationship points to
    pub class_type: String,
    pub low_cardinality: Cardinality,
    pub high_cardinality: Cardinality,
    pub is_composite: bool,
    pub is_exclusive: bool,
    pub is_dependent: bool,
}

impl RelationshipDef {
    pub fn new(name: impl Into<String>, class_type: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            description: String::new(),
            class_type: class_type.into(),
            low_cardinality: Cardinality::Zero,
            high_cardinality: Cardinality::Zero,
            is_composite: false,
            is_exclusive: false,
            is_dependent: false,
        }
    }

    /// True when the relationship holds a list rather than a single reference.
    pub fn is_multi_value(&self) -> bool {
        self.high_cardinality == Cardinality::Many
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodImplementation {
    pub language: String,
    pub prototype: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub id: Id,
    pub name: String,
    pub description: String,
    /// At most one implementation per language
    pub implementations: Vec<MethodImplementation>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            description: String::new(),
            implementations: Vec::new(),
        }
    }

    pub fn implementation(&self, language: &str) -> Option<&MethodImplementation> {
        self.implementations
            .iter()
            .find(|implementation| implementation.language == language)
    }

    /// Adds an implementation, replacing an existing one for the same language.
    pub fn add_implementation(&mut self, implementation: MethodImplementation) {
        match self
            .implementations
            .iter_mut()
            .find(|existing| existing.language == implementation.language)
        {
            Some(existing) => *existing = implementation,
            None => self.implementations.push(implementation),
        }
    }

    pub fn remove_implementation(&mut self, language: &str) -> bool {
        let before = self.implementations.len();
        self.implementations
            .retain(|implementation| implementation.language != language);
        before != self.implementations.len()
    }
}

/// Anything the schema kernel stores under an id.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaItem {
    Class(ClassDef),
    Attribute(AttributeDef),
    Relationship(RelationshipDef),
    Method(MethodDef),
}

impl SchemaItem {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaItem::Class(_) => "class",
            SchemaItem::Attribute(_) => "attribute",
            SchemaItem::Relationship(_) => "relationship",
            SchemaItem::Method(_) => "method",
        }
    }

    pub fn property_kind(&self) -> Option<PropertyKind> {
        match self {
            SchemaItem::Class(_) => None,
            SchemaItem::Attribute(_) => Some(PropertyKind::Attribute),
            SchemaItem::Relationship(_) => Some(PropertyKind::Relationship),
            SchemaItem::Method(_) => Some(PropertyKind::Method),
        }
    }

    pub fn id(&self) -> &Id {
        match self {
            SchemaItem::Class(class) => &class.id,
            SchemaItem::Attribute(attribute) => &attribute.id,
            SchemaItem::Relationship(relationship) => &relationship.id,
            SchemaItem::Method(method) => &method.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SchemaItem::Class(class) => &class.name,
            SchemaItem::Attribute(attribute) => &attribute.name,
            SchemaItem::Relationship(relationship) => &relationship.name,
            SchemaItem::Method(method) => &method.name,
        }
    }

    pub fn set_name(&mut self, name: &str) {
        let slot = match self {
            SchemaItem::Class(class) => &mut class.name,
            SchemaItem::Attribute(attribute) => &mut attribute.name,
            SchemaItem::Relationship(relationship) => &mut relationship.name,
            SchemaItem::Method(method) => &mut method.name,
        };
        *slot = name.to_string();
    }

    /// Copy of the item under a fresh id.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        let id = match &mut copy {
            SchemaItem::Class(class) => &mut class.id,
            SchemaItem::Attribute(attribute) => &mut attribute.id,
            SchemaItem::Relationship(relationship) => &mut relationship.id,
            SchemaItem::Method(method) => &mut method.id,
        };
        *id = generate_id();
        copy
    }

    pub fn as_class(&self) -> Option<&ClassDef> {
        match self {
            SchemaItem::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassDef> {
        match self {
            SchemaItem::Class(class) => Some(class),
            _ => None,
        }
    }
}
