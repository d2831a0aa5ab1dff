//! Name-to-field tables for schema records.
//!
//! Each wrapped kind gets an enum listing the fields it can read and write.
//! A name that parses to no field has no accessor and fails; a name that
//! parses but is missing from the kind's known-property list is still served,
//! with a warning.

use crate::diagnostics::{Finding, SharedDiagnostics};
use crate::error::{AdaptorError, Result};
use crate::model::{
    AttributeDef, Cardinality, ClassDef, DataType, IntegerFormat, MethodDef,
    MethodImplementation, RelationshipDef,
};
use serde_json::{json, Value};

pub trait FieldSet: Sized + Copy + 'static {
    type Target;

    /// Every field of the kind.
    const FIELDS: &'static [Self];
    /// Names the kind advertises; anything else triggers a warning.
    const KNOWN: &'static [&'static str];

    fn name(&self) -> &'static str;
    fn read(&self, target: &Self::Target) -> Value;
    /// `None` for read-only fields.
    fn write(&self, target: &mut Self::Target, value: Value) -> Option<std::result::Result<(), String>>;

    fn parse(name: &str) -> Option<Self> {
        Self::FIELDS.iter().copied().find(|field| field.name() == name)
    }

    fn is_known(name: &str) -> bool {
        Self::KNOWN.contains(&name)
    }
}

/// Reports an unknown-attribute warning when `name` is outside the known list.
pub fn check_known<F: FieldSet>(diagnostics: &SharedDiagnostics, owner: &str, name: &str) {
    if !F::is_known(name) {
        diagnostics.report(Finding::UnknownAttribute {
            owner: owner.to_string(),
            attribute: name.to_string(),
        });
    }
}

/// Reports and builds the error for a name with no accessor.
pub fn unsupported(diagnostics: &SharedDiagnostics, owner: &str, name: &str) -> AdaptorError {
    diagnostics.report(Finding::UnsupportedAttribute {
        owner: owner.to_string(),
        attribute: name.to_string(),
    });
    AdaptorError::UnsupportedAttribute {
        owner: owner.to_string(),
        attribute: name.to_string(),
    }
}

pub fn read_field<F: FieldSet>(
    diagnostics: &SharedDiagnostics,
    owner: &str,
    target: &F::Target,
    name: &str,
) -> Result<Value> {
    check_known::<F>(diagnostics, owner, name);
    match F::parse(name) {
        Some(field) => Ok(field.read(target)),
        None => Err(unsupported(diagnostics, owner, name)),
    }
}

/// Writes through the table; the target is left untouched on any failure.
pub fn write_field<F: FieldSet>(
    diagnostics: &SharedDiagnostics,
    owner: &str,
    target: &mut F::Target,
    name: &str,
    value: Value,
) -> Result<()> {
    check_known::<F>(diagnostics, owner, name);
    let field = F::parse(name).ok_or_else(|| unsupported(diagnostics, owner, name))?;
    match field.write(target, value) {
        Some(outcome) => outcome.map_err(|reason| AdaptorError::invalid_value(name, reason)),
        None => Err(unsupported(diagnostics, owner, name)),
    }
}

fn expect_bool(value: &Value) -> std::result::Result<bool, String> {
    value
        .as_bool()
        .ok_or_else(|| format!("expected a boolean, got {}", value))
}

fn expect_string(value: &Value) -> std::result::Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("expected a string, got {}", value))
}

fn expect_name(value: &Value) -> std::result::Result<String, String> {
    let name = expect_string(value)?;
    if name.trim().is_empty() {
        return Err("name must not be empty".to_string());
    }
    Ok(name)
}

fn string_list(value: &Value) -> std::result::Result<Vec<String>, String> {
    match value {
        Value::String(single) => Ok(vec![single.clone()]),
        Value::Array(items) => items.iter().map(expect_string).collect(),
        other => Err(format!("expected a name or a list of names, got {}", other)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassField {
    Name,
    Description,
    IsAbstract,
    Transient,
    File,
    SuperClasses,
}

impl FieldSet for ClassField {
    type Target = ClassDef;

    const FIELDS: &'static [Self] = &[
        ClassField::Name,
        ClassField::Description,
        ClassField::IsAbstract,
        ClassField::Transient,
        ClassField::File,
        ClassField::SuperClasses,
    ];
    const KNOWN: &'static [&'static str] = &["name", "description", "is_abstract", "file"];

    fn name(&self) -> &'static str {
        match self {
            ClassField::Name => "name",
            ClassField::Description => "description",
            ClassField::IsAbstract => "is_abstract",
            ClassField::Transient => "transient",
            ClassField::File => "file",
            ClassField::SuperClasses => "super_classes",
        }
    }

    fn read(&self, class: &ClassDef) -> Value {
        match self {
            ClassField::Name => json!(class.name),
            ClassField::Description => json!(class.description),
            ClassField::IsAbstract => json!(class.is_abstract),
            ClassField::Transient => json!(class.transient),
            ClassField::File => json!(class.file),
            ClassField::SuperClasses => json!(class.super_classes),
        }
    }

    fn write(&self, class: &mut ClassDef, value: Value) -> Option<std::result::Result<(), String>> {
        let outcome = match self {
            // Class names change through the handler's rename
            ClassField::Name => return None,
            ClassField::Description => expect_string(&value).map(|v| class.description = v),
            ClassField::IsAbstract => expect_bool(&value).map(|v| class.is_abstract = v),
            ClassField::Transient => expect_bool(&value).map(|v| class.transient = v),
            ClassField::File => expect_name(&value).map(|v| class.file = v),
            ClassField::SuperClasses => string_list(&value).and_then(|names| {
                if names.iter().any(|name| name == &class.name) {
                    return Err(format!("class '{}' cannot be its own superclass", class.name));
                }
                class.super_classes = names;
                Ok(())
            }),
        };
        Some(outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeField {
    Name,
    Description,
    Type,
    Range,
    InitValue,
    IsMultiValues,
    IsNotNull,
    Format,
}

impl FieldSet for AttributeField {
    type Target = AttributeDef;

    const FIELDS: &'static [Self] = &[
        AttributeField::Name,
        AttributeField::Description,
        AttributeField::Type,
        AttributeField::Range,
        AttributeField::InitValue,
        AttributeField::IsMultiValues,
        AttributeField::IsNotNull,
        AttributeField::Format,
    ];
    const KNOWN: &'static [&'static str] = &[
        "name",
        "description",
        "type",
        "range",
        "init_value",
        "is_multi_values",
        "format",
    ];

    fn name(&self) -> &'static str {
        match self {
            AttributeField::Name => "name",
            AttributeField::Description => "description",
            AttributeField::Type => "type",
            AttributeField::Range => "range",
            AttributeField::InitValue => "init_value",
            AttributeField::IsMultiValues => "is_multi_values",
            AttributeField::IsNotNull => "is_not_null",
            AttributeField::Format => "format",
        }
    }

    fn read(&self, attribute: &AttributeDef) -> Value {
        match self {
            AttributeField::Name => json!(attribute.name),
            AttributeField::Description => json!(attribute.description),
            AttributeField::Type => json!(attribute.data_type.as_str()),
            AttributeField::Range => json!(attribute.range),
            AttributeField::InitValue => json!(attribute.init_value),
            AttributeField::IsMultiValues => json!(attribute.is_multi_value),
            AttributeField::IsNotNull => json!(attribute.is_not_null),
            AttributeField::Format => json!(attribute.format.as_str()),
        }
    }

    fn write(&self, attribute: &mut AttributeDef, value: Value) -> Option<std::result::Result<(), String>> {
        let outcome = match self {
            AttributeField::Name => expect_name(&value).map(|v| attribute.name = v),
            AttributeField::Description => expect_string(&value).map(|v| attribute.description = v),
            AttributeField::Type => expect_string(&value).and_then(|text| {
                let data_type = DataType::parse(&text)
                    .ok_or_else(|| format!("'{}' is not an attribute type", text))?;
                attribute.data_type = data_type;
                Ok(())
            }),
            AttributeField::Range => expect_string(&value).map(|v| attribute.range = v),
            AttributeField::InitValue => {
                let text = match &value {
                    Value::String(text) => text.clone(),
                    other => attribute.data_type.format_value(other),
                };
                attribute
                    .data_type
                    .parse_text(&text)
                    .map(|_| attribute.init_value = text)
            }
            AttributeField::IsMultiValues => expect_bool(&value).map(|v| attribute.is_multi_value = v),
            AttributeField::IsNotNull => expect_bool(&value).map(|v| attribute.is_not_null = v),
            AttributeField::Format => expect_string(&value).and_then(|text| {
                let format = IntegerFormat::parse(&text)
                    .ok_or_else(|| format!("'{}' is not one of dec, hex, oct", text))?;
                attribute.format = format;
                Ok(())
            }),
        };
        Some(outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipField {
    Name,
    Description,
    ClassType,
    IsComposite,
    LowCardinality,
    HighCardinality,
    IsExclusive,
    IsDependent,
}

impl FieldSet for RelationshipField {
    type Target = RelationshipDef;

    const FIELDS: &'static [Self] = &[
        RelationshipField::Name,
        RelationshipField::Description,
        RelationshipField::ClassType,
        RelationshipField::IsComposite,
        RelationshipField::LowCardinality,
        RelationshipField::HighCardinality,
        RelationshipField::IsExclusive,
        RelationshipField::IsDependent,
    ];
    const KNOWN: &'static [&'static str] = &[
        "name",
        "description",
        "class_type",
        "is_composite",
        "low_cardinality_constraint",
        "high_cardinality_constraint",
        "is_exclusive",
        "is_dependent",
    ];

    fn name(&self) -> &'static str {
        match self {
            RelationshipField::Name => "name",
            RelationshipField::Description => "description",
            RelationshipField::ClassType => "class_type",
            RelationshipField::IsComposite => "is_composite",
            RelationshipField::LowCardinality => "low_cardinality_constraint",
            RelationshipField::HighCardinality => "high_cardinality_constraint",
            RelationshipField::IsExclusive => "is_exclusive",
            RelationshipField::IsDependent => "is_dependent",
        }
    }

    fn read(&self, relationship: &RelationshipDef) -> Value {
        match self {
            RelationshipField::Name => json!(relationship.name),
            RelationshipField::Description => json!(relationship.description),
            RelationshipField::ClassType => json!(relationship.class_type),
            RelationshipField::IsComposite => json!(relationship.is_composite),
            RelationshipField::LowCardinality => json!(relationship.low_cardinality.as_number()),
            RelationshipField::HighCardinality => json!(relationship.high_cardinality.as_number()),
            RelationshipField::IsExclusive => json!(relationship.is_exclusive),
            RelationshipField::IsDependent => json!(relationship.is_dependent),
        }
    }

    fn write(&self, relationship: &mut RelationshipDef, value: Value) -> Option<std::result::Result<(), String>> {
        let outcome = match self {
            RelationshipField::Name => expect_name(&value).map(|v| relationship.name = v),
            RelationshipField::Description => expect_string(&value).map(|v| relationship.description = v),
            RelationshipField::ClassType => expect_name(&value).map(|v| relationship.class_type = v),
            RelationshipField::IsComposite => expect_bool(&value).map(|v| relationship.is_composite = v),
            RelationshipField::LowCardinality => {
                Cardinality::from_value(&value).map(|v| relationship.low_cardinality = v)
            }
            RelationshipField::HighCardinality => {
                Cardinality::from_value(&value).map(|v| relationship.high_cardinality = v)
            }
            RelationshipField::IsExclusive => expect_bool(&value).map(|v| relationship.is_exclusive = v),
            RelationshipField::IsDependent => expect_bool(&value).map(|v| relationship.is_dependent = v),
        };
        Some(outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodField {
    Name,
    Description,
    Implementation,
}

impl FieldSet for MethodField {
    type Target = MethodDef;

    const FIELDS: &'static [Self] = &[
        MethodField::Name,
        MethodField::Description,
        MethodField::Implementation,
    ];
    const KNOWN: &'static [&'static str] = &["name", "description", "implementation"];

    fn name(&self) -> &'static str {
        match self {
            MethodField::Name => "name",
            MethodField::Description => "description",
            MethodField::Implementation => "implementation",
        }
    }

    fn read(&self, method: &MethodDef) -> Value {
        match self {
            MethodField::Name => json!(method.name),
            MethodField::Description => json!(method.description),
            MethodField::Implementation => json!(method
                .implementations
                .iter()
                .map(|i| json!({"language": i.language, "prototype": i.prototype, "body": i.body}))
                .collect::<Vec<_>>()),
        }
    }

    fn write(&self, method: &mut MethodDef, value: Value) -> Option<std::result::Result<(), String>> {
        let outcome = match self {
            MethodField::Name => expect_name(&value).map(|v| method.name = v),
            MethodField::Description => expect_string(&value).map(|v| method.description = v),
            MethodField::Implementation => set_implementation(method, &value),
        };
        Some(outcome)
    }
}

/// `{language, prototype, body}` adds (or replaces) an implementation;
/// `{remove: true, language}` detaches it.
fn set_implementation(method: &mut MethodDef, value: &Value) -> std::result::Result<(), String> {
    let entry = value
        .as_object()
        .ok_or_else(|| format!("expected an implementation object, got {}", value))?;
    let text = |key: &str| -> std::result::Result<String, String> {
        match entry.get(key) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(other) => expect_string(other),
        }
    };

    let language = text("language")?;
    let remove = match entry.get("remove") {
        None => false,
        Some(flag) => expect_bool(flag)?,
    };

    if remove {
        if !method.remove_implementation(&language) {
            return Err(format!(
                "method '{}' has no '{}' implementation",
                method.name, language
            ));
        }
        return Ok(());
    }

    method.add_implementation(MethodImplementation {
        language,
        prototype: text("prototype")?,
        body: text("body")?,
    });
    Ok(())
}
