//! On-disk form of schema and data files.
//!
//! Both engines persist their units as small XML documents. The structs here
//! mirror the documents one to one and are (de)serialized with quick-xml's
//! serde support; attributes use the `@name` convention.

use crate::error::{AdaptorError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const SCHEMA_ROOT: &str = "oks-schema";
pub const DATA_ROOT: &str = "oks-data";
const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

fn is_false(value: &bool) -> bool {
    !*value
}

/// Header written on every save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoElement {
    #[serde(rename = "@message", default)]
    pub message: String,
    #[serde(rename = "@saved-at", default)]
    pub saved_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludeElement {
    #[serde(rename = "@path")]
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InfoElement>,
    #[serde(rename = "include", default)]
    pub includes: Vec<IncludeElement>,
    #[serde(rename = "class", default)]
    pub classes: Vec<ClassElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@description", default)]
    pub description: String,
    #[serde(rename = "@is-abstract", default, skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    #[serde(rename = "@transient", default, skip_serializing_if = "is_false")]
    pub transient: bool,
    #[serde(rename = "superclass", default)]
    pub super_classes: Vec<SuperClassElement>,
    #[serde(rename = "attribute", default)]
    pub attributes: Vec<AttributeElement>,
    #[serde(rename = "relationship", default)]
    pub relationships: Vec<RelationshipElement>,
    #[serde(rename = "method", default)]
    pub methods: Vec<MethodElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperClassElement {
    #[serde(rename = "@name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@description", default)]
    pub description: String,
    #[serde(rename = "@type", default = "default_attribute_type")]
    pub data_type: String,
    #[serde(rename = "@range", default, skip_serializing_if = "String::is_empty")]
    pub range: String,
    #[serde(rename = "@init-value", default, skip_serializing_if = "String::is_empty")]
    pub init_value: String,
    #[serde(rename = "@is-multi-value", default, skip_serializing_if = "is_false")]
    pub is_multi_value: bool,
    #[serde(rename = "@is-not-null", default, skip_serializing_if = "is_false")]
    pub is_not_null: bool,
    #[serde(rename = "@format", default, skip_serializing_if = "String::is_empty")]
    pub format: String,
}

fn default_attribute_type() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@description", default)]
    pub description: String,
    #[serde(rename = "@class-type")]
    pub class_type: String,
    #[serde(rename = "@low-cc", default = "default_cardinality")]
    pub low_cardinality: String,
    #[serde(rename = "@high-cc", default = "default_cardinality")]
    pub high_cardinality: String,
    #[serde(rename = "@is-composite", default, skip_serializing_if = "is_false")]
    pub is_composite: bool,
    #[serde(rename = "@is-exclusive", default, skip_serializing_if = "is_false")]
    pub is_exclusive: bool,
    #[serde(rename = "@is-dependent", default, skip_serializing_if = "is_false")]
    pub is_dependent: bool,
}

fn default_cardinality() -> String {
    "zero".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@description", default)]
    pub description: String,
    #[serde(rename = "implementation", default)]
    pub implementations: Vec<ImplementationElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationElement {
    #[serde(rename = "@language")]
    pub language: String,
    #[serde(rename = "@prototype", default)]
    pub prototype: String,
    #[serde(rename = "@body", default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InfoElement>,
    #[serde(rename = "include", default)]
    pub includes: Vec<IncludeElement>,
    #[serde(rename = "obj", default)]
    pub objects: Vec<ObjectElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectElement {
    #[serde(rename = "@class")]
    pub class_name: String,
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "attr", default)]
    pub attributes: Vec<AttrElement>,
    #[serde(rename = "rel", default)]
    pub relationships: Vec<RelElement>,
}

/// Single values use `val`; multi-values are listed as `<data val=".."/>` children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@val", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "data", default)]
    pub values: Vec<DataElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataElement {
    #[serde(rename = "@val")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "ref", default)]
    pub targets: Vec<RefElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefElement {
    #[serde(rename = "@class")]
    pub class_name: String,
    #[serde(rename = "@id")]
    pub id: String,
}

fn parse<T: DeserializeOwned>(text: &str, path: &str) -> Result<T> {
    quick_xml::de::from_str(text).map_err(|e| AdaptorError::Format {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn render<T: Serialize>(root: &str, document: &T, path: &str) -> Result<String> {
    let body = quick_xml::se::to_string_with_root(root, document).map_err(|e| {
        AdaptorError::Format {
            path: path.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(format!("{}{}\n", XML_DECLARATION, body))
}

impl SchemaDocument {
    pub fn from_xml(text: &str, path: &str) -> Result<Self> {
        parse(text, path)
    }

    pub fn to_xml(&self, path: &str) -> Result<String> {
        render(SCHEMA_ROOT, self, path)
    }
}

impl DataDocument {
    pub fn from_xml(text: &str, path: &str) -> Result<Self> {
        parse(text, path)
    }

    pub fn to_xml(&self, path: &str) -> Result<String> {
        render(DATA_ROOT, self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema_document() {
        let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<oks-schema>
  <include path="core.schema.xml"/>
  <class name="Application" description="An application">
    <superclass name="Component"/>
    <attribute name="application_name" type="string"/>
    <attribute name="source_id" type="u32" init-value="0"/>
    <relationship name="uses" class-type="Resource" low-cc="zero" high-cc="many"/>
    <method name="get_source_id">
      <implementation language="c++" prototype="uint32_t get_source_id()"/>
    </method>
  </class>
</oks-schema>"#;

        let document = SchemaDocument::from_xml(text, "app.schema.xml").unwrap();
        assert_eq!(document.includes.len(), 1);
        let class = &document.classes[0];
        assert_eq!(class.name, "Application");
        assert!(!class.is_abstract);
        assert_eq!(class.super_classes[0].name, "Component");
        assert_eq!(class.attributes.len(), 2);
        assert_eq!(class.attributes[1].data_type, "u32");
        assert_eq!(class.relationships[0].high_cardinality, "many");
        assert_eq!(class.methods[0].implementations[0].language, "c++");
    }

    #[test]
    fn test_parse_data_document_with_multi_values() {
        let text = r#"<oks-data>
  <obj class="Segment" id="root-segment">
    <attr name="tags"><data val="a"/><data val="b"/></attr>
    <attr name="enabled" val="true"/>
    <rel name="applications"><ref class="Application" id="app-1"/></rel>
  </obj>
</oks-data>"#;

        let document = DataDocument::from_xml(text, "np02.data.xml").unwrap();
        let object = &document.objects[0];
        assert_eq!(object.id, "root-segment");
        assert_eq!(object.attributes[0].values.len(), 2);
        assert_eq!(object.attributes[1].value.as_deref(), Some("true"));
        assert_eq!(object.relationships[0].targets[0].id, "app-1");
    }

    #[test]
    fn test_malformed_document_is_a_format_error() {
        let error = SchemaDocument::from_xml("<oks-schema><class>", "bad.schema.xml").unwrap_err();
        assert!(matches!(error, AdaptorError::Format { .. }));
    }
}
