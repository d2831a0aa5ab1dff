use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

pub type Id = String;

/// Creation parameters and attribute maps exchanged with handlers.
pub type Attributes = serde_json::Map<String, Value>;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

pub const CONFIG_NAME_EXTENSION: &str = ".xml";

/// Kind of configuration a session manages; drives the file-name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    Schema,
    Data,
    Other,
}

impl ConfigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::Schema => "schema",
            ConfigType::Data => "data",
            ConfigType::Other => "other",
        }
    }

    /// Required ending of a configuration name, e.g. `schema.xml`.
    pub fn expected_suffix(&self) -> String {
        format!("{}{}", self.as_str(), CONFIG_NAME_EXTENSION)
    }

    pub fn matches_name(&self, name: &str) -> bool {
        name.ends_with(&self.expected_suffix())
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three kinds of class property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Attribute,
    Relationship,
    Method,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyKind::Attribute => "attribute",
            PropertyKind::Relationship => "relationship",
            PropertyKind::Method => "method",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute value types understood by the schema kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    S64,
    U64,
    Float,
    Double,
    Date,
    Time,
    String,
    Enum,
    Class,
}

impl Default for DataType {
    fn default() -> Self {
        DataType::String
    }
}

impl DataType {
    pub fn parse(text: &str) -> Option<Self> {
        let data_type = match text.trim().to_ascii_lowercase().as_str() {
            "bool" => DataType::Bool,
            "s8" => DataType::S8,
            "u8" => DataType::U8,
            "s16" => DataType::S16,
            "u16" => DataType::U16,
            "s32" => DataType::S32,
            "u32" => DataType::U32,
            "s64" => DataType::S64,
            "u64" => DataType::U64,
            "float" => DataType::Float,
            "double" => DataType::Double,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "string" => DataType::String,
            "enum" => DataType::Enum,
            "class" => DataType::Class,
            _ => return None,
        };
        Some(data_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::S8 => "s8",
            DataType::U8 => "u8",
            DataType::S16 => "s16",
            DataType::U16 => "u16",
            DataType::S32 => "s32",
            DataType::U32 => "u32",
            DataType::S64 => "s64",
            DataType::U64 => "u64",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::String => "string",
            DataType::Enum => "enum",
            DataType::Class => "class",
        }
    }

    fn signed_bounds(&self) -> Option<(i64, i64)> {
        match self {
            DataType::S8 => Some((i8::MIN as i64, i8::MAX as i64)),
            DataType::S16 => Some((i16::MIN as i64, i16::MAX as i64)),
            DataType::S32 => Some((i32::MIN as i64, i32::MAX as i64)),
            DataType::S64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    fn unsigned_bound(&self) -> Option<u64> {
        match self {
            DataType::U8 => Some(u8::MAX as u64),
            DataType::U16 => Some(u16::MAX as u64),
            DataType::U32 => Some(u32::MAX as u64),
            DataType::U64 => Some(u64::MAX),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.signed_bounds().is_some()
            || self.unsigned_bound().is_some()
            || matches!(self, DataType::Float | DataType::Double)
    }

    /// Value an unset single-valued attribute of this type reads as.
    pub fn default_value(&self) -> Value {
        match self {
            DataType::Bool => Value::Bool(false),
            DataType::Float | DataType::Double => Value::from(0.0),
            t if t.is_numeric() => Value::from(0),
            _ => Value::String(String::new()),
        }
    }

    /// Parses the textual form stored in configuration files.
    pub fn parse_text(&self, text: &str) -> Result<Value, String> {
        let text = text.trim();
        if let Some((low, high)) = self.signed_bounds() {
            let parsed = parse_signed(text)?;
            if parsed < low || parsed > high {
                return Err(format!("{} is out of range for {}", parsed, self.as_str()));
            }
            return Ok(Value::from(parsed));
        }
        if let Some(high) = self.unsigned_bound() {
            let parsed = parse_unsigned(text)?;
            if parsed > high {
                return Err(format!("{} is out of range for {}", parsed, self.as_str()));
            }
            return Ok(Value::from(parsed));
        }
        match self {
            DataType::Bool => match text {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                other => Err(format!("'{}' is not a boolean", other)),
            },
            DataType::Float | DataType::Double => text
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| format!("'{}' is not a floating point number", text)),
            _ => Ok(Value::String(text.to_string())),
        }
    }

    /// Checks a JSON value against this type and returns its canonical form.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        if let Some((low, high)) = self.signed_bounds() {
            let number = value
                .as_i64()
                .ok_or_else(|| format!("expected an integer, got {}", value))?;
            if number < low || number > high {
                return Err(format!("{} is out of range for {}", number, self.as_str()));
            }
            return Ok(Value::from(number));
        }
        if let Some(high) = self.unsigned_bound() {
            let number = value
                .as_u64()
                .ok_or_else(|| format!("expected a non-negative integer, got {}", value))?;
            if number > high {
                return Err(format!("{} is out of range for {}", number, self.as_str()));
            }
            return Ok(Value::from(number));
        }
        match self {
            DataType::Bool => value
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| format!("expected a boolean, got {}", value)),
            DataType::Float | DataType::Double => value
                .as_f64()
                .map(Value::from)
                .ok_or_else(|| format!("expected a number, got {}", value)),
            _ => value
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| format!("expected a string, got {}", value)),
        }
    }

    /// Applies an attribute range: `low..high` for numbers, a comma separated
    /// list of allowed tokens for enums and strings.
    pub fn check_range(&self, value: &Value, range: &str) -> Result<(), String> {
        let range = range.trim();
        if range.is_empty() {
            return Ok(());
        }
        if self.is_numeric() {
            let Some((low, high)) = range.split_once("..") else {
                return Ok(());
            };
            let number = value.as_f64().unwrap_or_default();
            let below = !low.trim().is_empty()
                && low.trim().parse::<f64>().map_or(false, |low| number < low);
            let above = !high.trim().is_empty()
                && high.trim().parse::<f64>().map_or(false, |high| number > high);
            if below || above {
                return Err(format!("{} is outside the range {}", number, range));
            }
            return Ok(());
        }
        if let Some(text) = value.as_str() {
            if matches!(self, DataType::Enum | DataType::String)
                && !range.split(',').any(|token| token.trim() == text)
            {
                return Err(format!("'{}' is not one of {}", text, range));
            }
        }
        Ok(())
    }

    /// Textual form written to configuration files.
    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

fn parse_signed(text: &str) -> Result<i64, String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = parse_unsigned(digits)? as i128;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).map_err(|_| format!("'{}' does not fit a 64-bit integer", text))
}

fn parse_unsigned(text: &str) -> Result<u64, String> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        u64::from_str_radix(&text[1..], 8)
    } else {
        text.parse::<u64>()
    };
    parsed.map_err(|_| format!("'{}' is not an integer", text))
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship cardinality constraint; numeric form is 0, 1, 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Zero,
    One,
    Many,
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::Zero
    }
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Zero => "zero",
            Cardinality::One => "one",
            Cardinality::Many => "many",
        }
    }

    pub fn as_number(&self) -> u64 {
        match self {
            Cardinality::Zero => 0,
            Cardinality::One => 1,
            Cardinality::Many => 2,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Some(Cardinality::Zero),
            "one" | "1" => Some(Cardinality::One),
            "many" | "2" => Some(Cardinality::Many),
            _ => None,
        }
    }

    /// Accepts either the numeric or the textual form.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let parsed = match value {
            Value::Number(number) => match number.as_u64() {
                Some(0) => Some(Cardinality::Zero),
                Some(1) => Some(Cardinality::One),
                Some(2) => Some(Cardinality::Many),
                _ => None,
            },
            Value::String(text) => Cardinality::parse(text),
            _ => None,
        };
        parsed.ok_or_else(|| format!("expected 0, 1, 2, 'zero', 'one' or 'many', got {}", value))
    }
}

/// One or more names; lets callers pass a single name or a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList(Vec<String>);

impl NameList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Names in first-seen order with duplicates removed.
    pub fn unique(&self) -> Vec<&str> {
        self.iter().unique().collect()
    }
}

impl From<&str> for NameList {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for NameList {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for NameList {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for NameList {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for NameList {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|name| name.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for NameList {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|name| name.to_string()).collect())
    }
}

impl FromIterator<String> for NameList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
