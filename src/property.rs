//! Recorded property schema
//!
//! A [`PropertyList`] is the ordered list of `(name, type, nullable)` triples that
//! describes a message class at the time one of its snapshots was captured.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ZddError};

/// Declared type of a message property
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Int,
    Float,
    Bool,
    Array,
    /// Any other type name, compared verbatim
    Object(String),
}

impl PropertyType {
    /// Parse a type keyword; anything that is not a scalar keyword names an object type
    pub fn parse(name: &str) -> Option<Self> {
        let ty = match name {
            "" => return None,
            "string" => PropertyType::String,
            "int" => PropertyType::Int,
            "float" => PropertyType::Float,
            "bool" => PropertyType::Bool,
            "array" => PropertyType::Array,
            other => PropertyType::Object(other.to_string()),
        };
        Some(ty)
    }

    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::String => "string",
            PropertyType::Int => "int",
            PropertyType::Float => "float",
            PropertyType::Bool => "bool",
            PropertyType::Array => "array",
            PropertyType::Object(name) => name,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single named property with its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    declared_type: PropertyType,
    nullable: bool,
}

impl Property {
    /// Create a non-nullable property
    pub fn new(name: impl Into<String>, declared_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            nullable: false,
        }
    }

    /// Create a nullable property
    pub fn nullable(name: impl Into<String>, declared_type: PropertyType) -> Self {
        Self {
            nullable: true,
            ..Self::new(name, declared_type)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &PropertyType {
        &self.declared_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Type description including nullability, e.g. `?int`
    pub fn type_description(&self) -> String {
        if self.nullable {
            format!("?{}", self.declared_type)
        } else {
            self.declared_type.to_string()
        }
    }

    /// Whether a value recorded under `self` can be read through `live`.
    ///
    /// The base type must be identical. Nullability may be added by the live
    /// declaration but never removed.
    pub fn accepts_as(&self, live: &Property) -> bool {
        self.declared_type == live.declared_type && (!self.nullable || live.nullable)
    }
}

/// Wire form of a property record
#[derive(Debug, Serialize, Deserialize)]
struct PropertyRecord {
    name: Option<String>,
    #[serde(rename = "type")]
    declared_type: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    nullable: bool,
}

impl PropertyRecord {
    fn into_property(self, index: usize) -> Result<Property> {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ZddError::SchemaFormat(format!("record {} is missing \"name\"", index)))?;
        let raw_type = self.declared_type.ok_or_else(|| {
            ZddError::SchemaFormat(format!("property \"{}\" is missing \"type\"", name))
        })?;

        // `?int` is shorthand for a nullable int
        let (nullable, type_name) = match raw_type.strip_prefix('?') {
            Some(rest) => (true, rest),
            None => (self.nullable, raw_type.as_str()),
        };
        if type_name.starts_with('?') {
            return Err(ZddError::SchemaFormat(format!(
                "property \"{}\" has a repeated nullable marker in \"{}\"",
                name, raw_type
            )));
        }
        let declared_type = PropertyType::parse(type_name).ok_or_else(|| {
            ZddError::SchemaFormat(format!("property \"{}\" has an empty type", name))
        })?;

        Ok(Property {
            name,
            declared_type,
            nullable,
        })
    }
}

impl From<&Property> for PropertyRecord {
    fn from(property: &Property) -> Self {
        Self {
            name: Some(property.name.clone()),
            declared_type: Some(property.declared_type.to_string()),
            nullable: property.nullable,
        }
    }
}

/// Ordered, name-keyed collection of properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyList {
    properties: Vec<Property>,
    index: HashMap<String, usize>,
}

impl PropertyList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from properties, rejecting duplicate or empty names
    pub fn from_properties(properties: Vec<Property>) -> Result<Self> {
        let mut index = HashMap::with_capacity(properties.len());
        for (i, property) in properties.iter().enumerate() {
            if property.name.is_empty() {
                return Err(ZddError::SchemaFormat(format!("property {} has an empty name", i)));
            }
            if index.insert(property.name.clone(), i).is_some() {
                return Err(ZddError::SchemaFormat(format!(
                    "duplicate property \"{}\"",
                    property.name
                )));
            }
        }
        Ok(Self { properties, index })
    }

    /// Build a list from a structured description: an array of `{name, type[, nullable]}` records
    pub fn from_structured(description: &Value) -> Result<Self> {
        let records = description
            .as_array()
            .ok_or_else(|| ZddError::SchemaFormat("expected a list of property records".to_string()))?;

        let properties = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                if !record.is_object() {
                    return Err(ZddError::SchemaFormat(format!("record {} is not an object", i)));
                }
                let record: PropertyRecord = serde_json::from_value(record.clone())
                    .map_err(|e| ZddError::SchemaFormat(format!("record {}: {}", i, e)))?;
                record.into_property(i)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_properties(properties)
    }

    /// Parse a JSON document holding a structured description
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ZddError::SchemaFormat(format!("invalid JSON: {}", e)))?;
        Self::from_structured(&value)
    }

    /// Serialize back to the structured description
    pub fn to_json(&self) -> Value {
        let records: Vec<PropertyRecord> = self.properties.iter().map(PropertyRecord::from).collect();
        serde_json::to_value(records).unwrap_or(Value::Null)
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get a property by name
    pub fn get(&self, name: &str) -> Result<&Property> {
        self.find(name)
            .ok_or_else(|| ZddError::PropertyNotFound(name.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<&Property> {
        self.index.get(name).map(|&i| &self.properties[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<'a> IntoIterator for &'a PropertyList {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let list = PropertyList::from_json(
            r#"[
                { "name": "content", "type": "string" },
                { "name": "number", "type": "int", "nullable": true }
            ]"#,
        )
        .unwrap();

        assert_eq!(list.len(), 2);
        assert!(list.has("content"));
        assert!(list.has("number"));
        assert!(!list.has("missing"));
        assert_eq!(list.get("content").unwrap().declared_type(), &PropertyType::String);
        assert!(list.get("number").unwrap().is_nullable());
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["content", "number"]);
    }

    #[test]
    fn test_missing_name_or_type() {
        let missing_name = PropertyList::from_structured(&json!([{ "type": "string" }]));
        assert!(matches!(missing_name, Err(ZddError::SchemaFormat(_))));

        let missing_type = PropertyList::from_structured(&json!([{ "name": "content" }]));
        assert!(matches!(missing_type, Err(ZddError::SchemaFormat(_))));

        let not_a_list = PropertyList::from_structured(&json!({ "name": "content" }));
        assert!(matches!(not_a_list, Err(ZddError::SchemaFormat(_))));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = PropertyList::from_structured(&json!([
            { "name": "content", "type": "string" },
            { "name": "content", "type": "int" }
        ]));
        assert!(matches!(result, Err(ZddError::SchemaFormat(msg)) if msg.contains("content")));
    }

    #[test]
    fn test_get_absent_property() {
        let list = PropertyList::new();
        assert!(list.is_empty());
        assert!(matches!(list.get("content"), Err(ZddError::PropertyNotFound(name)) if name == "content"));
    }

    #[test]
    fn test_nullable_shorthand() {
        let list = PropertyList::from_structured(&json!([{ "name": "number", "type": "?int" }])).unwrap();
        let number = list.get("number").unwrap();
        assert!(number.is_nullable());
        assert_eq!(number.type_description(), "?int");

        let doubled = PropertyList::from_structured(&json!([{ "name": "number", "type": "??int" }]));
        assert!(matches!(doubled, Err(ZddError::SchemaFormat(_))));
    }

    #[test]
    fn test_object_type_names() {
        let list = PropertyList::from_structured(&json!([
            { "name": "address", "type": "App\\Model\\Address" }
        ]))
        .unwrap();
        assert_eq!(
            list.get("address").unwrap().declared_type(),
            &PropertyType::Object("App\\Model\\Address".to_string())
        );
    }

    #[test]
    fn test_reparse_is_identical() {
        let original = PropertyList::from_structured(&json!([
            { "name": "content", "type": "string" },
            { "name": "number", "type": "int", "nullable": true },
            { "name": "tags", "type": "array" }
        ]))
        .unwrap();

        let reparsed = PropertyList::from_structured(&original.to_json()).unwrap();
        assert_eq!(original, reparsed);
        for name in original.names() {
            assert!(reparsed.has(name));
            assert_eq!(original.get(name).unwrap(), reparsed.get(name).unwrap());
        }
        assert_eq!(original.to_json(), reparsed.to_json());
    }

    #[test]
    fn test_nullability_widening() {
        let recorded = Property::new("number", PropertyType::Int);
        let widened = Property::nullable("number", PropertyType::Int);
        assert!(recorded.accepts_as(&widened));
        assert!(!widened.accepts_as(&recorded));
        assert!(!recorded.accepts_as(&Property::new("number", PropertyType::String)));
    }
}
