//! Live class introspection
//!
//! The checker never assumes a reflection facility. It asks a [`ClassIntrospector`]
//! for the current declaration of a class by identity. [`ClassRegistry`] is the
//! static-registry implementation: classes are registered in code through
//! [`MessageClass`] or loaded from a JSON description.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, ZddError};
use crate::property::{Property, PropertyList};

/// Current declaration of a message class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSchema {
    pub class: String,
    pub properties: PropertyList,
}

impl ClassSchema {
    pub fn new(class: impl Into<String>, properties: PropertyList) -> Self {
        Self {
            class: class.into(),
            properties,
        }
    }
}

/// Capability to describe the live declaration of a class by identity
pub trait ClassIntrospector: Send + Sync {
    /// Current schema of `class`, or `None` if the class is not known
    fn describe(&self, class: &str) -> Option<ClassSchema>;
}

/// A message type known at compile time
pub trait MessageClass {
    /// Fully-qualified class identity, as written into snapshots
    const CLASS: &'static str;

    /// Currently declared properties
    fn properties() -> Vec<Property>;
}

#[derive(Debug, Deserialize)]
struct ClassRecord {
    class: String,
    #[serde(default)]
    properties: Value,
}

/// Static registry of live class declarations
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: BTreeMap<String, ClassSchema>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compile-time message type
    pub fn register<M: MessageClass>(&mut self) -> Result<&mut Self> {
        let properties = PropertyList::from_properties(M::properties())?;
        self.insert(ClassSchema::new(M::CLASS, properties))
    }

    /// Register a class declaration, rejecting duplicates
    pub fn insert(&mut self, schema: ClassSchema) -> Result<&mut Self> {
        if self.classes.contains_key(&schema.class) {
            return Err(ZddError::SchemaFormat(format!(
                "class \"{}\" is registered twice",
                schema.class
            )));
        }
        self.classes.insert(schema.class.clone(), schema);
        Ok(self)
    }

    /// Parse a list of `{ "class": ..., "properties": [records] }` entries
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<ClassRecord> = serde_json::from_str(json)
            .map_err(|e| ZddError::SchemaFormat(format!("invalid class registry: {}", e)))?;

        let mut registry = Self::new();
        for record in records {
            let properties = match record.properties {
                Value::Null => PropertyList::new(),
                ref value => PropertyList::from_structured(value)?,
            };
            registry.insert(ClassSchema::new(record.class, properties))?;
        }
        Ok(registry)
    }

    /// Load a registry description from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Registered class identities, sorted
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassIntrospector for ClassRegistry {
    fn describe(&self, class: &str) -> Option<ClassSchema> {
        self.classes.get(class).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyType;

    struct DummyMessage;

    impl MessageClass for DummyMessage {
        const CLASS: &'static str = "App\\Messages\\DummyMessage";

        fn properties() -> Vec<Property> {
            vec![Property::new("content", PropertyType::String)]
        }
    }

    #[test]
    fn test_register_message_class() {
        let mut registry = ClassRegistry::new();
        registry.register::<DummyMessage>().unwrap();

        let schema = registry.describe("App\\Messages\\DummyMessage").unwrap();
        assert!(schema.properties.has("content"));
        assert!(registry.describe("App\\Messages\\Other").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ClassRegistry::new();
        registry.register::<DummyMessage>().unwrap();
        assert!(matches!(
            registry.register::<DummyMessage>(),
            Err(ZddError::SchemaFormat(_))
        ));
    }

    #[test]
    fn test_from_json() {
        let registry = ClassRegistry::from_json(
            r#"[
                {
                    "class": "App\\Messages\\DummyMessage",
                    "properties": [{ "name": "content", "type": "string" }]
                },
                { "class": "App\\Messages\\Empty" }
            ]"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.classes().collect::<Vec<_>>(),
            vec!["App\\Messages\\DummyMessage", "App\\Messages\\Empty"]
        );
        assert!(registry.describe("App\\Messages\\Empty").unwrap().properties.is_empty());
    }
}
