//! Decoded snapshots
//!
//! A [`SnapshotDecoder`] turns a serialized blob into a [`Snapshot`]: the runtime
//! class identity plus named field values. [`materialize`] then assigns those values
//! to the live class, which is where decode-level type violations surface.

use std::fmt;

use crate::error::{Result, ZddError};
use crate::introspect::ClassIntrospector;
use crate::property::{Property, PropertyType};

/// Key of an array entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    Int(i64),
    String(String),
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Int(i) => write!(f, "{}", i),
            ArrayKey::String(s) => write!(f, "{}", s),
        }
    }
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<(ArrayKey, FieldValue)>),
    Object(Snapshot),
}

impl FieldValue {
    /// Runtime type name of this value
    pub fn kind(&self) -> &str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::Array(_) => "array",
            FieldValue::Object(snapshot) => snapshot.class.as_str(),
        }
    }

    /// Whether this value can be assigned to a property declared as `declared`
    pub fn is_assignable_to(&self, declared: &Property) -> bool {
        match (self, declared.declared_type()) {
            (FieldValue::Null, _) => declared.is_nullable(),
            (FieldValue::Bool(_), PropertyType::Bool) => true,
            (FieldValue::Int(_), PropertyType::Int | PropertyType::Float) => true,
            (FieldValue::Float(_), PropertyType::Float) => true,
            (FieldValue::String(_), PropertyType::String) => true,
            (FieldValue::Array(_), PropertyType::Array) => true,
            (FieldValue::Object(snapshot), PropertyType::Object(name)) => snapshot.class == *name,
            _ => false,
        }
    }
}

/// Runtime class identity plus named field values
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub class: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl Snapshot {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, builder style
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

/// Decodes a serialized blob into a snapshot
pub trait SnapshotDecoder: Send + Sync {
    fn decode(&self, blob: &[u8]) -> Result<Snapshot>;
}

/// Assign every decoded value to the live declaration of its class.
///
/// Fields the live class does not declare, and objects of classes the introspector
/// does not know, are left as they are. Nested objects are checked recursively.
pub fn materialize(snapshot: &Snapshot, introspector: &dyn ClassIntrospector) -> Result<()> {
    match introspector.describe(&snapshot.class) {
        Some(live) => {
            for (name, value) in &snapshot.fields {
                let Some(declared) = live.properties.find(name) else {
                    continue;
                };
                if !value.is_assignable_to(declared) {
                    return Err(ZddError::DecodeTypeViolation {
                        class: snapshot.class.clone(),
                        property: name.clone(),
                        actual: value.kind().to_string(),
                        expected: declared.type_description(),
                    });
                }
            }
        }
        None => {
            tracing::debug!(class = %snapshot.class, "no live declaration, fields left unchecked");
        }
    }

    snapshot
        .fields
        .iter()
        .try_for_each(|(_, value)| materialize_value(value, introspector))
}

fn materialize_value(value: &FieldValue, introspector: &dyn ClassIntrospector) -> Result<()> {
    match value {
        FieldValue::Object(nested) => materialize(nested, introspector),
        FieldValue::Array(entries) => entries
            .iter()
            .try_for_each(|(_, item)| materialize_value(item, introspector)),
        _ => Ok(()),
    }
}
