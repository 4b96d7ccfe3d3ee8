//! Snapshot compatibility checking
//!
//! Decides whether a snapshot captured from an older version of a message class can
//! still be materialized against the class as it is declared now. The check is a
//! linear pipeline that stops at the first failing stage:
//!
//! 1. decode the blob and assign its values to the live class
//! 2. compare the runtime class with the expected class
//! 3. every recorded property must still exist (all removals reported together)
//! 4. every recorded type must still be accepted by the live declaration

use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::{Result, ZddError};
use crate::introspect::ClassIntrospector;
use crate::property::PropertyList;
use crate::snapshot::{materialize, SnapshotDecoder};

/// Compatibility checker for persisted message snapshots
pub struct CompatibilityChecker<'a> {
    introspector: &'a dyn ClassIntrospector,
    decoder: Box<dyn SnapshotDecoder + 'a>,
}

impl<'a> CompatibilityChecker<'a> {
    /// Create a checker reading object-notation snapshots
    pub fn new(introspector: &'a dyn ClassIntrospector) -> Self {
        Self::with_decoder(introspector, Codec::Notation)
    }

    /// Create a checker with a specific decoder
    pub fn with_decoder(
        introspector: &'a dyn ClassIntrospector,
        decoder: impl SnapshotDecoder + 'a,
    ) -> Self {
        Self {
            introspector,
            decoder: Box::new(decoder),
        }
    }

    /// Assert that `blob`, recorded with `recorded` as the shape of `expected_class`,
    /// is still compatible with the live declaration of that class.
    ///
    /// Success is the absence of an error.
    pub fn assert(&self, expected_class: &str, blob: &[u8], recorded: &PropertyList) -> Result<()> {
        let result = self.run(expected_class, blob, recorded);
        if let Err(err) = &result {
            warn!(class = expected_class, error = %err, "snapshot is not compatible");
        }
        result
    }

    fn run(&self, expected_class: &str, blob: &[u8], recorded: &PropertyList) -> Result<()> {
        let snapshot = self.decoder.decode(blob)?;
        materialize(&snapshot, self.introspector)?;
        debug!(class = %snapshot.class, fields = snapshot.fields.len(), "snapshot decoded");

        if snapshot.class != expected_class {
            return Err(ZddError::ClassMismatch {
                expected: expected_class.to_string(),
                actual: snapshot.class,
            });
        }

        let live = self
            .introspector
            .describe(expected_class)
            .ok_or_else(|| ZddError::UnknownClass(expected_class.to_string()))?;

        let removed: Vec<String> = recorded
            .names()
            .filter(|name| !live.properties.has(name))
            .map(String::from)
            .collect();
        if !removed.is_empty() {
            return Err(ZddError::PropertyRemoved {
                class: expected_class.to_string(),
                properties: removed,
            });
        }

        for property in recorded {
            let current = live.properties.get(property.name())?;
            debug!(
                class = expected_class,
                property = property.name(),
                recorded = %property.type_description(),
                live = %current.type_description(),
                "comparing property"
            );
            if !property.accepts_as(current) {
                return Err(ZddError::TypePropertyMismatch {
                    class: expected_class.to_string(),
                    property: property.name().to_string(),
                    recorded: property.type_description(),
                    live: current.type_description(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{ClassRegistry, ClassSchema};
    use crate::property::{Property, PropertyType};
    use serde_json::json;

    const DUMMY: &str = "App\\Messages\\DummyMessage";

    fn registry(properties: Vec<Property>) -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        registry
            .insert(ClassSchema::new(DUMMY, PropertyList::from_properties(properties).unwrap()))
            .unwrap();
        registry
    }

    fn blob() -> &'static [u8] {
        br#"O:25:"App\Messages\DummyMessage":1:{s:7:"content";s:11:"Hello world";}"#
    }

    #[test]
    fn test_unchanged_message() {
        let registry = registry(vec![Property::new("content", PropertyType::String)]);
        let recorded = PropertyList::from_structured(&json!([{ "name": "content", "type": "string" }])).unwrap();

        CompatibilityChecker::new(&registry).assert(DUMMY, blob(), &recorded).unwrap();
    }

    #[test]
    fn test_all_removed_properties_reported() {
        let registry = registry(vec![Property::new("content", PropertyType::String)]);
        let recorded = PropertyList::from_structured(&json!([
            { "name": "number", "type": "int" },
            { "name": "content", "type": "int" },
            { "name": "label", "type": "string" }
        ]))
        .unwrap();

        let err = CompatibilityChecker::new(&registry)
            .assert(DUMMY, blob(), &recorded)
            .unwrap_err();
        match err {
            ZddError::PropertyRemoved { class, properties } => {
                assert_eq!(class, DUMMY);
                assert_eq!(properties, vec!["number", "label"]);
            }
            other => panic!("Expected PropertyRemoved, got {:?}", other),
        }
    }

    #[test]
    fn test_nullability_removed_is_mismatch() {
        let registry = registry(vec![
            Property::new("content", PropertyType::String),
            Property::new("number", PropertyType::Int),
        ]);
        let recorded = PropertyList::from_structured(&json!([
            { "name": "content", "type": "string" },
            { "name": "number", "type": "int", "nullable": true }
        ]))
        .unwrap();

        let err = CompatibilityChecker::new(&registry)
            .assert(DUMMY, blob(), &recorded)
            .unwrap_err();
        assert!(matches!(
            err,
            ZddError::TypePropertyMismatch { ref property, ref recorded, ref live, .. }
                if property == "number" && recorded == "?int" && live == "int"
        ));
    }

    #[test]
    fn test_unknown_expected_class() {
        let registry = ClassRegistry::new();
        let err = CompatibilityChecker::new(&registry)
            .assert(DUMMY, blob(), &PropertyList::new())
            .unwrap_err();
        assert!(matches!(err, ZddError::UnknownClass(_)));
        assert!(!err.is_breaking_change());
    }

    #[test]
    fn test_json_decoder() {
        let registry = registry(vec![Property::new("content", PropertyType::String)]);
        let blob = br#"{ "class": "App\\Messages\\DummyMessage", "fields": { "content": true } }"#;

        let err = CompatibilityChecker::with_decoder(&registry, Codec::Json)
            .assert(DUMMY, blob, &PropertyList::new())
            .unwrap_err();
        assert!(matches!(err, ZddError::DecodeTypeViolation { .. }));
    }
}
