//! ZDD Message Checks
//!
//! Verifies that message snapshots persisted by an older release can still be
//! materialized by the current one, so in-flight messages survive a zero-downtime
//! deployment.
//!
//! ## Features
//!
//! - **Compatibility Checking**: decode, identity, removed-property and type checks
//! - **Safe Widening**: nullability may be added to a property, never removed
//! - **Pluggable Introspection**: live classes come from any [`ClassIntrospector`]
//! - **Fixture Store**: recorded snapshots with checksums, generated from live classes
//!
//! ## Example
//!
//! ```
//! use zdd_messages::{ClassRegistry, CompatibilityChecker, MessageClass, Property, PropertyList, PropertyType};
//!
//! struct DummyMessage;
//!
//! impl MessageClass for DummyMessage {
//!     const CLASS: &'static str = "App\\Messages\\DummyMessage";
//!
//!     fn properties() -> Vec<Property> {
//!         vec![Property::new("content", PropertyType::String)]
//!     }
//! }
//!
//! let mut registry = ClassRegistry::new();
//! registry.register::<DummyMessage>().unwrap();
//!
//! let recorded = PropertyList::from_json(r#"[{ "name": "content", "type": "string" }]"#).unwrap();
//! let blob = br#"O:25:"App\Messages\DummyMessage":1:{s:7:"content";s:11:"Hello world";}"#;
//!
//! CompatibilityChecker::new(&registry)
//!     .assert(DummyMessage::CLASS, blob, &recorded)
//!     .unwrap();
//! ```

pub mod checker;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod error;
pub mod fixture;
pub mod introspect;
pub mod property;
pub mod snapshot;

pub use checker::CompatibilityChecker;
pub use checksum::Checksum;
pub use codec::Codec;
pub use config::ZddConfig;
pub use error::{Result, ZddError};
pub use fixture::{Fixture, FixtureReport, FixtureStore};
pub use introspect::{ClassIntrospector, ClassRegistry, ClassSchema, MessageClass};
pub use property::{Property, PropertyList, PropertyType};
pub use snapshot::{ArrayKey, FieldValue, Snapshot, SnapshotDecoder};
