//! Fixture store
//!
//! Recorded snapshots live next to the schema they were captured with. A class
//! identity maps to a relative path by turning namespace separators into
//! directories:
//!
//! ```text
//! fixtures/
//! ├── App/
//! │   └── Messages/
//! │       ├── DummyMessage.txt              # snapshot blob
//! │       └── DummyMessage.properties.json  # recorded schema
//! └── manifest.json                          # checksums and capture times
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::checker::CompatibilityChecker;
use crate::checksum::Checksum;
use crate::codec::Codec;
use crate::error::{Result, ZddError};
use crate::introspect::{ClassIntrospector, ClassRegistry};
use crate::property::{PropertyList, PropertyType};
use crate::snapshot::{ArrayKey, FieldValue, Snapshot};

const SCHEMA_SUFFIX: &str = ".properties.json";
const MANIFEST_FILE: &str = "manifest.json";
const MAX_SAMPLE_DEPTH: usize = 8;

/// A recorded snapshot with the schema it was captured against
#[derive(Debug, Clone)]
pub struct Fixture {
    pub class: String,
    pub blob: Vec<u8>,
    pub schema: PropertyList,
}

/// Manifest entry for one recorded class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub class: String,
    pub checksum: Checksum,
    pub codec: Codec,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FixtureManifest {
    entries: Vec<ManifestEntry>,
}

/// Outcome of checking one stored fixture
#[derive(Debug)]
pub struct FixtureReport {
    pub class: String,
    pub error: Option<ZddError>,
}

impl FixtureReport {
    pub fn is_compatible(&self) -> bool {
        self.error.is_none()
    }
}

/// On-disk store of recorded snapshots
pub struct FixtureStore {
    root: PathBuf,
    codec: Codec,
    manifest: FixtureManifest,
}

impl FixtureStore {
    /// Open a store, creating the root directory if needed
    pub fn open(root: impl AsRef<Path>, codec: Codec) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            serde_json::from_str(&fs::read_to_string(&manifest_path)?)?
        } else {
            FixtureManifest::default()
        };

        Ok(Self { root, codec, manifest })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Manifest entry for a class, if one was recorded
    pub fn entry(&self, class: &str) -> Option<&ManifestEntry> {
        self.manifest.entries.iter().find(|e| e.class == class)
    }

    /// Store a snapshot blob and its recorded schema, replacing any previous recording
    pub fn record(&mut self, class: &str, blob: &[u8], schema: &PropertyList) -> Result<()> {
        let snapshot_path = self.snapshot_path(class)?;
        if let Some(parent) = snapshot_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&snapshot_path, blob)?;
        fs::write(
            self.schema_path(class)?,
            serde_json::to_string_pretty(&schema.to_json())?,
        )?;

        let entry = ManifestEntry {
            class: class.to_string(),
            checksum: Checksum::from_bytes(blob),
            codec: self.codec,
            recorded_at: Utc::now(),
        };
        self.manifest.entries.retain(|e| e.class != class);
        self.manifest.entries.push(entry);
        self.manifest.entries.sort_by(|a, b| a.class.cmp(&b.class));
        self.save_manifest()?;

        info!(class, path = %snapshot_path.display(), "fixture recorded");
        Ok(())
    }

    /// Load the fixture recorded for a class
    pub fn load(&self, class: &str) -> Result<Fixture> {
        let snapshot_path = self.snapshot_path(class)?;
        let schema_path = self.schema_path(class)?;
        if !snapshot_path.is_file() || !schema_path.is_file() {
            return Err(ZddError::FixtureNotFound(class.to_string()));
        }

        let blob = fs::read(&snapshot_path)?;
        let schema = PropertyList::from_json(&fs::read_to_string(&schema_path)?)?;
        Ok(Fixture {
            class: class.to_string(),
            blob,
            schema,
        })
    }

    /// Classes with both a snapshot and a recorded schema, sorted
    pub fn fixtures(&self) -> Result<Vec<String>> {
        let mut classes = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable fixture entry");
                    continue;
                }
            };
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(short_name) = file_name.strip_suffix(SCHEMA_SUFFIX) else {
                continue;
            };

            let relative = path.strip_prefix(&self.root).map_err(|e| {
                ZddError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
            })?;
            let mut segments: Vec<String> = relative
                .parent()
                .into_iter()
                .flat_map(|p| p.components())
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            segments.push(short_name.to_string());
            let class = segments.join("\\");

            if self.snapshot_path(&class)?.is_file() {
                classes.push(class);
            } else {
                debug!(class = %class, "schema without snapshot, skipped");
            }
        }
        classes.sort();
        Ok(classes)
    }

    /// Whether the stored blob still matches the checksum taken when it was recorded
    pub fn verify(&self, class: &str) -> Result<bool> {
        let entry = self
            .entry(class)
            .ok_or_else(|| ZddError::FixtureNotFound(class.to_string()))?;
        let blob = fs::read(self.snapshot_path(class)?)?;
        Ok(entry.checksum.verify(&blob))
    }

    fn snapshot_path(&self, class: &str) -> Result<PathBuf> {
        self.class_path(class, &format!(".{}", self.codec.extension()))
    }

    fn schema_path(&self, class: &str) -> Result<PathBuf> {
        self.class_path(class, SCHEMA_SUFFIX)
    }

    fn class_path(&self, class: &str, suffix: &str) -> Result<PathBuf> {
        let segments: Vec<&str> = class.split('\\').collect();
        if segments.iter().any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains('/')) {
            return Err(ZddError::SchemaFormat(format!(
                "class \"{}\" cannot be mapped to a fixture path",
                class
            )));
        }

        let (name, namespace) = segments.split_last().ok_or_else(|| {
            ZddError::SchemaFormat("empty class name".to_string())
        })?;
        let mut path = self.root.clone();
        path.extend(namespace);
        path.push(format!("{}{}", name, suffix));
        Ok(path)
    }

    fn save_manifest(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(self.root.join(MANIFEST_FILE), content)?;
        Ok(())
    }
}

/// Build an instance of the live class with a deterministic value for every property
pub fn sample_snapshot(class: &str, introspector: &dyn ClassIntrospector) -> Result<Snapshot> {
    sample_at_depth(class, introspector, 0)
}

fn sample_at_depth(class: &str, introspector: &dyn ClassIntrospector, depth: usize) -> Result<Snapshot> {
    if depth > MAX_SAMPLE_DEPTH {
        return Err(ZddError::SchemaFormat(format!(
            "class \"{}\" nests too deeply to build a sample",
            class
        )));
    }

    let live = introspector
        .describe(class)
        .ok_or_else(|| ZddError::UnknownClass(class.to_string()))?;

    let mut snapshot = Snapshot::new(class);
    for property in &live.properties {
        let value = match property.declared_type() {
            PropertyType::String => FieldValue::String("Hello world".to_string()),
            PropertyType::Int => FieldValue::Int(42),
            PropertyType::Float => FieldValue::Float(42.5),
            PropertyType::Bool => FieldValue::Bool(true),
            PropertyType::Array => FieldValue::Array(vec![(
                ArrayKey::Int(0),
                FieldValue::String("sample".to_string()),
            )]),
            PropertyType::Object(nested) => {
                FieldValue::Object(sample_at_depth(nested, introspector, depth + 1)?)
            }
        };
        snapshot.fields.push((property.name().to_string(), value));
    }
    Ok(snapshot)
}

/// Record a fresh fixture for every registered class
pub fn generate(store: &mut FixtureStore, registry: &ClassRegistry) -> Result<Vec<String>> {
    let mut recorded = Vec::with_capacity(registry.len());
    for class in registry.classes() {
        let live = registry
            .describe(class)
            .ok_or_else(|| ZddError::UnknownClass(class.to_string()))?;
        let snapshot = sample_snapshot(class, registry)?;
        let blob = store.codec().encode(&snapshot)?;
        store.record(class, &blob, &live.properties)?;
        recorded.push(class.to_string());
    }
    Ok(recorded)
}

/// Check every stored fixture, collecting one report per class
pub fn validate_all(store: &FixtureStore, checker: &CompatibilityChecker<'_>) -> Result<Vec<FixtureReport>> {
    let mut reports = Vec::new();
    for class in store.fixtures()? {
        let error = match store.load(&class) {
            Ok(fixture) => checker.assert(&fixture.class, &fixture.blob, &fixture.schema).err(),
            Err(err) => Some(err),
        };
        reports.push(FixtureReport { class, error });
    }
    Ok(reports)
}
