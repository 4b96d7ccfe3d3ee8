//! Snapshot wire formats

pub mod json;
pub mod notation;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::snapshot::{Snapshot, SnapshotDecoder};

/// Available snapshot encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Compact object notation (`O:<len>:"<class>":...`)
    #[default]
    Notation,
    /// JSON envelope (`{"class": ..., "fields": {...}}`)
    Json,
}

impl Codec {
    pub fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>> {
        match self {
            Codec::Notation => Ok(notation::encode(snapshot)),
            Codec::Json => json::encode(snapshot),
        }
    }

    /// File extension used for stored snapshots
    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Notation => "txt",
            Codec::Json => "snapshot.json",
        }
    }
}

impl SnapshotDecoder for Codec {
    fn decode(&self, blob: &[u8]) -> Result<Snapshot> {
        match self {
            Codec::Notation => notation::decode(blob),
            Codec::Json => json::decode(blob),
        }
    }
}
