//! Checksums for stored snapshot blobs

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum of a snapshot blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that a blob matches this checksum
    pub fn verify(&self, data: &[u8]) -> bool {
        *self == Self::from_bytes(data)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Checksum {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let blob = br#"O:8:"stdClass":0:{}"#;
        assert_eq!(Checksum::from_bytes(blob), Checksum::from_bytes(blob));
        assert_eq!(Checksum::from_bytes(blob).as_str().len(), 64);
    }

    #[test]
    fn test_checksum_verification() {
        let blob = br#"O:8:"stdClass":0:{}"#;
        let checksum = Checksum::from_bytes(blob);
        assert!(checksum.verify(blob));
        assert!(!checksum.verify(b"different content"));
    }
}
