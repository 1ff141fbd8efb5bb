//! Hashing for archive checksums and package identities.

use sha2::{Digest, Sha256};

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Builds a stable digest from labelled components.
///
/// Each component is written as `key=value` followed by a NUL separator,
/// so reordering or merging fields changes the result.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a labelled component.
    pub fn field(&mut self, key: &str, value: &str) -> &mut Self {
        self.hasher.update(key.as_bytes());
        self.hasher.update(b"=");
        self.hasher.update(value.as_bytes());
        self.hasher.update(b"\0");
        self
    }

    /// Add an optional component; absence hashes differently from "".
    pub fn field_opt(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.field(key, v),
            None => {
                self.hasher.update(key.as_bytes());
                self.hasher.update(b"\x01\0");
                self
            }
        }
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}
