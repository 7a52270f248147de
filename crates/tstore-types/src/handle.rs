use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque reference to content held in a blob store.
///
/// Handles are minted by the blob store on every put (UUID v7, so they sort
/// by creation time). Two puts of identical bytes produce two handles, which
/// keeps the lifetime of every blob tied to exactly one record field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlobHandle(uuid::Uuid);

impl BlobHandle {
    /// Mint a fresh handle.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// The nil handle. Never returned by a blob store.
    pub const fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }

    /// Returns `true` if this is the nil handle.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Hex-encoded string without separators, suitable as a file name.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Short representation (first 8 hex characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0.as_bytes()[..4])
    }

    /// Parse from the hex form produced by [`BlobHandle::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHandle(e.to_string()))?;
        let uuid = uuid::Uuid::from_slice(&bytes)
            .map_err(|e| TypeError::InvalidHandle(e.to_string()))?;
        Ok(Self(uuid))
    }
}

impl Default for BlobHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHandle({})", self.short_hex())
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BlobHandle {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidHandle(format!("{s}: {e}")))
    }
}
