use bytes::{BufMut, Bytes, BytesMut};
use tstore_types::BlobHandle;

use crate::error::{BlobError, BlobResult};

const MAGIC: &[u8; 4] = b"TSBL";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 32;

/// A stored blob: payload plus the BLAKE3 checksum taken at put time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Bytes,
    pub checksum: [u8; 32],
}

impl StoredBlob {
    /// Wrap a payload, computing its checksum.
    pub fn new(data: Bytes) -> Self {
        let checksum = *blake3::hash(&data).as_bytes();
        Self { data, checksum }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Recompute the checksum and compare it with the recorded one.
    pub fn verify(&self, handle: &BlobHandle) -> BlobResult<()> {
        let computed = blake3::hash(&self.data);
        if computed.as_bytes() != &self.checksum {
            return Err(BlobError::ChecksumMismatch {
                handle: *handle,
                expected: hex::encode(self.checksum),
                computed: computed.to_hex().to_string(),
            });
        }
        Ok(())
    }

    /// Serialize as `magic | version | checksum | payload`.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.data.len());
        buf.put_slice(MAGIC);
        buf.put_u32(VERSION);
        buf.put_slice(&self.checksum);
        buf.put_slice(&self.data);
        buf.freeze()
    }

    /// Parse the framing written by [`StoredBlob::to_bytes`] and verify the
    /// payload.
    pub fn from_bytes(handle: &BlobHandle, raw: Bytes) -> BlobResult<Self> {
        if raw.len() < HEADER_LEN {
            return Err(BlobError::Corrupt {
                handle: *handle,
                reason: format!("truncated header ({} bytes)", raw.len()),
            });
        }
        if &raw[..4] != MAGIC {
            return Err(BlobError::Corrupt {
                handle: *handle,
                reason: "bad magic".into(),
            });
        }
        let version = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        if version != VERSION {
            return Err(BlobError::Corrupt {
                handle: *handle,
                reason: format!("unsupported version {version}"),
            });
        }
        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&raw[8..HEADER_LEN]);
        let blob = Self {
            data: raw.slice(HEADER_LEN..),
            checksum,
        };
        blob.verify(handle)?;
        Ok(blob)
    }
}
