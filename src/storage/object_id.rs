//! Opaque document identifiers.
//!
//! Ids are 12 bytes rendered as 24 lowercase hex characters: a 4-byte
//! big-endian seconds timestamp, 5 random bytes fixed per process, and a
//! 3-byte wrapping counter. Anything else is rejected as an invalid key.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::AppError;

/// Fill `buf` from the OS generator; on failure the segment stays zeroed and
/// ids only stay unique within this process.
fn fill_random(buf: &mut [u8], what: &str) { fill_from(buf, what, getrandom::getrandom) }

fn fill_from<F>(buf: &mut [u8], what: &str, source: F)
where
    F: FnOnce(&mut [u8]) -> Result<(), getrandom::Error>,
{
    if let Err(e) = source(buf) {
        buf.fill(0);
        warn!(target: "storage", "random {} unavailable, using zeros: {}", what, e);
    }
}

static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| {
    let mut buf = [0u8; 5];
    fill_random(&mut buf, "process id segment");
    buf
});

static COUNTER: Lazy<AtomicU32> = Lazy::new(|| {
    let mut buf = [0u8; 4];
    fill_random(&mut buf, "counter seed");
    AtomicU32::new(u32::from_be_bytes(buf) & 0x00ff_ffff)
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId([u8; 12]);

impl DocumentId {
    pub fn generate() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Seconds since the epoch encoded in the id.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn to_hex(&self) -> String { hex::encode(self.0) }
}

impl FromStr for DocumentId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| AppError::invalid_key(format!("'{}' is not a 24 character hex id: {}", s, e)))?;
        Ok(Self(bytes))
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(&self.to_hex()) }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e: AppError| serde::de::Error::custom(e.message().to_string()))
    }
}
