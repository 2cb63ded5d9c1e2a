//! Stable hashing helpers for plans, tables, and manifests.

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    let out = h.finalize();
    Hash256(out.into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v).map_err(|e| crate::error::Error::Hash(e.to_string()))?;
    Ok(hash_bytes(&bytes))
}

/// Hash raw rows cell by cell. Cells and rows are length-prefixed so
/// `["ab","c"]` and `["a","bc"]` never collide.
pub fn hash_rows(rows: &[Vec<String>]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(&(rows.len() as u64).to_le_bytes());
    for row in rows {
        h.update(&(row.len() as u64).to_le_bytes());
        for cell in row {
            h.update(&(cell.len() as u64).to_le_bytes());
            h.update(cell.as_bytes());
        }
    }
    Hash256(h.finalize().into())
}
