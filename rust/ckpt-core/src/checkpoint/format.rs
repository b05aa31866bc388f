// rust/ckpt-core/src/checkpoint/format.rs

//! Checkpoint record layout.
//!
//! ```text
//! +---------------------------+
//! | Region count (usize)      |  <- native width, native byte order
//! +---------------------------+
//! | Catalog entry 0           |  <- id (i32) + length (usize)
//! | ...                       |
//! | Catalog entry n-1         |
//! +---------------------------+
//! | Payload 0                 |  <- raw region bytes, catalog order
//! | ...                       |
//! | Payload n-1               |
//! +---------------------------+
//! ```
//!
//! The record is an image of process memory, not a portable format: it is
//! only meaningful to a process with the same word size and byte order.

use std::mem;

use crate::region::RegionId;

/// Width of the region count that opens every record.
pub const COUNT_WIDTH: usize = mem::size_of::<usize>();

const ID_WIDTH: usize = mem::size_of::<RegionId>();
const LEN_WIDTH: usize = mem::size_of::<usize>();

/// Width of one `(id, length)` catalog entry.
pub const CATALOG_ENTRY_WIDTH: usize = ID_WIDTH + LEN_WIDTH;

/// One `(id, length)` pair of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: RegionId,
    pub len: usize,
}

impl CatalogEntry {
    pub fn encode(&self) -> [u8; CATALOG_ENTRY_WIDTH] {
        let mut out = [0u8; CATALOG_ENTRY_WIDTH];
        out[..ID_WIDTH].copy_from_slice(&self.id.to_ne_bytes());
        out[ID_WIDTH..].copy_from_slice(&self.len.to_ne_bytes());
        out
    }

    pub fn decode(bytes: &[u8; CATALOG_ENTRY_WIDTH]) -> Self {
        let mut id = [0u8; ID_WIDTH];
        let mut len = [0u8; LEN_WIDTH];
        id.copy_from_slice(&bytes[..ID_WIDTH]);
        len.copy_from_slice(&bytes[ID_WIDTH..]);
        Self {
            id: RegionId::from_ne_bytes(id),
            len: usize::from_ne_bytes(len),
        }
    }
}

pub fn encode_count(count: usize) -> [u8; COUNT_WIDTH] {
    count.to_ne_bytes()
}

pub fn decode_count(bytes: [u8; COUNT_WIDTH]) -> usize {
    usize::from_ne_bytes(bytes)
}

/// Bytes taken by the header and a catalog of `count` entries, or `None`
/// on overflow.
pub fn catalog_end(count: usize) -> Option<u64> {
    let catalog = (count as u64).checked_mul(CATALOG_ENTRY_WIDTH as u64)?;
    catalog.checked_add(COUNT_WIDTH as u64)
}

/// Total size of a well-formed record with this catalog, or `None` on
/// overflow.
pub fn record_size(catalog: &[CatalogEntry]) -> Option<u64> {
    catalog
        .iter()
        .try_fold(catalog_end(catalog.len())?, |acc, e| acc.checked_add(e.len as u64))
}
