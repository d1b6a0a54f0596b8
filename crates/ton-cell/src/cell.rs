//! Cell implementation for TON.
//!
//! A Cell is the fundamental data unit in TON, containing up to 1023 bits
//! of data and up to 4 references to other cells.
//!
//! Only ordinary cells are produced by wallet requests, so the representation
//! hash and depth are computed once at construction and cached.
//!
//! Reference: ton-blockchain/ton/crypto/vm/cells/DataCell.cpp

use std::sync::Arc;

use crate::{sha256, MAX_CELL_BITS, MAX_CELL_REFS};

/// Hash size in bytes (SHA256).
pub const HASH_BYTES: usize = 32;

/// Depth size in bytes.
pub const DEPTH_BYTES: usize = 2;

/// A TON Cell - the basic unit of data storage.
///
/// Cells form a DAG (Directed Acyclic Graph) where each cell can reference
/// up to 4 other cells. The cell hash uniquely identifies the cell and its
/// entire subtree.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Raw data bytes (may contain partial byte at the end).
    pub(crate) data: Vec<u8>,
    /// Number of bits stored in data.
    pub(crate) bit_len: usize,
    /// References to child cells.
    pub(crate) references: Vec<Arc<Cell>>,
    /// Cached representation hash.
    hash: [u8; HASH_BYTES],
    /// Cached depth.
    depth: u16,
}

impl Cell {
    /// Create a new cell with the given parameters.
    ///
    /// This is typically called by CellBuilder::build().
    pub(crate) fn new(data: Vec<u8>, bit_len: usize, references: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(references.len() <= MAX_CELL_REFS);

        let depth = references
            .iter()
            .map(|r| r.depth)
            .max()
            .map_or(0, |d| d.saturating_add(1));

        let mut cell = Cell {
            data,
            bit_len,
            references,
            hash: [0u8; HASH_BYTES],
            depth,
        };
        cell.hash = sha256(&cell.representation());
        cell
    }

    /// Create an empty cell.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    /// Get the representation hash of this cell.
    pub fn hash(&self) -> [u8; HASH_BYTES] {
        self.hash
    }

    /// Get the depth of this cell.
    ///
    /// Depth is 0 for cells with no references, otherwise it's
    /// 1 + max(depth of all references).
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Get the cell representation that is hashed.
    ///
    /// `d1 d2 data(with completion tag) depth(ref_i)* hash(ref_i)*`
    pub fn representation(&self) -> Vec<u8> {
        let mut repr =
            Vec::with_capacity(2 + 128 + self.references.len() * (DEPTH_BYTES + HASH_BYTES));

        let (d1, d2) = self.descriptors();
        repr.push(d1);
        repr.push(d2);
        repr.extend_from_slice(&self.data_with_completion_tag());

        for reference in &self.references {
            repr.extend_from_slice(&reference.depth.to_be_bytes());
        }
        for reference in &self.references {
            repr.extend_from_slice(&reference.hash);
        }

        repr
    }

    /// Get the descriptor bytes (d1, d2) for this ordinary cell.
    ///
    /// d1 = refs_count, d2 = ceil(bit_len / 8) + floor(bit_len / 8)
    pub fn descriptors(&self) -> (u8, u8) {
        let d1 = self.references.len() as u8;
        let d2 = (self.bit_len.div_ceil(8) + self.bit_len / 8) as u8;
        (d1, d2)
    }

    /// Get data with completion tag.
    ///
    /// If bit_len is not byte-aligned, the last byte has a completion tag:
    /// the remaining bits are filled with a 1 followed by 0s.
    pub fn data_with_completion_tag(&self) -> Vec<u8> {
        let mut result = self.data[..self.bit_len.div_ceil(8)].to_vec();
        let remainder = self.bit_len % 8;
        if remainder != 0 {
            if let Some(last) = result.last_mut() {
                *last |= 1 << (7 - remainder);
            }
        }
        result
    }

    /// Get the raw data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the number of bits in this cell.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Get all references to child cells.
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    /// Get a reference by index.
    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    /// Get the number of references.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Get a specific bit from the cell data.
    ///
    /// Returns None if the index is out of bounds.
    pub fn get_bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }

        let byte_index = index / 8;
        let bit_index = 7 - (index % 8);

        Some((self.data[byte_index] >> bit_index) & 1 == 1)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}
