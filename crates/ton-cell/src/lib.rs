//! TON Cell primitives
//!
//! This crate provides the data structures wallet requests are encoded into:
//!
//! - **Cell**: The basic unit of data storage in TON
//! - **CellBuilder**: Builder for creating cells
//! - **CellSlice**: Reader for extracting data from cells
//! - **MsgAddress**: TON address representation
//! - **dict**: `Hashmap n X` patricia tries stored in cells
//!
//! # Overview
//!
//! In TON, all data is stored as cells. A cell contains:
//! - Up to 1023 bits of data
//! - Up to 4 references to other cells
//!
//! This creates a DAG (Directed Acyclic Graph) structure where complex
//! data structures are built by combining cells.
//!
//! # Example
//!
//! ```
//! use ton_cell::{CellBuilder, CellSlice};
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u32(0x12345678).unwrap();
//! builder.store_bytes(&[1, 2, 3, 4]).unwrap();
//! let cell = builder.build().unwrap();
//!
//! let hash = cell.hash();
//! assert_eq!(hash.len(), 32);
//!
//! let mut slice = CellSlice::new(&cell);
//! assert_eq!(slice.load_u32().unwrap(), 0x12345678);
//! ```

use sha2::{Digest, Sha256};
use thiserror::Error;

mod address;
mod builder;
mod cell;
pub mod dict;
mod slice;

pub use address::MsgAddress;
pub use builder::CellBuilder;
pub use cell::{Cell, DEPTH_BYTES, HASH_BYTES};
pub use slice::CellSlice;

/// Errors that can occur during Cell operations.
#[derive(Debug, Error)]
pub enum CellError {
    /// The cell data exceeds the maximum of 1023 bits.
    #[error("Cell data too long: {0} bits (max 1023)")]
    DataTooLong(usize),

    /// The cell has too many references (max 4).
    #[error("Too many cell references: {0} (max 4)")]
    TooManyRefs(usize),

    /// Not enough bits available.
    #[error("Not enough bits: need {need}, have {have}")]
    NotEnoughBits { need: usize, have: usize },

    /// Not enough references available.
    #[error("Not enough refs: need {need}, have {have}")]
    NotEnoughRefs { need: usize, have: usize },

    /// Invalid address format.
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Invalid bit length.
    #[error("Invalid bit length: {0}")]
    InvalidBitLength(usize),

    /// Integer does not fit the requested bit width.
    #[error("Value {value} does not fit in {bits} bits")]
    IntegerOverflow { value: i128, bits: usize },

    /// Malformed dictionary.
    #[error("Invalid dictionary: {0}")]
    InvalidDictionary(String),
}

/// Result type for Cell operations.
pub type CellResult<T> = Result<T, CellError>;

/// Maximum number of bits in a cell's data.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have.
pub const MAX_CELL_REFS: usize = 4;

/// Compute SHA256 hash of the input data.
fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_constants() {
        assert_eq!(MAX_CELL_BITS, 1023);
        assert_eq!(MAX_CELL_REFS, 4);
    }

    #[test]
    fn test_empty_cell_hash() {
        // Well-known representation hash of the empty ordinary cell
        let cell = Cell::empty();
        assert_eq!(
            hex::encode(cell.hash()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
    }

    #[test]
    fn test_builder_slice_roundtrip() {
        let inner = Arc::new(CellBuilder::new().build().unwrap());

        let mut builder = CellBuilder::new();
        builder.store_bit(true).unwrap();
        builder.store_i8(-1).unwrap();
        builder.store_u32(0xdeadbeef).unwrap();
        builder.store_coins(1_000_000_000).unwrap();
        builder.store_ref(inner.clone()).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert!(slice.load_bit().unwrap());
        assert_eq!(slice.load_i8().unwrap(), -1);
        assert_eq!(slice.load_u32().unwrap(), 0xdeadbeef);
        assert_eq!(slice.load_coins().unwrap(), 1_000_000_000);
        assert_eq!(slice.load_ref().unwrap(), inner.as_ref());
        assert!(slice.is_empty());
    }
}
