//! Cell construction.
//!
//! Every `store_*` call appends MSB-first and fails instead of truncating:
//! integers must fit their width and the cell limits (1023 bits, 4 refs) are
//! checked before anything is written.

use std::sync::Arc;

use crate::{Cell, CellError, CellResult, CellSlice, MsgAddress, MAX_CELL_BITS, MAX_CELL_REFS};

/// Append-only writer producing a [`Cell`].
///
/// ```
/// use ton_cell::CellBuilder;
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// builder.store_bytes(&[1, 2, 3, 4]).unwrap();
/// let cell = builder.build().unwrap();
/// assert_eq!(cell.bit_len(), 64);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.check_fits(1, 0)?;
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    pub fn store_bits(&mut self, bits: &[bool]) -> CellResult<&mut Self> {
        self.check_fits(bits.len(), 0)?;
        for &bit in bits {
            self.store_bit(bit)?;
        }
        Ok(self)
    }

    pub fn store_u8(&mut self, value: u8) -> CellResult<&mut Self> {
        self.store_uint(value.into(), 8)
    }

    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_uint(value.into(), 32)
    }

    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_uint(value, 64)
    }

    pub fn store_i8(&mut self, value: i8) -> CellResult<&mut Self> {
        self.store_int(value.into(), 8)
    }

    pub fn store_i32(&mut self, value: i32) -> CellResult<&mut Self> {
        self.store_int(value.into(), 32)
    }

    /// Store `value` as a `bits`-wide unsigned integer (`uint{bits}`).
    ///
    /// Fails with [`CellError::IntegerOverflow`] if the value needs more bits.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        if bits < 64 && value >> bits != 0 {
            return Err(CellError::IntegerOverflow {
                value: value.into(),
                bits,
            });
        }
        self.check_fits(bits, 0)?;
        for shift in (0..bits).rev() {
            self.store_bit((value >> shift) & 1 == 1)?;
        }
        Ok(self)
    }

    /// Store `value` as a `bits`-wide two's complement integer (`int{bits}`).
    ///
    /// Fails with [`CellError::IntegerOverflow`] outside `-2^(bits-1) .. 2^(bits-1)`.
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        if bits == 0 {
            return match value {
                0 => Ok(self),
                _ => Err(CellError::IntegerOverflow {
                    value: value.into(),
                    bits,
                }),
            };
        }
        if bits < 64 {
            let bound = 1i64 << (bits - 1);
            if value < -bound || value >= bound {
                return Err(CellError::IntegerOverflow {
                    value: value.into(),
                    bits,
                });
            }
            return self.store_uint(value as u64 & ((1u64 << bits) - 1), bits);
        }
        self.store_uint(value as u64, bits)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.check_fits(bytes.len() * 8, 0)?;
        if self.bit_len % 8 == 0 {
            self.data.extend_from_slice(bytes);
            self.bit_len += bytes.len() * 8;
        } else {
            for &byte in bytes {
                self.store_u8(byte)?;
            }
        }
        Ok(self)
    }

    /// Append whatever the slice has not consumed yet, bits and refs.
    pub fn store_slice(&mut self, slice: &CellSlice<'_>) -> CellResult<&mut Self> {
        self.check_fits(slice.bits_left(), slice.refs_left())?;
        for i in 0..slice.bits_left() {
            self.store_bit(slice.get_bit_at(slice.bit_offset + i))?;
        }
        for reference in &slice.cell.references()[slice.ref_offset..] {
            self.store_ref(reference.clone())?;
        }
        Ok(self)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        self.check_fits(0, 1)?;
        self.references.push(cell);
        Ok(self)
    }

    /// `Maybe ^Cell`
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> CellResult<&mut Self> {
        match cell {
            Some(cell) => {
                self.store_bit(true)?;
                self.store_ref(cell)
            }
            None => self.store_bit(false),
        }
    }

    /// Append the bits and references accumulated by another builder.
    pub fn store_builder(&mut self, other: &CellBuilder) -> CellResult<&mut Self> {
        self.check_fits(other.bit_len, other.references.len())?;
        for i in 0..other.bit_len {
            self.store_bit(other.data[i / 8] & (0x80 >> (i % 8)) != 0)?;
        }
        for reference in &other.references {
            self.store_ref(reference.clone())?;
        }
        Ok(self)
    }

    /// Append a finalized cell's contents inline.
    pub fn store_cell(&mut self, cell: &Cell) -> CellResult<&mut Self> {
        self.store_slice(&CellSlice::new(cell))
    }

    fn check_fits(&self, bits: usize, refs: usize) -> CellResult<()> {
        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(CellError::DataTooLong(self.bit_len + bits));
        }
        if self.references.len() + refs > MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(self.references.len() + refs));
        }
        Ok(())
    }

    /// `Grams` / `VarUInteger 16`: a 4-bit byte length, then the value.
    pub fn store_coins(&mut self, nanotons: u128) -> CellResult<&mut Self> {
        let len = (128 - nanotons.leading_zeros() as usize).div_ceil(8);
        if len > 15 {
            return Err(CellError::IntegerOverflow {
                value: nanotons as i128,
                bits: 120,
            });
        }
        self.store_uint(len as u64, 4)?;
        self.store_bytes(&nanotons.to_be_bytes()[16 - len..])
    }

    /// `MsgAddress`; internal addresses are written as `addr_std` without anycast.
    pub fn store_address(&mut self, addr: &MsgAddress) -> CellResult<&mut Self> {
        match addr {
            MsgAddress::Null => self.store_uint(0b00, 2),
            MsgAddress::External { len, data } => {
                let len = *len as usize;
                if data.len() * 8 < len {
                    return Err(CellError::InvalidAddress(format!(
                        "external address of {} bits backed by {} bytes",
                        len,
                        data.len()
                    )));
                }
                self.store_uint(0b01, 2)?;
                self.store_uint(len as u64, 9)?;
                for i in 0..len {
                    self.store_bit(data[i / 8] & (0x80 >> (i % 8)) != 0)?;
                }
                Ok(self)
            }
            MsgAddress::Internal { workchain, address } => {
                let workchain = i8::try_from(*workchain).map_err(|_| {
                    CellError::InvalidAddress(format!("workchain {} does not fit in int8", workchain))
                })?;
                self.store_uint(0b100, 3)?; // addr_std$10, no anycast
                self.store_i8(workchain)?;
                self.store_bytes(address)
            }
        }
    }

    pub fn bits_left(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    pub fn refs_left(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Finalize into a cell.
    pub fn build(self) -> CellResult<Cell> {
        Ok(Cell::new(self.data, self.bit_len, self.references))
    }

    /// Finalize a copy of the current contents, leaving the builder usable.
    pub fn to_cell(&self) -> CellResult<Cell> {
        self.clone().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_builder() {
        let builder = CellBuilder::new();
        assert_eq!(builder.bit_len(), 0);
        assert_eq!(builder.ref_count(), 0);
        assert_eq!(builder.bits_left(), MAX_CELL_BITS);
        assert_eq!(builder.refs_left(), MAX_CELL_REFS);
    }

    #[test]
    fn test_store_bits_msb_first() {
        let mut builder = CellBuilder::new();
        builder.store_bits(&[true, false, true]).unwrap();
        builder.store_uint(0b10101, 5).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 8);
        assert_eq!(cell.data(), &[0b10110101]);
    }

    #[test]
    fn test_unaligned_bytes() {
        let mut builder = CellBuilder::new();
        builder.store_bit(true).unwrap();
        builder.store_bytes(&[0xff, 0x00]).unwrap();
        builder.store_u32(0x12345678).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 49);
        assert_eq!(cell.data(), &[0xff, 0x80, 0x09, 0x1a, 0x2b, 0x3c, 0x00]);
    }

    #[test]
    fn test_uint_out_of_range() {
        let mut builder = CellBuilder::new();
        assert!(matches!(
            builder.store_uint(32, 5),
            Err(CellError::IntegerOverflow { value: 32, bits: 5 })
        ));
        assert!(builder.store_uint(1, 0).is_err());
        builder.store_uint(31, 5).unwrap();
        builder.store_uint(u64::MAX, 64).unwrap();
        assert_eq!(builder.bit_len(), 69);
    }

    #[test]
    fn test_int_range() {
        let mut builder = CellBuilder::new();
        builder.store_int(-128, 8).unwrap();
        builder.store_int(127, 8).unwrap();
        builder.store_int(i64::MIN, 64).unwrap();
        assert!(matches!(
            builder.store_int(128, 8),
            Err(CellError::IntegerOverflow { value: 128, bits: 8 })
        ));
        assert!(builder.store_int(-129, 8).is_err());
        assert!(builder.store_int(-1, 0).is_err());
        assert_eq!(builder.bit_len(), 80);

        let cell = builder.build().unwrap();
        assert_eq!(&cell.data()[..2], &[0x80, 0x7f]);
    }

    #[test]
    fn test_address_workchain_must_fit_int8() {
        let mut builder = CellBuilder::new();
        for workchain in [300, 1000, -129] {
            assert!(matches!(
                builder.store_address(&MsgAddress::internal(workchain, [0x11; 32])),
                Err(CellError::InvalidAddress(_))
            ));
        }
        assert_eq!(builder.bit_len(), 0);

        builder.store_address(&MsgAddress::internal(-128, [0x11; 32])).unwrap();
        builder.store_address(&MsgAddress::internal(127, [0x11; 32])).unwrap();
        assert_eq!(builder.bit_len(), 2 * 267);
    }

    #[test]
    fn test_store_coins() {
        let mut builder = CellBuilder::new();
        builder.store_coins(0).unwrap();
        builder.store_coins(0x0102).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 4 + 4 + 16);
        assert_eq!(cell.data(), &[0x02, 0x01, 0x02]);

        let mut builder = CellBuilder::new();
        assert!(builder.store_coins(u128::MAX).is_err());
        builder.store_coins(u128::MAX >> 8).unwrap();
        assert_eq!(builder.bit_len(), 4 + 120);
    }

    #[test]
    fn test_store_builder_appends_bits_and_refs() {
        let child = Arc::new(Cell::empty());

        let mut tail = CellBuilder::new();
        tail.store_uint(0b101, 3).unwrap();
        tail.store_ref(child.clone()).unwrap();

        let mut head = CellBuilder::new();
        head.store_bit(true).unwrap();
        head.store_builder(&tail).unwrap();

        let cell = head.build().unwrap();
        assert_eq!(cell.bit_len(), 4);
        assert_eq!(cell.data(), &[0b11010000]);
        assert_eq!(cell.reference_count(), 1);
    }

    #[test]
    fn test_overflow_leaves_builder_untouched() {
        let mut tail = CellBuilder::new();
        tail.store_u64(0).unwrap();
        let mut big = CellBuilder::new();
        for _ in 0..15 {
            big.store_u64(0).unwrap();
        }
        assert!(matches!(big.store_builder(&tail), Err(CellError::DataTooLong(_))));
        assert!(matches!(big.store_bytes(&[0; 8]), Err(CellError::DataTooLong(_))));
        assert_eq!(big.bit_len(), 960);

        for _ in 0..4 {
            big.store_ref(Arc::new(Cell::empty())).unwrap();
        }
        assert!(matches!(
            big.store_ref(Arc::new(Cell::empty())),
            Err(CellError::TooManyRefs(5))
        ));
    }

    #[test]
    fn test_to_cell_keeps_builder() {
        let mut builder = CellBuilder::new();
        builder.store_u8(7).unwrap();
        let first = builder.to_cell().unwrap();
        builder.store_u8(8).unwrap();
        let second = builder.build().unwrap();
        assert_eq!(first.bit_len(), 8);
        assert_eq!(second.bit_len(), 16);
    }

    #[test]
    fn test_store_maybe_ref() {
        let mut builder = CellBuilder::new();
        builder.store_maybe_ref(None).unwrap();
        builder.store_maybe_ref(Some(Arc::new(Cell::empty()))).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 2);
        assert_eq!(cell.data(), &[0b01000000]);
        assert_eq!(cell.reference_count(), 1);
    }
}
