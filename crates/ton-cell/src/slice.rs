//! Sequential reading of cells.

use std::sync::Arc;

use crate::{Cell, CellBuilder, CellError, CellResult, MsgAddress};

/// Read cursor over a cell's bits and references.
///
/// ```
/// use ton_cell::{CellBuilder, CellSlice};
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// let cell = builder.build().unwrap();
///
/// let mut slice = CellSlice::new(&cell);
/// assert_eq!(slice.load_u32().unwrap(), 0x12345678);
/// assert!(slice.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    pub(crate) cell: &'a Cell,
    pub(crate) bit_offset: usize,
    /// Bits left after `bit_offset`.
    pub(crate) bit_len: usize,
    pub(crate) ref_offset: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        CellSlice {
            cell,
            bit_offset: 0,
            bit_len: cell.bit_len(),
            ref_offset: 0,
        }
    }

    fn ensure_bits(&self, need: usize) -> CellResult<()> {
        if need > self.bit_len {
            return Err(CellError::NotEnoughBits {
                need,
                have: self.bit_len,
            });
        }
        Ok(())
    }

    pub fn load_bit(&mut self) -> CellResult<bool> {
        self.ensure_bits(1)?;
        let bit = self.get_bit_at(self.bit_offset);
        self.bit_offset += 1;
        self.bit_len -= 1;
        Ok(bit)
    }

    pub fn load_bits(&mut self, count: usize) -> CellResult<Vec<bool>> {
        self.ensure_bits(count)?;
        (0..count).map(|_| self.load_bit()).collect()
    }

    pub fn load_u8(&mut self) -> CellResult<u8> {
        Ok(self.load_uint(8)? as u8)
    }

    pub fn load_u32(&mut self) -> CellResult<u32> {
        Ok(self.load_uint(32)? as u32)
    }

    pub fn load_u64(&mut self) -> CellResult<u64> {
        self.load_uint(64)
    }

    pub fn load_i8(&mut self) -> CellResult<i8> {
        Ok(self.load_int(8)? as i8)
    }

    /// Read a `bits`-wide unsigned integer (at most 64).
    pub fn load_uint(&mut self, bits: usize) -> CellResult<u64> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.ensure_bits(bits)?;
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | u64::from(self.load_bit()?);
        }
        Ok(value)
    }

    /// Read a `bits`-wide two's complement integer, sign-extended to `i64`.
    pub fn load_int(&mut self, bits: usize) -> CellResult<i64> {
        let raw = self.load_uint(bits)?;
        if bits == 0 || bits == 64 {
            return Ok(raw as i64);
        }
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    pub fn load_bytes(&mut self, count: usize) -> CellResult<Vec<u8>> {
        self.ensure_bits(count * 8)?;
        (0..count).map(|_| self.load_u8()).collect()
    }

    /// Next reference, borrowed from the underlying cell.
    pub fn load_ref(&mut self) -> CellResult<&'a Cell> {
        self.next_ref().map(|reference| &**reference)
    }

    /// Next reference, sharing ownership of the child.
    pub fn load_ref_arc(&mut self) -> CellResult<Arc<Cell>> {
        self.next_ref().cloned()
    }

    fn next_ref(&mut self) -> CellResult<&'a Arc<Cell>> {
        let cell: &'a Cell = self.cell;
        let reference = cell
            .reference(self.ref_offset)
            .ok_or(CellError::NotEnoughRefs { need: 1, have: 0 })?;
        self.ref_offset += 1;
        Ok(reference)
    }

    /// `Maybe ^Cell`
    pub fn load_maybe_ref(&mut self) -> CellResult<Option<Arc<Cell>>> {
        if self.load_bit()? {
            self.load_ref_arc().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Consume everything left and return it as a new cell.
    pub fn load_remaining(&mut self) -> CellResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_slice(self)?;
        self.bit_offset += self.bit_len;
        self.bit_len = 0;
        self.ref_offset = self.cell.reference_count();
        builder.build()
    }

    /// `Grams` / `VarUInteger 16`
    pub fn load_coins(&mut self) -> CellResult<u128> {
        let len = self.load_uint(4)? as usize;
        let mut value = 0u128;
        for byte in self.load_bytes(len)? {
            value = (value << 8) | u128::from(byte);
        }
        Ok(value)
    }

    /// Read a `MsgAddress`. `addr_var` is accepted as long as it carries 256 bits.
    pub fn load_address(&mut self) -> CellResult<MsgAddress> {
        match self.load_uint(2)? {
            0b00 => Ok(MsgAddress::Null),
            0b01 => {
                let len = self.load_uint(9)? as u16;
                let mut data = vec![0u8; (len as usize).div_ceil(8)];
                for i in 0..len as usize {
                    if self.load_bit()? {
                        data[i / 8] |= 0x80 >> (i % 8);
                    }
                }
                Ok(MsgAddress::External { len, data })
            }
            tag => {
                // anycast:(Maybe Anycast), rewrite_pfx is skipped
                if self.load_bit()? {
                    let depth = self.load_uint(5)? as usize;
                    self.skip_bits(depth)?;
                }
                let workchain = if tag == 0b10 {
                    i32::from(self.load_i8()?)
                } else {
                    let addr_len = self.load_uint(9)?;
                    if addr_len != 256 {
                        return Err(CellError::InvalidAddress(format!(
                            "addr_var with {} bit address",
                            addr_len
                        )));
                    }
                    self.load_int(32)? as i32
                };
                let mut address = [0u8; 32];
                address.copy_from_slice(&self.load_bytes(32)?);
                Ok(MsgAddress::Internal { workchain, address })
            }
        }
    }

    pub fn bits_left(&self) -> usize {
        self.bit_len
    }

    pub fn refs_left(&self) -> usize {
        self.cell.reference_count() - self.ref_offset
    }

    pub fn skip_bits(&mut self, count: usize) -> CellResult<()> {
        self.ensure_bits(count)?;
        self.bit_offset += count;
        self.bit_len -= count;
        Ok(())
    }

    pub fn skip_refs(&mut self, count: usize) -> CellResult<()> {
        let have = self.refs_left();
        if count > have {
            return Err(CellError::NotEnoughRefs { need: count, have });
        }
        self.ref_offset += count;
        Ok(())
    }

    /// No bits and no references left.
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs_left() == 0
    }

    pub(crate) fn get_bit_at(&self, index: usize) -> bool {
        self.cell.get_bit(index).unwrap_or(false)
    }
}
