//! Wallet V5 identity bitfield.
//!
//! The 80-bit wallet id is stored in the contract data and repeated in every
//! signed request:
//!
//! ```text
//! network_global_id:int32 workchain:int8 wallet_version:uint8 subwallet_number:uint32
//! ```

use ton_cell::{CellBuilder, CellSlice};

use crate::config::NETWORK_MAINNET;
use crate::error::{WalletError, WalletResult};

/// Size of a serialized wallet id.
pub const WALLET_ID_BYTES: usize = 10;

/// Wallet id bit length.
pub const WALLET_ID_BITS: usize = WALLET_ID_BYTES * 8;

/// Contract versions that can appear in a wallet id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WalletVersion {
    #[default]
    V5,
}

impl WalletVersion {
    /// Serialized version tag.
    pub fn tag(self) -> u8 {
        match self {
            WalletVersion::V5 => 0,
        }
    }

    /// Map a serialized tag back to a version.
    pub fn from_tag(tag: u8) -> WalletResult<Self> {
        match tag {
            0 => Ok(WalletVersion::V5),
            other => Err(WalletError::UnknownWalletVersion(other)),
        }
    }
}

/// Identity of a V5 wallet instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WalletId {
    pub network_global_id: i32,
    pub workchain: i8,
    pub wallet_version: WalletVersion,
    pub subwallet_number: u32,
}

impl Default for WalletId {
    fn default() -> Self {
        Self {
            network_global_id: NETWORK_MAINNET,
            workchain: 0,
            wallet_version: WalletVersion::V5,
            subwallet_number: 0,
        }
    }
}

impl WalletId {
    /// Wallet id for `workchain` on the given network, subwallet 0.
    pub fn new(network_global_id: i32, workchain: i8) -> Self {
        Self {
            network_global_id,
            workchain,
            ..Self::default()
        }
    }

    /// Set the subwallet number.
    pub fn with_subwallet(mut self, subwallet_number: u32) -> Self {
        self.subwallet_number = subwallet_number;
        self
    }

    /// Write the 80-bit id into a builder.
    pub fn store(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        builder.store_i32(self.network_global_id)?;
        builder.store_i8(self.workchain)?;
        builder.store_u8(self.wallet_version.tag())?;
        builder.store_u32(self.subwallet_number)?;
        Ok(())
    }

    /// Read exactly 10 bytes from the slice, leaving it positioned after them.
    pub fn load(slice: &mut CellSlice<'_>) -> WalletResult<Self> {
        let bytes = slice.load_bytes(WALLET_ID_BYTES)?;
        Self::from_bytes(&bytes)
    }

    /// Decode from the first 10 bytes of a byte string.
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        let bytes: &[u8; WALLET_ID_BYTES] = bytes
            .get(..WALLET_ID_BYTES)
            .and_then(|b| b.try_into().ok())
            .ok_or(WalletError::InvalidWalletIdLength(bytes.len()))?;

        let network_global_id = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let workchain = bytes[4] as i8;
        let wallet_version = WalletVersion::from_tag(bytes[5])?;
        let subwallet_number = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);

        Ok(Self {
            network_global_id,
            workchain,
            wallet_version,
            subwallet_number,
        })
    }

    /// Decode from an integer holding the id in its low 80 bits.
    ///
    /// Any bit set above bit 79 is rejected.
    pub fn from_u128(value: u128) -> WalletResult<Self> {
        if value >> WALLET_ID_BITS != 0 {
            let len = (u128::BITS - value.leading_zeros()) as usize;
            return Err(WalletError::InvalidWalletIdLength(len.div_ceil(8)));
        }
        let bytes = value.to_be_bytes();
        Self::from_bytes(&bytes[16 - WALLET_ID_BYTES..])
    }

    /// Serialize to 10 bytes, MSB first.
    pub fn to_bytes(&self) -> [u8; WALLET_ID_BYTES] {
        let mut out = [0u8; WALLET_ID_BYTES];
        out[..4].copy_from_slice(&self.network_global_id.to_be_bytes());
        out[4] = self.workchain as u8;
        out[5] = self.wallet_version.tag();
        out[6..].copy_from_slice(&self.subwallet_number.to_be_bytes());
        out
    }

    /// Serialize to an integer (low 80 bits).
    pub fn to_u128(&self) -> u128 {
        let mut buf = [0u8; 16];
        buf[16 - WALLET_ID_BYTES..].copy_from_slice(&self.to_bytes());
        u128::from_be_bytes(buf)
    }
}

impl TryFrom<&[u8]> for WalletId {
    type Error = WalletError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl TryFrom<u128> for WalletId {
    type Error = WalletError;

    fn try_from(value: u128) -> Result<Self, Self::Error> {
        Self::from_u128(value)
    }
}
