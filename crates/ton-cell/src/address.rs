//! Message addresses.

use std::str::FromStr;

use crate::{CellError, CellResult};

/// `MsgAddress` as it appears in message headers and actions.
///
/// Internal addresses keep the workchain as `i32` so `addr_var` can be read;
/// only workchains that fit `int8` can be written back (`addr_std`).
///
/// ```
/// use ton_cell::MsgAddress;
///
/// let addr: MsgAddress = "0:0000000000000000000000000000000000000000000000000000000000000000"
///     .parse()
///     .unwrap();
/// assert_eq!(addr.workchain(), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MsgAddress {
    /// No address (addr_none$00).
    #[default]
    Null,

    /// External address (addr_extern$01).
    External {
        /// Length in bits.
        len: u16,
        /// Address data.
        data: Vec<u8>,
    },

    /// Internal address (addr_std$10 or addr_var$11).
    Internal {
        /// Workchain ID (-1 for masterchain, 0 for basechain).
        workchain: i32,
        /// 256-bit address (account ID).
        address: [u8; 32],
    },
}

impl MsgAddress {
    /// Create an internal address.
    pub fn internal(workchain: i32, address: [u8; 32]) -> Self {
        MsgAddress::Internal { workchain, address }
    }

    /// Parse an address in raw form: "workchain:hex_address".
    ///
    /// An empty string parses to `MsgAddress::Null`.
    pub fn from_raw(s: &str) -> CellResult<Self> {
        let s = s.trim();

        if s.is_empty() {
            return Ok(MsgAddress::Null);
        }

        let (workchain_str, address_str) = s
            .split_once(':')
            .ok_or_else(|| CellError::InvalidAddress(format!("Expected wc:hex, got {}", s)))?;

        let workchain: i32 = workchain_str.parse().map_err(|_| {
            CellError::InvalidAddress(format!("Invalid workchain: {}", workchain_str))
        })?;

        if address_str.len() != 64 {
            return Err(CellError::InvalidAddress(format!(
                "Address hex must be 64 characters, got {}",
                address_str.len()
            )));
        }

        let mut address = [0u8; 32];
        hex::decode_to_slice(address_str, &mut address)
            .map_err(|e| CellError::InvalidAddress(format!("Invalid hex {}: {}", address_str, e)))?;

        Ok(MsgAddress::Internal { workchain, address })
    }

    /// Get the workchain ID (if internal address).
    pub fn workchain(&self) -> Option<i32> {
        match self {
            MsgAddress::Internal { workchain, .. } => Some(*workchain),
            _ => None,
        }
    }

    /// Get the 256-bit address hash (if internal address).
    pub fn hash_part(&self) -> Option<&[u8; 32]> {
        match self {
            MsgAddress::Internal { address, .. } => Some(address),
            _ => None,
        }
    }
}

impl FromStr for MsgAddress {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_raw(s)
    }
}

impl std::fmt::Display for MsgAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MsgAddress::Null => Ok(()),
            MsgAddress::External { len, data } => write!(f, "extern:{}:{}", len, hex::encode(data)),
            MsgAddress::Internal { workchain, address } => {
                write!(f, "{}:{}", workchain, hex::encode(address))
            }
        }
    }
}
