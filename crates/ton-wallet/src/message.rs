//! Outbound message structures
//!
//! ```text
//! message$_ {X:Type} info:CommonMsgInfoRelaxed
//!   init:(Maybe (Either StateInit ^StateInit))
//!   body:(Either X ^X) = MessageRelaxed X;
//!
//! int_msg_info$0 ihr_disabled:Bool bounce:Bool bounced:Bool
//!   src:MsgAddress dest:MsgAddressInt value:CurrencyCollection
//!   ihr_fee:Grams fwd_fee:Grams created_lt:uint64 created_at:uint32
//!   = CommonMsgInfoRelaxed;
//! ext_out_msg_info$11 src:MsgAddress dest:MsgAddressExt
//!   created_lt:uint64 created_at:uint32 = CommonMsgInfoRelaxed;
//! ```

use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ton_cell::{Cell, CellBuilder, CellError, CellSlice, MsgAddress, MAX_CELL_BITS, MAX_CELL_REFS};

use crate::error::{WalletError, WalletResult};

/// Send mode flags of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendMode(pub u8);

impl SendMode {
    pub const NONE: SendMode = SendMode(0);
    pub const PAY_GAS_SEPARATELY: SendMode = SendMode(1);
    pub const IGNORE_ERRORS: SendMode = SendMode(2);
    pub const DESTROY_ACCOUNT_IF_ZERO: SendMode = SendMode(32);
    pub const CARRY_ALL_REMAINING_INCOMING_VALUE: SendMode = SendMode(64);
    pub const CARRY_ALL_REMAINING_BALANCE: SendMode = SendMode(128);

    /// Raw flag byte.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether all flags of `other` are set.
    pub fn contains(self, other: SendMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for SendMode {
    /// Pay fees separately and ignore action-phase errors.
    fn default() -> Self {
        SendMode::PAY_GAS_SEPARATELY | SendMode::IGNORE_ERRORS
    }
}

impl BitOr for SendMode {
    type Output = SendMode;

    fn bitor(self, rhs: Self) -> Self::Output {
        SendMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for SendMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<u8> for SendMode {
    fn from(value: u8) -> Self {
        SendMode(value)
    }
}

/// Tick-tock flags of a special account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTock {
    pub tick: bool,
    pub tock: bool,
}

/// Contract code and data used to deploy an account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateInit {
    pub split_depth: Option<u8>,
    pub special: Option<TickTock>,
    pub code: Option<Arc<Cell>>,
    pub data: Option<Arc<Cell>>,
    pub libraries: Option<Arc<Cell>>,
}

impl StateInit {
    /// StateInit with code and data only.
    pub fn new(code: Arc<Cell>, data: Arc<Cell>) -> Self {
        Self {
            code: Some(code),
            data: Some(data),
            ..Self::default()
        }
    }

    /// Write the StateInit fields into a builder.
    pub fn store(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        // split_depth:(Maybe (## 5))
        match self.split_depth {
            Some(depth) => {
                builder.store_bit(true)?;
                builder.store_uint(depth as u64, 5)?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }
        // special:(Maybe TickTock)
        match self.special {
            Some(tt) => {
                builder.store_bit(true)?;
                builder.store_bit(tt.tick)?;
                builder.store_bit(tt.tock)?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }
        builder.store_maybe_ref(self.code.clone())?;
        builder.store_maybe_ref(self.data.clone())?;
        builder.store_maybe_ref(self.libraries.clone())?;
        Ok(())
    }

    /// Read a StateInit from a slice.
    pub fn load(slice: &mut CellSlice<'_>) -> WalletResult<Self> {
        let split_depth = if slice.load_bit()? {
            Some(slice.load_uint(5)? as u8)
        } else {
            None
        };
        let special = if slice.load_bit()? {
            Some(TickTock {
                tick: slice.load_bit()?,
                tock: slice.load_bit()?,
            })
        } else {
            None
        };
        Ok(Self {
            split_depth,
            special,
            code: slice.load_maybe_ref()?,
            data: slice.load_maybe_ref()?,
            libraries: slice.load_maybe_ref()?,
        })
    }

    /// Build the StateInit cell.
    pub fn to_cell(&self) -> WalletResult<Cell> {
        let mut builder = CellBuilder::new();
        self.store(&mut builder)?;
        builder.build().map_err(Into::into)
    }

    /// Address of the account this StateInit deploys.
    pub fn address(&self, workchain: i32) -> WalletResult<MsgAddress> {
        if i8::try_from(workchain).is_err() {
            return Err(CellError::InvalidAddress(format!(
                "workchain {} does not fit in int8",
                workchain
            ))
            .into());
        }
        Ok(MsgAddress::Internal {
            workchain,
            address: self.to_cell()?.hash(),
        })
    }
}

/// Header of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonMsgInfoRelaxed {
    Internal {
        ihr_disabled: bool,
        bounce: bool,
        bounced: bool,
        src: MsgAddress,
        dest: MsgAddress,
        /// Amount in nanotons
        value: u128,
        /// Extra currencies dictionary, if any
        extra_currencies: Option<Arc<Cell>>,
        ihr_fee: u128,
        forward_fee: u128,
        created_lt: u64,
        created_at: u32,
    },
    ExternalOut {
        src: MsgAddress,
        dest: MsgAddress,
        created_lt: u64,
        created_at: u32,
    },
}

impl CommonMsgInfoRelaxed {
    fn store(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        match self {
            CommonMsgInfoRelaxed::Internal {
                ihr_disabled,
                bounce,
                bounced,
                src,
                dest,
                value,
                extra_currencies,
                ihr_fee,
                forward_fee,
                created_lt,
                created_at,
            } => {
                builder.store_bit(false)?; // int_msg_info$0
                builder.store_bit(*ihr_disabled)?;
                builder.store_bit(*bounce)?;
                builder.store_bit(*bounced)?;
                builder.store_address(src)?;
                builder.store_address(dest)?;
                builder.store_coins(*value)?;
                builder.store_maybe_ref(extra_currencies.clone())?;
                builder.store_coins(*ihr_fee)?;
                builder.store_coins(*forward_fee)?;
                builder.store_u64(*created_lt)?;
                builder.store_u32(*created_at)?;
            }
            CommonMsgInfoRelaxed::ExternalOut {
                src,
                dest,
                created_lt,
                created_at,
            } => {
                builder.store_bits(&[true, true])?; // ext_out_msg_info$11
                builder.store_address(src)?;
                builder.store_address(dest)?;
                builder.store_u64(*created_lt)?;
                builder.store_u32(*created_at)?;
            }
        }
        Ok(())
    }

    fn load(slice: &mut CellSlice<'_>) -> WalletResult<Self> {
        if !slice.load_bit()? {
            return Ok(CommonMsgInfoRelaxed::Internal {
                ihr_disabled: slice.load_bit()?,
                bounce: slice.load_bit()?,
                bounced: slice.load_bit()?,
                src: slice.load_address()?,
                dest: slice.load_address()?,
                value: slice.load_coins()?,
                extra_currencies: slice.load_maybe_ref()?,
                ihr_fee: slice.load_coins()?,
                forward_fee: slice.load_coins()?,
                created_lt: slice.load_u64()?,
                created_at: slice.load_u32()?,
            });
        }
        if !slice.load_bit()? {
            return Err(WalletError::InvalidMessage(
                "inbound external header in outbound message".to_string(),
            ));
        }
        Ok(CommonMsgInfoRelaxed::ExternalOut {
            src: slice.load_address()?,
            dest: slice.load_address()?,
            created_lt: slice.load_u64()?,
            created_at: slice.load_u32()?,
        })
    }
}

/// An outbound message as carried by a send-message action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRelaxed {
    pub info: CommonMsgInfoRelaxed,
    pub init: Option<StateInit>,
    pub body: Arc<Cell>,
}

impl MessageRelaxed {
    /// Internal message with an empty body, bounce on and zero fees.
    pub fn internal(to: MsgAddress, value: u128) -> Self {
        Self {
            info: CommonMsgInfoRelaxed::Internal {
                ihr_disabled: true,
                bounce: true,
                bounced: false,
                src: MsgAddress::Null,
                dest: to,
                value,
                extra_currencies: None,
                ihr_fee: 0,
                forward_fee: 0,
                created_lt: 0,
                created_at: 0,
            },
            init: None,
            body: Arc::new(Cell::empty()),
        }
    }

    /// Set message body
    pub fn with_body(mut self, body: Cell) -> Self {
        self.body = Arc::new(body);
        self
    }

    /// Attach a StateInit to deploy the destination
    pub fn with_init(mut self, init: StateInit) -> Self {
        self.init = Some(init);
        self
    }

    /// Set bounce flag (internal messages only)
    pub fn with_bounce(mut self, value: bool) -> Self {
        if let CommonMsgInfoRelaxed::Internal { bounce, .. } = &mut self.info {
            *bounce = value;
        }
        self
    }

    /// Serialize the message into a builder.
    ///
    /// StateInit and body are inlined when they fit and referenced otherwise.
    pub fn store(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        self.info.store(builder)?;

        match &self.init {
            Some(init) => {
                builder.store_bit(true)?;
                let mut init_builder = CellBuilder::new();
                init.store(&mut init_builder)?;

                let inline_bits = init_builder.bit_len() + self.body.bit_len();
                let inline_refs = init_builder.ref_count() + self.body.reference_count();
                if builder.bits_left() < 2 + inline_bits
                    || builder.ref_count() + inline_refs > MAX_CELL_REFS
                {
                    builder.store_bit(true)?;
                    builder.store_ref(Arc::new(init_builder.build()?))?;
                } else {
                    builder.store_bit(false)?;
                    builder.store_builder(&init_builder)?;
                }
            }
            None => {
                builder.store_bit(false)?;
            }
        }

        let body_fits = builder.bit_len() + 1 + self.body.bit_len() <= MAX_CELL_BITS
            && builder.ref_count() + self.body.reference_count() <= MAX_CELL_REFS;
        if body_fits {
            builder.store_bit(false)?;
            builder.store_cell(&self.body)?;
        } else {
            builder.store_bit(true)?;
            builder.store_ref(self.body.clone())?;
        }
        Ok(())
    }

    /// Read a message, consuming the whole slice.
    pub fn load(slice: &mut CellSlice<'_>) -> WalletResult<Self> {
        let info = CommonMsgInfoRelaxed::load(slice)?;

        let init = if slice.load_bit()? {
            if slice.load_bit()? {
                let init_cell = slice.load_ref()?;
                Some(StateInit::load(&mut CellSlice::new(init_cell))?)
            } else {
                Some(StateInit::load(slice)?)
            }
        } else {
            None
        };

        let body = if slice.load_bit()? {
            slice.load_ref_arc()?
        } else {
            Arc::new(slice.load_remaining()?)
        };

        Ok(Self { info, init, body })
    }

    /// Build the message cell.
    pub fn to_cell(&self) -> WalletResult<Cell> {
        let mut builder = CellBuilder::new();
        self.store(&mut builder)?;
        builder.build().map_err(Into::into)
    }

    /// Parse a message cell.
    pub fn from_cell(cell: &Cell) -> WalletResult<Self> {
        Self::load(&mut CellSlice::new(cell))
    }
}

/// Build a text comment cell
pub fn comment(text: &str) -> WalletResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(0)?; // comment op = 0
    builder.store_bytes(text.as_bytes())?;
    builder.build().map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest() -> MsgAddress {
        MsgAddress::internal(0, [0x11; 32])
    }

    #[test]
    fn test_send_mode_flags() {
        let mode = SendMode::default();
        assert_eq!(mode.bits(), 3);
        assert!(mode.contains(SendMode::IGNORE_ERRORS));
        assert!(!mode.contains(SendMode::CARRY_ALL_REMAINING_BALANCE));

        let mut mode = SendMode::CARRY_ALL_REMAINING_BALANCE;
        mode |= SendMode::IGNORE_ERRORS;
        assert_eq!(mode.bits(), 130);
    }

    #[test]
    fn test_internal_message_layout() {
        let msg = MessageRelaxed::internal(dest(), 1_000_000_000).with_bounce(false);
        let cell = msg.to_cell().unwrap();

        let mut slice = CellSlice::new(&cell);
        assert!(!slice.load_bit().unwrap()); // int_msg_info$0
        assert!(slice.load_bit().unwrap()); // ihr_disabled
        assert!(!slice.load_bit().unwrap()); // bounce
        assert!(!slice.load_bit().unwrap()); // bounced
        assert_eq!(slice.load_address().unwrap(), MsgAddress::Null);
        assert_eq!(slice.load_address().unwrap(), dest());
        assert_eq!(slice.load_coins().unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_message_roundtrip_inline_body() {
        let msg = MessageRelaxed::internal(dest(), 5).with_body(comment("hello").unwrap());
        let cell = msg.to_cell().unwrap();
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(MessageRelaxed::from_cell(&cell).unwrap(), msg);
    }

    #[test]
    fn test_message_roundtrip_inline_init() {
        let init = StateInit::new(Arc::new(Cell::empty()), Arc::new(comment("data").unwrap()));
        let msg = MessageRelaxed::internal(dest(), 5)
            .with_init(init)
            .with_body(comment("hi").unwrap());

        let cell = msg.to_cell().unwrap();
        // code and data refs of the inlined StateInit
        assert_eq!(cell.reference_count(), 2);
        assert_eq!(MessageRelaxed::from_cell(&cell).unwrap(), msg);
    }

    #[test]
    fn test_message_roundtrip_referenced_body_and_init() {
        let mut big = CellBuilder::new();
        for _ in 0..15 {
            big.store_u64(u64::MAX).unwrap();
        }
        let init = StateInit::new(Arc::new(Cell::empty()), Arc::new(comment("data").unwrap()));
        let msg = MessageRelaxed::internal(dest(), 5)
            .with_init(init.clone())
            .with_body(big.build().unwrap());

        let cell = msg.to_cell().unwrap();
        assert_eq!(cell.reference_count(), 2);
        assert_eq!(cell.reference(0).unwrap().hash(), init.to_cell().unwrap().hash());
        assert_eq!(cell.reference(1).unwrap().bit_len(), 960);
        assert_eq!(MessageRelaxed::from_cell(&cell).unwrap(), msg);
    }

    #[test]
    fn test_external_out_roundtrip() {
        let mut body = CellBuilder::new();
        body.store_u8(0).unwrap();
        let msg = MessageRelaxed {
            info: CommonMsgInfoRelaxed::ExternalOut {
                src: MsgAddress::Null,
                dest: MsgAddress::Null,
                created_lt: 0,
                created_at: 0,
            },
            init: None,
            body: Arc::new(body.build().unwrap()),
        };
        let cell = msg.to_cell().unwrap();
        assert_eq!(MessageRelaxed::from_cell(&cell).unwrap(), msg);
    }

    #[test]
    fn test_state_init_address_is_hash() {
        let init = StateInit::new(Arc::new(Cell::empty()), Arc::new(Cell::empty()));
        let cell = init.to_cell().unwrap();
        assert_eq!(cell.bit_len(), 5);
        assert_eq!(cell.reference_count(), 2);
        assert_eq!(
            init.address(-1).unwrap(),
            MsgAddress::internal(-1, cell.hash())
        );
    }

    #[test]
    fn test_state_init_rejects_out_of_range_fields() {
        let mut init = StateInit::new(Arc::new(Cell::empty()), Arc::new(Cell::empty()));
        for workchain in [300, 1000, -129] {
            assert!(matches!(
                init.address(workchain),
                Err(WalletError::Cell(CellError::InvalidAddress(_)))
            ));
        }
        assert!(init.address(127).is_ok());

        // split_depth is a 5-bit field
        init.split_depth = Some(31);
        assert!(init.to_cell().is_ok());
        init.split_depth = Some(32);
        assert!(matches!(
            init.to_cell(),
            Err(WalletError::Cell(CellError::IntegerOverflow { value: 32, bits: 5 }))
        ));
    }

    #[test]
    fn test_comment() {
        let cell = comment("Hello TON").unwrap();
        assert_eq!(cell.bit_len(), 32 + 9 * 8);
    }
}
