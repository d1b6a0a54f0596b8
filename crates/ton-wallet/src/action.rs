//! Out actions and the standard `OutList` encoding
//!
//! ```text
//! out_list_empty$_ = OutList 0;
//! out_list$_ {n:#} prev:^(OutList n) action:OutAction = OutList (n + 1);
//! action_send_msg#0ec3c86d mode:(## 8) out_msg:^(MessageRelaxed Any) = OutAction;
//! action_set_code#ad4de08e new_code:^Cell = OutAction;
//! ```

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::error::{WalletError, WalletResult};
use crate::message::{MessageRelaxed, SendMode};

/// action_send_msg tag
pub const ACTION_SEND_MSG_TAG: u32 = 0x0ec3c86d;
/// action_set_code tag
pub const ACTION_SET_CODE_TAG: u32 = 0xad4de08e;
/// set_signature_auth_allowed tag
pub const ACTION_SET_IS_PUBLIC_KEY_ENABLED_TAG: u32 = 0x20cbb95a;
/// add_extension tag
pub const ACTION_ADD_EXTENSION_TAG: u32 = 0x1c40db9f;
/// remove_extension tag
pub const ACTION_REMOVE_EXTENSION_TAG: u32 = 0x5eaef4a4;

/// Send an outbound message with the given mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutActionSendMsg {
    pub mode: SendMode,
    pub out_msg: MessageRelaxed,
}

impl OutActionSendMsg {
    pub fn new(mode: SendMode, out_msg: MessageRelaxed) -> Self {
        Self { mode, out_msg }
    }
}

/// Action as it appears in a standard `OutList`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StandardAction {
    SendMsg(OutActionSendMsg),
    SetCode(Arc<Cell>),
}

impl StandardAction {
    fn store(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        match self {
            StandardAction::SendMsg(action) => {
                builder.store_u32(ACTION_SEND_MSG_TAG)?;
                builder.store_u8(action.mode.bits())?;
                builder.store_ref(Arc::new(action.out_msg.to_cell()?))?;
            }
            StandardAction::SetCode(code) => {
                builder.store_u32(ACTION_SET_CODE_TAG)?;
                builder.store_ref(code.clone())?;
            }
        }
        Ok(())
    }

    fn load(slice: &mut CellSlice<'_>) -> WalletResult<Self> {
        let tag = slice.load_u32()?;
        match tag {
            ACTION_SEND_MSG_TAG => {
                let mode = SendMode(slice.load_u8()?);
                let out_msg = MessageRelaxed::from_cell(slice.load_ref()?)?;
                Ok(StandardAction::SendMsg(OutActionSendMsg { mode, out_msg }))
            }
            ACTION_SET_CODE_TAG => Ok(StandardAction::SetCode(slice.load_ref_arc()?)),
            other => Err(WalletError::UnknownActionTag(other)),
        }
    }
}

/// Encode actions as a standard `OutList` cell.
///
/// The first action ends up deepest; the last one is the root.
pub fn store_out_list(actions: &[StandardAction]) -> WalletResult<Cell> {
    actions.iter().try_fold(Cell::empty(), |prev, action| -> WalletResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_ref(Arc::new(prev))?;
        action.store(&mut builder)?;
        Ok(builder.build()?)
    })
}

/// Decode a standard `OutList` cell into actions, first action first.
pub fn load_out_list(cell: &Cell) -> WalletResult<Vec<StandardAction>> {
    let mut actions = Vec::new();
    let mut current = cell;
    while current.reference_count() > 0 {
        let mut slice = CellSlice::new(current);
        let prev = slice.load_ref()?;
        actions.push(StandardAction::load(&mut slice)?);
        current = prev;
    }
    actions.reverse();
    Ok(actions)
}

/// Any action a V5 request can carry.
///
/// Everything but `SendMsg` is an extended action, understood only by V5 wallets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutAction {
    SendMsg(OutActionSendMsg),
    AddExtension(MsgAddress),
    RemoveExtension(MsgAddress),
    SetIsPublicKeyEnabled(bool),
}

impl OutAction {
    /// Send `msg` with `mode`.
    pub fn send_msg(mode: SendMode, msg: MessageRelaxed) -> Self {
        OutAction::SendMsg(OutActionSendMsg::new(mode, msg))
    }

    pub fn is_extended(&self) -> bool {
        !matches!(self, OutAction::SendMsg(_))
    }

    /// 32-bit tag written in front of the action fields.
    pub fn tag(&self) -> u32 {
        match self {
            OutAction::SendMsg(_) => ACTION_SEND_MSG_TAG,
            OutAction::AddExtension(_) => ACTION_ADD_EXTENSION_TAG,
            OutAction::RemoveExtension(_) => ACTION_REMOVE_EXTENSION_TAG,
            OutAction::SetIsPublicKeyEnabled(_) => ACTION_SET_IS_PUBLIC_KEY_ENABLED_TAG,
        }
    }

    /// Write an extended action (tag plus fields).
    pub(crate) fn store_extended(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        match self {
            OutAction::AddExtension(address) | OutAction::RemoveExtension(address) => {
                builder.store_u32(self.tag())?;
                builder.store_address(address)?;
            }
            OutAction::SetIsPublicKeyEnabled(enabled) => {
                builder.store_u32(self.tag())?;
                builder.store_bit(*enabled)?;
            }
            OutAction::SendMsg(_) => return Err(WalletError::MisorderedExtendedActions),
        }
        Ok(())
    }

    /// Read an extended action (tag plus fields).
    pub(crate) fn load_extended(slice: &mut CellSlice<'_>) -> WalletResult<Self> {
        let tag = slice.load_u32()?;
        match tag {
            ACTION_ADD_EXTENSION_TAG => Ok(OutAction::AddExtension(slice.load_address()?)),
            ACTION_REMOVE_EXTENSION_TAG => Ok(OutAction::RemoveExtension(slice.load_address()?)),
            ACTION_SET_IS_PUBLIC_KEY_ENABLED_TAG => {
                Ok(OutAction::SetIsPublicKeyEnabled(slice.load_bit()?))
            }
            other => Err(WalletError::UnknownActionTag(other)),
        }
    }
}

impl From<OutActionSendMsg> for OutAction {
    fn from(action: OutActionSendMsg) -> Self {
        OutAction::SendMsg(action)
    }
}
