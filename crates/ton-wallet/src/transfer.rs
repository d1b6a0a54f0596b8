//! Per-version signing message builders
//!
//! Every wallet version expects its own header layout in front of the
//! outbound messages:
//!
//! | version | signed fields |
//! |---------|---------------|
//! | V1 | `seqno:32 [mode:8 ^msg]` |
//! | V2 | `seqno:32 valid_until:32 (mode:8 ^msg)*` |
//! | V3 | `wallet_id:32 valid_until:32 seqno:32 (mode:8 ^msg)*` |
//! | V4 | `wallet_id:32 valid_until:32 seqno:32 op:8 (mode:8 ^msg)*` |
//! | V5 | `op:32 wallet_id:80 valid_until:32 seqno:32 actions:OutListExtended` |
//!
//! When `seqno` is zero the `valid_until` field is written as all ones so the
//! first (deploying) request never expires.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use ton_cell::{Cell, CellBuilder};

use crate::action::OutAction;
use crate::config::{TransferConfig, DEFAULT_TIMEOUT_SECS, MAX_LEGACY_MESSAGES, MAX_V5_ACTIONS};
use crate::error::{WalletError, WalletResult};
use crate::message::{MessageRelaxed, SendMode};
use crate::out_list::store_out_list_extended;
use crate::signing::{SignatureLayout, SigningMessage};
use crate::wallet_id::WalletId;

/// V5 op for requests authorized by an installed extension
pub const OP_AUTH_EXTENSION: u32 = 0x6578746e; // "extn"
/// V5 op for signed requests arriving as external messages
pub const OP_AUTH_SIGNED_EXTERNAL: u32 = 0x7369676e; // "sign"
/// V5 op for signed requests arriving as internal messages
pub const OP_AUTH_SIGNED_INTERNAL: u32 = 0x73696e74; // "sint"

/// V4 simple send op
const V4_OP_SIMPLE_SEND: u8 = 0;

/// Current unix time in seconds.
pub fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default()
}

/// How a V5 request is authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthType {
    /// Signed, delivered as an external message
    #[default]
    External,
    /// Signed, delivered inside an internal message
    Internal,
    /// Sent by an installed extension contract, no signature
    Extension,
}

impl AuthType {
    /// 32-bit op prefixing the request.
    pub fn op(self) -> u32 {
        match self {
            AuthType::External => OP_AUTH_SIGNED_EXTERNAL,
            AuthType::Internal => OP_AUTH_SIGNED_INTERNAL,
            AuthType::Extension => OP_AUTH_EXTENSION,
        }
    }

    pub fn is_signed(self) -> bool {
        self != AuthType::Extension
    }
}

/// Single-message request for V1 wallets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferV1 {
    pub seqno: u32,
    pub message: Option<MessageRelaxed>,
    pub send_mode: Option<SendMode>,
}

impl TransferV1 {
    pub fn new(seqno: u32, message: Option<MessageRelaxed>) -> Self {
        Self {
            seqno,
            message,
            send_mode: None,
        }
    }

    pub fn with_send_mode(mut self, mode: SendMode) -> Self {
        self.send_mode = Some(mode);
        self
    }

    /// Fill the send mode from `config` if unset.
    pub fn with_defaults(mut self, config: &TransferConfig) -> Self {
        self.send_mode.get_or_insert(config.send_mode);
        self
    }
}

/// Multi-message request for V2, V3 and V4 wallets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub seqno: u32,
    pub messages: Vec<MessageRelaxed>,
    /// Mode applied to every message (default: 3)
    pub send_mode: Option<SendMode>,
    /// Valid-until unix time (default: now + 60s)
    pub timeout: Option<u32>,
}

impl Transfer {
    pub fn new(seqno: u32, messages: Vec<MessageRelaxed>) -> Self {
        Self {
            seqno,
            messages,
            send_mode: None,
            timeout: None,
        }
    }

    /// Set send mode
    pub fn with_send_mode(mut self, mode: SendMode) -> Self {
        self.send_mode = Some(mode);
        self
    }

    /// Set valid-until timestamp
    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fill send mode and timeout from `config` where unset.
    pub fn with_defaults(mut self, config: &TransferConfig) -> Self {
        self.send_mode.get_or_insert(config.send_mode);
        if self.timeout.is_none() {
            self.timeout = Some(config.valid_until());
        }
        self
    }

    /// Turn the messages into V5 send actions.
    pub fn into_actions(self) -> Vec<OutAction> {
        let mode = self.send_mode.unwrap_or_default();
        self.messages
            .into_iter()
            .map(|msg| OutAction::send_msg(mode, msg))
            .collect()
    }
}

/// Action request for V5 wallets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub seqno: u32,
    pub actions: Vec<OutAction>,
    /// Valid-until unix time (default: now + 60s)
    pub timeout: Option<u32>,
    pub auth_type: AuthType,
}

impl Request {
    pub fn new(seqno: u32, actions: Vec<OutAction>) -> Self {
        Self {
            seqno,
            actions,
            timeout: None,
            auth_type: AuthType::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    /// Fill the timeout from `config` if unset.
    pub fn with_defaults(mut self, config: &TransferConfig) -> Self {
        if self.timeout.is_none() {
            self.timeout = Some(config.valid_until());
        }
        self
    }
}

fn check_message_count(messages: &[MessageRelaxed]) -> WalletResult<()> {
    if messages.len() > MAX_LEGACY_MESSAGES {
        return Err(WalletError::TooManyMessages {
            max: MAX_LEGACY_MESSAGES,
            got: messages.len(),
        });
    }
    Ok(())
}

fn check_action_count(actions: &[OutAction]) -> WalletResult<()> {
    if actions.len() > MAX_V5_ACTIONS {
        return Err(WalletError::TooManyActions {
            max: MAX_V5_ACTIONS,
            got: actions.len(),
        });
    }
    Ok(())
}

/// `valid_until:32`, or 32 one bits for the first request.
fn store_valid_until(builder: &mut CellBuilder, seqno: u32, timeout: Option<u32>) -> WalletResult<()> {
    if seqno == 0 {
        builder.store_u32(u32::MAX)?;
    } else {
        let valid_until =
            timeout.unwrap_or_else(|| unix_now().saturating_add(DEFAULT_TIMEOUT_SECS));
        builder.store_u32(valid_until)?;
    }
    Ok(())
}

fn store_message(builder: &mut CellBuilder, mode: SendMode, message: &MessageRelaxed) -> WalletResult<()> {
    builder.store_u8(mode.bits())?;
    builder.store_ref(Arc::new(message.to_cell()?))?;
    Ok(())
}

fn store_messages(builder: &mut CellBuilder, transfer: &Transfer) -> WalletResult<()> {
    let mode = transfer.send_mode.unwrap_or_default();
    for message in &transfer.messages {
        store_message(builder, mode, message)?;
    }
    Ok(())
}

/// Build the V1 signing message.
pub fn create_wallet_transfer_v1(args: &TransferV1) -> WalletResult<SigningMessage> {
    let mut builder = CellBuilder::new();
    builder.store_u32(args.seqno)?;
    if let Some(message) = &args.message {
        store_message(&mut builder, args.send_mode.unwrap_or_default(), message)?;
    }

    debug!("Assembled v1 signing message: seqno={}", args.seqno);
    Ok(SigningMessage::new(builder, SignatureLayout::Prefix))
}

/// Build the V2 signing message.
pub fn create_wallet_transfer_v2(args: &Transfer) -> WalletResult<SigningMessage> {
    check_message_count(&args.messages)?;

    let mut builder = CellBuilder::new();
    builder.store_u32(args.seqno)?;
    store_valid_until(&mut builder, args.seqno, args.timeout)?;
    store_messages(&mut builder, args)?;

    debug!(
        "Assembled v2 signing message: seqno={}, {} messages",
        args.seqno,
        args.messages.len()
    );
    Ok(SigningMessage::new(builder, SignatureLayout::Prefix))
}

/// Build the V3 signing message.
pub fn create_wallet_transfer_v3(args: &Transfer, wallet_id: u32) -> WalletResult<SigningMessage> {
    check_message_count(&args.messages)?;

    let mut builder = CellBuilder::new();
    builder.store_u32(wallet_id)?;
    store_valid_until(&mut builder, args.seqno, args.timeout)?;
    builder.store_u32(args.seqno)?;
    store_messages(&mut builder, args)?;

    debug!(
        "Assembled v3 signing message: wallet_id={}, seqno={}, {} messages",
        wallet_id,
        args.seqno,
        args.messages.len()
    );
    Ok(SigningMessage::new(builder, SignatureLayout::Prefix))
}

/// Build the V4 signing message (simple send).
pub fn create_wallet_transfer_v4(args: &Transfer, wallet_id: u32) -> WalletResult<SigningMessage> {
    check_message_count(&args.messages)?;

    let mut builder = CellBuilder::new();
    builder.store_u32(wallet_id)?;
    store_valid_until(&mut builder, args.seqno, args.timeout)?;
    builder.store_u32(args.seqno)?;
    builder.store_u8(V4_OP_SIMPLE_SEND)?;
    store_messages(&mut builder, args)?;

    debug!(
        "Assembled v4 signing message: wallet_id={}, seqno={}, {} messages",
        wallet_id,
        args.seqno,
        args.messages.len()
    );
    Ok(SigningMessage::new(builder, SignatureLayout::Prefix))
}

/// Build the V5 signing message for a signed (external or internal) request.
pub fn create_wallet_transfer_v5_signed(args: &Request, wallet_id: &WalletId) -> WalletResult<SigningMessage> {
    check_action_count(&args.actions)?;
    if !args.auth_type.is_signed() {
        return Err(WalletError::InvalidMessage(
            "extension-authorized requests carry no signature".to_string(),
        ));
    }

    let mut builder = CellBuilder::new();
    builder.store_u32(args.auth_type.op())?;
    wallet_id.store(&mut builder)?;
    store_valid_until(&mut builder, args.seqno, args.timeout)?;
    builder.store_u32(args.seqno)?;
    store_out_list_extended(&mut builder, &args.actions)?;

    debug!(
        "Assembled v5 signing message: auth={:?}, seqno={}, {} actions",
        args.auth_type,
        args.seqno,
        args.actions.len()
    );
    Ok(SigningMessage::new(builder, SignatureLayout::Suffix))
}

/// Build an unsigned V5 request to be sent by an installed extension.
pub fn create_wallet_transfer_v5_extension(actions: &[OutAction]) -> WalletResult<Cell> {
    check_action_count(actions)?;

    let mut builder = CellBuilder::new();
    builder.store_u32(OP_AUTH_EXTENSION)?;
    store_out_list_extended(&mut builder, actions)?;

    debug!("Assembled v5 extension request: {} actions", actions.len());
    builder.build().map_err(Into::into)
}
