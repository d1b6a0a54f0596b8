//! Protocol constants and request defaults.

use serde::{Deserialize, Serialize};

use crate::message::SendMode;

/// Network global id of TON mainnet.
pub const NETWORK_MAINNET: i32 = -239;

/// Network global id of TON testnet.
pub const NETWORK_TESTNET: i32 = -3;

/// Legacy wallets (V3, V4) derive their default wallet id as this plus the workchain.
pub const DEFAULT_WALLET_ID_BASE: u32 = 698983191;

/// Seconds a signed request stays valid when the caller gives no timeout.
pub const DEFAULT_TIMEOUT_SECS: u32 = 60;

/// Flat message lists (V2-V4) carry at most this many messages.
pub const MAX_LEGACY_MESSAGES: usize = 4;

/// A V5 request carries at most this many actions.
pub const MAX_V5_ACTIONS: usize = 255;

/// Default wallet id for a legacy wallet on `workchain`.
pub fn default_wallet_id(workchain: i32) -> u32 {
    DEFAULT_WALLET_ID_BASE.wrapping_add(workchain as u32)
}

/// Defaults applied by wallet facades to requests that leave them open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Lifetime of a signed request, added to the current unix time.
    pub timeout_secs: u32,
    /// Send mode for messages turned into actions.
    pub send_mode: SendMode,
}

impl TransferConfig {
    /// Valid-until timestamp for a request built now.
    pub fn valid_until(&self) -> u32 {
        crate::transfer::unix_now().saturating_add(self.timeout_secs)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            send_mode: SendMode::default(),
        }
    }
}
