//! Wallet V3 implementation
//!
//! V3 adds a 32-bit wallet id so one key can own several wallets.

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, MsgAddress};

use crate::config::{default_wallet_id, TransferConfig};
use crate::error::WalletResult;
use crate::message::{MessageRelaxed, StateInit};
use crate::provider::ContractProvider;
use crate::signing::{ExternalSigner, SecretKey, SigningMessage, SigningStrategy};
use crate::transfer::{create_wallet_transfer_v3, Transfer};
use crate::wallet::{wallet_init, WalletContract};

/// V3 contract revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WalletV3Revision {
    R1,
    #[default]
    R2,
}

/// Wallet V3
#[derive(Debug, Clone)]
pub struct WalletV3 {
    public_key: [u8; 32],
    workchain: i32,
    wallet_id: u32,
    revision: WalletV3Revision,
    init: StateInit,
    address: MsgAddress,
    config: TransferConfig,
}

impl WalletV3 {
    /// Create a wallet with the default wallet id of `workchain`.
    pub fn new(
        public_key: [u8; 32],
        workchain: i32,
        revision: WalletV3Revision,
        code: Arc<Cell>,
    ) -> WalletResult<Self> {
        Self::with_wallet_id(public_key, workchain, default_wallet_id(workchain), revision, code)
    }

    /// Create a wallet with a custom wallet id
    pub fn with_wallet_id(
        public_key: [u8; 32],
        workchain: i32,
        wallet_id: u32,
        revision: WalletV3Revision,
        code: Arc<Cell>,
    ) -> WalletResult<Self> {
        // Data: seqno:32 wallet_id:32 public_key:256
        let mut data = CellBuilder::new();
        data.store_u32(0)?;
        data.store_u32(wallet_id)?;
        data.store_bytes(&public_key)?;

        let (init, address) = wallet_init(code, data.build()?, workchain)?;
        Ok(Self {
            public_key,
            workchain,
            wallet_id,
            revision,
            init,
            address,
            config: TransferConfig::default(),
        })
    }

    /// Replace request defaults
    pub fn with_config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    pub fn wallet_id(&self) -> u32 {
        self.wallet_id
    }

    pub fn revision(&self) -> WalletV3Revision {
        self.revision
    }

    /// Unsigned request body
    pub fn signing_message(&self, args: Transfer) -> WalletResult<SigningMessage> {
        create_wallet_transfer_v3(&args.with_defaults(&self.config), self.wallet_id)
    }

    /// Create a transfer signed with a local key
    pub fn create_transfer(&self, key: &SecretKey, args: Transfer) -> WalletResult<Cell> {
        self.signing_message(args)?.sign(key)
    }

    /// Create a transfer signed by an external signer
    pub async fn create_transfer_async(
        &self,
        signer: &dyn ExternalSigner,
        args: Transfer,
    ) -> WalletResult<Cell> {
        self.signing_message(args)?.sign_with(signer).await
    }

    /// Sign and send a transfer
    pub async fn send_transfer(
        &self,
        provider: &dyn ContractProvider,
        strategy: SigningStrategy<'_>,
        args: Transfer,
    ) -> WalletResult<()> {
        let message = self.signing_message(args)?;
        self.send_signed(provider, strategy, message).await
    }
}

impl WalletContract for WalletV3 {
    fn version(&self) -> &'static str {
        match self.revision {
            WalletV3Revision::R1 => "v3r1",
            WalletV3Revision::R2 => "v3r2",
        }
    }

    fn address(&self) -> &MsgAddress {
        &self.address
    }

    fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    fn workchain(&self) -> i32 {
        self.workchain
    }

    fn state_init(&self) -> &StateInit {
        &self.init
    }

    fn single_message_request(&self, seqno: u32, message: MessageRelaxed) -> WalletResult<SigningMessage> {
        self.signing_message(Transfer::new(seqno, vec![message]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ton_cell::CellSlice;

    fn key() -> SecretKey {
        SecretKey::from_seed([3; 32])
    }

    #[test]
    fn test_default_wallet_id() {
        let code = Arc::new(Cell::empty());
        let base = WalletV3::new(*key().public_key(), 0, WalletV3Revision::R2, code.clone()).unwrap();
        let master = WalletV3::new(*key().public_key(), -1, WalletV3Revision::R2, code).unwrap();

        assert_eq!(base.wallet_id(), 698983191);
        assert_eq!(master.wallet_id(), 698983190);
        assert_ne!(base.address().hash_part(), master.address().hash_part());
    }

    #[test]
    fn test_initial_data_layout() {
        let wallet =
            WalletV3::with_wallet_id(*key().public_key(), 0, 7, WalletV3Revision::R1, Arc::new(Cell::empty()))
                .unwrap();
        let data = wallet.state_init().data.clone().unwrap();

        let mut slice = CellSlice::new(&data);
        assert_eq!(slice.load_u32().unwrap(), 0);
        assert_eq!(slice.load_u32().unwrap(), 7);
        assert_eq!(slice.load_bytes(32).unwrap(), key().public_key().to_vec());
        assert!(slice.is_empty());
    }

    #[test]
    fn test_subwallets_have_distinct_addresses() {
        let code = Arc::new(Cell::empty());
        let a = WalletV3::with_wallet_id(*key().public_key(), 0, 1, WalletV3Revision::R2, code.clone()).unwrap();
        let b = WalletV3::with_wallet_id(*key().public_key(), 0, 2, WalletV3Revision::R2, code).unwrap();
        assert_ne!(a.address(), b.address());
    }
}
