//! Wallet V2 implementation
//!
//! Adds a valid-until field and up to 4 messages per request.

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, MsgAddress};

use crate::config::TransferConfig;
use crate::error::WalletResult;
use crate::message::{MessageRelaxed, StateInit};
use crate::provider::ContractProvider;
use crate::signing::{ExternalSigner, SecretKey, SigningMessage, SigningStrategy};
use crate::transfer::{create_wallet_transfer_v2, Transfer};
use crate::wallet::{wallet_init, WalletContract};

/// V2 contract revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WalletV2Revision {
    R1,
    #[default]
    R2,
}

/// Wallet V2
#[derive(Debug, Clone)]
pub struct WalletV2 {
    public_key: [u8; 32],
    workchain: i32,
    revision: WalletV2Revision,
    init: StateInit,
    address: MsgAddress,
    config: TransferConfig,
}

impl WalletV2 {
    /// Create a wallet for `public_key` running `code` (the code of `revision`).
    pub fn new(
        public_key: [u8; 32],
        workchain: i32,
        revision: WalletV2Revision,
        code: Arc<Cell>,
    ) -> WalletResult<Self> {
        // Data: seqno:32 public_key:256
        let mut data = CellBuilder::new();
        data.store_u32(0)?;
        data.store_bytes(&public_key)?;

        let (init, address) = wallet_init(code, data.build()?, workchain)?;
        Ok(Self {
            public_key,
            workchain,
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

    pub fn revision(&self) -> WalletV2Revision {
        self.revision
    }

    /// Unsigned request body
    pub fn signing_message(&self, args: Transfer) -> WalletResult<SigningMessage> {
        create_wallet_transfer_v2(&args.with_defaults(&self.config))
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

impl WalletContract for WalletV2 {
    fn version(&self) -> &'static str {
        match self.revision {
            WalletV2Revision::R1 => "v2r1",
            WalletV2Revision::R2 => "v2r2",
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
