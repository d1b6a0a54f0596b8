//! Wallet V4 implementation
//!
//! Same request layout as V3 plus an op byte; op 0 is a plain transfer.
//! Plugin management ops are not built here.

use std::collections::BTreeMap;
use std::sync::Arc;

use ton_cell::dict::store_dict;
use ton_cell::{Cell, CellBuilder, MsgAddress};

use crate::config::{default_wallet_id, TransferConfig};
use crate::error::WalletResult;
use crate::message::{MessageRelaxed, StateInit};
use crate::provider::ContractProvider;
use crate::signing::{ExternalSigner, SecretKey, SigningMessage, SigningStrategy};
use crate::transfer::{create_wallet_transfer_v4, Transfer};
use crate::wallet::{wallet_init, WalletContract};

/// V4 contract revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WalletV4Revision {
    R1,
    #[default]
    R2,
}

/// Wallet V4
#[derive(Debug, Clone)]
pub struct WalletV4 {
    public_key: [u8; 32],
    workchain: i32,
    wallet_id: u32,
    revision: WalletV4Revision,
    init: StateInit,
    address: MsgAddress,
    config: TransferConfig,
}

impl WalletV4 {
    /// Create a wallet with the default wallet id of `workchain`.
    pub fn new(
        public_key: [u8; 32],
        workchain: i32,
        revision: WalletV4Revision,
        code: Arc<Cell>,
    ) -> WalletResult<Self> {
        Self::with_wallet_id(public_key, workchain, default_wallet_id(workchain), revision, code)
    }

    /// Create a wallet with a custom wallet id
    pub fn with_wallet_id(
        public_key: [u8; 32],
        workchain: i32,
        wallet_id: u32,
        revision: WalletV4Revision,
        code: Arc<Cell>,
    ) -> WalletResult<Self> {
        // Data: seqno:32 wallet_id:32 public_key:256 plugins:(HashmapE 264 bit)
        let mut data = CellBuilder::new();
        data.store_u32(0)?;
        data.store_u32(wallet_id)?;
        data.store_bytes(&public_key)?;
        store_dict(&mut data, &BTreeMap::new(), 264)?;

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

    pub fn revision(&self) -> WalletV4Revision {
        self.revision
    }

    /// Unsigned request body
    pub fn signing_message(&self, args: Transfer) -> WalletResult<SigningMessage> {
        create_wallet_transfer_v4(&args.with_defaults(&self.config), self.wallet_id)
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

impl WalletContract for WalletV4 {
    fn version(&self) -> &'static str {
        match self.revision {
            WalletV4Revision::R1 => "v4r1",
            WalletV4Revision::R2 => "v4r2",
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
