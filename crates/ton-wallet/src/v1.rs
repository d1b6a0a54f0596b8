//! Wallet V1 implementation
//!
//! The first wallet generation: one message per request and no expiry field.

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, MsgAddress};

use crate::config::TransferConfig;
use crate::error::WalletResult;
use crate::message::{MessageRelaxed, StateInit};
use crate::provider::ContractProvider;
use crate::signing::{ExternalSigner, SecretKey, SigningMessage, SigningStrategy};
use crate::transfer::{create_wallet_transfer_v1, TransferV1};
use crate::wallet::{wallet_init, WalletContract};

/// V1 contract revisions. They share the data layout and request format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WalletV1Revision {
    R1,
    R2,
    #[default]
    R3,
}

/// Wallet V1
#[derive(Debug, Clone)]
pub struct WalletV1 {
    public_key: [u8; 32],
    workchain: i32,
    revision: WalletV1Revision,
    init: StateInit,
    address: MsgAddress,
    config: TransferConfig,
}

impl WalletV1 {
    /// Create a wallet for `public_key` running `code` (the code of `revision`).
    pub fn new(
        public_key: [u8; 32],
        workchain: i32,
        revision: WalletV1Revision,
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

    pub fn revision(&self) -> WalletV1Revision {
        self.revision
    }

    /// Unsigned request body
    pub fn signing_message(&self, args: TransferV1) -> WalletResult<SigningMessage> {
        create_wallet_transfer_v1(&args.with_defaults(&self.config))
    }

    /// Create a transfer signed with a local key
    pub fn create_transfer(&self, key: &SecretKey, args: TransferV1) -> WalletResult<Cell> {
        self.signing_message(args)?.sign(key)
    }

    /// Create a transfer signed by an external signer
    pub async fn create_transfer_async(
        &self,
        signer: &dyn ExternalSigner,
        args: TransferV1,
    ) -> WalletResult<Cell> {
        self.signing_message(args)?.sign_with(signer).await
    }

    /// Sign and send a transfer
    pub async fn send_transfer(
        &self,
        provider: &dyn ContractProvider,
        strategy: SigningStrategy<'_>,
        args: TransferV1,
    ) -> WalletResult<()> {
        let message = self.signing_message(args)?;
        self.send_signed(provider, strategy, message).await
    }
}

impl WalletContract for WalletV1 {
    fn version(&self) -> &'static str {
        match self.revision {
            WalletV1Revision::R1 => "v1r1",
            WalletV1Revision::R2 => "v1r2",
            WalletV1Revision::R3 => "v1r3",
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
        self.signing_message(TransferV1::new(seqno, Some(message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::verify_signature;
    use ton_cell::CellSlice;

    fn code() -> Arc<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x7631).unwrap();
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn test_address_from_state_init() {
        let key = SecretKey::from_seed([1; 32]);
        let wallet = WalletV1::new(*key.public_key(), 0, WalletV1Revision::R3, code()).unwrap();

        let data = wallet.state_init().data.clone().unwrap();
        assert_eq!(data.bit_len(), 32 + 256);
        assert_eq!(&data.data()[4..], key.public_key());

        let expected = MsgAddress::internal(0, wallet.state_init().to_cell().unwrap().hash());
        assert_eq!(wallet.address(), &expected);
        assert_eq!(wallet.version(), "v1r3");
    }

    #[test]
    fn test_transfer_signature_first() {
        let key = SecretKey::from_seed([1; 32]);
        let wallet = WalletV1::new(*key.public_key(), 0, WalletV1Revision::R1, code()).unwrap();
        let message = MessageRelaxed::internal(wallet.address().clone(), 1);
        let args = TransferV1::new(2, Some(message));

        let unsigned = wallet.signing_message(args.clone()).unwrap().to_cell().unwrap();
        let signed = wallet.create_transfer(&key, args).unwrap();

        let mut slice = CellSlice::new(&signed);
        let signature: [u8; 64] = slice.load_bytes(64).unwrap().try_into().unwrap();
        assert!(verify_signature(key.public_key(), &unsigned.hash(), &signature));
        assert_eq!(slice.load_u32().unwrap(), 2);
        assert_eq!(slice.load_u8().unwrap(), 3);
    }
}
