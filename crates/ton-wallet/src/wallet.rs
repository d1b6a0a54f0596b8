//! Wallet trait definition

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use ton_cell::{Cell, CellBuilder, MsgAddress};

use crate::error::{WalletError, WalletResult};
use crate::message::{MessageRelaxed, StateInit};
use crate::provider::{ContractProvider, ContractState};
use crate::signing::{SigningMessage, SigningStrategy};

/// Common wallet interface
#[async_trait]
pub trait WalletContract: Send + Sync {
    /// Get wallet version name
    fn version(&self) -> &'static str;

    /// Get wallet address
    fn address(&self) -> &MsgAddress;

    /// Get public key
    fn public_key(&self) -> &[u8; 32];

    /// Get workchain
    fn workchain(&self) -> i32;

    /// Code and initial data used to deploy the wallet
    fn state_init(&self) -> &StateInit;

    /// Unsigned request carrying a single internal message at `seqno`
    fn single_message_request(&self, seqno: u32, message: MessageRelaxed) -> WalletResult<SigningMessage>;

    /// Wrap a signed body into an inbound external message.
    ///
    /// ```text
    /// ext_in_msg_info$10 src:MsgAddressExt dest:MsgAddressInt import_fee:Grams
    /// ```
    fn create_external_message(&self, signed_body: &Cell, with_init: bool) -> WalletResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_bits(&[true, false])?; // ext_in_msg_info$10
        builder.store_address(&MsgAddress::Null)?;
        builder.store_address(self.address())?;
        builder.store_coins(0)?; // import_fee

        if with_init {
            builder.store_bit(true)?; // has state_init
            builder.store_bit(true)?; // state_init in ref
            builder.store_ref(Arc::new(self.state_init().to_cell()?))?;
        } else {
            builder.store_bit(false)?;
        }

        // Body in ref
        builder.store_bit(true)?;
        builder.store_ref(Arc::new(signed_body.clone()))?;

        builder.build().map_err(Into::into)
    }

    /// Fetch account state
    async fn get_state(&self, provider: &dyn ContractProvider) -> WalletResult<ContractState> {
        provider.get_state(self.address()).await
    }

    /// Balance in nanotons
    async fn get_balance(&self, provider: &dyn ContractProvider) -> WalletResult<u128> {
        Ok(self.get_state(provider).await?.balance)
    }

    /// Current seqno, 0 while the wallet is not deployed
    async fn get_seqno(&self, provider: &dyn ContractProvider) -> WalletResult<u32> {
        if !self.get_state(provider).await?.is_active() {
            return Ok(0);
        }
        let mut stack = provider
            .run_get_method(self.address(), "seqno", &[])
            .await?
            .reader()?;
        let seqno = stack.read_number()?;
        u32::try_from(seqno).map_err(|_| WalletError::InvalidStackEntry {
            expected: "uint32",
            actual: seqno.to_string(),
        })
    }

    /// Submit a signed body, deploying the wallet if it is not active yet
    async fn send(&self, provider: &dyn ContractProvider, signed_body: Cell) -> WalletResult<()> {
        let deploy = !self.get_state(provider).await?.is_active();
        let message = self.create_external_message(&signed_body, deploy)?;
        debug!(
            "Sending external message to {} {} (deploy: {})",
            self.version(),
            self.address(),
            deploy
        );
        provider.send_external_message(&message).await
    }

    /// Sign a prepared request with `strategy` and submit it
    async fn send_signed(
        &self,
        provider: &dyn ContractProvider,
        strategy: SigningStrategy<'_>,
        message: SigningMessage,
    ) -> WalletResult<()> {
        let body = strategy.sign(&message).await?;
        self.send(provider, body).await
    }

    /// Send `value` to `to` with an optional body, using the seqno read from the chain
    async fn send_simple(
        &self,
        provider: &dyn ContractProvider,
        strategy: SigningStrategy<'_>,
        to: MsgAddress,
        value: u128,
        body: Option<Cell>,
    ) -> WalletResult<()> {
        let seqno = self.get_seqno(provider).await?;
        let mut message = MessageRelaxed::internal(to, value);
        if let Some(body) = body {
            message = message.with_body(body);
        }
        let request = self.single_message_request(seqno, message)?;
        self.send_signed(provider, strategy, request).await
    }
}

/// StateInit and address of a wallet with the given code and initial data.
pub(crate) fn wallet_init(code: Arc<Cell>, data: Cell, workchain: i32) -> WalletResult<(StateInit, MsgAddress)> {
    let init = StateInit::new(code, Arc::new(data));
    let address = init.address(workchain)?;
    Ok((init, address))
}
