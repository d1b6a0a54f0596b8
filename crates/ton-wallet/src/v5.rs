//! Wallet V5 implementation
//!
//! V5 (W5) requests carry an extended action list: outbound messages plus
//! extension management. Requests can be signed (external or internal
//! delivery) or come from an installed extension, in which case no signature
//! is attached.

use std::collections::BTreeMap;
use std::sync::Arc;

use ton_cell::dict::{key_to_bytes, load_hashmap, store_dict};
use ton_cell::{Cell, CellBuilder, MsgAddress};

use crate::action::OutAction;
use crate::config::TransferConfig;
use crate::error::{WalletError, WalletResult};
use crate::message::{MessageRelaxed, StateInit};
use crate::provider::ContractProvider;
use crate::signing::{ExternalSigner, SecretKey, SigningMessage, SigningStrategy};
use crate::transfer::{
    create_wallet_transfer_v5_extension, create_wallet_transfer_v5_signed, AuthType, Request, Transfer,
};
use crate::wallet::{wallet_init, WalletContract};
use crate::wallet_id::WalletId;

/// Wallet V5
#[derive(Debug, Clone)]
pub struct WalletV5 {
    public_key: [u8; 32],
    wallet_id: WalletId,
    init: StateInit,
    address: MsgAddress,
    config: TransferConfig,
}

impl WalletV5 {
    /// Create a wallet identified by `wallet_id`, deployed in its workchain.
    pub fn new(public_key: [u8; 32], wallet_id: WalletId, code: Arc<Cell>) -> WalletResult<Self> {
        // Data: is_signature_allowed:1 seqno:32 wallet_id:80 public_key:256 extensions:(HashmapE 256 int8)
        // The first 33 bits start zeroed; the contract enables signatures on deploy.
        let mut data = CellBuilder::new();
        data.store_uint(0, 33)?;
        wallet_id.store(&mut data)?;
        data.store_bytes(&public_key)?;
        store_dict(&mut data, &BTreeMap::new(), 256)?;

        let (init, address) = wallet_init(code, data.build()?, wallet_id.workchain as i32)?;
        Ok(Self {
            public_key,
            wallet_id,
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

    pub fn wallet_id(&self) -> &WalletId {
        &self.wallet_id
    }

    /// Raw extensions dictionary, `None` if empty or the wallet is not deployed
    pub async fn get_extensions(&self, provider: &dyn ContractProvider) -> WalletResult<Option<Arc<Cell>>> {
        if !self.get_state(provider).await?.is_active() {
            return Ok(None);
        }
        provider
            .run_get_method(&self.address, "get_extensions", &[])
            .await?
            .reader()?
            .read_cell_opt()
    }

    /// Addresses of installed extensions
    pub async fn get_extensions_array(&self, provider: &dyn ContractProvider) -> WalletResult<Vec<MsgAddress>> {
        match self.get_extensions(provider).await? {
            Some(dict) => parse_extensions(&dict),
            None => Ok(Vec::new()),
        }
    }

    /// Whether requests signed with the wallet key are accepted
    pub async fn get_is_secret_key_auth_enabled(&self, provider: &dyn ContractProvider) -> WalletResult<bool> {
        provider
            .run_get_method(&self.address, "is_public_key_enabled", &[])
            .await?
            .reader()?
            .read_bool()
    }

    /// Unsigned body of a signed request
    pub fn signing_message(&self, request: Request) -> WalletResult<SigningMessage> {
        create_wallet_transfer_v5_signed(&request.with_defaults(&self.config), &self.wallet_id)
    }

    /// Create a request signed with a local key.
    ///
    /// Extension-authorized requests are returned unsigned and `key` is not used.
    pub fn create_request(&self, key: &SecretKey, request: Request) -> WalletResult<Cell> {
        if request.auth_type == AuthType::Extension {
            return create_wallet_transfer_v5_extension(&request.actions);
        }
        self.signing_message(request)?.sign(key)
    }

    /// Create a request signed by an external signer
    pub async fn create_and_sign_request_async(
        &self,
        signer: &dyn ExternalSigner,
        request: Request,
    ) -> WalletResult<Cell> {
        self.signing_message(request)?.sign_with(signer).await
    }

    /// Create a request with either signing strategy
    pub async fn create_request_with(&self, strategy: SigningStrategy<'_>, request: Request) -> WalletResult<Cell> {
        if request.auth_type == AuthType::Extension {
            return create_wallet_transfer_v5_extension(&request.actions);
        }
        strategy.sign(&self.signing_message(request)?).await
    }

    fn transfer_request(&self, args: Transfer) -> Request {
        let args = args.with_defaults(&self.config);
        Request {
            seqno: args.seqno,
            timeout: args.timeout,
            actions: args.into_actions(),
            auth_type: AuthType::External,
        }
    }

    fn extension_request(&self, seqno: u32, action: OutAction) -> Request {
        Request::new(seqno, vec![action])
    }

    /// Create a transfer signed with a local key
    pub fn create_transfer(&self, key: &SecretKey, args: Transfer) -> WalletResult<Cell> {
        self.create_request(key, self.transfer_request(args))
    }

    /// Create a transfer signed by an external signer
    pub async fn create_transfer_async(&self, signer: &dyn ExternalSigner, args: Transfer) -> WalletResult<Cell> {
        self.create_and_sign_request_async(signer, self.transfer_request(args))
            .await
    }

    /// Create a signed request installing `extension`
    pub fn create_add_extension(&self, key: &SecretKey, seqno: u32, extension: MsgAddress) -> WalletResult<Cell> {
        self.create_request(key, self.extension_request(seqno, OutAction::AddExtension(extension)))
    }

    /// Create a signed request removing `extension`
    pub fn create_remove_extension(&self, key: &SecretKey, seqno: u32, extension: MsgAddress) -> WalletResult<Cell> {
        self.create_request(key, self.extension_request(seqno, OutAction::RemoveExtension(extension)))
    }

    /// Build, sign and send a request
    pub async fn send_request(
        &self,
        provider: &dyn ContractProvider,
        strategy: SigningStrategy<'_>,
        request: Request,
    ) -> WalletResult<()> {
        let body = self.create_request_with(strategy, request).await?;
        self.send(provider, body).await
    }

    /// Sign and send a transfer
    pub async fn send_transfer(
        &self,
        provider: &dyn ContractProvider,
        strategy: SigningStrategy<'_>,
        args: Transfer,
    ) -> WalletResult<()> {
        self.send_request(provider, strategy, self.transfer_request(args))
            .await
    }

    /// Sign and send an add-extension request
    pub async fn send_add_extension(
        &self,
        provider: &dyn ContractProvider,
        strategy: SigningStrategy<'_>,
        seqno: u32,
        extension: MsgAddress,
    ) -> WalletResult<()> {
        let request = self.extension_request(seqno, OutAction::AddExtension(extension));
        self.send_request(provider, strategy, request).await
    }

    /// Sign and send a remove-extension request
    pub async fn send_remove_extension(
        &self,
        provider: &dyn ContractProvider,
        strategy: SigningStrategy<'_>,
        seqno: u32,
        extension: MsgAddress,
    ) -> WalletResult<()> {
        let request = self.extension_request(seqno, OutAction::RemoveExtension(extension));
        self.send_request(provider, strategy, request).await
    }
}

impl WalletContract for WalletV5 {
    fn version(&self) -> &'static str {
        "v5r1"
    }

    fn address(&self) -> &MsgAddress {
        &self.address
    }

    fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    fn workchain(&self) -> i32 {
        self.wallet_id.workchain as i32
    }

    fn state_init(&self) -> &StateInit {
        &self.init
    }

    fn single_message_request(&self, seqno: u32, message: MessageRelaxed) -> WalletResult<SigningMessage> {
        self.signing_message(self.transfer_request(Transfer::new(seqno, vec![message])))
    }
}

/// Decode the extensions dictionary (`HashmapE 256 int8`, root cell given).
///
/// Keys hold the address hash XOR-ed with `workchain + 1`.
pub fn parse_extensions(dict: &Cell) -> WalletResult<Vec<MsgAddress>> {
    let entries = load_hashmap(dict, 256, |slice| slice.load_i8())?;

    entries
        .into_iter()
        .map(|(key, workchain)| {
            let mut address: [u8; 32] = key_to_bytes(&key)
                .try_into()
                .map_err(|_| WalletError::InvalidMessage("extension key is not 256 bits".to_string()))?;
            xor_workchain_tag(&mut address, workchain);
            Ok(MsgAddress::internal(workchain as i32, address))
        })
        .collect()
}

/// XOR a 256-bit big-endian value with `workchain + 1`, sign-extended.
fn xor_workchain_tag(value: &mut [u8; 32], workchain: i8) {
    let tag = (workchain as i64 + 1).to_be_bytes();
    let fill = if workchain < -1 { 0xff } else { 0x00 };
    for (i, byte) in value.iter_mut().enumerate() {
        *byte ^= if i < 24 { fill } else { tag[i - 24] };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NETWORK_TESTNET;
    use std::collections::BTreeMap;
    use ton_cell::dict::{build_hashmap, key_from_bytes};
    use ton_cell::CellSlice;

    fn key() -> SecretKey {
        SecretKey::from_seed([5; 32])
    }

    fn wallet() -> WalletV5 {
        WalletV5::new(*key().public_key(), WalletId::default(), Arc::new(Cell::empty())).unwrap()
    }

    #[test]
    fn test_initial_data_layout() {
        let wallet = WalletV5::new(
            *key().public_key(),
            WalletId::new(NETWORK_TESTNET, -1).with_subwallet(9),
            Arc::new(Cell::empty()),
        )
        .unwrap();
        let data = wallet.state_init().data.clone().unwrap();
        assert_eq!(data.bit_len(), 33 + 80 + 256 + 1);

        let mut slice = CellSlice::new(&data);
        assert_eq!(slice.load_uint(33).unwrap(), 0);
        assert_eq!(WalletId::load(&mut slice).unwrap(), *wallet.wallet_id());
        assert_eq!(slice.load_bytes(32).unwrap(), key().public_key().to_vec());
        assert!(!slice.load_bit().unwrap());
        assert_eq!(wallet.workchain(), -1);
        assert_eq!(wallet.address().workchain(), Some(-1));
    }

    #[test]
    fn test_signed_request_signature_last() {
        let wallet = wallet();
        let request = Request::new(3, vec![OutAction::SetIsPublicKeyEnabled(false)]).with_timeout(99);

        let unsigned = wallet.signing_message(request.clone()).unwrap().to_cell().unwrap();
        let signed = wallet.create_request(&key(), request).unwrap();

        assert_eq!(signed.bit_len(), unsigned.bit_len() + 512);
        let mut slice = CellSlice::new(&signed);
        slice.skip_bits(unsigned.bit_len()).unwrap();
        let signature: [u8; 64] = slice.load_bytes(64).unwrap().try_into().unwrap();
        assert!(crate::signing::verify_signature(
            key().public_key(),
            &unsigned.hash(),
            &signature
        ));
    }

    #[test]
    fn test_extension_request_is_unsigned() {
        let wallet = wallet();
        let actions = vec![OutAction::RemoveExtension(MsgAddress::internal(0, [9; 32]))];
        let request = Request::new(0, actions.clone()).with_auth_type(AuthType::Extension);

        let cell = wallet.create_request(&key(), request).unwrap();
        assert_eq!(cell, create_wallet_transfer_v5_extension(&actions).unwrap());
    }

    #[test]
    fn test_add_extension_request() {
        let wallet = wallet();
        let extension = MsgAddress::internal(0, [0x42; 32]);
        let signed = wallet.create_add_extension(&key(), 5, extension.clone()).unwrap();

        let mut slice = CellSlice::new(&signed);
        assert_eq!(slice.load_u32().unwrap(), crate::transfer::OP_AUTH_SIGNED_EXTERNAL);
        WalletId::load(&mut slice).unwrap();
        slice.skip_bits(32).unwrap();
        assert_eq!(slice.load_u32().unwrap(), 5);
        let actions = crate::out_list::load_out_list_extended(&mut slice).unwrap();
        assert_eq!(actions, vec![OutAction::AddExtension(extension)]);
    }

    #[test]
    fn test_xor_workchain_tag() {
        let mut value = [0u8; 32];
        xor_workchain_tag(&mut value, 0);
        assert_eq!(value[31], 1);
        assert!(value[..31].iter().all(|b| *b == 0));

        let mut value = [0xaa; 32];
        xor_workchain_tag(&mut value, -1);
        assert_eq!(value, [0xaa; 32]);
    }

    #[test]
    fn test_parse_extensions() {
        let basechain = [0x10; 32];
        let masterchain = [0x20; 32];

        let mut entries = BTreeMap::new();
        for (wc, hash) in [(0i8, basechain), (-1i8, masterchain)] {
            let mut stored = hash;
            xor_workchain_tag(&mut stored, wc);
            let mut value = CellBuilder::new();
            value.store_i8(wc).unwrap();
            entries.insert(key_from_bytes(&stored, 256), value);
        }
        let dict = build_hashmap(&entries, 256).unwrap();

        let mut addresses = parse_extensions(&dict).unwrap();
        addresses.sort_by_key(|a| a.workchain());
        assert_eq!(
            addresses,
            vec![
                MsgAddress::internal(-1, masterchain),
                MsgAddress::internal(0, basechain),
            ]
        );
    }
}
