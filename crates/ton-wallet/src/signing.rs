//! Signing pipeline
//!
//! A request builder produces a [`SigningMessage`]: the unsigned body plus the
//! place where the contract expects the signature. It is then signed either
//! locally with a [`SecretKey`] or through an [`ExternalSigner`], which is the
//! only asynchronous step of the whole pipeline.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use tracing::{debug, trace};
use ton_cell::{Cell, CellBuilder};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{SignerError, WalletError, WalletResult};

/// Ed25519 signature length.
pub const SIGNATURE_BYTES: usize = 64;

/// Ed25519 secret key material.
///
/// The seed is wiped when the key is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    seed: [u8; 32],
    #[zeroize(skip)]
    public_key: [u8; 32],
    #[zeroize(skip)]
    signing_key: SigningKey,
}

impl SecretKey {
    /// Generate a random key with the OS RNG.
    pub fn generate() -> Self {
        Self::from_seed(SigningKey::generate(&mut OsRng).to_bytes())
    }

    /// Create a key from its 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = signing_key.verifying_key().to_bytes();
        Self {
            seed,
            public_key,
            signing_key,
        }
    }

    /// Create a key from a 32-byte seed or a 64-byte `seed || public key` pair.
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        if bytes.len() != 32 && bytes.len() != 64 {
            return Err(WalletError::InvalidKey(format!(
                "Expected 32 or 64 bytes, got {}",
                bytes.len()
            )));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let key = Self::from_seed(seed);
        seed.zeroize();

        if bytes.len() == 64 && bytes[32..] != key.public_key {
            return Err(WalletError::InvalidKey(
                "Public key half does not match the seed".to_string(),
            ));
        }
        Ok(key)
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// Sign raw bytes.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_BYTES] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Sign the representation hash of a cell.
    pub fn sign_cell(&self, cell: &Cell) -> [u8; SIGNATURE_BYTES] {
        self.sign(&cell.hash())
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// Check a signature over raw bytes.
pub fn verify_signature(public_key: &[u8; 32], message: &[u8], signature: &[u8; SIGNATURE_BYTES]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(signature)).is_ok()
}

/// Signer holding the key outside this process (hardware wallet, remote service).
///
/// Receives the finalized unsigned body and returns an Ed25519 signature of its
/// representation hash.
#[async_trait]
pub trait ExternalSigner: Send + Sync {
    async fn sign(&self, message: &Cell) -> Result<[u8; SIGNATURE_BYTES], SignerError>;
}

#[async_trait]
impl ExternalSigner for SecretKey {
    async fn sign(&self, message: &Cell) -> Result<[u8; SIGNATURE_BYTES], SignerError> {
        Ok(self.sign_cell(message))
    }
}

/// Where the signature goes relative to the signed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureLayout {
    /// `signature:bits512 body` (wallets V1-V4)
    Prefix,
    /// `body signature:bits512` (wallet V5)
    Suffix,
}

/// Unsigned request body waiting for a signature.
#[derive(Debug, Clone)]
pub struct SigningMessage {
    builder: CellBuilder,
    layout: SignatureLayout,
}

impl SigningMessage {
    pub fn new(builder: CellBuilder, layout: SignatureLayout) -> Self {
        Self { builder, layout }
    }

    pub fn layout(&self) -> SignatureLayout {
        self.layout
    }

    pub fn builder(&self) -> &CellBuilder {
        &self.builder
    }

    /// Finalize the unsigned body. Its hash is what gets signed.
    pub fn to_cell(&self) -> WalletResult<Cell> {
        self.builder.to_cell().map_err(Into::into)
    }

    /// Sign with a local key.
    pub fn sign(&self, key: &SecretKey) -> WalletResult<Cell> {
        let unsigned = self.to_cell()?;
        trace!("Signing request {} locally", hex::encode(&unsigned.hash()[..8]));
        self.pack(&key.sign_cell(&unsigned))
    }

    /// Sign through an external signer; errors it reports are passed through.
    pub async fn sign_with(&self, signer: &dyn ExternalSigner) -> WalletResult<Cell> {
        let unsigned = self.to_cell()?;
        debug!(
            "Requesting signature for {} from external signer",
            hex::encode(&unsigned.hash()[..8])
        );
        let signature = signer.sign(&unsigned).await.map_err(WalletError::Signer)?;
        self.pack(&signature)
    }

    /// Combine the body with its signature in the order the contract expects.
    pub fn pack(&self, signature: &[u8; SIGNATURE_BYTES]) -> WalletResult<Cell> {
        let mut builder = CellBuilder::new();
        match self.layout {
            SignatureLayout::Prefix => {
                builder.store_bytes(signature)?;
                builder.store_builder(&self.builder)?;
            }
            SignatureLayout::Suffix => {
                builder.store_builder(&self.builder)?;
                builder.store_bytes(signature)?;
            }
        }
        builder.build().map_err(Into::into)
    }
}

/// How a facade obtains the signature for a request.
#[derive(Clone, Copy)]
pub enum SigningStrategy<'a> {
    Local(&'a SecretKey),
    Delegated(&'a dyn ExternalSigner),
}

impl SigningStrategy<'_> {
    /// Produce the signed body.
    pub async fn sign(&self, message: &SigningMessage) -> WalletResult<Cell> {
        match self {
            SigningStrategy::Local(key) => message.sign(key),
            SigningStrategy::Delegated(signer) => message.sign_with(*signer).await,
        }
    }
}

impl<'a> From<&'a SecretKey> for SigningStrategy<'a> {
    fn from(key: &'a SecretKey) -> Self {
        SigningStrategy::Local(key)
    }
}

impl std::fmt::Debug for SigningStrategy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningStrategy::Local(key) => f.debug_tuple("Local").field(key).finish(),
            SigningStrategy::Delegated(_) => f.write_str("Delegated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ton_cell::CellSlice;

    fn test_key() -> SecretKey {
        SecretKey::from_seed([7u8; 32])
    }

    fn body() -> CellBuilder {
        let mut builder = CellBuilder::new();
        builder.store_u32(0xdeadbeef).unwrap();
        builder.store_u32(42).unwrap();
        builder
    }

    struct FailingSigner;

    #[async_trait]
    impl ExternalSigner for FailingSigner {
        async fn sign(&self, _message: &Cell) -> Result<[u8; SIGNATURE_BYTES], SignerError> {
            Err("device disconnected".into())
        }
    }

    #[test]
    fn test_key_from_bytes() {
        let key = test_key();
        let same = SecretKey::from_bytes(&[7u8; 32]).unwrap();
        assert_eq!(key.public_key(), same.public_key());

        let mut pair = [7u8; 64];
        pair[32..].copy_from_slice(key.public_key());
        assert!(SecretKey::from_bytes(&pair).is_ok());

        pair[63] ^= 1;
        assert!(matches!(SecretKey::from_bytes(&pair), Err(WalletError::InvalidKey(_))));
        assert!(matches!(SecretKey::from_bytes(&[0u8; 31]), Err(WalletError::InvalidKey(_))));
    }

    #[test]
    fn test_sign_and_verify() {
        let key = SecretKey::generate();
        let signature = key.sign(b"Hello, TON!");
        assert!(verify_signature(key.public_key(), b"Hello, TON!", &signature));
        assert!(!verify_signature(key.public_key(), b"Hello, TOM!", &signature));
    }

    #[test]
    fn test_debug_hides_seed() {
        let printed = format!("{:?}", test_key());
        assert!(printed.contains(&hex::encode(test_key().public_key())));
        assert!(!printed.contains(&hex::encode([7u8; 32])));
    }

    #[test]
    fn test_prefix_layout() {
        let key = test_key();
        let message = SigningMessage::new(body(), SignatureLayout::Prefix);
        let unsigned = message.to_cell().unwrap();
        let signed = message.sign(&key).unwrap();

        assert_eq!(signed.bit_len(), 512 + 64);
        let mut slice = CellSlice::new(&signed);
        let signature: [u8; 64] = slice.load_bytes(64).unwrap().try_into().unwrap();
        assert!(verify_signature(key.public_key(), &unsigned.hash(), &signature));
        assert_eq!(slice.load_u32().unwrap(), 0xdeadbeef);
    }

    #[test]
    fn test_suffix_layout() {
        let key = test_key();
        let message = SigningMessage::new(body(), SignatureLayout::Suffix);
        let unsigned = message.to_cell().unwrap();
        let signed = message.sign(&key).unwrap();

        let mut slice = CellSlice::new(&signed);
        assert_eq!(slice.load_u32().unwrap(), 0xdeadbeef);
        assert_eq!(slice.load_u32().unwrap(), 42);
        let signature: [u8; 64] = slice.load_bytes(64).unwrap().try_into().unwrap();
        assert!(verify_signature(key.public_key(), &unsigned.hash(), &signature));
        assert!(slice.is_empty());
    }

    #[tokio::test]
    async fn test_local_and_delegated_match() {
        let key = test_key();
        for layout in [SignatureLayout::Prefix, SignatureLayout::Suffix] {
            let message = SigningMessage::new(body(), layout);
            let local = SigningStrategy::Local(&key).sign(&message).await.unwrap();
            let delegated = SigningStrategy::Delegated(&key).sign(&message).await.unwrap();
            assert_eq!(local, delegated);
        }
    }

    #[tokio::test]
    async fn test_signer_error_passes_through() {
        let message = SigningMessage::new(body(), SignatureLayout::Suffix);
        let err = message.sign_with(&FailingSigner).await.unwrap_err();
        assert!(matches!(err, WalletError::Signer(_)));
        assert_eq!(err.to_string(), "device disconnected");
    }
}
