//! Error types for ton-wallet

use thiserror::Error;

/// Error reported by an external signer, passed through untouched.
pub type SignerError = Box<dyn std::error::Error + Send + Sync>;

/// Wallet error type
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Cell error: {0}")]
    Cell(#[from] ton_cell::CellError),

    #[error("Too many messages: max {max}, got {got}")]
    TooManyMessages { max: usize, got: usize },

    #[error("Too many actions: max {max}, got {got}")]
    TooManyActions { max: usize, got: usize },

    #[error("Extended actions must be placed before all standard out actions")]
    MisorderedExtendedActions,

    #[error("Unknown out action tag 0x{0:08x}")]
    UnknownActionTag(u32),

    #[error("Code replacement is not allowed in wallet v5 action lists")]
    IllegalCodeReplacement,

    #[error("Unknown wallet version tag {0}")]
    UnknownWalletVersion(u8),

    #[error("Wallet id must be 10 bytes, got {0}")]
    InvalidWalletIdLength(usize),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Signer(SignerError),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Get method failed with exit code: {0}")]
    GetMethodFailed(i32),

    #[error("Invalid stack entry: expected {expected}, got {actual}")]
    InvalidStackEntry {
        expected: &'static str,
        actual: String,
    },

    #[error("Stack underflow")]
    StackUnderflow,
}

/// Result type alias
pub type WalletResult<T> = Result<T, WalletError>;
