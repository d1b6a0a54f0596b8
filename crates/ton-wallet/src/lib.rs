//! TON Wallet request building and signing
//!
//! This crate builds the signed bodies wallet contracts expect:
//! - Wallet V1 (R1-R3): single message, no expiry
//! - Wallet V2 (R1, R2): up to 4 messages with valid-until
//! - Wallet V3 (R1, R2): adds a 32-bit wallet id
//! - Wallet V4 (R1, R2): adds an op byte
//! - Wallet V5 (W5): extended action lists, extensions, 80-bit wallet id
//!
//! Signing is done locally with a [`SecretKey`] or by any [`ExternalSigner`].
//! Chain access goes through a [`ContractProvider`].

pub mod action;
pub mod config;
pub mod error;
pub mod message;
pub mod out_list;
pub mod provider;
pub mod signing;
pub mod transfer;
pub mod v1;
pub mod v2;
pub mod v3;
pub mod v4;
pub mod v5;
pub mod wallet;
pub mod wallet_id;

// Re-exports
pub use action::{OutAction, OutActionSendMsg, StandardAction};
pub use config::TransferConfig;
pub use error::{SignerError, WalletError, WalletResult};
pub use message::{comment, CommonMsgInfoRelaxed, MessageRelaxed, SendMode, StateInit};
pub use out_list::{load_out_list_extended, store_out_list_extended};
pub use provider::{AccountStatus, ContractProvider, ContractState, GetMethodResult, StackEntry, StackReader};
pub use signing::{ExternalSigner, SecretKey, SignatureLayout, SigningMessage, SigningStrategy};
pub use transfer::{AuthType, Request, Transfer, TransferV1};
pub use v1::{WalletV1, WalletV1Revision};
pub use v2::{WalletV2, WalletV2Revision};
pub use v3::{WalletV3, WalletV3Revision};
pub use v4::{WalletV4, WalletV4Revision};
pub use v5::WalletV5;
pub use wallet::WalletContract;
pub use wallet_id::{WalletId, WalletVersion};
