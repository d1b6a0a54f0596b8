//! Blockchain access used by the wallet facades.
//!
//! The wallet code never talks to the network itself; it goes through a
//! [`ContractProvider`], so any lite client, HTTP API or test double can back it.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use ton_cell::{Cell, MsgAddress};

use crate::error::{WalletError, WalletResult};

/// Account lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    /// Deployed and running
    Active,
    /// Has no code yet (possibly has balance)
    Uninit,
    /// Frozen for unpaid storage
    Frozen,
}

/// On-chain account summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractState {
    /// Balance in nanotons
    pub balance: u128,
    pub status: AccountStatus,
}

impl ContractState {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// TVM stack entry for get method arguments and results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    /// Null value.
    Null,
    /// Integer value (up to 257 bits).
    Int(BigInt),
    /// Cell reference.
    Cell(Arc<Cell>),
    /// Tuple of stack entries.
    Tuple(Vec<StackEntry>),
}

impl StackEntry {
    fn kind(&self) -> &'static str {
        match self {
            StackEntry::Null => "null",
            StackEntry::Int(_) => "int",
            StackEntry::Cell(_) => "cell",
            StackEntry::Tuple(_) => "tuple",
        }
    }

    /// Returns the entry as an integer, if it is one.
    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            StackEntry::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the entry as a cell, if it is one.
    pub fn as_cell(&self) -> Option<&Arc<Cell>> {
        match self {
            StackEntry::Cell(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the entry as a tuple, if it is one.
    pub fn as_tuple(&self) -> Option<&[StackEntry]> {
        match self {
            StackEntry::Tuple(t) => Some(t),
            _ => None,
        }
    }
}

impl From<i64> for StackEntry {
    fn from(value: i64) -> Self {
        StackEntry::Int(BigInt::from(value))
    }
}

impl From<Cell> for StackEntry {
    fn from(cell: Cell) -> Self {
        StackEntry::Cell(Arc::new(cell))
    }
}

/// Outcome of a get method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMethodResult {
    pub exit_code: i32,
    pub stack: Vec<StackEntry>,
}

impl GetMethodResult {
    /// Successful result with the given stack.
    pub fn ok(stack: Vec<StackEntry>) -> Self {
        Self { exit_code: 0, stack }
    }

    /// Reader over the result stack; fails on a non-zero exit code.
    pub fn reader(self) -> WalletResult<StackReader> {
        if self.exit_code != 0 {
            return Err(WalletError::GetMethodFailed(self.exit_code));
        }
        Ok(StackReader::new(self.stack))
    }
}

/// Sequential reader over a get method result stack, top entry first.
#[derive(Debug, Clone, Default)]
pub struct StackReader {
    entries: VecDeque<StackEntry>,
}

impl StackReader {
    pub fn new(stack: Vec<StackEntry>) -> Self {
        Self {
            entries: stack.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    /// Pop the next raw entry.
    pub fn pop(&mut self) -> WalletResult<StackEntry> {
        self.entries.pop_front().ok_or(WalletError::StackUnderflow)
    }

    pub fn read_bigint(&mut self) -> WalletResult<BigInt> {
        match self.pop()? {
            StackEntry::Int(n) => Ok(n),
            other => Err(WalletError::InvalidStackEntry {
                expected: "int",
                actual: other.kind().to_string(),
            }),
        }
    }

    /// Read an integer that fits into `i64`.
    pub fn read_number(&mut self) -> WalletResult<i64> {
        let n = self.read_bigint()?;
        n.to_i64().ok_or_else(|| WalletError::InvalidStackEntry {
            expected: "int64",
            actual: n.to_string(),
        })
    }

    pub fn read_bool(&mut self) -> WalletResult<bool> {
        Ok(self.read_number()? != 0)
    }

    pub fn read_cell(&mut self) -> WalletResult<Arc<Cell>> {
        match self.pop()? {
            StackEntry::Cell(c) => Ok(c),
            other => Err(WalletError::InvalidStackEntry {
                expected: "cell",
                actual: other.kind().to_string(),
            }),
        }
    }

    /// Read a cell, treating null as absent.
    pub fn read_cell_opt(&mut self) -> WalletResult<Option<Arc<Cell>>> {
        match self.pop()? {
            StackEntry::Null => Ok(None),
            StackEntry::Cell(c) => Ok(Some(c)),
            other => Err(WalletError::InvalidStackEntry {
                expected: "cell or null",
                actual: other.kind().to_string(),
            }),
        }
    }
}

/// Read and submit access to accounts on chain.
#[async_trait]
pub trait ContractProvider: Send + Sync {
    /// Fetch balance and status of an account.
    async fn get_state(&self, address: &MsgAddress) -> WalletResult<ContractState>;

    /// Run a get method by name.
    async fn run_get_method(
        &self,
        address: &MsgAddress,
        method: &str,
        args: &[StackEntry],
    ) -> WalletResult<GetMethodResult>;

    /// Broadcast a serialized inbound external message.
    async fn send_external_message(&self, message: &Cell) -> WalletResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_sequence() {
        let cell = Arc::new(Cell::empty());
        let result = GetMethodResult::ok(vec![
            StackEntry::from(42i64),
            StackEntry::Null,
            StackEntry::Cell(cell.clone()),
            StackEntry::from(0i64),
        ]);
        let mut reader = result.reader().unwrap();

        assert_eq!(reader.read_number().unwrap(), 42);
        assert_eq!(reader.read_cell_opt().unwrap(), None);
        assert_eq!(reader.read_cell_opt().unwrap(), Some(cell));
        assert!(!reader.read_bool().unwrap());
        assert_eq!(reader.remaining(), 0);
        assert!(matches!(reader.pop(), Err(WalletError::StackUnderflow)));
    }

    #[test]
    fn test_reader_type_mismatch() {
        let mut reader = StackReader::new(vec![StackEntry::Null]);
        assert!(matches!(
            reader.read_cell(),
            Err(WalletError::InvalidStackEntry { expected: "cell", .. })
        ));
    }

    #[test]
    fn test_reader_number_overflow() {
        let big = BigInt::from(u128::MAX);
        let mut reader = StackReader::new(vec![StackEntry::Int(big)]);
        assert!(matches!(
            reader.read_number(),
            Err(WalletError::InvalidStackEntry { expected: "int64", .. })
        ));
    }

    #[test]
    fn test_failed_exit_code() {
        let result = GetMethodResult {
            exit_code: 11,
            stack: vec![],
        };
        assert!(matches!(result.reader(), Err(WalletError::GetMethodFailed(11))));
    }

    #[test]
    fn test_entry_accessors() {
        let entry = StackEntry::Tuple(vec![StackEntry::from(1i64), StackEntry::Null]);
        assert_eq!(entry.as_tuple().map(|t| t.len()), Some(2));
        assert!(entry.as_int().is_none());
        assert!(entry.as_cell().is_none());
        assert_eq!(StackEntry::from(7i64).as_int(), Some(&BigInt::from(7)));
    }
}
