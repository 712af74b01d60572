use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{AccountId, MoneyError, MoneyValue};

pub type EntryId = Uuid;

/// Maximum description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 200;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry amount must be positive, got {amount}")]
    NonPositiveAmount { amount: MoneyValue },

    #[error("description exceeds {MAX_DESCRIPTION_LEN} characters (got {len})")]
    DescriptionTooLong { len: usize },

    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Whether an entry type increases or decreases the account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDirection {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Funds entering the account from outside
    Deposit,
    /// Funds leaving the account to outside
    Withdrawal,
    /// The debit leg of a transfer
    TransferOut,
    /// The credit leg of a transfer
    TransferIn,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Deposit => "deposit",
            EntryType::Withdrawal => "withdrawal",
            EntryType::TransferOut => "transfer_out",
            EntryType::TransferIn => "transfer_in",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(EntryType::Deposit),
            "withdrawal" => Some(EntryType::Withdrawal),
            "transfer_out" => Some(EntryType::TransferOut),
            "transfer_in" => Some(EntryType::TransferIn),
            _ => None,
        }
    }

    /// Sign table: which way this entry moves the balance.
    pub fn direction(&self) -> EntryDirection {
        match self {
            EntryType::Deposit | EntryType::TransferIn => EntryDirection::Credit,
            EntryType::Withdrawal | EntryType::TransferOut => EntryDirection::Debit,
        }
    }

    pub fn is_credit(&self) -> bool {
        self.direction() == EntryDirection::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.direction() == EntryDirection::Debit
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit record of one balance-affecting event. Entries are
/// append-only: the ledger store exposes no update or delete, and
/// corrections are made by recording compensating entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub entry_type: EntryType,
    /// Amount moved (always positive); the sign comes from the entry type.
    pub amount: MoneyValue,
    /// The account this entry belongs to
    pub account_id: AccountId,
    /// The other account of a transfer; absent for deposits and withdrawals
    pub counterpart_id: Option<AccountId>,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Balance immediately before the event
    pub balance_before: MoneyValue,
    /// Balance immediately after: balance_before plus or minus amount,
    /// per the entry type's direction
    pub balance_after: MoneyValue,
}

impl LedgerEntry {
    /// Record a new entry. The closing balance is computed here from the
    /// opening balance and the type's direction, so the two can never
    /// disagree.
    pub fn record(
        entry_type: EntryType,
        amount: MoneyValue,
        account_id: AccountId,
        counterpart_id: Option<AccountId>,
        description: Option<String>,
        balance_before: MoneyValue,
    ) -> Result<Self, EntryError> {
        if !amount.is_positive() {
            return Err(EntryError::NonPositiveAmount { amount });
        }
        let description = normalize_description(description)?;
        let balance_after = match entry_type.direction() {
            EntryDirection::Credit => balance_before.add(&amount)?,
            EntryDirection::Debit => balance_before.subtract(&amount)?,
        };

        Ok(Self {
            id: Uuid::new_v4(),
            entry_type,
            amount,
            account_id,
            counterpart_id,
            description,
            timestamp: Utc::now(),
            balance_before,
            balance_after,
        })
    }

    pub fn deposit(
        amount: MoneyValue,
        account_id: AccountId,
        description: Option<String>,
        balance_before: MoneyValue,
    ) -> Result<Self, EntryError> {
        Self::record(
            EntryType::Deposit,
            amount,
            account_id,
            None,
            description,
            balance_before,
        )
    }

    pub fn withdrawal(
        amount: MoneyValue,
        account_id: AccountId,
        description: Option<String>,
        balance_before: MoneyValue,
    ) -> Result<Self, EntryError> {
        Self::record(
            EntryType::Withdrawal,
            amount,
            account_id,
            None,
            description,
            balance_before,
        )
    }

    /// The debit leg of a transfer, recorded on the source account.
    pub fn transfer_out(
        amount: MoneyValue,
        account_id: AccountId,
        counterpart_id: AccountId,
        description: Option<String>,
        balance_before: MoneyValue,
    ) -> Result<Self, EntryError> {
        Self::record(
            EntryType::TransferOut,
            amount,
            account_id,
            Some(counterpart_id),
            description,
            balance_before,
        )
    }

    /// The credit leg of a transfer, recorded on the destination account.
    pub fn transfer_in(
        amount: MoneyValue,
        account_id: AccountId,
        counterpart_id: AccountId,
        description: Option<String>,
        balance_before: MoneyValue,
    ) -> Result<Self, EntryError> {
        Self::record(
            EntryType::TransferIn,
            amount,
            account_id,
            Some(counterpart_id),
            description,
            balance_before,
        )
    }

    /// Rehydrate an entry loaded from a store; invariants were enforced
    /// when the entry was recorded.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: EntryId,
        entry_type: EntryType,
        amount: MoneyValue,
        account_id: AccountId,
        counterpart_id: Option<AccountId>,
        description: Option<String>,
        timestamp: DateTime<Utc>,
        balance_before: MoneyValue,
        balance_after: MoneyValue,
    ) -> Self {
        Self {
            id,
            entry_type,
            amount,
            account_id,
            counterpart_id,
            description,
            timestamp,
            balance_before,
            balance_after,
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(
            self.entry_type,
            EntryType::TransferOut | EntryType::TransferIn
        )
    }
}

/// Trim a description, dropping it entirely when blank. Fails when longer
/// than MAX_DESCRIPTION_LEN characters.
pub fn normalize_description(
    description: Option<String>,
) -> Result<Option<String>, EntryError> {
    match description {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let len = trimmed.chars().count();
            if len > MAX_DESCRIPTION_LEN {
                return Err(EntryError::DescriptionTooLong { len });
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}
