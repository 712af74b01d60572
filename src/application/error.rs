use thiserror::Error;

use crate::domain::{AccountError, AccountId, EntryError, MoneyError, UserId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Account number not found: {0}")]
    AccountNumberNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Cannot transfer from account {0} to itself")]
    SelfTransfer(AccountId),

    #[error("Timed out waiting for the lock on account {0}")]
    LockTimeout(AccountId),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Entry(#[from] EntryError),

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}
