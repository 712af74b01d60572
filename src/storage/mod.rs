mod memory;
mod sqlite;

pub use memory::*;
pub use sqlite::*;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Account, AccountId, EntryType, LedgerEntry, User, UserId};

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Collaborator store for accounts. Implementations persist and retrieve;
/// they never mutate domain state themselves.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert or update an account, returning the stored copy.
    async fn save(&self, account: &Account) -> Result<Account>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>>;

    async fn find_by_number(&self, number: &str) -> Result<Option<Account>>;

    async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Account>>;

    async fn exists_by_number(&self, number: &str) -> Result<bool>;
}

/// Collaborator store for the audit trail. The contract is append-only:
/// there is no update or delete, which is what makes entries immutable at
/// the system level.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append an entry, returning the stored copy.
    async fn save(&self, entry: &LedgerEntry) -> Result<LedgerEntry>;

    /// All entries touching the account, in append order.
    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>>;

    async fn find_by_account_and_type(
        &self,
        account_id: AccountId,
        entry_type: EntryType,
    ) -> Result<Vec<LedgerEntry>>;

    /// Entries within [from, to], inclusive on both ends.
    async fn find_by_account_and_range(
        &self,
        account_id: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>>;
}

/// Read-only view of the user population, consulted when opening an
/// account. Registration lives outside this crate.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}
