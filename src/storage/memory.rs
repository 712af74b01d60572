use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{Account, AccountId, EntryType, LedgerEntry, User, UserId};

use super::{AccountStore, LedgerStore, UserDirectory};

/// Map-backed account store. The reference collaborator for tests and
/// single-process embedding.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn save(&self, account: &Account) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).cloned())
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.number == number).cloned())
    }

    async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut owned: Vec<Account> = accounts
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by_key(|a| a.created_at);
        Ok(owned)
    }

    async fn exists_by_number(&self, number: &str) -> Result<bool> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().any(|a| a.number == number))
    }
}

/// Vec-backed append-only ledger store.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    entries: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn save(&self, entry: &LedgerEntry) -> Result<LedgerEntry> {
        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        Ok(entry.clone())
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn find_by_account_and_type(
        &self,
        account_id: AccountId,
        entry_type: EntryType,
    ) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.account_id == account_id && e.entry_type == entry_type)
            .cloned()
            .collect())
    }

    async fn find_by_account_and_range(
        &self,
        account_id: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.account_id == account_id && e.timestamp >= from && e.timestamp <= to)
            .cloned()
            .collect())
    }
}

/// Map-backed user directory. Seed it with `insert` before opening
/// accounts for the users it holds.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) -> User {
        let mut users = self.users.write().await;
        users.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }
}
