use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Currency, EntryType, LedgerEntry, MoneyValue, UserId,
    normalize_description,
};
use crate::storage::{AccountStore, LedgerStore, UserDirectory};

use super::locks::AccountLocks;
use super::LedgerError;

/// How many random draws to try before giving up on allocating a unique
/// account number. At 10^10 candidates this only trips on a broken store.
const NUMBER_ATTEMPTS: u32 = 100;

/// Service configuration. Construct with `..Default::default()` to pick up
/// the defaults.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Bound on waiting for a per-account lock before the operation is
    /// rejected with `LedgerError::LockTimeout`.
    pub lock_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
        }
    }
}

/// Result of a single-account money movement
#[derive(Debug)]
pub struct OperationReceipt {
    pub account: Account,
    pub entry: LedgerEntry,
}

/// Result of a transfer: both updated accounts and the two linked legs
#[derive(Debug)]
pub struct TransferReceipt {
    pub source: Account,
    pub destination: Account,
    pub outgoing: LedgerEntry,
    pub incoming: LedgerEntry,
}

/// Application service providing the ledger use cases. This is the primary
/// interface for any client (service layer, CLI, tests) and the sole
/// writer of accounts and ledger entries.
///
/// Every mutating operation serializes on a per-account lock and commits
/// the account update together with its audit entry; display reads go
/// straight to the stores.
pub struct LedgerService {
    accounts: Arc<dyn AccountStore>,
    entries: Arc<dyn LedgerStore>,
    users: Arc<dyn UserDirectory>,
    locks: AccountLocks,
}

impl LedgerService {
    /// Create a new ledger service over the given collaborator stores.
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        entries: Arc<dyn LedgerStore>,
        users: Arc<dyn UserDirectory>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            accounts,
            entries,
            users,
            locks: AccountLocks::new(config.lock_timeout),
        }
    }

    // ========================
    // Account lifecycle
    // ========================

    /// Open a new account for an existing user: zero balance, active, and
    /// a freshly allocated unique 10-digit account number.
    pub async fn open_account(
        &self,
        owner_id: UserId,
        currency: Currency,
    ) -> Result<Account, LedgerError> {
        self.users
            .find_by_id(owner_id)
            .await?
            .ok_or(LedgerError::UserNotFound(owner_id))?;

        let number = self.allocate_account_number().await?;
        let account = Account::new(owner_id, number, currency);
        let account = self.accounts.save(&account).await?;

        debug!(account_id = %account.id, number = %account.number, "account opened");
        Ok(account)
    }

    /// Deactivate an account. Idempotent; the balance is left untouched.
    pub async fn deactivate_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        let _guard = self.locks.acquire(account_id).await?;
        let mut account = self.fetch_account(account_id).await?;
        account.deactivate();
        let account = self.accounts.save(&account).await?;

        debug!(account_id = %account.id, "account deactivated");
        Ok(account)
    }

    /// Reactivate an account. Idempotent.
    pub async fn activate_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        let _guard = self.locks.acquire(account_id).await?;
        let mut account = self.fetch_account(account_id).await?;
        account.activate();
        let account = self.accounts.save(&account).await?;

        debug!(account_id = %account.id, "account activated");
        Ok(account)
    }

    // ========================
    // Money movement
    // ========================

    /// Deposit funds into an account.
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount: MoneyValue,
        description: Option<String>,
    ) -> Result<OperationReceipt, LedgerError> {
        let description = normalize_description(description)?;

        let _guard = self.locks.acquire(account_id).await?;
        let mut account = self.fetch_account(account_id).await?;
        let snapshot = account.clone();

        let balance_before = account.balance();
        account.deposit(amount)?;
        let entry = LedgerEntry::deposit(amount, account_id, description, balance_before)?;

        let (account, entry) = self.commit(&snapshot, &account, &entry).await?;
        debug!(account_id = %account_id, amount = %amount, "deposit recorded");
        Ok(OperationReceipt { account, entry })
    }

    /// Withdraw funds from an account. Insufficient funds abort before
    /// anything is persisted.
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount: MoneyValue,
        description: Option<String>,
    ) -> Result<OperationReceipt, LedgerError> {
        let description = normalize_description(description)?;

        let _guard = self.locks.acquire(account_id).await?;
        let mut account = self.fetch_account(account_id).await?;
        let snapshot = account.clone();

        let balance_before = account.balance();
        account.withdraw(amount)?;
        let entry = LedgerEntry::withdrawal(amount, account_id, description, balance_before)?;

        let (account, entry) = self.commit(&snapshot, &account, &entry).await?;
        debug!(account_id = %account_id, amount = %amount, "withdrawal recorded");
        Ok(OperationReceipt { account, entry })
    }

    /// Move funds between two accounts, all-or-nothing. Both per-account
    /// locks are held for the duration of the two legs; any failure leaves
    /// accounts and ledger exactly as they were.
    pub async fn transfer(
        &self,
        source_id: AccountId,
        dest_id: AccountId,
        amount: MoneyValue,
        description: Option<String>,
    ) -> Result<TransferReceipt, LedgerError> {
        if source_id == dest_id {
            return Err(LedgerError::SelfTransfer(source_id));
        }
        let description = normalize_description(description)?;

        let _guards = self.locks.acquire_pair(source_id, dest_id).await?;
        let mut source = self.fetch_account(source_id).await?;
        let mut dest = self.fetch_account(dest_id).await?;
        let source_snapshot = source.clone();
        let dest_snapshot = dest.clone();

        let source_before = source.balance();
        let dest_before = dest.balance();

        // Debit leg first; a failure here has touched nothing.
        source.withdraw(amount)?;
        // Credit leg; on failure the local source mutation is simply
        // dropped, nothing has been persisted yet.
        dest.deposit(amount)?;

        let outgoing = LedgerEntry::transfer_out(
            amount,
            source_id,
            dest_id,
            description.clone(),
            source_before,
        )?;
        let incoming =
            LedgerEntry::transfer_in(amount, dest_id, source_id, description, dest_before)?;

        let (outgoing, incoming) = self
            .commit_transfer(
                &source_snapshot,
                &dest_snapshot,
                &source,
                &dest,
                &outgoing,
                &incoming,
            )
            .await?;

        debug!(
            source = %source_id,
            destination = %dest_id,
            amount = %amount,
            "transfer recorded"
        );
        Ok(TransferReceipt {
            source,
            destination: dest,
            outgoing,
            incoming,
        })
    }

    // ========================
    // Queries
    // ========================

    /// Current balance, read without the write lock. Display use only:
    /// a transactional decision must go through deposit/withdraw/transfer,
    /// which re-read under the lock.
    pub async fn balance(&self, account_id: AccountId) -> Result<MoneyValue, LedgerError> {
        Ok(self.fetch_account(account_id).await?.balance())
    }

    /// Get an account by id.
    pub async fn account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.fetch_account(account_id).await
    }

    /// Get an account by its externally visible number.
    pub async fn account_by_number(&self, number: &str) -> Result<Account, LedgerError> {
        self.accounts
            .find_by_number(number)
            .await?
            .ok_or_else(|| LedgerError::AccountNumberNotFound(number.to_string()))
    }

    /// All accounts owned by a user, oldest first.
    pub async fn accounts_for_owner(&self, owner_id: UserId) -> Result<Vec<Account>, LedgerError> {
        Ok(self.accounts.find_by_owner(owner_id).await?)
    }

    /// Full history for an account, in append order.
    pub async fn entries(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.fetch_account(account_id).await?;
        Ok(self.entries.find_by_account(account_id).await?)
    }

    /// History filtered by entry type.
    pub async fn entries_by_type(
        &self,
        account_id: AccountId,
        entry_type: EntryType,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.fetch_account(account_id).await?;
        Ok(self
            .entries
            .find_by_account_and_type(account_id, entry_type)
            .await?)
    }

    /// History within [from, to], inclusive on both ends.
    pub async fn entries_between(
        &self,
        account_id: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.fetch_account(account_id).await?;
        Ok(self
            .entries
            .find_by_account_and_range(account_id, from, to)
            .await?)
    }

    // ========================
    // Internals
    // ========================

    async fn fetch_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    /// Draw random 10-digit numbers until one is free. Bounded so a store
    /// that answers "taken" forever cannot spin the service.
    async fn allocate_account_number(&self) -> Result<String, LedgerError> {
        for _ in 0..NUMBER_ATTEMPTS {
            let candidate = random_account_number();
            if !self.accounts.exists_by_number(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(LedgerError::Store(anyhow::anyhow!(
            "could not allocate a unique account number after {} attempts",
            NUMBER_ATTEMPTS
        )))
    }

    /// Persist an account update and its audit entry as one unit. If the
    /// entry append fails, the pre-operation snapshot is written back
    /// (while the account lock is still held) before the error surfaces,
    /// so a balance change is never committed without its entry.
    async fn commit(
        &self,
        snapshot: &Account,
        account: &Account,
        entry: &LedgerEntry,
    ) -> Result<(Account, LedgerEntry), LedgerError> {
        let saved_account = self.accounts.save(account).await?;
        match self.entries.save(entry).await {
            Ok(saved_entry) => Ok((saved_account, saved_entry)),
            Err(err) => {
                self.accounts
                    .save(snapshot)
                    .await
                    .context("Failed to roll back account after ledger append failure")?;
                Err(LedgerError::Store(err))
            }
        }
    }

    /// Transfer variant of `commit`: two account updates and two entry
    /// appends as one unit, compensated in reverse order on failure. The
    /// ledger is append-only, so compensation restores account state but
    /// cannot retract an already-appended leg; entry appends therefore run
    /// last, and only a failing store can split them.
    async fn commit_transfer(
        &self,
        source_snapshot: &Account,
        dest_snapshot: &Account,
        source: &Account,
        dest: &Account,
        outgoing: &LedgerEntry,
        incoming: &LedgerEntry,
    ) -> Result<(LedgerEntry, LedgerEntry), LedgerError> {
        self.accounts.save(source).await?;

        if let Err(err) = self.accounts.save(dest).await {
            self.accounts
                .save(source_snapshot)
                .await
                .context("Failed to roll back source account")?;
            return Err(LedgerError::Store(err));
        }

        let saved_outgoing = match self.entries.save(outgoing).await {
            Ok(saved) => saved,
            Err(err) => {
                self.rollback_accounts(source_snapshot, dest_snapshot).await?;
                return Err(LedgerError::Store(err));
            }
        };

        match self.entries.save(incoming).await {
            Ok(saved_incoming) => Ok((saved_outgoing, saved_incoming)),
            Err(err) => {
                self.rollback_accounts(source_snapshot, dest_snapshot).await?;
                Err(LedgerError::Store(err))
            }
        }
    }

    async fn rollback_accounts(
        &self,
        source_snapshot: &Account,
        dest_snapshot: &Account,
    ) -> Result<(), LedgerError> {
        self.accounts
            .save(dest_snapshot)
            .await
            .context("Failed to roll back destination account")?;
        self.accounts
            .save(source_snapshot)
            .await
            .context("Failed to roll back source account")?;
        Ok(())
    }
}

/// 10 digits derived from a v4 UUID's random bits.
fn random_account_number() -> String {
    let n = Uuid::new_v4().as_u128() % 10_000_000_000;
    format!("{:010}", n)
}
