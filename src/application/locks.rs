use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

use crate::domain::AccountId;

use super::LedgerError;

/// Exclusive guard over one account's read-modify-write cycle. Held from
/// before the account is fetched until its ledger entry is recorded.
pub(crate) type AccountGuard = OwnedMutexGuard<()>;

/// Registry of per-account locks. Handles are created on first use and
/// never reclaimed: the core never deletes accounts, so the registry grows
/// with the account population, not with traffic.
pub(crate) struct AccountLocks {
    acquire_timeout: Duration,
    handles: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new(acquire_timeout: Duration) -> Self {
        Self {
            acquire_timeout,
            handles: Mutex::new(HashMap::new()),
        }
    }

    async fn handle(&self, id: AccountId) -> Arc<Mutex<()>> {
        let mut handles = self.handles.lock().await;
        handles.entry(id).or_default().clone()
    }

    /// Acquire the exclusive lock for one account, bounded by the
    /// configured timeout.
    pub async fn acquire(&self, id: AccountId) -> Result<AccountGuard, LedgerError> {
        let handle = self.handle(id).await;
        timeout(self.acquire_timeout, handle.lock_owned())
            .await
            .map_err(|_| LedgerError::LockTimeout(id))
    }

    /// Acquire both locks, always in ascending account-id order regardless
    /// of argument order. Concurrent opposite-direction transfers therefore
    /// contend on the same first lock instead of deadlocking.
    pub async fn acquire_pair(
        &self,
        a: AccountId,
        b: AccountId,
    ) -> Result<(AccountGuard, AccountGuard), LedgerError> {
        debug_assert_ne!(a, b, "pair acquisition requires distinct accounts");
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first_guard = self.acquire(first).await?;
        let second_guard = self.acquire(second).await?;
        Ok((first_guard, second_guard))
    }
}
