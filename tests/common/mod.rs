// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use contare::application::{LedgerConfig, LedgerService};
use contare::domain::{Account, Currency, MoneyValue, User, UserId};
use contare::storage::{InMemoryAccountStore, InMemoryLedgerStore, InMemoryUserDirectory};

/// Test harness bundling an in-memory service with the directory handle
/// used to seed owners.
pub struct TestLedger {
    pub service: LedgerService,
    pub directory: Arc<InMemoryUserDirectory>,
}

impl TestLedger {
    /// Seed a user and return its id.
    pub async fn seed_owner(&self) -> UserId {
        self.directory
            .insert(User::new("Ana Torres", "ana@example.com"))
            .await
            .id
    }

    /// Open an account and fund it with an initial deposit.
    pub async fn open_funded(&self, owner_id: UserId, cents: i64) -> Result<Account> {
        let account = self.service.open_account(owner_id, eur()).await?;
        if cents > 0 {
            self.service
                .deposit(account.id, eur_cents(cents), None)
                .await?;
        }
        Ok(self.service.account(account.id).await?)
    }
}

/// Helper to create a test service over in-memory stores
pub fn test_ledger() -> TestLedger {
    let accounts = Arc::new(InMemoryAccountStore::new());
    let entries = Arc::new(InMemoryLedgerStore::new());
    let directory = Arc::new(InMemoryUserDirectory::new());
    let service = LedgerService::new(
        accounts,
        entries,
        directory.clone(),
        LedgerConfig::default(),
    );
    TestLedger { service, directory }
}

pub fn eur() -> Currency {
    Currency::new("EUR").unwrap()
}

pub fn usd() -> Currency {
    Currency::new("USD").unwrap()
}

pub fn eur_cents(cents: i64) -> MoneyValue {
    MoneyValue::from_cents(cents, eur())
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}
