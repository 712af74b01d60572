use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Currency, EntryType, LedgerEntry, MoneyValue, UserId,
};

use super::{AccountStore, LedgerStore, MIGRATION_001_INITIAL};

/// SQLite-backed store implementing both the account and ledger contracts
/// from one connection pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let owner_str: String = row.get("owner_id");
        let currency_str: String = row.get("currency");
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        let currency = Currency::new(&currency_str)
            .with_context(|| format!("Invalid currency: {}", currency_str))?;

        Ok(Account::from_parts(
            Uuid::parse_str(&id_str).context("Invalid account ID")?,
            row.get("number"),
            Uuid::parse_str(&owner_str).context("Invalid owner ID")?,
            MoneyValue::from_cents(row.get("balance_cents"), currency),
            row.get::<i32, _>("active") != 0,
            parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
            parse_timestamp(&updated_at_str).context("Invalid updated_at timestamp")?,
        ))
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<LedgerEntry> {
        let id_str: String = row.get("id");
        let entry_type_str: String = row.get("entry_type");
        let currency_str: String = row.get("currency");
        let account_str: String = row.get("account_id");
        let counterpart_str: Option<String> = row.get("counterpart_id");
        let timestamp_str: String = row.get("timestamp");

        let entry_type = EntryType::from_str(&entry_type_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid entry type: {}", entry_type_str))?;
        let currency = Currency::new(&currency_str)
            .with_context(|| format!("Invalid currency: {}", currency_str))?;

        Ok(LedgerEntry::from_parts(
            Uuid::parse_str(&id_str).context("Invalid entry ID")?,
            entry_type,
            MoneyValue::from_cents(row.get("amount_cents"), currency),
            Uuid::parse_str(&account_str).context("Invalid account ID")?,
            counterpart_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid counterpart ID")?,
            row.get("description"),
            parse_timestamp(&timestamp_str).context("Invalid timestamp")?,
            MoneyValue::from_cents(row.get("balance_before_cents"), currency),
            MoneyValue::from_cents(row.get("balance_after_cents"), currency),
        ))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn save(&self, account: &Account) -> Result<Account> {
        // Number, owner and creation time are immutable after opening;
        // only the mutable columns are touched on conflict.
        sqlx::query(
            r#"
            INSERT INTO accounts (id, number, owner_id, balance_cents, currency, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                balance_cents = excluded.balance_cents,
                active = excluded.active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.number)
        .bind(account.owner_id.to_string())
        .bind(account.balance().cents())
        .bind(account.balance().currency().as_str())
        .bind(account.is_active())
        .bind(account.created_at.to_rfc3339())
        .bind(account.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;

        Ok(account.clone())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, number, owner_id, balance_cents, currency, active, created_at, updated_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, number, owner_id, balance_cents, currency, active, created_at, updated_at
            FROM accounts
            WHERE number = ?
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by number")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_owner(&self, owner_id: UserId) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, number, owner_id, balance_cents, currency, active, created_at, updated_at
            FROM accounts
            WHERE owner_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts by owner")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    async fn exists_by_number(&self, number: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM accounts WHERE number = ?")
            .bind(number)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check account number")?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn save(&self, entry: &LedgerEntry) -> Result<LedgerEntry> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, entry_type, amount_cents, currency, account_id, counterpart_id, description, timestamp, balance_before_cents, balance_after_cents)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.entry_type.as_str())
        .bind(entry.amount.cents())
        .bind(entry.amount.currency().as_str())
        .bind(entry.account_id.to_string())
        .bind(entry.counterpart_id.map(|id| id.to_string()))
        .bind(&entry.description)
        .bind(entry.timestamp.to_rfc3339())
        .bind(entry.balance_before.cents())
        .bind(entry.balance_after.cents())
        .execute(&self.pool)
        .await
        .context("Failed to save ledger entry")?;

        Ok(entry.clone())
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_type, amount_cents, currency, account_id, counterpart_id, description, timestamp, balance_before_cents, balance_after_cents
            FROM ledger_entries
            WHERE account_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list ledger entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn find_by_account_and_type(
        &self,
        account_id: AccountId,
        entry_type: EntryType,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_type, amount_cents, currency, account_id, counterpart_id, description, timestamp, balance_before_cents, balance_after_cents
            FROM ledger_entries
            WHERE account_id = ? AND entry_type = ?
            ORDER BY rowid
            "#,
        )
        .bind(account_id.to_string())
        .bind(entry_type.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list ledger entries by type")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn find_by_account_and_range(
        &self,
        account_id: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_type, amount_cents, currency, account_id, counterpart_id, description, timestamp, balance_before_cents, balance_after_cents
            FROM ledger_entries
            WHERE account_id = ? AND timestamp >= ? AND timestamp <= ?
            ORDER BY rowid
            "#,
        )
        .bind(account_id.to_string())
        .bind(from.to_rfc3339())
        .bind(to.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list ledger entries by date range")?;

        rows.iter().map(Self::row_to_entry).collect()
    }
}
