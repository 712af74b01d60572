use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Currency, MoneyError, MoneyValue, UserId};

pub type AccountId = Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("account {account_id} is not active")]
    Inactive { account_id: AccountId },

    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount { amount: MoneyValue },

    #[error(
        "insufficient funds in account {account_id}: available {available}, requested {requested}"
    )]
    InsufficientFunds {
        account_id: AccountId,
        available: MoneyValue,
        requested: MoneyValue,
    },

    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// A balance-holding account. The balance is private: `deposit` and
/// `withdraw` are the only mutation points, which is what keeps the
/// non-negative invariant in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Externally visible account number, unique across the store.
    pub number: String,
    /// Owner reference; the account does not own the user record.
    pub owner_id: UserId,
    balance: MoneyValue,
    active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account: zero balance, active.
    pub fn new(owner_id: UserId, number: String, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            number,
            owner_id,
            balance: MoneyValue::zero(currency),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate an account loaded from a store. Creation-time invariants
    /// are not re-checked here; the store holds what was committed.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: AccountId,
        number: String,
        owner_id: UserId,
        balance: MoneyValue,
        active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            number,
            owner_id,
            balance,
            active,
            created_at,
            updated_at,
        }
    }

    pub fn balance(&self) -> MoneyValue {
        self.balance
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Add funds. Requires an active account and a positive amount.
    /// Returns the new balance.
    pub fn deposit(&mut self, amount: MoneyValue) -> Result<MoneyValue, AccountError> {
        self.require_active()?;
        Self::require_positive(amount)?;

        self.balance = self.balance.add(&amount)?;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }

    /// Remove funds. Requires an active account, a positive amount, and
    /// sufficient balance. Returns the new balance.
    pub fn withdraw(&mut self, amount: MoneyValue) -> Result<MoneyValue, AccountError> {
        self.require_active()?;
        Self::require_positive(amount)?;
        if !self.has_sufficient_funds(&amount)? {
            return Err(AccountError::InsufficientFunds {
                account_id: self.id,
                available: self.balance,
                requested: amount,
            });
        }

        self.balance = self.balance.subtract(&amount)?;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }

    /// Pure query: balance >= amount, same currency.
    pub fn has_sufficient_funds(&self, amount: &MoneyValue) -> Result<bool, MoneyError> {
        Ok(self.balance.try_cmp(amount)?.is_ge())
    }

    /// Idempotent; touches the update timestamp either way.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Idempotent; touches the update timestamp either way.
    pub fn activate(&mut self) {
        self.active = true;
        self.updated_at = Utc::now();
    }

    fn require_active(&self) -> Result<(), AccountError> {
        if !self.active {
            return Err(AccountError::Inactive { account_id: self.id });
        }
        Ok(())
    }

    fn require_positive(amount: MoneyValue) -> Result<(), AccountError> {
        if !amount.is_positive() {
            return Err(AccountError::NonPositiveAmount { amount });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur() -> Currency {
        Currency::new("EUR").unwrap()
    }

    fn eur_cents(cents: i64) -> MoneyValue {
        MoneyValue::from_cents(cents, eur())
    }

    fn test_account() -> Account {
        Account::new(Uuid::new_v4(), "0000000001".into(), eur())
    }

    #[test]
    fn test_new_account_is_active_with_zero_balance() {
        let account = test_account();
        assert!(account.is_active());
        assert!(account.balance().is_zero());
        assert_eq!(account.balance().currency(), eur());
    }

    #[test]
    fn test_deposit_increases_balance() {
        let mut account = test_account();
        let balance = account.deposit(eur_cents(50000)).unwrap();
        assert_eq!(balance, eur_cents(50000));
        assert_eq!(account.balance(), eur_cents(50000));
    }

    #[test]
    fn test_withdraw_decreases_balance() {
        let mut account = test_account();
        account.deposit(eur_cents(50000)).unwrap();
        let balance = account.withdraw(eur_cents(20000)).unwrap();
        assert_eq!(balance, eur_cents(30000));
    }

    #[test]
    fn test_withdraw_more_than_balance_fails() {
        let mut account = test_account();
        account.deposit(eur_cents(30000)).unwrap();

        let err = account.withdraw(eur_cents(200000)).unwrap_err();
        assert!(matches!(err, AccountError::InsufficientFunds { .. }));
        // Balance untouched
        assert_eq!(account.balance(), eur_cents(30000));
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let mut account = test_account();
        assert!(matches!(
            account.deposit(eur_cents(0)),
            Err(AccountError::NonPositiveAmount { .. })
        ));
        assert!(matches!(
            account.deposit(eur_cents(-100)),
            Err(AccountError::NonPositiveAmount { .. })
        ));
        assert!(matches!(
            account.withdraw(eur_cents(0)),
            Err(AccountError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_inactive_account_rejects_operations() {
        let mut account = test_account();
        account.deposit(eur_cents(10000)).unwrap();
        account.deactivate();

        assert!(matches!(
            account.deposit(eur_cents(100)),
            Err(AccountError::Inactive { .. })
        ));
        assert!(matches!(
            account.withdraw(eur_cents(100)),
            Err(AccountError::Inactive { .. })
        ));
        // Deactivation leaves the balance alone
        assert_eq!(account.balance(), eur_cents(10000));
    }

    #[test]
    fn test_activate_deactivate_are_idempotent() {
        let mut account = test_account();
        account.deactivate();
        account.deactivate();
        assert!(!account.is_active());

        account.activate();
        account.activate();
        assert!(account.is_active());
        account.deposit(eur_cents(100)).unwrap();
    }

    #[test]
    fn test_has_sufficient_funds() {
        let mut account = test_account();
        account.deposit(eur_cents(10000)).unwrap();

        assert!(account.has_sufficient_funds(&eur_cents(10000)).unwrap());
        assert!(account.has_sufficient_funds(&eur_cents(9999)).unwrap());
        assert!(!account.has_sufficient_funds(&eur_cents(10001)).unwrap());

        let usd = MoneyValue::from_cents(100, Currency::new("USD").unwrap());
        assert!(account.has_sufficient_funds(&usd).is_err());
    }

    #[test]
    fn test_deposit_rejects_other_currency() {
        let mut account = test_account();
        let usd = MoneyValue::from_cents(100, Currency::new("USD").unwrap());
        assert!(matches!(
            account.deposit(usd),
            Err(AccountError::Money(MoneyError::CurrencyMismatch { .. }))
        ));
    }

    #[test]
    fn test_from_parts_roundtrip() {
        let original = test_account();
        let loaded = Account::from_parts(
            original.id,
            original.number.clone(),
            original.owner_id,
            original.balance(),
            original.is_active(),
            original.created_at,
            original.updated_at,
        );
        assert_eq!(loaded.id, original.id);
        assert_eq!(loaded.balance(), original.balance());
        assert_eq!(loaded.is_active(), original.is_active());
    }
}
