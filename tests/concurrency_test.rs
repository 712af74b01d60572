mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{eur_cents, test_ledger};
use contare::application::LedgerError;
use contare::domain::{AccountError, EntryType};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_converge_to_exact_total() -> Result<()> {
    let ledger = test_ledger();
    let owner = ledger.seed_owner().await;
    let account = ledger.open_funded(owner, 0).await?;
    let service = Arc::new(ledger.service);

    let mut handles = Vec::new();
    for _ in 0..50 {
        let service = service.clone();
        let account_id = account.id;
        handles.push(tokio::spawn(async move {
            service.deposit(account_id, eur_cents(100), None).await
        }));
    }
    for handle in handles {
        handle.await?.expect("deposit failed");
    }

    // 50 deposits of 1.00 against a zero balance: exactly 50.00
    assert_eq!(service.balance(account.id).await?, eur_cents(5000));
    let entries = service.entries(account.id).await?;
    assert_eq!(entries.len(), 50);
    assert!(entries.iter().all(|e| e.entry_type == EntryType::Deposit));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_oversubscribed_withdrawals_never_overdraw() -> Result<()> {
    let ledger = test_ledger();
    let owner = ledger.seed_owner().await;
    let account = ledger.open_funded(owner, 1000).await?;
    let service = Arc::new(ledger.service);

    // Twenty 1.00 withdrawals against a 10.00 balance
    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = service.clone();
        let account_id = account.id;
        handles.push(tokio::spawn(async move {
            service.withdraw(account_id, eur_cents(100), None).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => succeeded += 1,
            Err(LedgerError::Account(AccountError::InsufficientFunds { .. })) => {}
            Err(other) => panic!("unexpected failure: {other:?}"),
        }
    }

    assert_eq!(succeeded, 10);
    assert!(service.balance(account.id).await?.is_zero());

    // One funding deposit plus exactly one entry per successful withdrawal
    let withdrawals = service
        .entries_by_type(account.id, EntryType::Withdrawal)
        .await?;
    assert_eq!(withdrawals.len(), 10);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_direction_transfers_complete_and_conserve_total() -> Result<()> {
    let ledger = test_ledger();
    let owner = ledger.seed_owner().await;
    let a = ledger.open_funded(owner, 10000).await?;
    let b = ledger.open_funded(owner, 10000).await?;
    let service = Arc::new(ledger.service);

    let mut handles = Vec::new();
    for i in 0..40 {
        let service = service.clone();
        let (from, to) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
        handles.push(tokio::spawn(async move {
            service.transfer(from, to, eur_cents(100), None).await
        }));
    }
    for handle in handles {
        handle.await?.expect("transfer failed");
    }

    let balance_a = service.balance(a.id).await?;
    let balance_b = service.balance(b.id).await?;
    assert_eq!(balance_a.add(&balance_b)?, eur_cents(20000));
    // Symmetric traffic: both accounts end where they started
    assert_eq!(balance_a, eur_cents(10000));
    assert_eq!(balance_b, eur_cents(10000));

    let entries_a = service.entries(a.id).await?;
    // Funding deposit + 20 outgoing legs + 20 incoming legs
    assert_eq!(entries_a.len(), 41);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_from_shared_source_respect_funds() -> Result<()> {
    let ledger = test_ledger();
    let owner = ledger.seed_owner().await;
    let source = ledger.open_funded(owner, 500).await?;
    let dest = ledger.open_funded(owner, 0).await?;
    let service = Arc::new(ledger.service);

    // Ten 1.00 transfers against a 5.00 source
    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = service.clone();
        let (from, to) = (source.id, dest.id);
        handles.push(tokio::spawn(async move {
            service.transfer(from, to, eur_cents(100), None).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => succeeded += 1,
            Err(LedgerError::Account(AccountError::InsufficientFunds { .. })) => {}
            Err(other) => panic!("unexpected failure: {other:?}"),
        }
    }

    assert_eq!(succeeded, 5);
    assert!(service.balance(source.id).await?.is_zero());
    assert_eq!(service.balance(dest.id).await?, eur_cents(500));

    Ok(())
}
