//! Integration tests for snapshot transactions.

use std::time::Duration;

use custos_core::error::CustosError;
use custos_core::models::account::CreateAccount;
use custos_core::repository::{AccountRepository, Repositories, Transaction, UnitOfWork};
use custos_db::{MemStore, TransactionStats};
use tokio_util::sync::CancellationToken;

async fn create_account(store: &MemStore, name: &str) -> uuid::Uuid {
    store
        .accounts()
        .create(CreateAccount { name: name.into() })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn commit_keeps_changes() {
    let store = MemStore::default();
    let cancel = CancellationToken::new();

    let tx = store.unit_of_work().begin(&cancel).await.unwrap();
    let id = create_account(&store, "Acme").await;
    tx.commit().await.unwrap();

    assert!(store.accounts().get_by_id(id).await.is_ok());
    assert_eq!(
        store.transaction_stats(),
        TransactionStats {
            begun: 1,
            committed: 1,
            rolled_back: 0,
        }
    );
}

#[tokio::test]
async fn rollback_restores_snapshot() {
    let store = MemStore::default();
    let cancel = CancellationToken::new();
    let kept = create_account(&store, "Kept").await;

    let tx = store.unit_of_work().begin(&cancel).await.unwrap();
    let dropped = create_account(&store, "Dropped").await;
    store.accounts().delete(kept).await.unwrap();
    tx.rollback().await.unwrap();

    assert!(store.accounts().get_by_id(kept).await.is_ok());
    assert!(store.accounts().get_by_id(dropped).await.is_err());
    assert_eq!(store.transaction_stats().rolled_back, 1);
}

#[tokio::test]
async fn drop_without_commit_rolls_back() {
    let store = MemStore::default();
    let cancel = CancellationToken::new();

    let id = {
        let _tx = store.unit_of_work().begin(&cancel).await.unwrap();
        create_account(&store, "Acme").await
    };

    assert!(store.accounts().get_by_id(id).await.is_err());
    assert_eq!(store.transaction_stats().rolled_back, 1);
}

#[tokio::test]
async fn cancelled_commit_rolls_back() {
    let store = MemStore::default();
    let cancel = CancellationToken::new();

    let tx = store.unit_of_work().begin(&cancel).await.unwrap();
    let id = create_account(&store, "Acme").await;
    cancel.cancel();

    let err = tx.commit().await.unwrap_err();
    assert_eq!(err, CustosError::Cancelled);
    assert!(store.accounts().get_by_id(id).await.is_err());
    assert_eq!(store.transaction_stats().committed, 0);
    assert_eq!(store.transaction_stats().rolled_back, 1);
}

#[tokio::test]
async fn begin_on_cancelled_token_fails() {
    let store = MemStore::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = store.unit_of_work().begin(&cancel).await;
    assert!(matches!(result, Err(CustosError::Cancelled)));
    assert_eq!(store.transaction_stats().begun, 0);
}

#[tokio::test]
async fn transactions_are_serialized() {
    let store = MemStore::default();
    let cancel = CancellationToken::new();

    let first = store.unit_of_work().begin(&cancel).await.unwrap();

    let second = {
        let store = store.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let tx = store.unit_of_work().begin(&cancel).await.unwrap();
            tx.commit().await.unwrap();
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.transaction_stats().begun, 1);

    first.commit().await.unwrap();
    second.await.unwrap();
    assert_eq!(store.transaction_stats().committed, 2);
}

#[tokio::test]
async fn waiting_begin_observes_cancellation() {
    let store = MemStore::default();
    let holder = CancellationToken::new();
    let _open = store.unit_of_work().begin(&holder).await.unwrap();

    let waiter = CancellationToken::new();
    let pending = {
        let store = store.clone();
        let waiter = waiter.clone();
        tokio::spawn(async move { store.unit_of_work().begin(&waiter).await.map(|_| ()) })
    };

    waiter.cancel();
    let result = pending.await.unwrap();
    assert!(matches!(result, Err(CustosError::Cancelled)));
}
