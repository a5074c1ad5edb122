#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use ledger_core::config::CoreConfig;
use ledger_core::core::LedgerService;
use ledger_core::domain::{Account, CreditCard};
use ledger_core::storage::{decode, encode, Collection, DocumentStore, MemoryStore};

/// Creates a ledger service over a fresh in-memory store for each test.
pub fn setup() -> (Arc<MemoryStore>, LedgerService) {
    let store = Arc::new(MemoryStore::new());
    let service = LedgerService::new(store.clone(), CoreConfig::default());
    (store, service)
}

pub fn seed_account(store: &MemoryStore, user_id: Uuid, balance: f64) -> Uuid {
    let account = Account::new(user_id, "Checking", balance, "USD", Utc::now());
    store
        .set(Collection::Accounts, account.id, encode(&account).unwrap())
        .unwrap();
    account.id
}

pub fn seed_card(store: &MemoryStore, user_id: Uuid, current_balance: f64) -> Uuid {
    let card = CreditCard::new(user_id, "Visa", current_balance, Utc::now());
    store
        .set(Collection::CreditCards, card.id, encode(&card).unwrap())
        .unwrap();
    card.id
}

pub fn account_balance(store: &MemoryStore, id: Uuid) -> f64 {
    let doc = store.get(Collection::Accounts, id).unwrap().unwrap();
    decode::<Account>(doc).unwrap().balance
}

pub fn card_balance(store: &MemoryStore, id: Uuid) -> f64 {
    let doc = store.get(Collection::CreditCards, id).unwrap().unwrap();
    decode::<CreditCard>(doc).unwrap().current_balance
}
