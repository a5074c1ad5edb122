#![doc(test(attr(deny(warnings))))]

//! Ledger Core provides the balance-consistency engine for a personal finance
//! tracker: atomic expense/loan/credit-card operations, installment
//! amortization, and recurring expense scheduling.
//!
//! No CLI, no terminal I/O, no network surface. The crate is consumed by a
//! UI/API layer that supplies user ids it already owns.

pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod utils;

pub use config::CoreConfig;
pub use errors::{CoreError, Result};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Ledger Core tracing initialized.");
    });
}
