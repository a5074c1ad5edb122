//! Business logic: the ledger transaction engine, the installment
//! amortization calculator, and the scheduled batch jobs.

pub mod amortization;
pub mod jobs;
pub mod ledger_service;

pub use amortization::{amortize, Amortization};
pub use jobs::{
    run_installment_debt_reduction, run_recurring_expense_creation, JobErrorDetail, JobReport,
};
pub use ledger_service::LedgerService;
