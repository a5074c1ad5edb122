//! Domain entities for the ledger core.
//!
//! Money entities (accounts, credit cards, loans) hold the balances that are
//! the single source of truth; balance-affecting records (expenses, loan
//! payments) are created and removed only through the ledger service so that
//! every record has an atomic, reversible effect on exactly one balance.

pub mod account;
pub mod credit_card;
pub mod expense;
pub mod loan;
pub mod recurring;

pub use account::Account;
pub use credit_card::CreditCard;
pub use expense::{Expense, NewExpense, PaymentSource};
pub use loan::{Loan, LoanDirection, LoanPayment, NewLoan, NewLoanPayment};
pub use recurring::{Frequency, RecurringExpenseTemplate};
