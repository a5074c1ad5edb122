//! The ledger transaction engine.
//!
//! Every operation that creates or removes a balance-affecting record also
//! mutates its money entity inside one atomic store transaction: either all
//! reads and writes commit, or none do. No code path outside this service may
//! write a bare balance field.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::domain::{
    Account, CreditCard, Expense, Loan, LoanDirection, LoanPayment, NewExpense, NewLoan,
    NewLoanPayment, PaymentSource,
};
use crate::errors::{CoreError, Result};
use crate::storage::{decode, encode, Collection, DocumentStore, StoreTransaction};
use crate::utils::round_cents;

pub struct LedgerService {
    store: Arc<dyn DocumentStore>,
    config: CoreConfig,
}

impl LedgerService {
    pub fn new(store: Arc<dyn DocumentStore>, config: CoreConfig) -> Self {
        Self { store, config }
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Creates an expense and applies its balance effect atomically.
    ///
    /// Debit expenses draw the account down, rejected with
    /// `InsufficientFunds` below the configured overdraft floor. Credit
    /// expenses grow the card's outstanding debt and are born carrying their
    /// full amount as remaining debt.
    pub fn create_expense(&self, user_id: Uuid, data: NewExpense) -> Result<Uuid> {
        validate_amount(data.amount)?;
        if data.name.trim().is_empty() {
            return Err(CoreError::Validation("expense name is required".into()));
        }
        if data.is_installment && !data.installment_months.is_some_and(|m| m > 0) {
            return Err(CoreError::Validation(
                "installment expenses require installment_months >= 1".into(),
            ));
        }
        if data.is_installment && !data.source.is_credit() {
            return Err(CoreError::Validation(
                "installments are only supported on credit expenses".into(),
            ));
        }

        let now = self.store.now();
        let expense = Expense::from_new(user_id, &data, now);
        let expense_doc = encode(&expense)?;

        match data.source {
            PaymentSource::Debit { account_id } => {
                let floor = self.config.overdraft_floor;
                self.store.run_transaction(&mut |tx| {
                    let mut account: Account = read_entity(tx, Collection::Accounts, account_id)?
                        .ok_or(CoreError::AccountNotFound(account_id))?;
                    let new_balance = round_cents(account.balance - data.amount);
                    if new_balance < floor {
                        return Err(CoreError::InsufficientFunds);
                    }
                    account.balance = new_balance;
                    account.updated_at = now;
                    tx.set(Collection::Expenses, expense.id, expense_doc.clone());
                    tx.set(Collection::Accounts, account_id, encode(&account)?);
                    Ok(())
                })?;
            }
            PaymentSource::Credit { credit_card_id } => {
                self.store.run_transaction(&mut |tx| {
                    let mut card: CreditCard =
                        read_entity(tx, Collection::CreditCards, credit_card_id)?
                            .ok_or(CoreError::CreditCardNotFound(credit_card_id))?;
                    card.current_balance = round_cents(card.current_balance + data.amount);
                    card.updated_at = now;
                    tx.set(Collection::Expenses, expense.id, expense_doc.clone());
                    tx.set(Collection::CreditCards, credit_card_id, encode(&card)?);
                    Ok(())
                })?;
            }
        }

        info!(expense_id = %expense.id, source = %data.source, amount = data.amount, "expense created");
        Ok(expense.id)
    }

    /// Deletes an expense, reversing its original balance effect regardless
    /// of amortization progress.
    pub fn delete_expense(&self, expense_id: Uuid) -> Result<()> {
        let now = self.store.now();
        self.store.run_transaction(&mut |tx| {
            let expense: Expense = read_entity(tx, Collection::Expenses, expense_id)?
                .ok_or(CoreError::ExpenseNotFound(expense_id))?;

            match expense.source {
                PaymentSource::Debit { account_id } => {
                    let mut account: Account = read_entity(tx, Collection::Accounts, account_id)?
                        .ok_or(CoreError::AccountNotFound(account_id))?;
                    account.balance = round_cents(account.balance + expense.amount);
                    account.updated_at = now;
                    tx.set(Collection::Accounts, account_id, encode(&account)?);
                }
                PaymentSource::Credit { credit_card_id } => {
                    let mut card: CreditCard =
                        read_entity(tx, Collection::CreditCards, credit_card_id)?
                            .ok_or(CoreError::CreditCardNotFound(credit_card_id))?;
                    card.current_balance =
                        round_cents((card.current_balance - expense.amount).max(0.0));
                    card.updated_at = now;
                    tx.set(Collection::CreditCards, credit_card_id, encode(&card)?);
                }
            }

            tx.delete(Collection::Expenses, expense_id);
            Ok(())
        })?;

        info!(expense_id = %expense_id, "expense deleted");
        Ok(())
    }

    /// Pays down a credit card from an account.
    ///
    /// The card balance is clamped at zero on overpayment; the account is
    /// debited the full amount and must cover it.
    pub fn pay_credit_card(&self, card_id: Uuid, account_id: Uuid, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoreError::InvalidAmount(
                "payment amount must be greater than 0".into(),
            ));
        }

        let now = self.store.now();
        self.store.run_transaction(&mut |tx| {
            let mut card: CreditCard = read_entity(tx, Collection::CreditCards, card_id)?
                .ok_or(CoreError::CreditCardNotFound(card_id))?;
            let mut account: Account = read_entity(tx, Collection::Accounts, account_id)?
                .ok_or(CoreError::AccountNotFound(account_id))?;

            if account.balance < amount {
                return Err(CoreError::InsufficientFunds);
            }

            card.current_balance = round_cents((card.current_balance - amount).max(0.0));
            card.updated_at = now;
            account.balance = round_cents(account.balance - amount);
            account.updated_at = now;

            tx.set(Collection::CreditCards, card_id, encode(&card)?);
            tx.set(Collection::Accounts, account_id, encode(&account)?);
            Ok(())
        })?;

        info!(card_id = %card_id, account_id = %account_id, amount, "credit card paid");
        Ok(())
    }

    /// Creates a loan, moving money on the linked account immediately:
    /// lending debits the account, borrowing credits it.
    pub fn create_loan(&self, user_id: Uuid, data: NewLoan) -> Result<Uuid> {
        validate_amount(data.amount)?;
        if data.person_name.trim().is_empty() {
            return Err(CoreError::Validation("person name is required".into()));
        }

        let now = self.store.now();
        let loan = Loan::from_new(user_id, &data, now);
        let loan_doc = encode(&loan)?;
        let account_id = data.account_id;

        self.store.run_transaction(&mut |tx| {
            let mut account: Account = read_entity(tx, Collection::Accounts, account_id)?
                .ok_or(CoreError::AccountNotFound(account_id))?;
            account.balance = match data.direction {
                LoanDirection::Lent => round_cents(account.balance - data.amount),
                LoanDirection::Borrowed => round_cents(account.balance + data.amount),
            };
            account.updated_at = now;
            tx.set(Collection::Loans, loan.id, loan_doc.clone());
            tx.set(Collection::Accounts, account_id, encode(&account)?);
            Ok(())
        })?;

        info!(loan_id = %loan.id, direction = %data.direction, amount = data.amount, "loan created");
        Ok(loan.id)
    }

    /// Records a partial or full loan settlement.
    ///
    /// `known_remaining` is the caller's last-seen remaining amount and is
    /// validated before the transaction; the just-read value inside the
    /// transaction is authoritative and re-checked, so two payments racing
    /// the same loan serialize correctly.
    pub fn record_payment(
        &self,
        user_id: Uuid,
        loan_id: Uuid,
        known_remaining: f64,
        data: NewLoanPayment,
    ) -> Result<()> {
        validate_amount(data.amount)?;
        if data.amount > known_remaining {
            return Err(CoreError::PaymentExceedsRemaining);
        }

        let now = self.store.now();
        let payment = LoanPayment::from_new(user_id, loan_id, &data, now);
        let payment_doc = encode(&payment)?;

        self.store.run_transaction(&mut |tx| {
            let mut loan: Loan = read_entity(tx, Collection::Loans, loan_id)?
                .ok_or(CoreError::LoanNotFound(loan_id))?;
            if data.amount > loan.remaining_amount {
                return Err(CoreError::PaymentExceedsRemaining);
            }

            let account_id = loan.account_id;
            let mut account: Account = read_entity(tx, Collection::Accounts, account_id)?
                .ok_or(CoreError::AccountNotFound(account_id))?;

            account.balance = match loan.direction {
                LoanDirection::Lent => round_cents(account.balance + data.amount),
                LoanDirection::Borrowed => round_cents(account.balance - data.amount),
            };
            account.updated_at = now;

            let new_remaining = round_cents(loan.remaining_amount - data.amount);
            loan.remaining_amount = new_remaining.max(0.0);
            loan.is_paid = new_remaining <= 0.0;
            loan.updated_at = now;

            tx.set(Collection::LoanPayments, payment.id, payment_doc.clone());
            tx.set(Collection::Loans, loan_id, encode(&loan)?);
            tx.set(Collection::Accounts, account_id, encode(&account)?);
            Ok(())
        })?;

        info!(loan_id = %loan_id, amount = data.amount, "loan payment recorded");
        Ok(())
    }

    /// Deletes a loan, reversing its outstanding effect on the linked
    /// account using `remaining_amount` (partial payments already moved
    /// money back). Fully paid loans delete without a balance write.
    pub fn delete_loan(&self, loan_id: Uuid) -> Result<()> {
        let now = self.store.now();
        self.store.run_transaction(&mut |tx| {
            let loan: Loan = read_entity(tx, Collection::Loans, loan_id)?
                .ok_or(CoreError::LoanNotFound(loan_id))?;

            if !loan.is_paid && loan.remaining_amount > 0.0 {
                let account_id = loan.account_id;
                let mut account: Account = read_entity(tx, Collection::Accounts, account_id)?
                    .ok_or(CoreError::AccountNotFound(account_id))?;
                account.balance = match loan.direction {
                    LoanDirection::Lent => round_cents(account.balance + loan.remaining_amount),
                    LoanDirection::Borrowed => {
                        round_cents(account.balance - loan.remaining_amount)
                    }
                };
                account.updated_at = now;
                tx.set(Collection::Accounts, account_id, encode(&account)?);
            }

            tx.delete(Collection::Loans, loan_id);
            Ok(())
        })?;

        info!(loan_id = %loan_id, "loan deleted");
        Ok(())
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CoreError::Validation(
            "amount must be a positive number".into(),
        ));
    }
    Ok(())
}

fn read_entity<T: DeserializeOwned>(
    tx: &mut dyn StoreTransaction,
    collection: Collection,
    id: Uuid,
) -> Result<Option<T>> {
    match tx.get(collection, id)? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}
