use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::round_cents;

/// Identifies the money entity an expense draws on.
///
/// A sum type instead of two nullable id fields: "both set" and "neither set"
/// are unrepresentable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "payment_type", rename_all = "snake_case")]
pub enum PaymentSource {
    Debit { account_id: Uuid },
    Credit { credit_card_id: Uuid },
}

impl PaymentSource {
    pub fn is_credit(&self) -> bool {
        matches!(self, PaymentSource::Credit { .. })
    }
}

impl fmt::Display for PaymentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentSource::Debit { account_id } => write!(f, "debit:{account_id}"),
            PaymentSource::Credit { credit_card_id } => write!(f, "credit:{credit_card_id}"),
        }
    }
}

/// A balance-affecting record: immutable once created, except for the
/// amortization fields the monthly job advances.
///
/// Lifecycle: created atomically with its balance mutation; if an
/// installment, amortized once per scheduled period until
/// `installment_months_paid >= installment_months` or `remaining_debt <= 0`;
/// deletable at any time, which reverses the original balance effect
/// regardless of amortization progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: f64,
    pub category: String,
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub source: PaymentSource,
    pub is_installment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_months: Option<u32>,
    pub installment_months_paid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_start_date: Option<DateTime<Utc>>,
    pub remaining_debt: f64,
    pub is_fully_paid: bool,
    pub is_from_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_expense_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating an expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub name: String,
    pub amount: f64,
    pub category: String,
    pub date: DateTime<Utc>,
    pub source: PaymentSource,
    pub is_installment: bool,
    pub installment_months: Option<u32>,
    pub is_from_recurring: bool,
    pub recurring_expense_id: Option<Uuid>,
}

impl NewExpense {
    pub fn debit(
        name: impl Into<String>,
        amount: f64,
        account_id: Uuid,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            amount,
            category: "Uncategorized".into(),
            date,
            source: PaymentSource::Debit { account_id },
            is_installment: false,
            installment_months: None,
            is_from_recurring: false,
            recurring_expense_id: None,
        }
    }

    pub fn credit(
        name: impl Into<String>,
        amount: f64,
        credit_card_id: Uuid,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            amount,
            category: "Uncategorized".into(),
            date,
            source: PaymentSource::Credit { credit_card_id },
            is_installment: false,
            installment_months: None,
            is_from_recurring: false,
            recurring_expense_id: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_installments(mut self, months: u32) -> Self {
        self.is_installment = true;
        self.installment_months = Some(months);
        self
    }
}

impl Expense {
    /// Materializes the persisted expense from caller input.
    ///
    /// Credit expenses are born carrying their full amount as remaining debt;
    /// debit expenses settle immediately and are born fully paid.
    pub fn from_new(user_id: Uuid, data: &NewExpense, now: DateTime<Utc>) -> Self {
        let is_credit = data.source.is_credit();
        let monthly_payment = match (data.is_installment, data.installment_months) {
            (true, Some(months)) if months > 0 => {
                Some(round_cents(data.amount / f64::from(months)))
            }
            _ => None,
        };
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: data.name.clone(),
            amount: data.amount,
            category: data.category.clone(),
            date: data.date,
            source: data.source,
            is_installment: data.is_installment,
            installment_months: data.installment_months,
            installment_months_paid: 0,
            monthly_payment,
            installment_start_date: data.is_installment.then_some(data.date),
            remaining_debt: if is_credit { data.amount } else { 0.0 },
            is_fully_paid: !is_credit,
            is_from_recurring: data.is_from_recurring,
            recurring_expense_id: data.recurring_expense_id,
            created_at: now,
            updated_at: now,
        }
    }
}
