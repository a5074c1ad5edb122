use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a personal loan relative to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoanDirection {
    /// Money left the linked account and is owed back to the user.
    Lent,
    /// Money entered the linked account and the user owes it back.
    Borrowed,
}

impl fmt::Display for LoanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoanDirection::Lent => "lent",
            LoanDirection::Borrowed => "borrowed",
        })
    }
}

/// A loan whose creation moved money on the linked account and whose deletion
/// reverses that effect using `remaining_amount` (partial payments have
/// already moved money back).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub direction: LoanDirection,
    pub person_name: String,
    pub amount: f64,
    pub remaining_amount: f64,
    pub currency: String,
    pub account_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub is_paid: bool,
    pub include_in_dashboard: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating a loan.
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub direction: LoanDirection,
    pub person_name: String,
    pub amount: f64,
    pub currency: String,
    pub account_id: Uuid,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub include_in_dashboard: bool,
}

impl Loan {
    pub fn from_new(user_id: Uuid, data: &NewLoan, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            direction: data.direction,
            person_name: data.person_name.clone(),
            amount: data.amount,
            remaining_amount: data.amount,
            currency: data.currency.clone(),
            account_id: data.account_id,
            description: data.description.clone(),
            date: data.date,
            due_date: data.due_date,
            is_paid: false,
            include_in_dashboard: data.include_in_dashboard,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable record of a partial or full loan settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoanPayment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for recording a loan payment.
#[derive(Debug, Clone)]
pub struct NewLoanPayment {
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub note: Option<String>,
}

impl LoanPayment {
    pub fn from_new(
        user_id: Uuid,
        loan_id: Uuid,
        data: &NewLoanPayment,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            user_id,
            amount: data.amount,
            date: data.date,
            note: data.note.clone(),
            created_at: now,
        }
    }
}
