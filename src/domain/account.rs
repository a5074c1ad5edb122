use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a bank account tracked for a user.
///
/// `balance` is the single source of truth for the money held here. It is
/// debited by debit expenses and lent loans, credited by borrowed-loan
/// proceeds and repayments received. Negative balances are permitted
/// (overdraft) down to a soft floor enforced only at expense-creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub balance: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_return: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new account with an opening balance.
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        balance: f64,
        currency: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            balance,
            currency: currency.into(),
            annual_return: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Flags the account as an investment vehicle with an expected return.
    pub fn with_annual_return(mut self, annual_return: f64) -> Self {
        self.annual_return = Some(annual_return);
        self
    }
}
