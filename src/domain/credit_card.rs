use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a credit card and its outstanding debt.
///
/// `current_balance` grows when a credit expense is created and shrinks when
/// the expense is deleted, paid down, or amortized. It is clamped at zero on
/// every mutation that could drive it negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub current_balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_four_digits: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CreditCard {
    /// Creates a new credit card with an opening debt balance.
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        current_balance: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            current_balance,
            credit_limit: None,
            last_four_digits: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_credit_limit(mut self, credit_limit: f64) -> Self {
        self.credit_limit = Some(credit_limit);
        self
    }
}
