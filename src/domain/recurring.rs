use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expense::PaymentSource;

/// Cadence at which a recurring expense template materializes expenses.
///
/// Unknown cadences are unrepresentable here; a stored document carrying an
/// unrecognized frequency string fails decode, which the daily job surfaces
/// as a per-record error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Advances a due date by one period.
    ///
    /// Monthly advances clamp to the last day of the target month when the
    /// source day overflows it (Jan 31 -> Feb 28/29). Yearly advances clamp
    /// Feb 29 to Feb 28 on non-leap target years.
    pub fn next_due_date(&self, current: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => current + Duration::days(1),
            Frequency::Weekly => current + Duration::days(7),
            Frequency::Monthly => shift_month(current, 1),
            Frequency::Yearly => shift_year(current, 1),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        })
    }
}

fn shift_month(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    while month > 12 {
        month -= 12;
        year += 1;
    }
    while month < 1 {
        month += 12;
        year -= 1;
    }
    let day = date.day().min(days_in_month(year, month as u32));
    NaiveDate::from_ymd_opt(year, month as u32, day).expect("clamped day is valid")
}

fn shift_year(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() + years;
    let day = date.day().min(days_in_month(year, date.month()));
    NaiveDate::from_ymd_opt(year, date.month(), day).expect("clamped day is valid")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first of month is valid");
    (first_next - Duration::days(1)).day()
}

/// Template that the daily job materializes into expenses while due.
///
/// State machine: `active(due) -> active(materialized, advanced)` or
/// `active -> inactive` once `end_date` passes. `inactive` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringExpenseTemplate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: f64,
    pub category: String,
    #[serde(flatten)]
    pub source: PaymentSource,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_created_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_installment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_months: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringExpenseTemplate {
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        amount: f64,
        source: PaymentSource,
        frequency: Frequency,
        next_due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            amount,
            category: "Uncategorized".into(),
            source,
            frequency,
            next_due_date,
            end_date: None,
            last_created_at: None,
            is_active: true,
            is_installment: false,
            installment_months: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_installments(mut self, months: u32) -> Self {
        self.is_installment = true;
        self.installment_months = Some(months);
        self
    }

    /// True once the template's end date lies strictly before `today`.
    pub fn has_ended(&self, today: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| end < today)
    }
}

#[cfg(test)]
mod tests {
    use super::Frequency;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_and_weekly_advance_linearly() {
        assert_eq!(
            Frequency::Daily.next_due_date(date(2025, 3, 14)),
            date(2025, 3, 15)
        );
        assert_eq!(
            Frequency::Weekly.next_due_date(date(2025, 12, 29)),
            date(2026, 1, 5)
        );
    }

    #[test]
    fn monthly_clamps_to_end_of_target_month() {
        assert_eq!(
            Frequency::Monthly.next_due_date(date(2025, 1, 31)),
            date(2025, 2, 28)
        );
        assert_eq!(
            Frequency::Monthly.next_due_date(date(2024, 1, 31)),
            date(2024, 2, 29)
        );
        assert_eq!(
            Frequency::Monthly.next_due_date(date(2025, 3, 31)),
            date(2025, 4, 30)
        );
    }

    #[test]
    fn monthly_preserves_mid_month_days() {
        assert_eq!(
            Frequency::Monthly.next_due_date(date(2025, 2, 15)),
            date(2025, 3, 15)
        );
        assert_eq!(
            Frequency::Monthly.next_due_date(date(2025, 12, 1)),
            date(2026, 1, 1)
        );
    }

    #[test]
    fn yearly_clamps_leap_day() {
        assert_eq!(
            Frequency::Yearly.next_due_date(date(2024, 2, 29)),
            date(2025, 2, 28)
        );
        assert_eq!(
            Frequency::Yearly.next_due_date(date(2025, 7, 4)),
            date(2026, 7, 4)
        );
    }

    #[test]
    fn unknown_frequency_fails_decode() {
        let err = serde_json::from_str::<Frequency>("\"fortnightly\"");
        assert!(err.is_err());
    }
}
