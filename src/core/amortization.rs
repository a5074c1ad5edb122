//! Pure installment amortization math.

use crate::domain::Expense;
use crate::errors::{CoreError, Result};
use crate::utils::round_cents;

/// Result of advancing an installment expense by one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Amortization {
    pub months_paid: u32,
    pub monthly_payment: f64,
    pub remaining_debt: f64,
    pub is_fully_paid: bool,
}

/// Advances an installment expense by one paid month.
///
/// Malformed inputs (missing/zero `installment_months`, non-positive or
/// non-finite amounts) return an error; batch callers skip and log these
/// rather than aborting the run.
pub fn amortize(expense: &Expense) -> Result<Amortization> {
    let months = expense
        .installment_months
        .filter(|m| *m > 0)
        .ok_or_else(|| CoreError::Validation("missing or zero installment_months".into()))?;
    if !expense.amount.is_finite() || expense.amount <= 0.0 {
        return Err(CoreError::Validation("amount must be a positive number".into()));
    }

    let monthly_payment = expense
        .monthly_payment
        .unwrap_or(expense.amount / f64::from(months));
    if !monthly_payment.is_finite() || monthly_payment <= 0.0 {
        return Err(CoreError::Validation("invalid monthly payment".into()));
    }

    let months_paid = expense.installment_months_paid + 1;
    let raw_remaining = expense.amount - monthly_payment * f64::from(months_paid);
    let is_fully_paid = months_paid >= months || raw_remaining <= 0.0;
    // Rounded monthly payments can leave cent-level residue on the last
    // period; a finished schedule always reports zero debt.
    let remaining_debt = if is_fully_paid {
        0.0
    } else {
        round_cents(raw_remaining.max(0.0))
    };

    Ok(Amortization {
        months_paid,
        monthly_payment,
        remaining_debt,
        is_fully_paid,
    })
}

#[cfg(test)]
mod tests {
    use super::amortize;
    use crate::domain::{Expense, NewExpense};
    use chrono::Utc;
    use uuid::Uuid;

    fn installment_expense(amount: f64, months: u32) -> Expense {
        let data = NewExpense::credit("Laptop", amount, Uuid::new_v4(), Utc::now())
            .with_installments(months);
        Expense::from_new(Uuid::new_v4(), &data, Utc::now())
    }

    fn advance(expense: &mut Expense) {
        let step = amortize(expense).unwrap();
        expense.installment_months_paid = step.months_paid;
        expense.remaining_debt = step.remaining_debt;
        expense.is_fully_paid = step.is_fully_paid;
    }

    #[test]
    fn single_step_reduces_debt() {
        let expense = installment_expense(1200.0, 12);
        let step = amortize(&expense).unwrap();
        assert_eq!(step.months_paid, 1);
        assert_eq!(step.monthly_payment, 100.0);
        assert_eq!(step.remaining_debt, 1100.0);
        assert!(!step.is_fully_paid);
    }

    #[test]
    fn converges_in_exactly_installment_months_steps() {
        for months in [1u32, 3, 7, 12, 60] {
            let mut expense = installment_expense(999.99, months);
            for step in 0..months {
                assert!(!expense.is_fully_paid, "paid early at step {step}");
                advance(&mut expense);
            }
            assert!(expense.is_fully_paid, "not paid after {months} months");
            assert_eq!(expense.remaining_debt, 0.0);
        }
    }

    #[test]
    fn one_step_short_leaves_debt() {
        let mut expense = installment_expense(100.0, 3);
        advance(&mut expense);
        advance(&mut expense);
        assert!(!expense.is_fully_paid);
        assert!(expense.remaining_debt > 0.0);
    }

    #[test]
    fn zero_installment_months_is_rejected() {
        let mut expense = installment_expense(100.0, 3);
        expense.installment_months = Some(0);
        assert!(amortize(&expense).is_err());
    }

    #[test]
    fn missing_months_is_rejected_not_nan() {
        let mut expense = installment_expense(100.0, 3);
        expense.installment_months = None;
        assert!(amortize(&expense).is_err());
    }

    #[test]
    fn non_finite_amount_is_rejected() {
        let mut expense = installment_expense(100.0, 3);
        expense.amount = f64::NAN;
        assert!(amortize(&expense).is_err());
    }
}
