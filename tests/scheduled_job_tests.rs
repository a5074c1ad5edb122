mod common;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use common::{account_balance, card_balance, seed_account, seed_card, setup};
use ledger_core::config::CoreConfig;
use ledger_core::core::{run_installment_debt_reduction, run_recurring_expense_creation};
use ledger_core::domain::{
    Expense, Frequency, NewExpense, PaymentSource, RecurringExpenseTemplate,
};
use ledger_core::storage::{decode, encode, Collection, DocumentStore, FieldFilter, MemoryStore};

fn seed_installment_expense(
    store: &MemoryStore,
    user: Uuid,
    card_id: Uuid,
    amount: f64,
    months: u32,
) -> Uuid {
    let data =
        NewExpense::credit("Installment", amount, card_id, Utc::now()).with_installments(months);
    let expense = Expense::from_new(user, &data, Utc::now());
    store
        .set(Collection::Expenses, expense.id, encode(&expense).unwrap())
        .unwrap();
    expense.id
}

fn seed_template(
    store: &MemoryStore,
    template: &RecurringExpenseTemplate,
) -> Uuid {
    store
        .set(
            Collection::RecurringExpenses,
            template.id,
            encode(template).unwrap(),
        )
        .unwrap();
    template.id
}

fn latest_job_log(store: &MemoryStore) -> serde_json::Value {
    let logs = store.query(Collection::JobLogs, &[]).unwrap();
    assert_eq!(logs.len(), 1, "expected exactly one job log");
    logs.into_iter().next().unwrap().1
}

#[test]
fn installment_run_advances_expenses_and_nets_card_delta() {
    let (store, service) = setup();
    let user = Uuid::new_v4();
    let card_id = seed_card(&store, user, 900.0);
    let first = seed_installment_expense(&store, user, card_id, 600.0, 6);
    let second = seed_installment_expense(&store, user, card_id, 300.0, 3);
    drop(service);

    let report = run_installment_debt_reduction(&*store, &CoreConfig::default()).unwrap();
    assert!(report.success);
    assert_eq!(report.processed, 2);
    assert_eq!(report.errors, 0);

    let expense: Expense =
        decode(store.get(Collection::Expenses, first).unwrap().unwrap()).unwrap();
    assert_eq!(expense.installment_months_paid, 1);
    assert_eq!(expense.remaining_debt, 500.0);
    let expense: Expense =
        decode(store.get(Collection::Expenses, second).unwrap().unwrap()).unwrap();
    assert_eq!(expense.remaining_debt, 200.0);

    // One card write carrying the net delta: -(100 + 100).
    assert_eq!(card_balance(&store, card_id), 700.0);
}

#[test]
fn installment_run_tolerates_malformed_records() {
    let (store, service) = setup();
    let user = Uuid::new_v4();
    let card_id = seed_card(&store, user, 1000.0);
    for _ in 0..4 {
        seed_installment_expense(&store, user, card_id, 120.0, 12);
    }
    // Malformed: installment months of zero.
    let bad = {
        let data = NewExpense::credit("Broken", 120.0, card_id, Utc::now()).with_installments(12);
        let mut expense = Expense::from_new(user, &data, Utc::now());
        expense.installment_months = Some(0);
        store
            .set(Collection::Expenses, expense.id, encode(&expense).unwrap())
            .unwrap();
        expense.id
    };
    drop(service);

    let report = run_installment_debt_reduction(&*store, &CoreConfig::default()).unwrap();
    assert!(!report.success);
    assert_eq!(report.processed, 4);
    assert_eq!(report.errors, 1);
    assert_eq!(report.error_details.len(), 1);
    assert_eq!(report.error_details[0].record_id, bad);

    // The malformed record is untouched; the other four amortized.
    let expense: Expense = decode(store.get(Collection::Expenses, bad).unwrap().unwrap()).unwrap();
    assert_eq!(expense.installment_months_paid, 0);
    assert_eq!(card_balance(&store, card_id), 960.0);

    let log = latest_job_log(&store);
    assert_eq!(log["processed"], json!(4));
    assert_eq!(log["errors"], json!(1));
    assert_eq!(log["success"], json!(false));
}

#[test]
fn installment_run_reaches_fully_paid_and_stops() {
    let (store, service) = setup();
    let user = Uuid::new_v4();
    let card_id = seed_card(&store, user, 300.0);
    let id = seed_installment_expense(&store, user, card_id, 300.0, 3);
    drop(service);

    for _ in 0..3 {
        run_installment_debt_reduction(&*store, &CoreConfig::default()).unwrap();
    }
    let expense: Expense = decode(store.get(Collection::Expenses, id).unwrap().unwrap()).unwrap();
    assert!(expense.is_fully_paid);
    assert_eq!(expense.remaining_debt, 0.0);
    assert_eq!(card_balance(&store, card_id), 0.0);

    // A fully paid expense no longer matches the due query.
    let report = run_installment_debt_reduction(&*store, &CoreConfig::default()).unwrap();
    assert_eq!(report.processed, 0);
    let expense: Expense = decode(store.get(Collection::Expenses, id).unwrap().unwrap()).unwrap();
    assert_eq!(expense.installment_months_paid, 3);
}

#[test]
fn installment_run_with_nothing_due_reports_empty_success() {
    let (store, service) = setup();
    drop(service);
    let report = run_installment_debt_reduction(&*store, &CoreConfig::default()).unwrap();
    assert!(report.success);
    assert_eq!(report.processed, 0);
    assert_eq!(report.errors, 0);
}

#[test]
fn installment_run_reports_missing_card() {
    let (store, service) = setup();
    let user = Uuid::new_v4();
    let ghost_card = Uuid::new_v4();
    seed_installment_expense(&store, user, ghost_card, 100.0, 10);
    drop(service);

    let report = run_installment_debt_reduction(&*store, &CoreConfig::default()).unwrap();
    // The expense itself still amortizes; the card update is the error.
    assert_eq!(report.processed, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(report.error_details[0].record_id, ghost_card);
}

#[test]
fn recurring_run_materializes_due_template_through_the_engine() {
    let (store, service) = setup();
    let user = Uuid::new_v4();
    let account_id = seed_account(&store, user, 500.0);
    let today = Utc::now().date_naive();
    let template = RecurringExpenseTemplate::new(
        user,
        "Gym",
        50.0,
        PaymentSource::Debit { account_id },
        Frequency::Monthly,
        today - Duration::days(1),
        Utc::now(),
    );
    let template_id = seed_template(&store, &template);

    let report = run_recurring_expense_creation(&service, &CoreConfig::default()).unwrap();
    assert!(report.success);
    assert_eq!(report.processed, 1);

    // The expense went through the ledger engine: account debited.
    assert_eq!(account_balance(&store, account_id), 450.0);
    let expenses = store
        .query(
            Collection::Expenses,
            &[FieldFilter::Eq("is_from_recurring", json!(true))],
        )
        .unwrap();
    assert_eq!(expenses.len(), 1);
    let expense: Expense = decode(expenses.into_iter().next().unwrap().1).unwrap();
    assert_eq!(expense.recurring_expense_id, Some(template_id));
    assert_eq!(expense.amount, 50.0);

    let advanced: RecurringExpenseTemplate = decode(
        store
            .get(Collection::RecurringExpenses, template_id)
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(
        advanced.next_due_date,
        Frequency::Monthly.next_due_date(today - Duration::days(1))
    );
    assert!(advanced.last_created_at.is_some());
    assert!(advanced.is_active);
}

#[test]
fn recurring_run_skips_templates_not_yet_due() {
    let (store, service) = setup();
    let user = Uuid::new_v4();
    let account_id = seed_account(&store, user, 500.0);
    let template = RecurringExpenseTemplate::new(
        user,
        "Rent",
        100.0,
        PaymentSource::Debit { account_id },
        Frequency::Monthly,
        Utc::now().date_naive() + Duration::days(3),
        Utc::now(),
    );
    seed_template(&store, &template);

    let report = run_recurring_expense_creation(&service, &CoreConfig::default()).unwrap();
    assert_eq!(report.processed, 0);
    assert!(store.query(Collection::Expenses, &[]).unwrap().is_empty());
    assert_eq!(account_balance(&store, account_id), 500.0);
}

#[test]
fn recurring_run_deactivates_ended_template_without_expense() {
    let (store, service) = setup();
    let user = Uuid::new_v4();
    let account_id = seed_account(&store, user, 500.0);
    let today = Utc::now().date_naive();
    let template = RecurringExpenseTemplate::new(
        user,
        "Old subscription",
        25.0,
        PaymentSource::Debit { account_id },
        Frequency::Monthly,
        today - Duration::days(10),
        Utc::now(),
    )
    .with_end_date(today - Duration::days(5));
    let template_id = seed_template(&store, &template);

    let report = run_recurring_expense_creation(&service, &CoreConfig::default()).unwrap();
    assert!(report.success);
    assert_eq!(report.processed, 0);

    let stored: RecurringExpenseTemplate = decode(
        store
            .get(Collection::RecurringExpenses, template_id)
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert!(!stored.is_active);
    assert!(store.query(Collection::Expenses, &[]).unwrap().is_empty());
    assert_eq!(account_balance(&store, account_id), 500.0);
}

#[test]
fn recurring_run_counts_per_record_failures_and_continues() {
    let (store, service) = setup();
    let user = Uuid::new_v4();
    let account_id = seed_account(&store, user, 500.0);
    let today = Utc::now().date_naive();

    let good = RecurringExpenseTemplate::new(
        user,
        "Netflix",
        15.0,
        PaymentSource::Debit { account_id },
        Frequency::Monthly,
        today,
        Utc::now(),
    );
    seed_template(&store, &good);

    // Invalid amount: fails validation and is reported.
    let mut zero_amount = RecurringExpenseTemplate::new(
        user,
        "Broken",
        1.0,
        PaymentSource::Debit { account_id },
        Frequency::Monthly,
        today,
        Utc::now(),
    );
    zero_amount.amount = 0.0;
    let zero_id = seed_template(&store, &zero_amount);

    // References an account that does not exist: the engine rejects it.
    let ghost = RecurringExpenseTemplate::new(
        user,
        "Ghost account",
        10.0,
        PaymentSource::Debit {
            account_id: Uuid::new_v4(),
        },
        Frequency::Monthly,
        today,
        Utc::now(),
    );
    let ghost_id = seed_template(&store, &ghost);

    let report = run_recurring_expense_creation(&service, &CoreConfig::default()).unwrap();
    assert!(!report.success);
    assert_eq!(report.processed, 1);
    assert_eq!(report.errors, 2);
    let failed: Vec<Uuid> = report.error_details.iter().map(|d| d.record_id).collect();
    assert!(failed.contains(&zero_id));
    assert!(failed.contains(&ghost_id));

    // The good template materialized; the failed ones were not advanced.
    assert_eq!(account_balance(&store, account_id), 485.0);
    let stored: RecurringExpenseTemplate = decode(
        store
            .get(Collection::RecurringExpenses, ghost_id)
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(stored.next_due_date, today);
    assert!(stored.last_created_at.is_none());
}

#[test]
fn recurring_run_reports_undecodable_template() {
    let (store, service) = setup();
    let id = Uuid::new_v4();
    store
        .set(
            Collection::RecurringExpenses,
            id,
            json!({
                "is_active": true,
                "next_due_date": "2000-01-01",
                "frequency": "fortnightly"
            }),
        )
        .unwrap();

    let report = run_recurring_expense_creation(&service, &CoreConfig::default()).unwrap();
    assert!(!report.success);
    assert_eq!(report.errors, 1);
    assert_eq!(report.error_details[0].record_id, id);
}
