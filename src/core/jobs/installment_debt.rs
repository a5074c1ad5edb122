//! Monthly job: advance every open installment expense by one period.
//!
//! Record-level, partial-failure-tolerant consistency: expense updates and
//! the per-card net deltas go out as grouped batched writes, not one giant
//! transaction. A failure on one expense or card is logged and counted
//! without aborting the rest of the run.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::core::amortization::amortize;
use crate::core::jobs::{write_job_log, JobErrorDetail, JobReport};
use crate::domain::{CreditCard, Expense, PaymentSource};
use crate::errors::Result;
use crate::storage::{decode, encode, BatchWriter, Collection, DocumentStore, FieldFilter, WriteOp};

const JOB_NAME: &str = "installment_debt_reduction";

/// Runs the monthly installment amortization batch.
///
/// Fatal errors (the query or a batch commit failing) are logged to the
/// monitoring collection with `success: false` and rethrown so the external
/// scheduler's retry policy can engage.
pub fn run_installment_debt_reduction(
    store: &dyn DocumentStore,
    config: &CoreConfig,
) -> Result<JobReport> {
    let started = Instant::now();
    let executed_at = store.now();
    info!(job = JOB_NAME, "starting installment debt reduction");

    let mut processed = 0usize;
    let mut details = Vec::new();

    match reduce_installments(store, config, &mut processed, &mut details) {
        Ok(()) => {
            let report =
                JobReport::from_run(processed, details, started.elapsed().as_millis() as u64);
            if report.errors > 0 {
                warn!(
                    job = JOB_NAME,
                    processed = report.processed,
                    errors = report.errors,
                    "completed with errors"
                );
            } else {
                info!(job = JOB_NAME, processed = report.processed, "completed");
            }
            write_job_log(store, JOB_NAME, executed_at, &report, None);
            Ok(report)
        }
        Err(err) => {
            error!(job = JOB_NAME, "fatal error: {err}");
            let mut report =
                JobReport::from_run(processed, details, started.elapsed().as_millis() as u64);
            report.success = false;
            report.errors += 1;
            write_job_log(store, JOB_NAME, executed_at, &report, Some(&err.to_string()));
            Err(err)
        }
    }
}

fn reduce_installments(
    store: &dyn DocumentStore,
    config: &CoreConfig,
    processed: &mut usize,
    details: &mut Vec<JobErrorDetail>,
) -> Result<()> {
    let executed_at = store.now();
    let due = store.query(
        Collection::Expenses,
        &[
            FieldFilter::Eq("payment_type", json!("credit")),
            FieldFilter::Eq("is_installment", json!(true)),
            FieldFilter::Eq("is_fully_paid", json!(false)),
        ],
    )?;

    if due.is_empty() {
        info!(job = JOB_NAME, "no installment debts to reduce");
        return Ok(());
    }
    info!(job = JOB_NAME, count = due.len(), "found installment expenses to process");

    let mut writer = BatchWriter::new(store, config.batch_size);
    // Net balance change per card, written once per card instead of once per
    // expense.
    let mut card_deltas: HashMap<Uuid, f64> = HashMap::new();

    for (id, doc) in due {
        let mut expense: Expense = match decode(doc) {
            Ok(expense) => expense,
            Err(err) => {
                warn!(job = JOB_NAME, expense_id = %id, "skipping undecodable expense: {err}");
                details.push(JobErrorDetail {
                    record_id: id,
                    message: err.to_string(),
                });
                continue;
            }
        };

        let step = match amortize(&expense) {
            Ok(step) => step,
            Err(err) => {
                warn!(job = JOB_NAME, expense_id = %id, "skipping invalid installment: {err}");
                details.push(JobErrorDetail {
                    record_id: id,
                    message: err.to_string(),
                });
                continue;
            }
        };

        expense.installment_months_paid = step.months_paid;
        expense.remaining_debt = step.remaining_debt;
        expense.is_fully_paid = step.is_fully_paid;
        expense.updated_at = executed_at;

        let expense_doc = match encode(&expense) {
            Ok(doc) => doc,
            Err(err) => {
                details.push(JobErrorDetail {
                    record_id: id,
                    message: err.to_string(),
                });
                continue;
            }
        };
        writer.push(WriteOp::Set {
            collection: Collection::Expenses,
            id,
            doc: expense_doc,
        })?;

        if let PaymentSource::Credit { credit_card_id } = expense.source {
            *card_deltas.entry(credit_card_id).or_insert(0.0) -= step.monthly_payment;
        }
        *processed += 1;
    }

    for (card_id, delta) in card_deltas {
        match load_card(store, card_id) {
            Ok(Some(mut card)) => {
                card.current_balance =
                    crate::utils::round_cents((card.current_balance + delta).max(0.0));
                card.updated_at = executed_at;
                match encode(&card) {
                    Ok(doc) => writer.push(WriteOp::Set {
                        collection: Collection::CreditCards,
                        id: card_id,
                        doc,
                    })?,
                    Err(err) => details.push(JobErrorDetail {
                        record_id: card_id,
                        message: err.to_string(),
                    }),
                }
            }
            Ok(None) => {
                warn!(job = JOB_NAME, card_id = %card_id, "credit card not found");
                details.push(JobErrorDetail {
                    record_id: card_id,
                    message: "credit card not found".into(),
                });
            }
            Err(err) => {
                warn!(job = JOB_NAME, card_id = %card_id, "failed to update credit card: {err}");
                details.push(JobErrorDetail {
                    record_id: card_id,
                    message: err.to_string(),
                });
            }
        }
    }

    writer.flush()
}

fn load_card(store: &dyn DocumentStore, card_id: Uuid) -> Result<Option<CreditCard>> {
    match store.get(Collection::CreditCards, card_id)? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}
