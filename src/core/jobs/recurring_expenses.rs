//! Daily job: materialize an expense for every due recurring template.
//!
//! Each materialized expense goes through the ledger transaction engine (its
//! own atomic transaction, so the balance effect is applied consistently);
//! the template's advanced `next_due_date` goes out in a batched write
//! afterwards. The two are deliberately not one atomic unit, so a scheduler
//! retry between them can double-create an expense for the same due date.

use std::time::Instant;

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::config::CoreConfig;
use crate::core::jobs::{write_job_log, JobErrorDetail, JobReport};
use crate::core::ledger_service::LedgerService;
use crate::domain::{NewExpense, RecurringExpenseTemplate};
use crate::errors::Result;
use crate::storage::{decode, encode, BatchWriter, Collection, DocumentStore, FieldFilter, WriteOp};

const JOB_NAME: &str = "recurring_expense_creation";

/// Runs the daily recurring-expense materialization batch.
pub fn run_recurring_expense_creation(
    service: &LedgerService,
    config: &CoreConfig,
) -> Result<JobReport> {
    let store = service.store();
    let started = Instant::now();
    let executed_at = store.now();
    info!(job = JOB_NAME, "starting recurring expense creation");

    let mut processed = 0usize;
    let mut details = Vec::new();

    match materialize_due_templates(service, config, &mut processed, &mut details) {
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

fn materialize_due_templates(
    service: &LedgerService,
    config: &CoreConfig,
    processed: &mut usize,
    details: &mut Vec<JobErrorDetail>,
) -> Result<()> {
    let store = service.store();
    let executed_at = store.now();
    let today = executed_at.date_naive();

    let due = store.query(
        Collection::RecurringExpenses,
        &[
            FieldFilter::Eq("is_active", json!(true)),
            FieldFilter::Le("next_due_date", json!(today)),
        ],
    )?;

    if due.is_empty() {
        info!(job = JOB_NAME, "no recurring expenses due");
        return Ok(());
    }
    info!(job = JOB_NAME, count = due.len(), "found due recurring expenses");

    let mut writer = BatchWriter::new(store, config.batch_size);

    for (id, doc) in due {
        // A template with an unknown frequency or missing fields fails
        // decode here and is reported, never crashes the run.
        let mut template: RecurringExpenseTemplate = match decode(doc) {
            Ok(template) => template,
            Err(err) => {
                warn!(job = JOB_NAME, template_id = %id, "skipping undecodable template: {err}");
                details.push(JobErrorDetail {
                    record_id: id,
                    message: err.to_string(),
                });
                continue;
            }
        };

        if template.name.trim().is_empty() || !template.amount.is_finite() || template.amount <= 0.0
        {
            warn!(job = JOB_NAME, template_id = %id, "skipping template with invalid fields");
            details.push(JobErrorDetail {
                record_id: id,
                message: "missing or invalid required fields".into(),
            });
            continue;
        }

        // Terminal transition: past its end date the template deactivates
        // without creating an expense.
        if template.has_ended(today) {
            debug!(job = JOB_NAME, template_id = %id, "template ended, deactivating");
            template.is_active = false;
            template.updated_at = executed_at;
            match encode(&template) {
                Ok(doc) => writer.push(WriteOp::Set {
                    collection: Collection::RecurringExpenses,
                    id,
                    doc,
                })?,
                Err(err) => details.push(JobErrorDetail {
                    record_id: id,
                    message: err.to_string(),
                }),
            }
            continue;
        }

        let new_expense = NewExpense {
            name: template.name.clone(),
            amount: template.amount,
            category: template.category.clone(),
            date: executed_at,
            source: template.source,
            is_installment: template.is_installment,
            installment_months: template.installment_months,
            is_from_recurring: true,
            recurring_expense_id: Some(id),
        };

        match service.create_expense(template.user_id, new_expense) {
            Ok(expense_id) => {
                debug!(job = JOB_NAME, template_id = %id, expense_id = %expense_id, "expense materialized");
            }
            Err(err) => {
                warn!(job = JOB_NAME, template_id = %id, "failed to materialize expense: {err}");
                details.push(JobErrorDetail {
                    record_id: id,
                    message: err.to_string(),
                });
                continue;
            }
        }

        template.last_created_at = Some(executed_at);
        template.next_due_date = template.frequency.next_due_date(template.next_due_date);
        template.updated_at = executed_at;
        match encode(&template) {
            Ok(doc) => writer.push(WriteOp::Set {
                collection: Collection::RecurringExpenses,
                id,
                doc,
            })?,
            Err(err) => {
                details.push(JobErrorDetail {
                    record_id: id,
                    message: err.to_string(),
                });
                continue;
            }
        }
        *processed += 1;
    }

    writer.flush()
}
