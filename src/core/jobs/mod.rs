//! Scheduled batch jobs and their monitoring contract.
//!
//! An external scheduler invokes these on fixed cadences (monthly for
//! installment debt reduction, daily for recurring expense creation) under a
//! wall-clock budget, retrying the whole invocation with backoff on fatal
//! failure. Per-record failures are the jobs' own responsibility: caught,
//! counted, and reported, never propagated.

pub mod installment_debt;
pub mod recurring_expenses;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::storage::{encode, Collection, DocumentStore};

pub use installment_debt::run_installment_debt_reduction;
pub use recurring_expenses::run_recurring_expense_creation;

/// One record's failure inside a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobErrorDetail {
    pub record_id: Uuid,
    pub message: String,
}

/// Structured outcome of one job invocation, returned and persisted to the
/// monitoring collection regardless of success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobReport {
    pub success: bool,
    pub processed: usize,
    pub errors: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<JobErrorDetail>,
    pub duration_ms: u64,
}

impl JobReport {
    fn from_run(processed: usize, error_details: Vec<JobErrorDetail>, duration_ms: u64) -> Self {
        Self {
            success: error_details.is_empty(),
            processed,
            errors: error_details.len(),
            error_details,
            duration_ms,
        }
    }
}

#[derive(Serialize)]
struct JobLogEntry<'a> {
    job_name: &'a str,
    executed_at: DateTime<Utc>,
    #[serde(flatten)]
    report: &'a JobReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    fatal_error: Option<&'a str>,
}

/// Best-effort write to the monitoring collection. A log failure is warned
/// about but never changes the job outcome.
fn write_job_log(
    store: &dyn DocumentStore,
    job_name: &str,
    executed_at: DateTime<Utc>,
    report: &JobReport,
    fatal_error: Option<&str>,
) {
    let entry = JobLogEntry {
        job_name,
        executed_at,
        report,
        fatal_error,
    };
    let result = encode(&entry)
        .and_then(|doc| store.set(Collection::JobLogs, Uuid::new_v4(), doc));
    if let Err(err) = result {
        warn!(job_name, "failed to write job log: {err}");
    }
}
