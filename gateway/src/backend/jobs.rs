use crate::errors::GatewayError;
use serde_json::Value;

pub const QUERY_JOB_COMMAND: &str = "queryAsyncJobResult";

/// Terminal result of polling one asynchronous backend job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded(Value),
    Failed { text: String, code: Option<i64> },
    TimedOut { job_id: String, polls: u32 },
}

impl JobOutcome {
    pub fn into_result(self) -> Result<Value, GatewayError> {
        match self {
            JobOutcome::Succeeded(result) => Ok(result),
            JobOutcome::Failed { text, code } => Err(GatewayError::BackendError { text, code }),
            JobOutcome::TimedOut { job_id, polls } => Err(GatewayError::BackendTimeout(format!(
                "job {job_id} did not finish after {polls} status queries"
            ))),
        }
    }
}

/// `jobstatus` as reported by `queryAsyncJobResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub(crate) fn from_response(response: &Value) -> Result<Self, GatewayError> {
        match response.get("jobstatus").and_then(Value::as_i64) {
            Some(0) => Ok(JobStatus::Pending),
            Some(1) => Ok(JobStatus::Succeeded),
            Some(2) => Ok(JobStatus::Failed),
            other => Err(GatewayError::BackendUnavailable(format!(
                "unexpected job status {other:?}"
            ))),
        }
    }
}

/// Reads the job handle out of a submission response. CloudStack sends it
/// as a string, older versions as a number.
pub(crate) fn job_id(response: &Value) -> Option<String> {
    match response.get("jobid")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Splits a `queryAsyncJobResult` response in a terminal state into the
/// matching outcome.
pub(crate) fn terminal_outcome(status: JobStatus, response: &Value) -> JobOutcome {
    let result = response.get("jobresult").cloned().unwrap_or(Value::Null);
    match status {
        JobStatus::Failed => JobOutcome::Failed {
            text: result
                .get("errortext")
                .and_then(Value::as_str)
                .unwrap_or("job failed without an error text")
                .to_string(),
            code: result.get("errorcode").and_then(Value::as_i64),
        },
        _ => JobOutcome::Succeeded(result),
    }
}
