//! CloudStack request executor.
//!
//! Three call shapes are offered to resource handlers:
//!
//! - [`BackendClient::execute`]: one synchronous API call, returning the
//!   object CloudStack wraps in `<command>response`.
//! - [`BackendClient::execute_async`]: submit a job and poll
//!   `queryAsyncJobResult` until it reaches a terminal state, bounded by a
//!   poll count and a wall clock ceiling.
//! - [`BackendClient::describe`] and [`BackendClient::find_by_name`]: list
//!   calls that single out requested items and fail with the resource's
//!   not-found error when one is missing.
//!
//! Backend failures are returned as [`GatewayError::BackendError`] and are
//! turned into front-facing errors by the handler's error table.

mod call;
mod jobs;

pub use call::BackendCall;
pub use jobs::{JobOutcome, QUERY_JOB_COMMAND};

use crate::config::BackendConfig;
use crate::errors::{ErrorConstructor, GatewayError, Result};
use crate::metrics_defs::{BACKEND_JOB_POLLS, BACKEND_JOB_TIMEOUT, BACKEND_REQUEST_DURATION};
use jobs::JobStatus;
use serde_json::Value;
use shared::{counter, histogram};
use std::sync::Arc;
use tokio::time::{Instant, sleep, timeout_at};

/// How to single out items of one resource type in list responses.
#[derive(Clone, Copy)]
pub struct ItemLookup {
    /// Key of the item array inside the list response, e.g. `volume`
    pub item_key: &'static str,
    /// Human readable resource name used in not-found messages
    pub noun: &'static str,
    pub not_found: ErrorConstructor,
}

#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    config: Arc<BackendConfig>,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(BackendClient {
            client,
            config: Arc::new(config),
        })
    }

    /// Sends one call and returns the unwrapped result object.
    pub async fn execute(&self, call: BackendCall) -> Result<Value> {
        let command = call.command().to_string();
        let started = Instant::now();

        let mut url = self.config.url.clone();
        url.set_query(Some(&call.signed_query(
            &self.config.api_key,
            &self.config.secret_key,
        )));

        tracing::debug!(command = %command, "Sending backend request");

        let result = self.send(url, &call).await;

        histogram!(BACKEND_REQUEST_DURATION, "command" => command.clone())
            .record(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            match e {
                GatewayError::BackendError { text, code } => {
                    tracing::debug!(command = %command, ?code, "Backend rejected request: {text}")
                }
                other => tracing::error!(command = %command, "Backend request failed: {other}"),
            }
        }

        result
    }

    async fn send(&self, url: url::Url, call: &BackendCall) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(call.command(), e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(call.command(), e))?;

        let parsed = match serde_json::from_slice::<Value>(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(GatewayError::BackendUnavailable(format!(
                    "{} returned HTTP {status} with an unparseable body: {e}",
                    call.command()
                )));
            }
        };

        let result = unwrap_response(parsed, &call.response_key());

        // CloudStack reports rejected input with 4xx statuses and an error
        // body, so the body is checked before the status.
        if let Some(error) = backend_error(&result) {
            return Err(error);
        }

        if !status.is_success() {
            return Err(GatewayError::BackendUnavailable(format!(
                "{} returned HTTP {status}",
                call.command()
            )));
        }

        Ok(result)
    }

    /// Submits an asynchronous job and waits for its result. The submission
    /// and every status query share one deadline of `max_job_wait`, so an
    /// in-flight backend call is cut off when it expires.
    pub async fn execute_async(&self, call: BackendCall) -> Result<Value> {
        let max_wait = self.config.max_job_wait();
        let deadline = Instant::now() + max_wait;
        let command = call.command().to_string();

        let submitted = match timeout_at(deadline, self.execute(call)).await {
            Ok(submitted) => submitted?,
            Err(_) => {
                return Err(job_timeout(
                    &command,
                    format!("{command} was not accepted within {max_wait:?}"),
                ));
            }
        };
        let job_id = jobs::job_id(&submitted).ok_or_else(|| {
            GatewayError::BackendUnavailable(format!("{command} response did not contain a jobid"))
        })?;

        tracing::debug!(command = %command, job_id = %job_id, "Submitted async job");

        match timeout_at(deadline, self.wait_for_job(&job_id, deadline)).await {
            Ok(Ok(JobOutcome::TimedOut { polls, .. })) => Err(job_timeout(
                &command,
                format!("job {job_id} did not finish after {polls} status queries"),
            )),
            Ok(outcome) => outcome?.into_result(),
            Err(_) => Err(job_timeout(
                &command,
                format!("job {job_id} did not finish within {max_wait:?}"),
            )),
        }
    }

    /// Polls the job until it succeeds, fails, runs out of attempts or passes
    /// `deadline`. The interval doubles after every pending answer, capped at
    /// the configured maximum.
    pub async fn wait_for_job(&self, job_id: &str, deadline: Instant) -> Result<JobOutcome> {
        let mut interval = self.config.poll_interval();
        let max_interval = self.config.max_poll_interval();
        let max_attempts = self.config.max_poll_attempts;

        for attempt in 1..=max_attempts {
            let response = self
                .execute(BackendCall::new(QUERY_JOB_COMMAND).arg("jobid", job_id))
                .await?;

            let status = JobStatus::from_response(&response)?;
            if status != JobStatus::Pending {
                histogram!(BACKEND_JOB_POLLS).record(attempt as f64);
                tracing::debug!(job_id, attempt, ?status, "Async job finished");
                return Ok(jobs::terminal_outcome(status, &response));
            }

            tracing::debug!(job_id, attempt, "Async job still pending");

            let now = Instant::now();
            if attempt == max_attempts || now >= deadline {
                return Ok(JobOutcome::TimedOut {
                    job_id: job_id.to_string(),
                    polls: attempt,
                });
            }

            sleep(interval.min(deadline - now)).await;
            interval = (interval * 2).min(max_interval);
        }

        Ok(JobOutcome::TimedOut {
            job_id: job_id.to_string(),
            polls: max_attempts,
        })
    }

    /// Runs a list call. Without `ids` every item is returned. With `ids`
    /// the call is repeated per id and each id must resolve to exactly its
    /// item; the first missing id fails the whole lookup.
    pub async fn describe(
        &self,
        call: BackendCall,
        lookup: &ItemLookup,
        ids: &[&str],
    ) -> Result<Vec<Value>> {
        if ids.is_empty() {
            let response = self.execute(call).await?;
            return Ok(items(&response, lookup.item_key));
        }

        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let response = self.execute(call.clone().arg("id", *id)).await?;
            let item = items(&response, lookup.item_key)
                .into_iter()
                .find(|item| field(item, "id").as_deref() == Some(*id))
                .ok_or_else(|| {
                    (lookup.not_found)(format!("The {} ID '{id}' does not exist", lookup.noun))
                })?;
            found.push(item);
        }
        Ok(found)
    }

    /// Resolves a resource by its exact `name`.
    pub async fn find_by_name(
        &self,
        call: BackendCall,
        lookup: &ItemLookup,
        name: &str,
    ) -> Result<Value> {
        let response = self.execute(call.arg("name", name)).await?;
        items(&response, lookup.item_key)
            .into_iter()
            .find(|item| field(item, "name").as_deref() == Some(name))
            .ok_or_else(|| {
                (lookup.not_found)(format!("The {} '{name}' does not exist", lookup.noun))
            })
    }
}

fn job_timeout(command: &str, message: String) -> GatewayError {
    counter!(BACKEND_JOB_TIMEOUT).increment(1);
    tracing::error!(command, "Gave up waiting for async job: {message}");
    GatewayError::BackendTimeout(message)
}

fn transport_error(command: &str, e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::BackendTimeout(format!("{command}: {e}"))
    } else {
        GatewayError::BackendUnavailable(format!("{command}: {e}"))
    }
}

/// Strips the `<command>response` wrapper. Bodies without it are returned
/// unchanged.
fn unwrap_response(mut body: Value, response_key: &str) -> Value {
    match body.get_mut(response_key) {
        Some(inner) => inner.take(),
        None => body,
    }
}

fn backend_error(result: &Value) -> Option<GatewayError> {
    let text = result.get("errortext")?;
    Some(GatewayError::BackendError {
        text: text.as_str().map(String::from).unwrap_or_else(|| text.to_string()),
        code: result.get("errorcode").and_then(Value::as_i64),
    })
}

/// Items of a list response. A response without the key (CloudStack omits
/// it when `count` is 0) has no items.
fn items(response: &Value, item_key: &str) -> Vec<Value> {
    match response.get(item_key) {
        Some(Value::Array(items)) => items.clone(),
        Some(item @ Value::Object(_)) => vec![item.clone()],
        _ => Vec::new(),
    }
}

/// String form of a scalar field. Ids may be numeric on older backends.
pub fn field(item: &Value, name: &str) -> Option<String> {
    match item.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
