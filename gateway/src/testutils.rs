use crate::BackendClient;
use crate::config::{BackendConfig, ResourceSettings};
use crate::credentials::StaticCredentialStore;
use crate::dispatcher::{ActionTable, Dispatcher};
use crate::params::{Params, RequestContext};
use crate::signature::{SignatureMethod, compute_signature};
use http::Method;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCESS_KEY: &str = "AKID";
pub const SECRET_KEY: &str = "secret";
pub const HOST: &str = "localhost";

pub fn backend_config_for(url: &str) -> BackendConfig {
    BackendConfig {
        url: url.parse().unwrap(),
        api_key: "backend-key".into(),
        secret_key: "backend-secret".into(),
        timeout_secs: 5,
        poll_interval_ms: 1,
        max_poll_interval_ms: 5,
        max_poll_attempts: 50,
        max_job_wait_secs: 30,
    }
}

pub fn backend_config(server: &MockServer) -> BackendConfig {
    backend_config_for(&format!("{}/client/api", server.uri()))
}

pub fn credential_store() -> Arc<StaticCredentialStore> {
    Arc::new(StaticCredentialStore::new(HashMap::from([(
        ACCESS_KEY.to_string(),
        SECRET_KEY.to_string(),
    )])))
}

pub fn dispatcher(server: &MockServer) -> Dispatcher {
    Dispatcher::new(
        ActionTable::standard(),
        credential_store(),
        BackendClient::new(backend_config(server)).unwrap(),
        ResourceSettings::default(),
    )
}

/// Parameters for `action` plus `extra`, signed for a POST to
/// `http://localhost/`.
pub fn signed_params(action: &str, extra: &[(&str, &str)]) -> Params {
    let mut params: Params = [
        ("Action", action),
        ("AWSAccessKeyId", ACCESS_KEY),
        ("SignatureVersion", "2"),
        ("SignatureMethod", "HmacSHA256"),
        ("Timestamp", "2014-03-01T12:00:00Z"),
        ("Version", "2013-10-15"),
    ]
    .into_iter()
    .collect();
    for (name, value) in extra {
        params.insert(*name, *value);
    }
    let signature = compute_signature(
        SECRET_KEY,
        SignatureMethod::HmacSha256,
        "POST",
        HOST,
        "/",
        &params,
    );
    params.insert("Signature", signature);
    params
}

pub fn signed_request(action: &str, extra: &[(&str, &str)]) -> RequestContext {
    RequestContext::new(Method::POST, HOST, "/", signed_params(action, extra))
}

/// Answers every call of `command` with `status` and `body`.
pub async fn mock_command(server: &MockServer, command: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(query_param("command", command))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Reports `job_id` as pending for `pending_polls` queries, then as
/// succeeded with `result`.
pub async fn mock_job_status(server: &MockServer, job_id: &str, pending_polls: u64, result: Value) {
    if pending_polls > 0 {
        Mock::given(method("GET"))
            .and(query_param("command", "queryAsyncJobResult"))
            .and(query_param("jobid", job_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "queryasyncjobresultresponse": {"jobid": job_id, "jobstatus": 0}
            })))
            .up_to_n_times(pending_polls)
            .with_priority(1)
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(query_param("command", "queryAsyncJobResult"))
        .and(query_param("jobid", job_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "queryasyncjobresultresponse": {
                "jobid": job_id,
                "jobstatus": 1,
                "jobresultcode": 0,
                "jobresult": result
            }
        })))
        .with_priority(2)
        .mount(server)
        .await;
}

/// Reports `job_id` as failed with `errortext`.
pub async fn mock_job_failure(server: &MockServer, job_id: &str, errortext: &str) {
    Mock::given(method("GET"))
        .and(query_param("command", "queryAsyncJobResult"))
        .and(query_param("jobid", job_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "queryasyncjobresultresponse": {
                "jobid": job_id,
                "jobstatus": 2,
                "jobresultcode": 530,
                "jobresult": {"errorcode": 530, "errortext": errortext}
            }
        })))
        .mount(server)
        .await;
}

/// Zone and custom disk offering lookups used by volume creation.
pub async fn mock_zone_and_offering(server: &MockServer) {
    mock_command(
        server,
        "listZones",
        200,
        json!({"listzonesresponse": {"count": 1, "zone": [
            {"id": "zone-1", "name": "zoneA", "allocationstate": "Enabled"}
        ]}}),
    )
    .await;
    mock_command(
        server,
        "listDiskOfferings",
        200,
        json!({"listdiskofferingsresponse": {"count": 1, "diskoffering": [
            {"id": "offering-1", "name": "Custom", "iscustomized": true}
        ]}}),
    )
    .await;
}
