//! Console REST client — [`Console`] trait and the ureq-backed
//! [`ConsoleClient`].
//!
//! # Consumed surface
//!
//! | Operation                     | Endpoint                        |
//! |-------------------------------|---------------------------------|
//! | List / fetch jobs             | `GET /jobs`, `GET /jobs/{id}`   |
//! | Create job (best-effort mode) | `POST /jobs?ignore_errors=`     |
//! | Full replace                  | `PUT /jobs/{id}`                |
//! | Delete                        | `DELETE /jobs/{id}`             |
//! | Agent directory               | `GET /agents`                   |
//! | Runs                          | `GET /runs?job_id=`, `POST /runs`, `PUT /runs/{id}/stop` |
//! | Hydrate                       | `PUT /runs/{id}/files/hydrate`  |

use std::time::Duration;

use serde_json::{json, Value};

use crate::error::ApiError;
use crate::types::{HydrateReport, JobSpec, RemoteAgent, RemoteJob, RunInfo};

/// API root appended to the configured console URL.
pub const API_ROOT: &str = "/api/v2";

/// Hard cap the console places on one hydrate request.
pub const MAX_HYDRATE_PATHS: usize = 1000;

const CALL_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The console operations the reconciliation engine depends on.
///
/// Implemented by [`ConsoleClient`] for production and by in-memory fakes in
/// engine tests; the engine receives it as an injected dependency, never as
/// global state.
pub trait Console {
    fn jobs(&self) -> Result<Vec<RemoteJob>, ApiError>;
    fn job(&self, id: u64) -> Result<RemoteJob, ApiError>;
    fn agents(&self) -> Result<Vec<RemoteAgent>, ApiError>;
    /// Create a job; with `ignore_errors` the console is asked to tolerate
    /// partial validation failures instead of rejecting the whole payload.
    fn create_job(&self, spec: &JobSpec, ignore_errors: bool) -> Result<u64, ApiError>;
    fn update_job(&self, id: u64, body: &Value) -> Result<(), ApiError>;
    fn delete_job(&self, id: u64) -> Result<(), ApiError>;
    fn runs_for_job(&self, job_id: u64) -> Result<Vec<RunInfo>, ApiError>;
    fn start_run(&self, job_id: u64) -> Result<u64, ApiError>;
    fn stop_run(&self, run_id: u64) -> Result<(), ApiError>;
    fn hydrate(
        &self,
        run_id: u64,
        files: &[String],
        agents: Option<&[u64]>,
    ) -> Result<HydrateReport, ApiError>;
}

// ---------------------------------------------------------------------------
// ureq client
// ---------------------------------------------------------------------------

/// Bearer-token console client over ureq.
pub struct ConsoleClient {
    base_url: String,
    token: String,
    agent: ureq::Agent,
}

impl ConsoleClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
            agent: ureq::AgentBuilder::new().timeout(CALL_TIMEOUT).build(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_ROOT}{path}", self.base_url)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.agent
            .request(method, &self.url(path))
            .set("Authorization", &format!("Token {}", self.token))
            .set("Content-Type", "application/json")
    }

    fn call(&self, request: ureq::Request) -> Result<ureq::Response, ApiError> {
        request.call().map_err(map_err)
    }

    fn send(&self, request: ureq::Request, body: &Value) -> Result<ureq::Response, ApiError> {
        request.send_json(body).map_err(map_err)
    }

    /// Extract the new resource id from a create response (`{"id": N}`).
    fn created_id(response: ureq::Response) -> Result<u64, ApiError> {
        let body = into_json(response)?;
        body.get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| ApiError::Generic(format!("create response carried no id: {body}")))
    }
}

impl Console for ConsoleClient {
    fn jobs(&self) -> Result<Vec<RemoteJob>, ApiError> {
        decode(into_json(self.call(self.request("GET", "/jobs"))?)?)
    }

    fn job(&self, id: u64) -> Result<RemoteJob, ApiError> {
        decode(into_json(self.call(self.request("GET", &format!("/jobs/{id}")))?)?)
    }

    fn agents(&self) -> Result<Vec<RemoteAgent>, ApiError> {
        decode(into_json(self.call(self.request("GET", "/agents"))?)?)
    }

    fn create_job(&self, spec: &JobSpec, ignore_errors: bool) -> Result<u64, ApiError> {
        let request = self
            .request("POST", "/jobs")
            .query("ignore_errors", if ignore_errors { "true" } else { "false" });
        let body = serde_json::to_value(spec)
            .map_err(|e| ApiError::Generic(format!("failed to encode job body: {e}")))?;
        Self::created_id(self.send(request, &body)?)
    }

    fn update_job(&self, id: u64, body: &Value) -> Result<(), ApiError> {
        self.send(self.request("PUT", &format!("/jobs/{id}")), body)?;
        Ok(())
    }

    fn delete_job(&self, id: u64) -> Result<(), ApiError> {
        self.call(self.request("DELETE", &format!("/jobs/{id}")))?;
        Ok(())
    }

    fn runs_for_job(&self, job_id: u64) -> Result<Vec<RunInfo>, ApiError> {
        let request = self
            .request("GET", "/runs")
            .query("job_id", &job_id.to_string());
        decode(into_json(self.call(request)?)?)
    }

    fn start_run(&self, job_id: u64) -> Result<u64, ApiError> {
        let body = json!({ "job_id": job_id });
        Self::created_id(self.send(self.request("POST", "/runs"), &body)?)
    }

    fn stop_run(&self, run_id: u64) -> Result<(), ApiError> {
        self.call(self.request("PUT", &format!("/runs/{run_id}/stop")))?;
        Ok(())
    }

    fn hydrate(
        &self,
        run_id: u64,
        files: &[String],
        agents: Option<&[u64]>,
    ) -> Result<HydrateReport, ApiError> {
        if files.len() > MAX_HYDRATE_PATHS {
            return Err(ApiError::PayloadLimit {
                limit: MAX_HYDRATE_PATHS,
                got: files.len(),
            });
        }

        let mut body = json!({ "files": files });
        if let Some(agents) = agents {
            body["agents"] = json!(agents);
        }
        let request = self.request("PUT", &format!("/runs/{run_id}/files/hydrate"));
        decode(into_json(self.send(request, &body)?)?)
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_err(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(code, response) => {
            let message = status_message(response);
            match code {
                401 => ApiError::Unauthorized(message),
                404 => ApiError::NotFound(message),
                _ => ApiError::Generic(format!("console returned {code}: {message}")),
            }
        }
        ureq::Error::Transport(transport) => ApiError::Connection(transport.to_string()),
    }
}

/// Error detail: the body's `message` field when the body is JSON and has
/// one, else the raw response text.
fn status_message(response: ureq::Response) -> String {
    let raw = response.into_string().unwrap_or_default();
    match serde_json::from_str::<Value>(&raw) {
        Ok(body) => body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or(raw),
        Err(_) => raw,
    }
}

fn into_json(response: ureq::Response) -> Result<Value, ApiError> {
    response
        .into_json()
        .map_err(|e| ApiError::Generic(format!("console response was not valid JSON: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::Generic(format!("unexpected console response shape: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ConsoleClient::new("https://console.example.com/", "t");
        assert_eq!(client.url("/jobs"), "https://console.example.com/api/v2/jobs");
    }

    #[test]
    fn hydrate_rejects_oversized_payload_without_a_request() {
        // Unroutable host: reaching the transport at all would fail the test
        // with a Connection error instead of PayloadLimit.
        let client = ConsoleClient::new("http://192.0.2.1", "t");
        let files: Vec<String> = (0..1001).map(|i| format!("/files/{i}")).collect();
        let err = client.hydrate(1, &files, None).expect_err("should reject");
        match err {
            ApiError::PayloadLimit { limit, got } => {
                assert_eq!(limit, MAX_HYDRATE_PATHS);
                assert_eq!(got, 1001);
            }
            other => panic!("expected payload limit, got {other:?}"),
        }
    }

    #[test]
    fn exactly_limit_paths_is_not_rejected_client_side() {
        let client = ConsoleClient::new("http://127.0.0.1:1", "t");
        let files: Vec<String> = (0..MAX_HYDRATE_PATHS).map(|i| format!("/files/{i}")).collect();
        // The limit check passes; the dead endpoint then yields Connection.
        let err = client.hydrate(1, &files, None).expect_err("dead endpoint");
        assert!(matches!(err, ApiError::Connection(_)), "got {err:?}");
    }
}
