//! HTTP client for the CFS master admin API.
//!
//! Every call is an unauthenticated `GET` with query parameters.  Masters
//! answer either with an opaque body (older releases) or with a JSON envelope
//! `{"code": 0, "msg": "...", "data": ...}`; both are understood here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{AdminOutcome, LAYOUT, LeaderQuery, REPLICAS, VolumeAdmin};
use crate::error::CsiError;

/// Client for the master admin endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct MasterClient {
    http: reqwest::Client,
}

impl MasterClient {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, CsiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CsiError::internal)?;
        Ok(Self { http })
    }

    async fn admin(
        &self,
        endpoint: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<AdminOutcome, CsiError> {
        let url = format!("http://{endpoint}{path}");
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CsiError::Unavailable(format!("GET {url}: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CsiError::Unavailable(format!("read reply of {url}: {e}")))?;
        debug!(%url, %status, %body, "master replied");
        classify_reply(status, &body)
    }
}

#[async_trait]
impl LeaderQuery for MasterClient {
    #[instrument(skip(self))]
    async fn leader_of(&self, endpoint: &str) -> Result<String, CsiError> {
        let url = format!("http://{endpoint}/admin/getCluster");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CsiError::Unavailable(format!("GET {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CsiError::Unavailable(format!("GET {url}: status {status}")));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| CsiError::Unavailable(format!("read reply of {url}: {e}")))?;
        parse_leader(&body)
    }
}

#[async_trait]
impl VolumeAdmin for MasterClient {
    #[instrument(skip(self))]
    async fn create_volume(&self, leader: &str, name: &str) -> Result<AdminOutcome, CsiError> {
        self.admin(
            leader,
            "/admin/createVol",
            &[
                ("name", name.to_owned()),
                ("replicas", REPLICAS.to_string()),
                ("type", LAYOUT.to_owned()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn create_data_partitions(
        &self,
        leader: &str,
        name: &str,
        count: u64,
    ) -> Result<AdminOutcome, CsiError> {
        self.admin(
            leader,
            "/dataPartition/create",
            &[
                ("count", count.to_string()),
                ("name", name.to_owned()),
                ("type", LAYOUT.to_owned()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_volume(&self, leader: &str, name: &str) -> Result<AdminOutcome, CsiError> {
        self.admin(leader, "/vol/delete", &[("name", name.to_owned())])
            .await
    }
}

/// Extract `LeaderAddr` from a describe-cluster reply.
pub fn parse_leader(body: &str) -> Result<String, CsiError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| CsiError::Unavailable(format!("unparsable getCluster reply: {e}")))?;

    if let Some(code) = value.get("code").and_then(Value::as_i64)
        && code != 0
    {
        let msg = value.get("msg").and_then(Value::as_str).unwrap_or_default();
        return Err(CsiError::Unavailable(format!(
            "getCluster rejected (code {code}): {msg}"
        )));
    }

    let view = value
        .get("data")
        .filter(|d| d.is_object())
        .unwrap_or(&value);
    match view.get("LeaderAddr").and_then(Value::as_str) {
        Some(leader) if !leader.is_empty() => Ok(leader.to_owned()),
        _ => Err(CsiError::Unavailable(
            "getCluster reply carries no leader".into(),
        )),
    }
}

/// Turn an admin reply into an [`AdminOutcome`].
///
/// * `404` whose body says the volume does not exist means the volume is
///   unknown.  Any other `404` (a wrong path, a router in front of the
///   master) is [`CsiError::Unavailable`], like every other non-2xx status.
/// * A 2xx envelope with a non-zero `code` is a rejection; "not exists" and
///   "duplicate"/"already exists" messages are recognised, anything else is
///   [`CsiError::Internal`].
/// * A 2xx body without an envelope is success.
pub fn classify_reply(status: StatusCode, body: &str) -> Result<AdminOutcome, CsiError> {
    if status == StatusCode::NOT_FOUND && reports_absent(body) {
        return Ok(AdminOutcome::Absent);
    }
    if !status.is_success() {
        return Err(CsiError::Unavailable(format!(
            "master returned {status}: {body}"
        )));
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Ok(AdminOutcome::Done);
    };
    let Some(code) = value.get("code").and_then(Value::as_i64) else {
        return Ok(AdminOutcome::Done);
    };
    if code == 0 {
        return Ok(AdminOutcome::Done);
    }

    let msg = value.get("msg").and_then(Value::as_str).unwrap_or_default();
    let lower = msg.to_ascii_lowercase();
    if reports_absent(&lower) {
        Ok(AdminOutcome::Absent)
    } else if lower.contains("duplicate") || lower.contains("already exist") {
        Ok(AdminOutcome::AlreadyExists)
    } else {
        Err(CsiError::Internal(format!(
            "master rejected request (code {code}): {msg}"
        )))
    }
}

fn reports_absent(msg: &str) -> bool {
    msg.to_ascii_lowercase().contains("not exist")
}
