//! Types that mirror the backend's JSON schema, plus the stamped telemetry sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::frame::RawSample;

/// A decoded frame stamped with the client receipt time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub received_at: DateTime<Utc>,
    pub cpu_percent: f32,
    pub mem_total_bytes: u64,
    pub mem_free_bytes: u64,
}

impl Sample {
    pub fn stamp(raw: RawSample, received_at: DateTime<Utc>) -> Self {
        Self {
            received_at,
            cpu_percent: raw.cpu_percent,
            mem_total_bytes: raw.mem_total_bytes,
            mem_free_bytes: raw.mem_free_bytes,
        }
    }

    /// `total - free`, or `None` when the agent reported more free than total.
    pub fn mem_used_bytes(&self) -> Option<u64> {
        self.mem_total_bytes.checked_sub(self.mem_free_bytes)
    }
}

/// Every REST response is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub time_to_process: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `data` of `GET /health`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthData {
    /// Human readable, e.g. "2 days, 3 hours, 5 minutes, 10 seconds".
    pub uptime: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub baseline_ms: Option<u64>,
    #[serde(default)]
    pub baseline_timestamp: Option<String>,
    #[serde(default)]
    pub total_requests: Option<u64>,
    #[serde(default)]
    pub active_sessions: Option<u64>,
    #[serde(default)]
    pub latency: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// One poll of the health endpoint. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    pub uptime: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub baseline_ms: Option<u64>,
    pub baseline_timestamp: Option<DateTime<Utc>>,
    pub total_requests: Option<u64>,
    pub active_sessions: Option<u64>,
    pub latency: Option<String>,
    pub version: Option<String>,
    pub time_to_process: Option<String>,
}

impl HealthSnapshot {
    /// Build from the wire form. The snapshot timestamp falls back to the
    /// envelope's `meta.timestamp` when `data.timestamp` is missing or bad.
    pub fn from_response(data: HealthData, meta: Option<ResponseMeta>) -> Self {
        let meta = meta.unwrap_or_default();
        let timestamp = data
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| meta.timestamp.as_deref().and_then(parse_timestamp));
        Self {
            uptime: data.uptime,
            timestamp,
            baseline_ms: data.baseline_ms,
            baseline_timestamp: data.baseline_timestamp.as_deref().and_then(parse_timestamp),
            total_requests: data.total_requests,
            active_sessions: data.active_sessions,
            latency: data.latency,
            version: data.version,
            time_to_process: meta.time_to_process,
        }
    }
}

/// RFC 3339 timestamps; anything else is treated as absent.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A comment as returned by `GET /posts/{id}/comments` (flat list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub post_id: u64,
    #[serde(default)]
    pub parent_id: Option<u64>,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub my_vote: i8,
}

/// Body of `POST /{posts|comments}/{id}/vote`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoteRequest {
    pub value: i8,
}

/// Server-confirmed vote totals for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub score: i64,
    /// -1, 0 or 1.
    pub my_vote: i8,
}
