//! Vehicle metrics via the mavlink2rest facade.
//!
//! Read-only companion to the control session: polls the REST telemetry
//! facade for the latest HEARTBEAT and VFR_HUD messages and normalizes them
//! into a metrics snapshot. Each read degrades independently to a default,
//! so a dead facade yields a valid (if empty) snapshot rather than an error.

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::command::modes;
use crate::session::now_ms;

pub const DEFAULT_BASE_URL: &str = "http://host.docker.internal/mavlink2rest/mavlink";

/// Per-request deadline against the facade
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Normalized metrics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct VehicleMetrics {
    pub armed: bool,
    pub current_depth: f64,
    pub current_heading: i64,
    pub mode: String,
    /// Unix time in seconds
    pub timestamp: f64,
}

/// On-demand client for the mavlink2rest telemetry facade
pub struct MetricsPoller {
    base_url: String,
    client: reqwest::Client,
}

impl MetricsPoller {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Fetch the current metrics snapshot. Never fails: unreachable or
    /// malformed reads fall back to `armed=false`, depth/heading 0 and mode
    /// "Unknown", field by field.
    pub async fn poll(&self) -> VehicleMetrics {
        let heartbeat = self.fetch_message("HEARTBEAT").await;
        let depth_read = self.fetch_message("VFR_HUD").await;
        let heading_read = self.fetch_message("VFR_HUD").await;

        let (armed, mode) = match &heartbeat {
            Some(msg) => (
                base_mode_bits(msg) & 0x80 != 0, // MAV_MODE_FLAG_SAFETY_ARMED
                msg.get("custom_mode")
                    .and_then(Value::as_u64)
                    .map(|code| modes::mode_name(code as u32))
                    .unwrap_or_else(|| "Unknown".into()),
            ),
            None => (false, "Unknown".into()),
        };

        let current_depth = depth_read
            .as_ref()
            .and_then(|msg| msg.get("alt"))
            .and_then(Value::as_f64)
            .map(|depth| (depth * 100.0).round() / 100.0)
            .unwrap_or(0.0);

        let current_heading = heading_read
            .as_ref()
            .and_then(|msg| msg.get("heading"))
            .and_then(Value::as_i64)
            .unwrap_or(0);

        VehicleMetrics {
            armed,
            current_depth,
            current_heading,
            mode,
            timestamp: now_ms() as f64 / 1000.0,
        }
    }

    /// One timed read of `{base}/vehicles/1/components/1/{name}`, unwrapping
    /// the mavlink2rest `message` envelope.
    async fn fetch_message(&self, name: &str) -> Option<Value> {
        let url = format!("{}/vehicles/1/components/1/{}", self.base_url, name);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(body) => body.get("message").cloned(),
                Err(e) => {
                    warn!("Malformed response from {}: {}", url, e);
                    None
                }
            },
            Ok(resp) => {
                warn!("Telemetry facade returned {} for {}", resp.status(), url);
                None
            }
            Err(e) => {
                warn!("Failed to reach telemetry facade: {}", e);
                None
            }
        }
    }
}

/// mavlink2rest serializes bitmask enums as `{"bits": n}`; older builds used
/// a bare integer. Accept both.
fn base_mode_bits(msg: &Value) -> u64 {
    match msg.get("base_mode") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(obj) => obj.get("bits").and_then(Value::as_u64).unwrap_or(0),
        None => 0,
    }
}
