//! Heartbeat monitor task.
//!
//! Sole writer of the telemetry fields in [`VehicleState`]. Runs until the
//! session clears the `running` flag; faults are logged and retried, never
//! surfaced to callers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mavlink::ardupilotmega::{MavMessage, MavModeFlag, HEARTBEAT_DATA};
use mavlink::MavHeader;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{info, warn};

use super::{now_ms, VehicleState};
use crate::transport::{MavTarget, MavlinkTransport};

/// Idle wait between receive drains; heartbeats arrive at 1 Hz
const IDLE_INTERVAL: Duration = Duration::from_millis(100);
/// Backoff after a transport error before retrying
const ERROR_BACKOFF: Duration = Duration::from_secs(1);
/// Most messages consumed per drain pass. Keeps a flooding peer from
/// starving the shutdown check between passes.
const DRAIN_BATCH: usize = 64;

pub(crate) async fn run(
    link: Arc<dyn MavlinkTransport>,
    state: Arc<RwLock<VehicleState>>,
    target: Arc<RwLock<MavTarget>>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        // Drain whatever arrived since the last pass, up to a batch cap
        for _ in 0..DRAIN_BATCH {
            match link.poll().await {
                Ok(Some((header, MavMessage::HEARTBEAT(hb)))) => {
                    apply_heartbeat(&state, &target, &header, &hb).await;
                }
                Ok(Some(_)) => {} // other telemetry, not ours to track
                Ok(None) => break,
                Err(e) => {
                    warn!("Connection monitoring error: {}", e);
                    sleep(ERROR_BACKOFF).await;
                    break;
                }
            }
        }
        sleep(IDLE_INTERVAL).await;
    }
}

async fn apply_heartbeat(
    state: &RwLock<VehicleState>,
    target: &RwLock<MavTarget>,
    header: &MavHeader,
    hb: &HEARTBEAT_DATA,
) {
    let mut state = state.write().await;
    if !state.heartbeat_received {
        info!(
            "Heartbeat received from vehicle (system {} component {})",
            header.system_id, header.component_id
        );
        state.heartbeat_received = true;
        // Command frames go to whoever is heartbeating at us
        *target.write().await = MavTarget {
            system: header.system_id,
            component: header.component_id,
        };
    }
    state.armed = hb.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED);
    state.custom_mode = hb.custom_mode;
    state.last_updated_ms = now_ms();
}
