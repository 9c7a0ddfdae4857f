//! Vehicle control session.
//!
//! Owns the MAVLink link, the shared vehicle state snapshot and the
//! heartbeat monitor lifecycle, and exposes the gated command API the HTTP
//! adapter calls into. One session per vehicle; instantiate and inject.

pub(crate) mod monitor;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{error, warn};

use crate::command::{encoder, modes};
use crate::transport::{LinkConfig, MavTarget, MavlinkTransport, UdpLink};

const NO_CONNECTION: &str = "No connection to vehicle";

/// Latch poll interval for `wait_for_heartbeat`
const HEARTBEAT_POLL: Duration = Duration::from_millis(100);
/// Settle window after an arm command before the armed flag is trusted
const ARM_SETTLE: Duration = Duration::from_secs(2);
/// Settle window after a mode change command
const MODE_SETTLE: Duration = Duration::from_secs(1);
/// Bounded wait for the monitor task on disconnect
const MONITOR_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Snapshot of what we know about the vehicle.
///
/// `armed` and `custom_mode` are only meaningful once `heartbeat_received`
/// is true; `connected` alone says nothing about the vehicle being alive.
#[derive(Debug, Clone, Default)]
pub struct VehicleState {
    pub connected: bool,
    pub heartbeat_received: bool,
    pub armed: bool,
    pub custom_mode: u32,
    pub last_updated_ms: u64,
}

/// Structured result of every session command; expected failures are data,
/// not errors.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Status as reported on `/api/status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub connected: bool,
    pub heartbeat: bool,
    pub armed: bool,
    pub mode: Option<u32>,
}

/// Control session for one vehicle
pub struct VehicleSession {
    config: LinkConfig,
    link: RwLock<Option<Arc<dyn MavlinkTransport>>>,
    state: Arc<RwLock<VehicleState>>,
    target: Arc<RwLock<MavTarget>>,
    running: Arc<AtomicBool>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    boot_time: RwLock<Option<Instant>>,
}

impl VehicleSession {
    pub fn new(config: LinkConfig) -> Self {
        let target = MavTarget {
            system: config.target_system,
            component: config.target_component,
        };

        Self {
            config,
            link: RwLock::new(None),
            state: Arc::new(RwLock::new(VehicleState::default())),
            target: Arc::new(RwLock::new(target)),
            running: Arc::new(AtomicBool::new(false)),
            monitor: Mutex::new(None),
            boot_time: RwLock::new(None),
        }
    }

    /// Open the MAVLink endpoint and start the heartbeat monitor.
    ///
    /// Returns as soon as the endpoint is open; heartbeat acquisition is
    /// observed through `wait_for_heartbeat` or `status`.
    pub async fn connect(&self) -> CommandOutcome {
        if self.link.read().await.is_some() {
            return CommandOutcome::ok("Already connected");
        }

        match UdpLink::bind(&self.config) {
            Ok(link) => {
                self.attach(Arc::new(link)).await;
                CommandOutcome::ok("Connection initiated")
            }
            Err(e) => {
                error!("Failed to open MAVLink endpoint: {}", e);
                CommandOutcome::fail(format!("Failed to initiate connection: {}", e))
            }
        }
    }

    /// Install a link and spawn the monitor over it.
    async fn attach(&self, link: Arc<dyn MavlinkTransport>) {
        *self.boot_time.write().await = Some(Instant::now());
        *self.target.write().await = MavTarget {
            system: self.config.target_system,
            component: self.config.target_component,
        };
        *self.state.write().await = VehicleState {
            connected: true,
            ..Default::default()
        };
        *self.link.write().await = Some(link.clone());

        self.running.store(true, Ordering::SeqCst);
        let handle = tokio::spawn(monitor::run(
            link,
            self.state.clone(),
            self.target.clone(),
            self.running.clone(),
        ));
        *self.monitor.lock().await = Some(handle);
    }

    /// Stop the monitor (bounded wait), drop the link and reset state.
    ///
    /// Safe to call repeatedly. An in-flight command holding its own clone
    /// of the link keeps the socket alive until that send completes.
    pub async fn disconnect(&self) -> CommandOutcome {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.monitor.lock().await.take() {
            if timeout(MONITOR_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("Heartbeat monitor did not stop within 1s, continuing");
            }
        }

        *self.link.write().await = None;
        *self.boot_time.write().await = None;
        *self.state.write().await = VehicleState::default();

        CommandOutcome::ok("Disconnected from vehicle")
    }

    /// Block the caller until the first heartbeat or the timeout elapses.
    pub async fn wait_for_heartbeat(&self, timeout_secs: u64) -> bool {
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        loop {
            if self.state.read().await.heartbeat_received {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(HEARTBEAT_POLL).await;
        }
    }

    pub async fn status(&self) -> StatusReport {
        let state = self.state.read().await.clone();
        StatusReport {
            connected: state.connected,
            heartbeat: state.heartbeat_received,
            armed: state.armed,
            mode: state.heartbeat_received.then_some(state.custom_mode),
        }
    }

    /// Send the arm command and report based on the armed flag after the
    /// settle window; confirmation comes from the next heartbeat, not an
    /// ack.
    pub async fn arm(&self) -> CommandOutcome {
        let link = match self.ready_link().await {
            Ok(link) => link,
            Err(outcome) => return outcome,
        };

        let target = *self.target.read().await;
        if let Err(e) = link.send(&encoder::arm_command(target)).await {
            error!("Arm command failed: {}", e);
            return CommandOutcome::fail(format!("Arm command failed: {}", e));
        }

        sleep(ARM_SETTLE).await;
        if self.state.read().await.armed {
            CommandOutcome::ok("Vehicle armed successfully")
        } else {
            CommandOutcome::fail("Failed to arm vehicle")
        }
    }

    /// Resolve the mode name and send the mode change.
    ///
    /// Reports success after the settle window without re-checking state;
    /// callers poll `/api/status` to confirm the switch.
    pub async fn set_mode(&self, mode_name: &str) -> CommandOutcome {
        let link = match self.ready_link().await {
            Ok(link) => link,
            Err(outcome) => return outcome,
        };

        let Some(code) = modes::mode_code(mode_name) else {
            return CommandOutcome::fail(format!("Unknown mode: {}", mode_name));
        };

        let target = *self.target.read().await;
        if let Err(e) = link.send(&encoder::set_mode_command(target, code)).await {
            error!("Mode change failed: {}", e);
            return CommandOutcome::fail(format!("Mode change failed: {}", e));
        }

        sleep(MODE_SETTLE).await;
        CommandOutcome::ok(format!("Mode set to {}", modes::mode_name(code)))
    }

    /// Drive in a direction for a fixed duration, then stop.
    ///
    /// Holds the caller for the whole duration and always finishes with an
    /// all-zero frame. Unrecognized directions send zero axes and still run
    /// the full sequence.
    pub async fn send_movement(
        &self,
        direction: &str,
        throttle: f32,
        duration_secs: f32,
    ) -> CommandOutcome {
        let link = match self.ready_link().await {
            Ok(link) => link,
            Err(outcome) => return outcome,
        };

        let target = *self.target.read().await;
        let axes = encoder::axes_for_direction(direction, throttle);
        if let Err(e) = link.send(&encoder::manual_control(target, axes)).await {
            error!("Movement command failed: {}", e);
            return CommandOutcome::fail(format!("Movement command failed: {}", e));
        }

        // Negative, NaN or out-of-range durations hold for zero; the stop
        // frame below must go out no matter what the caller asked for.
        let hold = Duration::try_from_secs_f32(duration_secs).unwrap_or(Duration::ZERO);
        sleep(hold).await;

        let stop = encoder::manual_control(target, encoder::ManualAxes::default());
        if let Err(e) = link.send(&stop).await {
            error!("Movement stop failed: {}", e);
            return CommandOutcome::fail(format!("Movement stop failed: {}", e));
        }

        CommandOutcome::ok(format!(
            "Movement command executed: {} for {}s at throttle {}",
            direction, duration_secs, throttle
        ))
    }

    /// Send a depth setpoint; depth hold takes it from there.
    pub async fn set_depth(&self, depth_m: f32) -> CommandOutcome {
        let link = match self.ready_link().await {
            Ok(link) => link,
            Err(outcome) => return outcome,
        };

        let target = *self.target.read().await;
        let msg = encoder::depth_target(self.time_boot_ms().await, target, depth_m);
        if let Err(e) = link.send(&msg).await {
            error!("Depth command failed: {}", e);
            return CommandOutcome::fail(format!("Depth command failed: {}", e));
        }

        CommandOutcome::ok(format!("Target depth set to {} meters", depth_m))
    }

    /// Send an attitude setpoint. Requires ALT_HOLD so the depth controller
    /// keeps owning throttle.
    pub async fn set_attitude(&self, roll_deg: f32, pitch_deg: f32, yaw_deg: f32) -> CommandOutcome {
        let link = match self.ready_link().await {
            Ok(link) => link,
            Err(outcome) => return outcome,
        };

        if self.state.read().await.custom_mode != modes::ALT_HOLD {
            return CommandOutcome::fail("Attitude control only available in ALT_HOLD mode");
        }

        let target = *self.target.read().await;
        let msg = encoder::attitude_target(
            self.time_boot_ms().await,
            target,
            roll_deg,
            pitch_deg,
            yaw_deg,
        );
        if let Err(e) = link.send(&msg).await {
            error!("Attitude command failed: {}", e);
            return CommandOutcome::fail(format!("Attitude command failed: {}", e));
        }

        CommandOutcome::ok(format!(
            "Target attitude set to roll={} pitch={} yaw={} degrees",
            roll_deg, pitch_deg, yaw_deg
        ))
    }

    /// Yaw-only attitude setpoint. Same ALT_HOLD requirement.
    pub async fn set_heading(&self, heading_deg: f32) -> CommandOutcome {
        let link = match self.ready_link().await {
            Ok(link) => link,
            Err(outcome) => return outcome,
        };

        if self.state.read().await.custom_mode != modes::ALT_HOLD {
            return CommandOutcome::fail("Heading control only available in ALT_HOLD mode");
        }

        let target = *self.target.read().await;
        let msg = encoder::attitude_target(self.time_boot_ms().await, target, 0.0, 0.0, heading_deg);
        if let Err(e) = link.send(&msg).await {
            error!("Heading command failed: {}", e);
            return CommandOutcome::fail(format!("Heading command failed: {}", e));
        }

        CommandOutcome::ok(format!("Target heading set to {} degrees", heading_deg))
    }

    /// Connection precondition shared by every command: link open and first
    /// heartbeat seen. Checked before any mode requirement.
    async fn ready_link(&self) -> Result<Arc<dyn MavlinkTransport>, CommandOutcome> {
        let link = self.link.read().await.clone();
        match link {
            Some(link) if self.state.read().await.heartbeat_received => Ok(link),
            _ => Err(CommandOutcome::fail(NO_CONNECTION)),
        }
    }

    async fn time_boot_ms(&self) -> u32 {
        match *self.boot_time.read().await {
            Some(boot) => boot.elapsed().as_millis().min(u32::MAX as u128) as u32,
            None => 0,
        }
    }
}
