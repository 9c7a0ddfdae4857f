//! Vehicle link abstraction
//!
//! The session talks to the autopilot through the [`MavlinkTransport`]
//! trait so tests can substitute a scripted link for the UDP socket.

mod udp;

pub use udp::UdpLink;

use async_trait::async_trait;
use mavlink::ardupilotmega::MavMessage;
use mavlink::MavHeader;
use thiserror::Error;

/// Configuration for the MAVLink endpoint
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Local UDP bind address (the vehicle sends to this port)
    pub bind: String,
    /// System ID for this bridge
    pub system_id: u8,
    /// Component ID for this bridge
    pub component_id: u8,
    /// Target system ID (autopilot) until a heartbeat tells us otherwise
    pub target_system: u8,
    /// Target component ID (autopilot)
    pub target_component: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:14550".into(),
            system_id: 255,      // GCS-style controller
            component_id: 190,   // MAV_COMP_ID_ONBOARD_COMPUTER
            target_system: 1,    // Autopilot
            target_component: 1, // MAV_COMP_ID_AUTOPILOT1
        }
    }
}

/// Addressing for outbound command frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MavTarget {
    pub system: u8,
    pub component: u8,
}

/// Errors raised by the vehicle link
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("mavlink encode error: {0}")]
    Write(#[from] mavlink::error::MessageWriteError),
    #[error("mavlink decode error: {0}")]
    Read(#[from] mavlink::error::MessageReadError),
}

/// A bidirectional MAVLink link to the vehicle
#[async_trait]
pub trait MavlinkTransport: Send + Sync {
    /// Send one frame to the vehicle.
    ///
    /// A no-op `Ok` until the vehicle's address has been discovered from an
    /// incoming datagram.
    async fn send(&self, msg: &MavMessage) -> Result<(), TransportError>;

    /// Try to receive one frame without blocking.
    async fn poll(&self) -> Result<Option<(MavHeader, MavMessage)>, TransportError>;
}
