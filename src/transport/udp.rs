//! UDP MAVLink endpoint.
//!
//! Binds the well-known telemetry port and learns the vehicle's address
//! from the first datagram it sends us, the same way a GCS-side `udpin`
//! connection behaves. Outbound frames are dropped until then.

use std::io::{self, Cursor};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use mavlink::ardupilotmega::MavMessage;
use mavlink::peek_reader::PeekReader;
use mavlink::MavHeader;
use tokio::sync::Mutex;
use tracing::debug;

use super::{LinkConfig, MavlinkTransport, TransportError};

/// Largest MAVLink v2 frame with headroom
const RECV_BUF_LEN: usize = 512;

/// Nonblocking UDP link to the vehicle
pub struct UdpLink {
    socket: UdpSocket,
    system_id: u8,
    component_id: u8,
    sequence: AtomicU8,
    peer: Mutex<Option<SocketAddr>>,
}

impl UdpLink {
    /// Bind the configured local address in non-blocking mode.
    pub fn bind(config: &LinkConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(&config.bind)?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            socket,
            system_id: config.system_id,
            component_id: config.component_id,
            sequence: AtomicU8::new(0),
            peer: Mutex::new(None),
        })
    }

    fn next_header(&self) -> MavHeader {
        MavHeader {
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl MavlinkTransport for UdpLink {
    async fn send(&self, msg: &MavMessage) -> Result<(), TransportError> {
        let Some(addr) = *self.peer.lock().await else {
            // Vehicle not discovered yet; nothing to address the frame to.
            return Ok(());
        };

        let mut buf = Cursor::new(Vec::with_capacity(280));
        mavlink::write_v2_msg(&mut buf, self.next_header(), msg)?;
        self.socket.send_to(&buf.into_inner(), addr)?;
        Ok(())
    }

    async fn poll(&self) -> Result<Option<(MavHeader, MavMessage)>, TransportError> {
        let mut buf = [0u8; RECV_BUF_LEN];
        match self.socket.recv_from(&mut buf) {
            Ok((len, addr)) => {
                let mut peer = self.peer.lock().await;
                if peer.is_none() {
                    debug!("Vehicle endpoint discovered at {}", addr);
                    *peer = Some(addr);
                }
                drop(peer);

                let mut reader = PeekReader::new(Cursor::new(&buf[..len]));
                let frame = mavlink::read_v2_msg::<MavMessage, _>(&mut reader)?;
                Ok(Some(frame))
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::ardupilotmega::{
        MavAutopilot, MavModeFlag, MavState, MavType, HEARTBEAT_DATA,
    };

    fn test_config() -> LinkConfig {
        LinkConfig {
            bind: "127.0.0.1:0".into(),
            ..Default::default()
        }
    }

    fn vehicle_heartbeat() -> MavMessage {
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 2,
            mavtype: MavType::MAV_TYPE_SUBMARINE,
            autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
            base_mode: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        })
    }

    #[tokio::test]
    async fn send_without_peer_is_noop() {
        let link = UdpLink::bind(&test_config()).unwrap();
        assert!(link.send(&vehicle_heartbeat()).await.is_ok());
    }

    #[tokio::test]
    async fn poll_on_idle_socket_returns_none() {
        let link = UdpLink::bind(&test_config()).unwrap();
        let frame = link.poll().await.unwrap();
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn loopback_discovers_peer_and_replies() {
        let link = UdpLink::bind(&test_config()).unwrap();
        let link_addr = link.socket.local_addr().unwrap();

        // Simulated vehicle sends us a heartbeat
        let vehicle = UdpSocket::bind("127.0.0.1:0").unwrap();
        let header = MavHeader {
            system_id: 1,
            component_id: 1,
            sequence: 0,
        };
        let mut buf = Cursor::new(Vec::with_capacity(280));
        mavlink::write_v2_msg(&mut buf, header, &vehicle_heartbeat()).unwrap();
        vehicle.send_to(&buf.into_inner(), link_addr).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));

        let (header, msg) = link.poll().await.unwrap().expect("frame expected");
        assert_eq!(header.system_id, 1);
        assert!(matches!(msg, MavMessage::HEARTBEAT(_)));

        // Replies now reach the discovered endpoint
        link.send(&vehicle_heartbeat()).await.unwrap();
        vehicle
            .set_read_timeout(Some(std::time::Duration::from_millis(500)))
            .unwrap();
        let mut recv = [0u8; RECV_BUF_LEN];
        let (len, _) = vehicle.recv_from(&mut recv).unwrap();
        assert!(len > 0);
    }
}
