use std::net::{SocketAddr, UdpSocket};

use crate::net::{is_benign_reset, NetworkError};
use crate::protocol;

// Owns the outbound socket for its lifetime. One datagram per call, no
// retries; a lost sample is forfeit.
pub struct TelemetrySender {
    socket: UdpSocket,
    sent: u64,
    suppressed: u64,
}

impl TelemetrySender {
    // Binds an ephemeral local port; the destination is chosen per datagram.
    pub fn bind() -> Result<Self, NetworkError> {
        let addr: SocketAddr = ([0, 0, 0, 0], 0).into();
        let socket =
            UdpSocket::bind(addr).map_err(|source| NetworkError::Bind { addr, source })?;
        Ok(Self {
            socket,
            sent: 0,
            suppressed: 0,
        })
    }

    pub fn send(
        &mut self,
        dest: SocketAddr,
        timestamp_ms: u32,
        value: f32,
    ) -> Result<(), NetworkError> {
        let packet = protocol::encode_sample(timestamp_ms, value);
        match self.socket.send_to(&packet, dest) {
            Ok(_) => {
                self.sent += 1;
                Ok(())
            }
            Err(source) if is_benign_reset(&source) => {
                // Nobody listening on the other side; keep transmitting
                self.suppressed += 1;
                Ok(())
            }
            Err(source) => Err(NetworkError::Send { dest, source }),
        }
    }

    // Datagrams that actually left the socket.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    // Sends swallowed because the peer was not listening.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}
