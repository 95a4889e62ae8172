use std::io;
use std::net::SocketAddr;

use thiserror::Error;

pub mod command;
pub mod telemetry;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to bind udp socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("udp send to {dest} failed: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: io::Error,
    },
}

// Peer-not-listening style failures. Loopback telemetry with no consumer on
// the other end raises these on every send; they carry nothing worth logging.
pub(crate) fn is_benign_reset(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset
    )
}
