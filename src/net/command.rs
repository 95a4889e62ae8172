use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::Mutex;

use crate::net::{is_benign_reset, NetworkError};
use crate::protocol;
use crate::state::{EventLog, SharedState};

// Sleep when the socket has nothing for us.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

// Pause before retrying a failed bind.
const REBIND_RETRY: Duration = Duration::from_secs(1);

pub struct ReceiverStats {
    pub accepted: AtomicU64,
    pub discarded: AtomicU64,
    pub shutdown: AtomicBool,
    bound: Mutex<Option<SocketAddr>>,
}

impl ReceiverStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            accepted: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            bound: Mutex::new(None),
        })
    }

    // Address the listener actually bound, once it has one.
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock()
    }

    fn set_bound(&self, addr: Option<SocketAddr>) {
        *self.bound.lock() = addr;
    }
}

fn bind_listener(addr: SocketAddr) -> Result<UdpSocket, NetworkError> {
    let socket = UdpSocket::bind(addr).map_err(|source| NetworkError::Bind { addr, source })?;
    socket
        .set_nonblocking(true)
        .map_err(|source| NetworkError::Bind { addr, source })?;
    Ok(socket)
}

// Listens for 4-byte setpoint datagrams and writes them straight into the
// shared state. The socket is owned by this thread; endpoint changes from
// the parameter snapshot are applied between receive attempts, never during
// one. A failed bind leaves the receiver running without a socket until the
// next retry.
pub fn spawn_receiver_thread(
    state: SharedState,
    events: EventLog,
) -> (thread::JoinHandle<()>, Arc<ReceiverStats>) {
    let stats = ReceiverStats::new();
    let stats_clone = stats.clone();

    let handle = thread::spawn(move || {
        let mut socket: Option<UdpSocket> = None;
        let mut bound_to: Option<SocketAddr> = None;
        let mut next_bind_attempt = Instant::now();
        let mut buf = [0u8; 1024];

        loop {
            if stats_clone.shutdown.load(Ordering::Relaxed) {
                break;
            }

            let target = state.params().listen_addr;
            if bound_to != Some(target) {
                // Endpoint changed: drop the old socket before binding anew
                socket = None;
                bound_to = Some(target);
                stats_clone.set_bound(None);
                next_bind_attempt = Instant::now();
            }

            if socket.is_none() {
                if Instant::now() < next_bind_attempt {
                    thread::sleep(POLL_INTERVAL);
                    continue;
                }
                match bind_listener(target) {
                    Ok(s) => {
                        stats_clone.set_bound(s.local_addr().ok());
                        events.push(format!("[CMD] listening on {target}"));
                        socket = Some(s);
                    }
                    Err(e) => {
                        warn!("{e}; receiver degraded until next retry");
                        next_bind_attempt = Instant::now() + REBIND_RETRY;
                        thread::sleep(POLL_INTERVAL);
                        continue;
                    }
                }
            }

            if let Some(sock) = &socket {
                match sock.recv_from(&mut buf) {
                    Ok((len, src)) => {
                        if let Some(setpoint) = protocol::decode_setpoint(&buf[..len]) {
                            state.set_setpoint(setpoint as f64);
                            stats_clone.accepted.fetch_add(1, Ordering::Relaxed);
                            events.push(format!("[CMD] setpoint {setpoint:.3} from {src}"));
                        } else {
                            // Wrong-size datagram: not ours, drop it silently
                            stats_clone.discarded.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        thread::sleep(POLL_INTERVAL);
                    }
                    Err(e) if is_benign_reset(&e) => {}
                    Err(e) => {
                        warn!("command receiver: {e}");
                        thread::sleep(POLL_INTERVAL);
                    }
                }
            }
        }
    });

    (handle, stats)
}
