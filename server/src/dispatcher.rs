use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use line_server_net::{data_types::ConnectionId, sockets::line_stream::LineStream};
use log::{debug, error, info, warn};

use crate::{connection::ClientConnection, worker_pool::WorkerPool};

const WAKE_TIMEOUT: Duration = Duration::from_secs(1);
const ACCEPT_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Asks a dispatcher to stop accepting connections. Clones share the same flag,
/// so one can be handed to a signal handler while the server keeps another.
#[derive(Clone)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl StopSignal {
    /// `listen_addr` is the address the dispatcher's listener is bound to
    pub fn new(listen_addr: SocketAddr) -> Self {
        let ip = match listen_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };

        Self {
            requested: Arc::new(AtomicBool::new(false)),
            wake_addr: SocketAddr::new(ip, listen_addr.port()),
        }
    }

    /// Sets the flag then connects to the listener so that a dispatcher blocked
    /// in accept() wakes up and sees it. Only the first request does anything.
    pub fn request(self: &Self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("StopSignal: Shutdown requested");
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            debug!("StopSignal: Could not wake listener at {}: {e}", self.wake_addr);
        }
    }

    pub fn is_requested(self: &Self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Owns the listening socket. Accepts connections on the calling thread and
/// hands each one to the worker pool as a task. Construct with new() then call
/// run(), which returns once the stop signal has been raised.
pub struct Dispatcher {
    listener: TcpListener,
    pool: Arc<WorkerPool>,
    stop_signal: StopSignal,
    next_connection_id: ConnectionId,
}

impl Dispatcher {
    pub fn new(listener: TcpListener, pool: &Arc<WorkerPool>, stop_signal: &StopSignal) -> Self {
        Self {
            listener,
            pool: pool.clone(),
            stop_signal: stop_signal.clone(),
            next_connection_id: 1,
        }
    }

    /// This method owns Self so that the listener is closed when it returns
    pub fn run(self: Self) {
        self.run_with(TcpListener::accept)
    }

    fn run_with<A>(mut self: Self, mut accept: A)
    where
        A: FnMut(&TcpListener) -> io::Result<(TcpStream, SocketAddr)>,
    {
        info!("Dispatcher: Starting");
        while !self.stop_signal.is_requested() {
            match accept(&self.listener) {
                Ok((stream, peer)) => {
                    if self.stop_signal.is_requested() {
                        debug!("Dispatcher: Closing connection from {peer} accepted during shutdown");
                        break;
                    }
                    self.dispatch(stream, peer);
                }
                Err(e) => {
                    if self.stop_signal.is_requested() {
                        break;
                    }
                    error!("Dispatcher: accept() failed: {e}");
                    thread::sleep(ACCEPT_RETRY_INTERVAL);
                }
            }
        }
        info!("Dispatcher: Stopping");
    }

    fn dispatch(self: &mut Self, stream: TcpStream, peer: SocketAddr) {
        let connection_id = self.next_connection_id;
        self.next_connection_id = self.next_connection_id.wrapping_add(1);
        debug!("Dispatcher: Accepted {peer} id={connection_id}");

        let connection =
            ClientConnection::new(connection_id, peer, LineStream::new(stream), self.pool.counter());

        if let Err(rejected) = self.pool.submit(move || connection.run()) {
            warn!("Dispatcher: Worker pool is shutting down, closing connection from {peer}");
            drop(rejected);
        }
    }
}
