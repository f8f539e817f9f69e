use std::{
    fmt::{Display, Formatter},
    net::{Ipv4Addr, SocketAddr, TcpListener},
    sync::Arc,
};

use line_server_net::data_types::{ClientCount, PortNumber};
use log::info;
use socket2::{Domain, Protocol, Socket, Type};

use crate::{
    config::ServerConfig,
    dispatcher::{Dispatcher, StopSignal},
    worker_pool::{PoolErr, WorkerPool},
};

#[derive(Debug, PartialEq)]
pub enum ServerErr {
    Pool(PoolErr),
    Bind { port: PortNumber, msg: String },
}

impl Display for ServerErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerErr::Pool(e) => write!(f, "{e}"),
            ServerErr::Bind { port, msg } => write!(f, "failed to listen on port {port}: {msg}"),
        }
    }
}

impl From<PoolErr> for ServerErr {
    fn from(e: PoolErr) -> Self {
        ServerErr::Pool(e)
    }
}

/// A worker pool and a listening socket, ready to serve. Dropping a server
/// that never ran shuts its pool down.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    pool: Arc<WorkerPool>,
    stop_signal: StopSignal,
}

impl Server {
    /// Starts the worker threads then binds the listening socket on all interfaces
    pub fn bind(config: &ServerConfig) -> Result<Self, ServerErr> {
        let pool = Arc::new(WorkerPool::new(config.worker_count)?);

        let listener = listen(config.port, config.backlog).map_err(|e| ServerErr::Bind {
            port: config.port,
            msg: e.to_string(),
        })?;
        let local_addr = listener.local_addr().map_err(|e| ServerErr::Bind {
            port: config.port,
            msg: e.to_string(),
        })?;

        info!("Server: Listening on port {}", local_addr.port());

        Ok(Self {
            listener,
            local_addr,
            pool,
            stop_signal: StopSignal::new(local_addr),
        })
    }

    pub fn local_addr(self: &Self) -> SocketAddr {
        self.local_addr
    }

    /// Raising this signal makes `run` stop accepting and shut down
    pub fn stop_signal(self: &Self) -> StopSignal {
        self.stop_signal.clone()
    }

    pub fn active_clients(self: &Self) -> ClientCount {
        self.pool.counter().get()
    }

    /// Accepts and serves clients on the calling thread until the stop signal is
    /// raised, then shuts the worker pool down. Returns once every worker has exited.
    pub fn run(self: Self) {
        let Self {
            listener,
            pool,
            stop_signal,
            ..
        } = self;

        Dispatcher::new(listener, &pool, &stop_signal).run();

        info!("Server: Shutting down");
        pool.shutdown();
        info!("Server: Stopped. Total active clients at shutdown: {}", pool.counter().get());
    }
}

fn listen(port: PortNumber, backlog: i32) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket.into())
}
