use std::{net::SocketAddr, sync::Arc};

use line_server_net::{data_types::ConnectionId, sockets::line_stream::LineStream};
use log::{debug, error, info};

use crate::{commands, shared_counter::SharedCounter};

/// One accepted client. Runs on a worker thread and answers commands one at a
/// time until the client quits, hangs up, or the connection fails.
pub(crate) struct ClientConnection {
    connection_id: ConnectionId,
    peer: SocketAddr,
    stream: LineStream,
    counter: Arc<SharedCounter>,
}

impl ClientConnection {
    pub(crate) fn new(
        connection_id: ConnectionId,
        peer: SocketAddr,
        stream: LineStream,
        counter: &Arc<SharedCounter>,
    ) -> Self {
        Self {
            connection_id,
            peer,
            stream,
            counter: counter.clone(),
        }
    }

    /// Owns self so that the stream is closed when this returns
    pub(crate) fn run(self: Self) {
        let Self {
            connection_id,
            peer,
            mut stream,
            counter,
        } = self;

        let active = counter.enter();
        info!("Client connected: {peer} id={connection_id} (Active: {})", counter.get());

        loop {
            let line = match stream.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("Client disconnected: {peer} id={connection_id}");
                    break;
                }
                Err(e) => {
                    error!("Receive failed for {peer} id={connection_id}: {e}");
                    break;
                }
            };

            debug!("Processing command from {peer}: {line}");
            let reply = commands::interpret(&line, counter.get());

            if let Err(e) = stream.write_line(&reply.text) {
                error!("Send failed for {peer} id={connection_id}: {e}");
                break;
            }

            if reply.disconnect {
                info!("Client requested disconnect: {peer} id={connection_id}");
                break;
            }
        }

        drop(stream);
        drop(active);
        debug!("Connection closed: {peer} id={connection_id} (Active: {})", counter.get());
    }
}
