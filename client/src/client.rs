use std::net::SocketAddr;

use line_server_net::sockets::line_stream::LineStream;
use log::info;

/// A blocking connection to a line server. Each command is answered before the
/// next one is sent. The connection is closed when the client is dropped.
pub struct Client {
    authority: String,
    stream: LineStream,
}

impl Client {
    pub fn connect(authority: &str) -> std::io::Result<Self> {
        let stream = LineStream::connect(authority)?;
        info!("Client: Connected to {authority}");

        Ok(Self {
            authority: String::from(authority),
            stream,
        })
    }

    /// Sends one command and waits for the reply. Returns None if the server
    /// closed the connection instead of replying.
    pub fn send(self: &mut Self, command: &str) -> std::io::Result<Option<String>> {
        self.stream.write_line(command)?;
        self.stream.read_line()
    }

    pub fn local_addr(self: &Self) -> std::io::Result<SocketAddr> {
        self.stream.local_addr()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        info!("Client: Disconnected from {}", self.authority);
    }
}
