/// Type aliases shared by the server, the client and the test tools
pub mod data_types;

/// The text command grammar understood by the server
pub mod protocol;

/// Newline framed text over blocking Tcp streams
pub mod sockets;
