/*
Thin wrapper around sockets implementation in the standard library.
Every message in either direction is one line of text terminated by '\n'.
*/
pub mod line_stream;

/// Longest line, in bytes and including the terminator, that either side will accept
pub const MAX_LINE_LENGTH: usize = 4096;

pub const LINE_TERMINATOR: u8 = b'\n';
