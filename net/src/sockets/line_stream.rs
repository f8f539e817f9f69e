use std::{
    io::{BufRead, BufReader, Error, ErrorKind, Read, Write},
    net::{SocketAddr, TcpStream},
};

#[cfg(debug_assertions)]
use log::debug;

use super::{LINE_TERMINATOR, MAX_LINE_LENGTH};
use crate::protocol::trim_terminator;

/// Owns a Tcp stream and exchanges newline terminated text over it. Reads are
/// buffered so that several lines arriving in one segment are returned one at
/// a time. Dropping the LineStream closes the connection.
pub struct LineStream {
    reader: BufReader<TcpStream>,
}

impl LineStream {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }

    pub fn connect(authority: &str) -> std::io::Result<Self> {
        Ok(Self::new(TcpStream::connect(authority)?))
    }

    /// Blocks until a whole line is available and returns it without its terminator.
    /// Returns None when the other party closed the connection. A final line that
    /// was not terminated before the connection closed is still returned.
    pub fn read_line(self: &mut Self) -> std::io::Result<Option<String>> {
        let mut buffer = Vec::new();
        let limit = MAX_LINE_LENGTH as u64;
        let byte_count = (&mut self.reader)
            .take(limit)
            .read_until(LINE_TERMINATOR, &mut buffer)?;

        if byte_count == 0 {
            return Ok(None);
        }

        if buffer.last() != Some(&LINE_TERMINATOR) && byte_count == MAX_LINE_LENGTH {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("LineStream: line exceeds {MAX_LINE_LENGTH} bytes"),
            ));
        }

        #[cfg(debug_assertions)]
        debug!("LineStream Rx: {byte_count} bytes");

        let line = String::from_utf8_lossy(&buffer);
        Ok(Some(String::from(trim_terminator(&line))))
    }

    /// Writes the text followed by a line terminator and flushes the stream
    pub fn write_line(self: &mut Self, text: &str) -> std::io::Result<()> {
        let mut buffer = Vec::with_capacity(text.len() + 1);
        buffer.extend_from_slice(text.as_bytes());
        buffer.push(LINE_TERMINATOR);

        let stream = self.reader.get_mut();
        stream.write_all(&buffer)?;
        stream.flush()
    }

    pub fn local_addr(self: &Self) -> std::io::Result<SocketAddr> {
        self.reader.get_ref().local_addr()
    }
}
