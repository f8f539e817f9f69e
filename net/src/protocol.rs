/*
Commands that clients send to the server, one per line. The line terminator is
removed before matching and matching is exact and case sensitive.
*/

use std::fmt::{Display, Formatter};

use crate::data_types::ClientCount;

pub const PONG: &str = "PONG";
pub const GOODBYE: &str = "Goodbye";
pub const UNKNOWN_COMMAND: &str = "ERROR: Unknown command";
pub const STATS_PREFIX: &str = "Active clients: ";

/// Format of the `TIME` response, server local time
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PING: &str = "PING";
const TIME: &str = "TIME";
const ECHO_PREFIX: &str = "ECHO ";
const STATS: &str = "STATS";
const QUIT: &str = "QUIT";

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Command<'a> {
    Ping,
    Time,
    Echo(&'a str),
    Stats,
    Quit,
    Unknown,
}

impl<'a> Command<'a> {
    /// Classifies one received line. Everything after the first space of an
    /// `ECHO` command is the message, verbatim.
    pub fn parse(line: &'a str) -> Self {
        match trim_terminator(line) {
            PING => Command::Ping,
            TIME => Command::Time,
            STATS => Command::Stats,
            QUIT => Command::Quit,
            other => match other.strip_prefix(ECHO_PREFIX) {
                Some(message) => Command::Echo(message),
                None => Command::Unknown,
            },
        }
    }
}

/// Renders the command the way a client puts it on the wire, without the terminator
impl<'a> Display for Command<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Ping => f.write_str(PING),
            Command::Time => f.write_str(TIME),
            Command::Echo(message) => write!(f, "{ECHO_PREFIX}{message}"),
            Command::Stats => f.write_str(STATS),
            Command::Quit => f.write_str(QUIT),
            Command::Unknown => f.write_str(""),
        }
    }
}

pub fn stats_response(active_clients: ClientCount) -> String {
    format!("{STATS_PREFIX}{active_clients}")
}

/// Strips any trailing carriage returns and line feeds
pub fn trim_terminator(line: &str) -> &str {
    line.trim_end_matches(|c| c == '\r' || c == '\n')
}
