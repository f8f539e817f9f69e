/*
Turns one received line into the text to send back. Apart from reading the
clock for TIME this has no side effects, the caller owns the connection.
*/

use chrono::Local;
use line_server_net::{
    data_types::ClientCount,
    protocol::{self, Command},
};

#[derive(Debug, PartialEq)]
pub struct Reply {
    /// Response line without its terminator
    pub text: String,
    /// The server should close the connection once the reply has been sent
    pub disconnect: bool,
}

impl Reply {
    fn send(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            disconnect: false,
        }
    }

    fn send_and_close(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            disconnect: true,
        }
    }
}

pub fn interpret(line: &str, active_clients: ClientCount) -> Reply {
    match Command::parse(line) {
        Command::Ping => Reply::send(protocol::PONG),
        Command::Time => Reply::send(Local::now().format(protocol::TIME_FORMAT).to_string()),
        Command::Echo(message) => Reply::send(message),
        Command::Stats => Reply::send(protocol::stats_response(active_clients)),
        Command::Quit => Reply::send_and_close(protocol::GOODBYE),
        Command::Unknown => Reply::send(protocol::UNKNOWN_COMMAND),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn should_answer_ping() {
        assert_eq!(Reply::send("PONG"), interpret("PING\n", 1));
    }

    #[test]
    fn should_echo_message() {
        assert_eq!(Reply::send("hello world"), interpret("ECHO hello world\r\n", 1));
    }

    #[test]
    fn should_report_active_clients() {
        assert_eq!(Reply::send("Active clients: 7"), interpret("STATS", 7));
    }

    #[test]
    fn should_say_goodbye_and_disconnect() {
        let reply = interpret("QUIT\n", 1);
        assert_eq!("Goodbye", reply.text);
        assert!(reply.disconnect);
    }

    #[test]
    fn should_keep_connection_for_unknown_commands() {
        let reply = interpret("BOGUS", 1);
        assert_eq!("ERROR: Unknown command", reply.text);
        assert!(!reply.disconnect);
        assert!(!interpret("quit", 1).disconnect);
    }

    #[test]
    fn should_tell_the_time() {
        let reply = interpret("TIME", 1);
        assert!(!reply.disconnect);
        assert_eq!(19, reply.text.len());
        assert!(NaiveDateTime::parse_from_str(&reply.text, protocol::TIME_FORMAT).is_ok());
    }
}
