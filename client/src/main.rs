use std::{
    env,
    io::{self, BufRead},
    process,
};

use line_server_client::{Client, PortNumber};
use log::{error, LevelFilter};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: PortNumber = 8080;

#[derive(Debug, PartialEq)]
struct Options {
    host: String,
    port: PortNumber,
    /// Empty means read commands from stdin
    commands: Vec<String>,
}

fn main() {
    let mut clog = colog::default_builder();
    clog.filter_level(LevelFilter::Warn);
    clog.init();

    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("{msg}");
            print_usage();
            process::exit(2);
        }
    };

    let authority = format!("{}:{}", options.host, options.port);
    let mut client = match Client::connect(&authority) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to {authority}: {e}");
            process::exit(1);
        }
    };

    let result = if options.commands.is_empty() {
        let stdin = io::stdin();
        let commands = stdin.lock().lines().map_while(Result::ok);
        run_commands(&mut client, commands)
    } else {
        run_commands(&mut client, options.commands.into_iter())
    };

    if let Err(e) = result {
        error!("Connection to {authority} failed: {e}");
        process::exit(1);
    }
}

/// Sends each command and prints the reply, stopping early if the server hangs up
fn run_commands(client: &mut Client, commands: impl Iterator<Item = String>) -> io::Result<()> {
    for command in commands {
        match client.send(&command)? {
            Some(reply) => println!("{reply}"),
            None => break,
        }
    }
    Ok(())
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        host: String::from(DEFAULT_HOST),
        port: DEFAULT_PORT,
        commands: Vec::new(),
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--host" => options.host = args.next().ok_or("--host needs a value")?,
            "--port" => {
                let port = args.next().ok_or("--port needs a value")?;
                options.port = port.parse().map_err(|_| format!("'{port}' is not a valid port"))?;
            }
            "--" => {
                options.commands.extend(args.by_ref());
            }
            _ => options.commands.push(arg),
        }
    }
    Ok(options)
}

fn print_usage() {
    eprintln!("Usage: line_server_client [--host HOST] [--port PORT] [COMMAND ...]");
    eprintln!("Examples:");
    eprintln!("  line_server_client PING");
    eprintln!("  line_server_client \"ECHO Hello World\" TIME STATS");
    eprintln!("  line_server_client --port 9000      (reads commands from stdin)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values.iter().map(|value| String::from(*value)).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn should_default_to_local_server_and_stdin() {
        let options = parse_args(args(&[])).unwrap();
        assert_eq!("127.0.0.1", options.host);
        assert_eq!(8080, options.port);
        assert!(options.commands.is_empty());
    }

    #[test]
    fn should_collect_commands_and_options() {
        let options = parse_args(args(&["--port", "9000", "PING", "ECHO a b", "--host", "example"])).unwrap();
        assert_eq!("example", options.host);
        assert_eq!(9000, options.port);
        assert_eq!(vec![String::from("PING"), String::from("ECHO a b")], options.commands);
    }

    #[test]
    fn should_pass_everything_after_double_dash_as_commands() {
        let options = parse_args(args(&["--", "--port", "PING"])).unwrap();
        assert_eq!(vec![String::from("--port"), String::from("PING")], options.commands);
    }

    #[test]
    fn should_reject_bad_port() {
        assert!(parse_args(args(&["--port", "http"])).is_err());
        assert!(parse_args(args(&["--port"])).is_err());
    }
}
