use chrono::NaiveDateTime;
use line_server_client::{
    protocol::{GOODBYE, PONG, STATS_PREFIX, TIME_FORMAT, UNKNOWN_COMMAND},
    Client,
};
use log::debug;

type Outcome = Result<(), String>;

struct Scenario {
    name: &'static str,
    run: fn(&str) -> Outcome,
}

const SCENARIOS: [Scenario; 7] = [
    Scenario { name: "PING returns PONG", run: ping },
    Scenario { name: "TIME returns local time", run: time },
    Scenario { name: "ECHO returns its message", run: echo },
    Scenario { name: "STATS counts this client", run: stats },
    Scenario { name: "QUIT says goodbye and closes", run: quit },
    Scenario { name: "Unknown command keeps the connection", run: unknown },
    Scenario { name: "Connection persists across commands", run: persistent },
];

/// Runs every protocol scenario against the server and prints a summary.
/// Returns true if all of them passed.
pub fn run_test(authority: &str) -> bool {
    let mut failures = 0;

    for scenario in SCENARIOS.iter() {
        match (scenario.run)(authority) {
            Ok(()) => println!("PASS  {}", scenario.name),
            Err(msg) => {
                failures += 1;
                println!("FAIL  {}: {msg}", scenario.name);
            }
        }
    }

    println!(
        "{} passed, {} failed against {authority}",
        SCENARIOS.len() - failures,
        failures
    );
    failures == 0
}

fn connect(authority: &str) -> Result<Client, String> {
    Client::connect(authority).map_err(|e| format!("failed to connect: {e}"))
}

fn request(client: &mut Client, command: &str) -> Result<String, String> {
    debug!("Check: Sending {command}");
    match client.send(command) {
        Ok(Some(reply)) => Ok(reply),
        Ok(None) => Err(format!("server closed the connection after {command}")),
        Err(e) => Err(format!("{command} failed: {e}")),
    }
}

fn expect_reply(client: &mut Client, command: &str, expected: &str) -> Outcome {
    let reply = request(client, command)?;
    if reply == expected {
        Ok(())
    } else {
        Err(format!("{command} returned '{reply}', expected '{expected}'"))
    }
}

fn ping(authority: &str) -> Outcome {
    let mut client = connect(authority)?;
    expect_reply(&mut client, "PING", PONG)
}

fn time(authority: &str) -> Outcome {
    let mut client = connect(authority)?;
    let reply = request(&mut client, "TIME")?;
    NaiveDateTime::parse_from_str(&reply, TIME_FORMAT)
        .map(|_| ())
        .map_err(|e| format!("'{reply}' is not a time: {e}"))
}

fn echo(authority: &str) -> Outcome {
    let mut client = connect(authority)?;
    expect_reply(&mut client, "ECHO Hello World", "Hello World")?;
    expect_reply(&mut client, "ECHO ", "")
}

fn stats(authority: &str) -> Outcome {
    let mut client = connect(authority)?;
    let reply = request(&mut client, "STATS")?;
    let count: usize = reply
        .strip_prefix(STATS_PREFIX)
        .and_then(|count| count.parse().ok())
        .ok_or_else(|| format!("'{reply}' is not a client count"))?;
    if count >= 1 {
        Ok(())
    } else {
        Err(format!("reported {count} clients while connected"))
    }
}

fn quit(authority: &str) -> Outcome {
    let mut client = connect(authority)?;
    expect_reply(&mut client, "QUIT", GOODBYE)?;
    match client.send("PING") {
        Ok(Some(reply)) => Err(format!("connection still open, got '{reply}'")),
        Ok(None) | Err(_) => Ok(()),
    }
}

fn unknown(authority: &str) -> Outcome {
    let mut client = connect(authority)?;
    expect_reply(&mut client, "INVALID", UNKNOWN_COMMAND)?;
    expect_reply(&mut client, "ping", UNKNOWN_COMMAND)?;
    expect_reply(&mut client, "PING", PONG)
}

fn persistent(authority: &str) -> Outcome {
    let mut client = connect(authority)?;
    expect_reply(&mut client, "PING", PONG)?;
    expect_reply(&mut client, "ECHO Test", "Test")?;
    request(&mut client, "TIME")?;
    request(&mut client, "STATS")?;
    expect_reply(&mut client, "QUIT", GOODBYE)
}
