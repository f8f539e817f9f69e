use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::Instant,
};

use line_server_client::{protocol::Command, Client};
use log::{debug, error};

const CLIENT_COUNT: usize = 20;
const REPEAT_COUNT: usize = 10;

/// Opens all clients first, then has each one send ECHO commands with random
/// payloads over its own connection. Returns false if any reply was wrong.
pub fn run_test(authority: &str) -> bool {
    let barrier = Arc::new(Barrier::new(CLIENT_COUNT + 1));
    let failures = Arc::new(AtomicUsize::new(0));

    let mut threads: Vec<thread::JoinHandle<()>> = Vec::with_capacity(CLIENT_COUNT);
    for index in 0..CLIENT_COUNT {
        let client_id = index + 1;
        let authority = String::from(authority);
        let barrier = barrier.clone();
        let failures = failures.clone();
        let worker = thread::Builder::new().name(format!("client-{client_id}"));
        let spawned = worker.spawn(move || {
            let client = Client::connect(&authority);

            // Wait for every client to connect before the timer starts
            barrier.wait();

            match client {
                Ok(mut client) => {
                    let failed = send_echoes(&mut client, client_id);
                    failures.fetch_add(failed, Ordering::Relaxed);
                }
                Err(e) => {
                    error!("Load: Client {client_id} failed to connect to {authority}: {e}");
                    failures.fetch_add(REPEAT_COUNT, Ordering::Relaxed);
                }
            }
        });
        match spawned {
            Ok(handle) => threads.push(handle),
            Err(e) => {
                error!("Load: Failed to start client thread: {e}");
                return false;
            }
        }
    }

    barrier.wait();
    let start = Instant::now();

    for thread in threads {
        if thread.join().is_err() {
            failures.fetch_add(REPEAT_COUNT, Ordering::Relaxed);
        }
    }

    let elapsed = start.elapsed();
    let request_count = CLIENT_COUNT * REPEAT_COUNT;
    let failed = failures.load(Ordering::Relaxed);

    println!(
        "Elapsed: {:.2?} sending {} requests from {} clients",
        elapsed, request_count, CLIENT_COUNT
    );
    println!(
        "Average throughput {} requests/sec",
        (request_count as f64 / elapsed.as_secs_f64()).floor()
    );
    println!("{} of {} requests failed", failed, request_count);

    failed == 0
}

/// Returns the number of requests that did not get their payload echoed back
fn send_echoes(client: &mut Client, client_id: usize) -> usize {
    let mut failed = 0;
    for sequence in 0..REPEAT_COUNT {
        let payload = format!("client-{client_id}-{sequence}-{:016x}", rand::random::<u64>());
        match client.send(&Command::Echo(&payload).to_string()) {
            Ok(Some(reply)) if reply == payload => {}
            Ok(Some(reply)) => {
                debug!("Load: Client {client_id} sent '{payload}' but got '{reply}'");
                failed += 1;
            }
            Ok(None) => {
                error!("Load: Server closed the connection of client {client_id}");
                return failed + REPEAT_COUNT - sequence;
            }
            Err(e) => {
                error!("Load: Client {client_id} request failed: {e}");
                return failed + REPEAT_COUNT - sequence;
            }
        }
    }
    failed
}
