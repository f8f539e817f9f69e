mod check;
mod load;

use log::LevelFilter;
use std::{env, process};

const DEFAULT_AUTHORITY: &str = "127.0.0.1:8080";

fn main() {
    let mut clog = colog::default_builder();

    #[cfg(debug_assertions)]
    clog.filter_level(LevelFilter::Debug);

    #[cfg(not(debug_assertions))]
    clog.filter_level(LevelFilter::Warn);

    clog.init();

    let args: Vec<String> = env::args().collect();
    let authority = args.get(2).map(String::as_str).unwrap_or(DEFAULT_AUTHORITY);

    let passed = match args.get(1) {
        Some(s) if s == "check" => check::run_test(authority),
        Some(s) if s == "load" => load::run_test(authority),
        Some(_) | None => {
            println!("Pass 'check' or 'load' on the command line, optionally followed by host:port");
            true
        }
    };

    if !passed {
        process::exit(1);
    }
}
