use std::{env, path::PathBuf, process};

use log::{error, info, warn};

use line_server::{
    config::{ConfigSource, ServerConfig, DEFAULT_CONFIG_FILE},
    logging,
    server::Server,
};

fn main() {
    // 1st command line arg is the path to the configuration file
    let config_path = match env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };

    let (config, source) = match ServerConfig::load(&config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Err(e) = logging::init(config.log_level, config.log_file.as_deref()) {
        eprintln!("{e}");
    }

    match source {
        ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        ConfigSource::Defaults => info!("Using default configuration"),
    }

    info!("Starting TCP server...");
    info!("Port: {}", config.port);
    info!("Thread pool size: {}", config.worker_count);
    info!("Max connections: {}", config.backlog);

    let server = match Server::bind(&config) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {e}");
            process::exit(1);
        }
    };

    // Handle SIGINT by raising the stop signal. A second SIGINT gives up on
    // clients that have not disconnected yet.
    let stop_signal = server.stop_signal();
    let handler = ctrlc::set_handler(move || {
        if stop_signal.is_requested() {
            warn!("Received SIGINT again, exiting without waiting for clients");
            process::exit(1);
        }
        info!("Received SIGINT, shutting down...");
        stop_signal.request();
    });
    if let Err(e) = handler {
        error!("Failed to install SIGINT handler: {e}");
        process::exit(1);
    }

    server.run();
}
