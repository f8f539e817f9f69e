/// Key=value settings file layered under LINE_SERVER_* environment variables
pub mod config;

/// Console and log file output for the log crate macros
pub mod logging;

/// Unbounded FIFO of pending work that worker threads park on
pub mod task_queue;

/// Fixed set of worker threads that run tasks from the task queue
pub mod worker_pool;

/// Mutex protected count of connected clients
pub mod shared_counter;

/// Text command interpreter, one reply per received line
pub mod commands;

/// Accept loop that turns connections into worker pool tasks
pub mod dispatcher;

/// Ties the worker pool, the listening socket and the dispatcher together
pub mod server;

mod connection;
