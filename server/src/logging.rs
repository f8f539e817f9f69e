use std::{
    fmt::{Arguments, Display, Formatter},
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
};

use chrono::Local;
use env_logger::Target;
use log::{warn, Level, LevelFilter};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, PartialEq)]
pub enum LoggingErr {
    AlreadyInitialized,
}

impl Display for LoggingErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggingErr::AlreadyInitialized => f.write_str("a logger is already installed"),
        }
    }
}

/// Installs the process wide logger. Without a log file this is the usual
/// colored console output. With one, every record is written as a plain
/// `[timestamp] [LEVEL] message` line to stdout and appended to the file.
/// A log file that cannot be opened is reported and otherwise ignored.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<(), LoggingErr> {
    let mut clog = colog::default_builder();
    clog.filter_level(level);

    let mut open_error = None;
    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                clog.format(|buf, record| write_record(buf, record.level(), record.args()));
                clog.target(Target::Pipe(Box::new(TeeWriter::new(file))));
            }
            Err(e) => open_error = Some(e),
        }
    }

    clog.try_init().map_err(|_| LoggingErr::AlreadyInitialized)?;

    if let (Some(path), Some(e)) = (log_file, open_error) {
        warn!("Logging: Failed to open log file {}: {e}", path.display());
    }
    Ok(())
}

fn write_record<W: Write + ?Sized>(out: &mut W, level: Level, args: &Arguments) -> io::Result<()> {
    writeln!(out, "[{}] [{}] {}", Local::now().format(TIMESTAMP_FORMAT), level, args)
}

/// Copies everything written to stdout and to a file
struct TeeWriter {
    file: File,
}

impl TeeWriter {
    fn new(file: File) -> Self {
        Self { file }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}
