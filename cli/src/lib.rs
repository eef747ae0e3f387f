//! Shared plumbing for the `kmasm`, `kmdisasm`, `kmlist` and `kmrun` binaries
//!
//! Logging setup, program loading, and the mapping from typed errors to
//! process exit codes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use kmvm_disassembler::DisassemblerError;
use kmvm_runtime::RuntimeError;
use kmvm_spec::{Program, SpecError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Exit code for a failed `stat` and for bad command lines
pub const EXIT_USAGE: u8 = 1;
/// Exit code when a file cannot be opened, read or written
pub const EXIT_OPEN: u8 = 2;
/// Exit code for a bad header or an undecodable instruction
pub const EXIT_FORMAT: u8 = 3;
/// Exit code of `kmrun` for a division by zero
pub const EXIT_DIVISION_BY_ZERO: u8 = 4;

/// Install the stderr subscriber
///
/// `RUST_LOG` wins when set; otherwise the level starts at `warn` and each
/// `-v` raises it by one.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: SpecError,
    },
}

impl LoadError {
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadError::Stat { .. } => EXIT_USAGE,
            LoadError::Open { .. } => EXIT_OPEN,
            LoadError::Format { .. } => EXIT_FORMAT,
        }
    }
}

/// Read a KM binary and check its header
pub fn load_program(path: &Path) -> Result<Program, LoadError> {
    let metadata = fs::metadata(path).map_err(|source| LoadError::Stat {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), size = metadata.len(), "loading program");

    let bytes = fs::read(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Program::from_bytes(&bytes).map_err(|source| LoadError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Exit code of `kmdisasm` and `kmlist` for an error chain
pub fn decode_exit_code(err: &anyhow::Error) -> u8 {
    if let Some(load) = err.downcast_ref::<LoadError>() {
        return load.exit_code();
    }
    match err.downcast_ref::<DisassemblerError>() {
        Some(DisassemblerError::IoError(_)) => EXIT_OPEN,
        Some(_) => EXIT_FORMAT,
        None if err.downcast_ref::<std::io::Error>().is_some() => EXIT_OPEN,
        None => EXIT_USAGE,
    }
}

/// Exit code of `kmrun` for an error chain
pub fn run_exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RuntimeError>() {
        Some(RuntimeError::DivisionByZero { .. }) => EXIT_DIVISION_BY_ZERO,
        _ => EXIT_USAGE,
    }
}

/// Print a command-line parse failure and pick the exit code
///
/// `--help` and `--version` exit cleanly; everything else is a usage error.
pub fn usage_exit(err: clap::Error) -> ExitCode {
    let _ = err.print();
    if err.use_stderr() {
        ExitCode::from(EXIT_USAGE)
    } else {
        ExitCode::SUCCESS
    }
}

/// Report an error chain on stderr and convert it to an exit code
pub fn report(err: &anyhow::Error, code: u8) -> ExitCode {
    eprintln!("Error: {err:#}");
    ExitCode::from(code)
}

/// Write `text` to `output`, or to stdout when no path is given
pub fn write_text(output: Option<&Path>, text: &str) -> std::io::Result<()> {
    use std::io::Write;

    match output {
        Some(path) => fs::write(path, text),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()
        }
    }
}
