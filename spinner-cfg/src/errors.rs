//  ERRORS.rs
//
//  Created:
//    06 Feb 2023, 10:14:02
//  Last edited:
//    21 Feb 2023, 15:47:55
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines errors that occur in the `spinner-cfg` crate.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;


/***** LIBRARY *****/
/// Errors that relate to loading a `spinner.yml` file.
#[derive(Debug)]
pub enum SpinnerConfigError {
    /// Failed to open the given config path.
    FileOpenError{ path: PathBuf, err: std::io::Error },
    /// Failed to read from the given config path.
    FileReadError{ path: PathBuf, err: std::io::Error },
    /// Failed to parse the given file.
    FileParseError{ path: PathBuf, err: serde_yaml::Error },
}

impl Display for SpinnerConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use SpinnerConfigError::*;
        match self {
            FileOpenError{ path, err }  => write!(f, "Failed to open the spinner config file '{}': {}", path.display(), err),
            FileReadError{ path, err }  => write!(f, "Failed to read the spinner config file '{}': {}", path.display(), err),
            FileParseError{ path, err } => write!(f, "Failed to parse spinner config file '{}' as YAML: {}", path.display(), err),
        }
    }
}

impl Error for SpinnerConfigError {}



/// Fatal problems with the run parameters, detected before any VM is started.
#[derive(Debug, Eq, PartialEq)]
pub enum ValidationError {
    /// Every VM would get more CPUs than the host has.
    CpusExceedHost{ cpus: usize, host: usize },
    /// More VMs would run in parallel than the host has CPUs.
    ParallelismExceedsHost{ parallelism: usize, host: usize },

    /// The VMs were given no CPUs at all.
    ZeroCpus,
    /// The parallelism is zero, which would never admit a single VM.
    ZeroParallelism,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ValidationError::*;
        match self {
            CpusExceedHost{ cpus, host }                => write!(f, "Number of CPUs for each VM ({}) exceeds the number of CPUs available ({})", cpus, host),
            ParallelismExceedsHost{ parallelism, host } => write!(f, "Number of parallel VMs ({}) exceeds the number of CPUs available ({})", parallelism, host),

            ZeroCpus        => write!(f, "Number of CPUs for each VM cannot be zero"),
            ZeroParallelism => write!(f, "Number of parallel VMs cannot be zero"),
        }
    }
}

impl Error for ValidationError {}



/// Non-fatal problems with the run parameters. These are reported, but the run goes on.
#[derive(Debug, Eq, PartialEq)]
pub enum ValidationWarning {
    /// All parallel VMs together get more CPUs than the host has.
    Oversubscribed{ total: usize, host: usize },
}

impl Display for ValidationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use ValidationWarning::*;
        match self {
            Oversubscribed{ total, host } => write!(f, "Number of parallel CPUs (cpus * parallelism = {}) exceeds the number of CPUs available ({})", total, host),
        }
    }
}



/// Errors that relate to parsing log levels.
#[derive(Debug)]
pub enum LogLevelError {
    /// The given level is not one we support.
    UnknownLevel{ raw: String },
}

impl Display for LogLevelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use LogLevelError::*;
        match self {
            UnknownLevel{ raw } => write!(f, "Unknown log level '{}' (expected one of 'trace', 'debug' or 'info')", raw),
        }
    }
}

impl Error for LogLevelError {}
