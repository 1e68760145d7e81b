//  ERRORS.rs
//
//  Created:
//    14 Feb 2023, 10:41:55
//  Last edited:
//    22 Feb 2023, 11:02:31
//  Auto updated?
//    Yes
//
//  Description:
//!   Collects the toplevel errors of the `vm-spinner` executable.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;

use spinner_cfg::errors::{SpinnerConfigError, ValidationError};
use spinner_drv::DriverError;
use spinner_job::JobError;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use spinner_job::JobKind;

    use super::*;

    #[test]
    fn messages_wrap_their_cause() {
        let err = CliError::InvalidConfig{ err: ValidationError::ZeroParallelism };
        assert_eq!(err.to_string(), "Invalid configuration: Number of parallel VMs cannot be zero");

        let cause = JobError::MissingImages{ kind: JobKind::Cmd };
        let err   = CliError::JobCreateError{ err: JobError::MissingImages{ kind: JobKind::Cmd } };
        assert_eq!(err.to_string(), cause.to_string());
    }
}





/***** LIBRARY *****/
/// Defines toplevel errors for the `vm-spinner` executable. All of them are fatal.
#[derive(Debug)]
pub enum CliError {
    /// Failed to load the configuration file.
    ConfigLoadError{ err: SpinnerConfigError },
    /// The configuration does not fit this host.
    InvalidConfig{ err: ValidationError },

    /// Failed to open the log file.
    LogFileError{ path: PathBuf, err: std::io::Error },
    /// Failed to install the logger.
    LoggerError{ err: log::SetLoggerError },

    /// Failed to construct the job.
    JobCreateError{ err: JobError },
    /// Failed to run the job.
    JobRunError{ err: DriverError },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use CliError::*;
        match self {
            ConfigLoadError{ err } => write!(f, "{}", err),
            InvalidConfig{ err }   => write!(f, "Invalid configuration: {}", err),

            LogFileError{ path, err } => write!(f, "Failed to open log file '{}': {}", path.display(), err),
            LoggerError{ err }        => write!(f, "Failed to setup logger: {}", err),

            JobCreateError{ err } => write!(f, "{}", err),
            JobRunError{ err }    => write!(f, "{}", err),
        }
    }
}

impl Error for CliError {}
