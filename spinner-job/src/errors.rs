//  ERRORS.rs
//
//  Created:
//    08 Feb 2023, 13:05:10
//  Last edited:
//    21 Feb 2023, 11:20:02
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines errors that occur in the `spinner-job` crate.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;

use crate::spec::JobKind;


/***** LIBRARY *****/
/// Defines errors that occur while constructing a job.
#[derive(Debug)]
pub enum JobError {
    /// The job has no default images and the user did not give any.
    MissingImages{ kind: JobKind },
    /// The job was given an empty command.
    EmptyCommand{ kind: JobKind },
    /// The given commit hash contains characters that have no business in a commit hash.
    IllegalCommit{ kind: JobKind, commit: String },

    /// Failed to read the command from stdin.
    StdinReadError{ err: std::io::Error },
    /// Failed to read the script file.
    ScriptReadError{ path: PathBuf, err: std::io::Error },
}

impl Display for JobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use JobError::*;
        match self {
            MissingImages{ kind }         => write!(f, "Job '{}' has no default images; specify some with '--images'", kind),
            EmptyCommand{ kind }          => write!(f, "Job '{}' was given an empty command", kind),
            IllegalCommit{ kind, commit } => write!(f, "Job '{}' was given illegal commit hash '{}'", kind, commit),

            StdinReadError{ err }        => write!(f, "Failed to read command from stdin: {}", err),
            ScriptReadError{ path, err } => write!(f, "Failed to read script file '{}': {}", path.display(), err),
        }
    }
}

impl Error for JobError {}
