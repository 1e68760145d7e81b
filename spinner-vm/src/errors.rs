//  ERRORS.rs
//
//  Created:
//    07 Feb 2023, 09:33:40
//  Last edited:
//    20 Feb 2023, 13:58:21
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines errors that occur in the `spinner-vm` crate.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;


/***** LIBRARY *****/
/// Defines errors that occur during a single VM session. None of these abort the session; they are reported as events.
#[derive(Debug)]
pub enum VmError {
    /// Failed to create the instance directory of a VM.
    WorkdirCreateError{ path: PathBuf, err: std::io::Error },
    /// Failed to write the Vagrantfile of a VM.
    VagrantfileWriteError{ path: PathBuf, err: std::io::Error },
    /// Failed to remove the instance directory of a VM.
    WorkdirRemoveError{ path: PathBuf, err: std::io::Error },

    /// Failed to launch a Vagrant command.
    SpawnError{ command: String, err: std::io::Error },
    /// A launched command did not give us its stdout or stderr.
    PipeError{ command: String, what: &'static str },
    /// Failed to read a line of a command's output.
    ReadError{ command: String, err: std::io::Error },
    /// Failed to wait for a launched command.
    WaitError{ command: String, err: std::io::Error },
    /// A Vagrant command completed with a non-zero exit code.
    CommandFailed{ command: String, code: Option<i32> },

    /// The session was killed before it completed.
    Killed{ name: String },
    /// Some other, runtime-specific problem.
    Custom{ msg: String },
}

impl Display for VmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use VmError::*;
        match self {
            WorkdirCreateError{ path, err }    => write!(f, "Failed to create VM directory '{}': {}", path.display(), err),
            VagrantfileWriteError{ path, err } => write!(f, "Failed to write Vagrantfile '{}': {}", path.display(), err),
            WorkdirRemoveError{ path, err }    => write!(f, "Failed to remove VM directory '{}': {}", path.display(), err),

            SpawnError{ command, err }    => write!(f, "Failed to launch '{}': {}", command, err),
            PipeError{ command, what }    => write!(f, "Failed to capture the {} of '{}'", what, command),
            ReadError{ command, err }     => write!(f, "Failed to read output of '{}': {}", command, err),
            WaitError{ command, err }     => write!(f, "Failed to wait for '{}': {}", command, err),
            CommandFailed{ command, code } => match code {
                Some(code) => write!(f, "Command '{}' returned non-zero exit code {}", command, code),
                None       => write!(f, "Command '{}' was terminated by a signal", command),
            },

            Killed{ name } => write!(f, "VM '{}' was killed before it completed", name),
            Custom{ msg }  => write!(f, "{}", msg),
        }
    }
}

impl Error for VmError {}
