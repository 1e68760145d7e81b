//  LOGGING.rs
//
//  Created:
//    06 Feb 2023, 11:02:17
//  Last edited:
//    20 Feb 2023, 09:41:30
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines how a run logs: its verbosity, its format and where the
//!   records go. The logger itself is installed once by the binary.
//

use std::fmt::{Display, Formatter, Result as FResult};
use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub use crate::errors::LogLevelError as Error;


/***** TESTS *****/





/***** LIBRARY *****/
/// The log levels a run may be configured with.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including the raw output of the VM provisioning.
    Trace,
    /// Everything but the raw output of the VM provisioning.
    #[default]
    Debug,
    /// Only the command output and lifecycle of every VM.
    Info,
}

impl LogLevel {
    /// Returns the `log` filter that matches this level.
    #[inline]
    pub fn filter(&self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::Trace,
            Self::Debug => LevelFilter::Debug,
            Self::Info  => LevelFilter::Info,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use LogLevel::*;
        match self {
            Trace => write!(f, "trace"),
            Debug => write!(f, "debug"),
            Info  => write!(f, "info"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info"  => Ok(Self::Info),

            raw => Err(Error::UnknownLevel{ raw: raw.into() }),
        }
    }
}



/// Defines the logging part of the configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The most verbose level to still show.
    pub level  : LogLevel,
    /// Whether to write every record as a JSON object instead of plain text.
    pub json   : bool,
    /// The file to append records to. Standard output if omitted.
    pub output : Option<PathBuf>,
}
