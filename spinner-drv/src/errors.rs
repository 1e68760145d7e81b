//  ERRORS.rs
//
//  Created:
//    10 Feb 2023, 09:14:02
//  Last edited:
//    17 Feb 2023, 16:40:13
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines errors that occur in the `spinner-drv` crate.
//

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FResult};

use tokio::task::JoinError;


/***** LIBRARY *****/
/// Defines errors that occur while driving a job.
///
/// Errors within VM sessions never end up here; those are logged by the worker that owns the session.
#[derive(Debug)]
pub enum DriverError {
    /// The aggregator task died before it drained its input, taking the job with it.
    AggregatorPanicked{ err: JoinError },
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use DriverError::*;
        match self {
            AggregatorPanicked{ err } => write!(f, "Output aggregator failed before it drained all output: {}", err),
        }
    }
}

impl Error for DriverError {}
