//  LIB.rs
// 
//  Created:
//    10 Feb 2023, 09:12:40
//  Last edited:
//    22 Feb 2023, 10:03:29
//  Auto updated?
//    Yes
// 
//  Description:
//!   The `spinner-drv` crate drives a job over a set of VMs: it admits at
//!   most a fixed number of VM sessions at a time, forwards the output of
//!   each of them to a single consumer and shuts everything down in order.
// 

// Declare modules
pub mod errors;
pub mod scheduler;
pub mod worker;
pub mod aggregator;
pub mod orchestrator;
#[cfg(test)]
pub mod dummy;


// Bring some stuff into the crate namespace
pub use errors::DriverError;
pub use aggregator::Aggregator;
pub use orchestrator::{Orchestrator, OrchestratorState};
pub use scheduler::{AdmissionToken, Scheduler};
pub use worker::{SessionEnd, Worker};
