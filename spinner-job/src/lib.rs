//  LIB.rs
// 
//  Created:
//    08 Feb 2023, 13:02:45
//  Last edited:
//    21 Feb 2023, 11:37:19
//  Auto updated?
//    Yes
// 
//  Description:
//!   The `spinner-job` crate defines the workloads that `vm-spinner` can
//!   run on its VMs: what images to use, what to run in them and what
//!   to make of the output.
// 

// Declare modules
pub mod errors;
pub mod spec;
pub mod build_job;
pub mod cmd_job;
pub mod vm_job;


// Bring some stuff into the crate namespace
pub use errors::JobError;
pub use spec::{Job, JobKind, VmOutput};
pub use vm_job::{JobSpec, VmJob};
