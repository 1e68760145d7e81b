//  LIB.rs
// 
//  Created:
//    07 Feb 2023, 09:31:12
//  Last edited:
//    20 Feb 2023, 14:26:07
//  Auto updated?
//    Yes
// 
//  Description:
//!   The `spinner-vm` crate defines what a VM runtime looks like to the
//!   orchestrator (a configuration in, a set of event channels out) and
//!   implements one on top of Vagrant.
// 

// Declare modules
pub mod errors;
pub mod spec;
pub mod vagrant;


// Bring some stuff into the crate namespace
pub use errors::VmError;
pub use spec::{session, SessionSenders, VmConfig, VmEvent, VmRuntime, VmSession};
pub use vagrant::VagrantRuntime;
