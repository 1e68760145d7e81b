//  LIB.rs
// 
//  Created:
//    06 Feb 2023, 10:12:40
//  Last edited:
//    21 Feb 2023, 16:03:11
//  Auto updated?
//    Yes
// 
//  Description:
//!   The `spinner-cfg` crate defines the configuration of a `vm-spinner`
//!   run: the settings of each VM, the parallelism bound, logging
//!   options and the validation of all of that against the host.
// 

// Declare modules
pub mod errors;
pub mod logging;
pub mod spinner;


// Bring some stuff into the crate namespace
pub use spinner::SpinnerConfig;
