//  LIB.rs
// 
//  Created:
//    14 Feb 2023, 10:40:02
//  Last edited:
//    22 Feb 2023, 11:15:48
//  Auto updated?
//    Yes
// 
//  Description:
//!   The `spinner-cli` crate implements the `vm-spinner` executable. The
//!   library part holds what the entrypoint needs in a testable form.
// 

// Declare modules
pub mod errors;
pub mod logging;
pub mod options;
