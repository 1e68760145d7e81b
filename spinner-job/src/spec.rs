//  SPEC.rs
//
//  Created:
//    08 Feb 2023, 13:11:37
//  Last edited:
//    20 Feb 2023, 17:04:58
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the interface every job implements, and the output records
//!   it is fed with.
//

use std::fmt::{Display, Formatter, Result as FResult};


/***** LIBRARY *****/
/// A single line of command output, tagged with the VM it came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VmOutput {
    /// The image of the VM that produced this line.
    pub vm   : String,
    /// The line itself.
    pub line : String,
}

impl VmOutput {
    /// Constructor for the VmOutput.
    #[inline]
    pub fn new(vm: impl Into<String>, line: impl Into<String>) -> Self {
        Self { vm: vm.into(), line: line.into() }
    }
}



/// The kinds of jobs there are.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum JobKind {
    /// Builds the falcosecurity eBPF probe and runs it through the verifier.
    Bpf,
    /// Builds the falcosecurity kernel module and loads it.
    Kmod,
    /// Runs a command given on the command line.
    Cmd,
    /// Runs a command read from stdin.
    Stdin,
    /// Runs a script read from a file.
    Script,
}

impl Display for JobKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use JobKind::*;
        match self {
            Bpf    => write!(f, "bpf"),
            Kmod   => write!(f, "kmod"),
            Cmd    => write!(f, "cmd"),
            Stdin  => write!(f, "stdin"),
            Script => write!(f, "script"),
        }
    }
}



/// Defines a workload that is run identically on a set of VMs.
///
/// `process()` is never called concurrently with itself, so implementations need no synchronization of their own.
pub trait Job: 'static + Send {
    /// Returns the images to run on, in the order in which they should be started.
    fn images(&self) -> &[String];

    /// Returns the command to run in every VM.
    fn command(&self) -> &str;

    /// Handles a single line of output of any of the VMs.
    ///
    /// # Arguments
    /// - `output`: The VmOutput with the line and the VM it came from.
    fn process(&mut self, output: VmOutput);

    /// Called exactly once, after every VM has completed and every line has been processed.
    fn done(&mut self);
}
