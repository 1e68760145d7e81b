//  VM JOB.rs
//
//  Created:
//    09 Feb 2023, 11:48:30
//  Last edited:
//    21 Feb 2023, 11:36:52
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the closed set of jobs `vm-spinner` knows, and how to select
//!   one of them.
//

use std::io::Read;
use std::path::PathBuf;

use crate::build_job::BuildJob;
use crate::cmd_job::CommandJob;
use crate::errors::JobError;
use crate::spec::{Job, JobKind, VmOutput};


/***** TESTS *****/





/***** LIBRARY *****/
/// Describes which job to run, as chosen by the user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum JobSpec {
    /// Build the eBPF probe at the given commit.
    Bpf{ commit: Option<String> },
    /// Build the kernel module at the given commit.
    Kmod{ commit: Option<String> },
    /// Run the given command.
    Cmd{ line: String },
    /// Run whatever is on stdin.
    Stdin,
    /// Run the given script file.
    Script{ file: PathBuf },
}

impl JobSpec {
    /// Returns the kind of job this describes.
    pub fn kind(&self) -> JobKind {
        match self {
            JobSpec::Bpf{ .. }    => JobKind::Bpf,
            JobSpec::Kmod{ .. }   => JobKind::Kmod,
            JobSpec::Cmd{ .. }    => JobKind::Cmd,
            JobSpec::Stdin        => JobKind::Stdin,
            JobSpec::Script{ .. } => JobKind::Script,
        }
    }
}



/// Any of the jobs `vm-spinner` can run.
#[derive(Debug)]
pub enum VmJob {
    Bpf(BuildJob),
    Kmod(BuildJob),
    Cmd(CommandJob),
    Stdin(CommandJob),
    Script(CommandJob),
}

impl VmJob {
    /// Constructor for the VmJob that reads the command of a `JobSpec::Stdin` from the process' stdin.
    ///
    /// # Arguments
    /// - `spec`: The JobSpec that says which job to build.
    /// - `images`: The images given by the user. May be empty for jobs with default images.
    ///
    /// # Returns
    /// A new VmJob instance.
    ///
    /// # Errors
    /// This function errors if the job cannot be built with the given parameters.
    #[inline]
    pub fn new(spec: JobSpec, images: Vec<String>) -> Result<Self, JobError> {
        Self::with_stdin(spec, images, std::io::stdin().lock())
    }

    /// Constructor for the VmJob that reads the command of a `JobSpec::Stdin` from the given reader.
    ///
    /// # Errors
    /// This function errors if the job cannot be built with the given parameters.
    pub fn with_stdin(spec: JobSpec, images: Vec<String>, stdin: impl Read) -> Result<Self, JobError> {
        let kind: JobKind = spec.kind();
        match spec {
            JobSpec::Bpf{ commit }    => Ok(Self::Bpf(BuildJob::new(kind, commit, images)?)),
            JobSpec::Kmod{ commit }   => Ok(Self::Kmod(BuildJob::new(kind, commit, images)?)),
            JobSpec::Cmd{ line }      => Ok(Self::Cmd(CommandJob::new(kind, line, images)?)),
            JobSpec::Stdin            => Ok(Self::Stdin(CommandJob::from_reader(kind, stdin, images)?)),
            JobSpec::Script{ file }   => Ok(Self::Script(CommandJob::from_path(kind, file, images)?)),
        }
    }

    /// Returns the kind of this job.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Bpf(_)    => JobKind::Bpf,
            Self::Kmod(_)   => JobKind::Kmod,
            Self::Cmd(_)    => JobKind::Cmd,
            Self::Stdin(_)  => JobKind::Stdin,
            Self::Script(_) => JobKind::Script,
        }
    }
}

impl Job for VmJob {
    fn images(&self) -> &[String] {
        match self {
            Self::Bpf(job) | Self::Kmod(job)                     => job.images(),
            Self::Cmd(job) | Self::Stdin(job) | Self::Script(job) => job.images(),
        }
    }

    fn command(&self) -> &str {
        match self {
            Self::Bpf(job) | Self::Kmod(job)                     => job.command(),
            Self::Cmd(job) | Self::Stdin(job) | Self::Script(job) => job.command(),
        }
    }

    fn process(&mut self, output: VmOutput) {
        match self {
            Self::Bpf(job) | Self::Kmod(job)                     => job.process(output),
            Self::Cmd(job) | Self::Stdin(job) | Self::Script(job) => job.process(output),
        }
    }

    fn done(&mut self) {
        match self {
            Self::Bpf(job) | Self::Kmod(job)                     => job.done(),
            Self::Cmd(job) | Self::Stdin(job) | Self::Script(job) => job.done(),
        }
    }
}
