//  SPINNER.rs
//
//  Created:
//    06 Feb 2023, 10:20:55
//  Last edited:
//    21 Feb 2023, 16:01:48
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the `spinner.yml` file, which describes how every VM of a
//!   run looks (provider, CPUs, memory), how many of them may run at
//!   the same time and how the run logs.
//

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

pub use crate::errors::SpinnerConfigError as Error;
use crate::errors::{ValidationError, ValidationWarning};
use crate::logging::LogConfig;


/***** TESTS *****/





/***** CONSTANTS *****/
/// The default amount of memory (in MiB) for every VM.
pub const DEFAULT_MEMORY: usize = 1024;
/// The default VM provider.
pub const DEFAULT_PROVIDER: &str = "virtualbox";
/// The default capacity of the channel that carries command output to the job.
pub const DEFAULT_BUFFER: usize = 16;
/// The default directory in which VM instance directories are created.
pub const DEFAULT_WORKDIR: &str = "/tmp";
/// The default Vagrant executable.
pub const DEFAULT_VAGRANT: &str = "vagrant";





/***** HELPER FUNCTIONS *****/
/// Returns the default parallelism for a host with the given number of CPUs (half of them, at least one).
#[inline]
pub fn default_parallelism(host_cpus: usize) -> usize {
    (host_cpus / 2).max(1)
}

/// Returns the default number of CPUs per VM for a host with the given number of CPUs, such that running the default parallelism fills the host.
#[inline]
pub fn default_cpus(host_cpus: usize) -> usize {
    (host_cpus / default_parallelism(host_cpus)).max(1)
}

/// Returns the number of CPUs of the host we are running on.
#[inline]
pub fn host_cpus() -> usize {
    num_cpus::get()
}





/***** LIBRARY *****/
/// Defines the configuration of a single `vm-spinner` run.
///
/// It is constructed once at startup and then only read.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SpinnerConfig {
    /// The Vagrant provider to boot the VMs with.
    pub provider    : String,
    /// The number of CPUs of every VM.
    pub cpus        : usize,
    /// The amount of memory (in MiB) of every VM.
    pub memory      : usize,
    /// The maximum number of VMs running at the same time.
    pub parallelism : usize,
    /// If given, the number of seconds after which a VM that still did not complete is killed.
    pub timeout     : Option<u64>,
    /// The number of command output lines that may be queued for the job before VMs have to wait.
    pub buffer      : usize,

    /// The directory in which every VM gets its own instance directory.
    pub workdir  : PathBuf,
    /// The Vagrant executable to call.
    pub vagrant  : PathBuf,
    /// If true, VMs are not destroyed after they completed. Useful for debugging.
    pub keep_vms : bool,

    /// How to log.
    pub log : LogConfig,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        let host: usize = host_cpus();
        Self {
            provider    : DEFAULT_PROVIDER.into(),
            cpus        : default_cpus(host),
            memory      : DEFAULT_MEMORY,
            parallelism : default_parallelism(host),
            timeout     : None,
            buffer      : DEFAULT_BUFFER,

            workdir  : DEFAULT_WORKDIR.into(),
            vagrant  : DEFAULT_VAGRANT.into(),
            keep_vms : false,

            log : LogConfig::default(),
        }
    }
}

impl SpinnerConfig {
    /// Reads a SpinnerConfig from the given YAML file. Fields that are missing get their default value.
    ///
    /// # Arguments
    /// - `path`: The path to read the config from.
    ///
    /// # Returns
    /// A new SpinnerConfig with the file's contents.
    ///
    /// # Errors
    /// This function errors if the file could not be read or was not valid YAML for a SpinnerConfig.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path: &Path = path.as_ref();
        debug!("Loading spinner config file '{}'...", path.display());

        // Get the raw file to parse
        let mut raw: String = String::new();
        {
            let mut handle: File = match File::open(path) {
                Ok(handle) => handle,
                Err(err)   => { return Err(Error::FileOpenError{ path: path.into(), err }); },
            };
            if let Err(err) = handle.read_to_string(&mut raw) { return Err(Error::FileReadError{ path: path.into(), err }); }
        }

        // Parse with serde
        match serde_yaml::from_str(&raw) {
            Ok(config) => Ok(config),
            Err(err)   => Err(Error::FileParseError{ path: path.into(), err }),
        }
    }



    /// Checks whether this configuration makes sense on a host with the given number of CPUs.
    ///
    /// # Arguments
    /// - `host_cpus`: The number of CPUs the host has (see `host_cpus()`).
    ///
    /// # Returns
    /// A list of non-fatal problems that should be reported to the user.
    ///
    /// # Errors
    /// This function errors if the configuration cannot be run at all, i.e., a single VM or the parallelism exceeds the host's CPUs, or either is zero.
    pub fn validate(&self, host_cpus: usize) -> Result<Vec<ValidationWarning>, ValidationError> {
        if self.cpus == 0 { return Err(ValidationError::ZeroCpus); }
        if self.parallelism == 0 { return Err(ValidationError::ZeroParallelism); }
        if self.cpus > host_cpus { return Err(ValidationError::CpusExceedHost{ cpus: self.cpus, host: host_cpus }); }
        if self.parallelism > host_cpus { return Err(ValidationError::ParallelismExceedsHost{ parallelism: self.parallelism, host: host_cpus }); }

        let mut warnings: Vec<ValidationWarning> = vec![];
        let total: usize = self.cpus.saturating_mul(self.parallelism);
        if total > host_cpus { warnings.push(ValidationWarning::Oversubscribed{ total, host: host_cpus }); }
        Ok(warnings)
    }

    /// Returns the per-VM deadline, if any.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}
