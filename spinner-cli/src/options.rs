//  OPTIONS.rs
//
//  Created:
//    14 Feb 2023, 13:05:41
//  Last edited:
//    22 Feb 2023, 11:12:26
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the command-line arguments of `vm-spinner`, and how they
//!   combine with the configuration file.
//

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use spinner_cfg::SpinnerConfig;
use spinner_cfg::logging::LogLevel;
use spinner_job::JobSpec;

use crate::errors::CliError;


/***** TESTS *****/





/***** LIBRARY *****/
/// Defines the toplevel arguments for the `vm-spinner` tool.
#[derive(Debug, Parser)]
#[clap(name = "vm-spinner", about = "Runs a job on a set of freshly booted Vagrant VMs, a bounded number at a time.")]
pub struct Arguments {
    /// The images to run on.
    #[clap(short, long, value_delimiter = ',', env = "VMSPINNER_IMAGES", help = "Comma-separated list of Vagrant boxes to run the job on. Required by all jobs except 'bpf' and 'kmod', which have a default set.")]
    pub images      : Vec<String>,
    /// The provider to boot the VMs with.
    #[clap(short, long, env = "VMSPINNER_PROVIDER", help = "The Vagrant provider to boot the VMs with (e.g., 'virtualbox' or 'libvirt').")]
    pub provider    : Option<String>,
    /// The memory of every VM.
    #[clap(long, env = "VMSPINNER_MEMORY", help = "The amount of memory (in MiB) to give every VM.")]
    pub memory      : Option<usize>,
    /// The CPUs of every VM.
    #[clap(long, env = "VMSPINNER_CPUS", help = "The number of CPUs to give every VM. May not exceed the number of CPUs of this host.")]
    pub cpus        : Option<usize>,
    /// The number of VMs that run at the same time.
    #[clap(long, env = "VMSPINNER_PARALLELISM", help = "The number of VMs to run at the same time. May not exceed the number of CPUs of this host.")]
    pub parallelism : Option<usize>,
    /// The per-VM timeout.
    #[clap(long, env = "VMSPINNER_TIMEOUT", help = "If given, VMs that did not complete within this many seconds are killed.")]
    pub timeout     : Option<u64>,

    /// Where the VM directories go.
    #[clap(long, env = "VMSPINNER_WORKDIR", help = "The directory in which every VM gets its own directory with a Vagrantfile.")]
    pub workdir  : Option<PathBuf>,
    /// The Vagrant executable.
    #[clap(long, env = "VMSPINNER_VAGRANT", help = "The Vagrant executable to use.")]
    pub vagrant  : Option<PathBuf>,
    /// Whether to leave VMs alone after they completed.
    #[clap(long, env = "VMSPINNER_KEEP_VMS", help = "If given, does not destroy VMs after they completed. Useful for debugging.")]
    pub keep_vms : bool,

    /// The configuration file.
    #[clap(long, env = "VMSPINNER_CONFIG", help = "A YAML file with defaults for any of these options. Options given on the command line take precedence.")]
    pub config : Option<PathBuf>,

    /// Whether to log as JSON.
    #[clap(long, env = "VMSPINNER_LOG_JSON", help = "If given, writes every log record as a JSON object.")]
    pub log_json   : bool,
    /// The log level.
    #[clap(long, env = "VMSPINNER_LOG_LEVEL", help = "The most verbose log level to show. One of 'trace', 'debug' or 'info'.")]
    pub log_level  : Option<LogLevel>,
    /// The log file.
    #[clap(long, env = "VMSPINNER_LOG_OUTPUT", help = "If given, appends log records to this file instead of writing them to stdout.")]
    pub log_output : Option<PathBuf>,

    /// The job to run.
    #[clap(subcommand)]
    pub job : JobSubcommand,
}

impl Arguments {
    /// Resolves the configuration of this run: defaults, then the configuration file (if any), then the flags.
    ///
    /// # Errors
    /// This function errors if the configuration file was given but could not be loaded.
    pub fn config(&self) -> Result<SpinnerConfig, CliError> {
        let mut config: SpinnerConfig = match &self.config {
            Some(path) => match SpinnerConfig::from_path(path) {
                Ok(config) => config,
                Err(err)   => { return Err(CliError::ConfigLoadError{ err }); },
            },
            None => SpinnerConfig::default(),
        };

        if let Some(provider) = &self.provider { config.provider = provider.clone(); }
        if let Some(memory) = self.memory { config.memory = memory; }
        if let Some(cpus) = self.cpus { config.cpus = cpus; }
        if let Some(parallelism) = self.parallelism { config.parallelism = parallelism; }
        if let Some(timeout) = self.timeout { config.timeout = Some(timeout); }
        if let Some(workdir) = &self.workdir { config.workdir = workdir.clone(); }
        if let Some(vagrant) = &self.vagrant { config.vagrant = vagrant.clone(); }
        if self.keep_vms { config.keep_vms = true; }

        if self.log_json { config.log.json = true; }
        if let Some(level) = self.log_level { config.log.level = level; }
        if let Some(output) = &self.log_output { config.log.output = Some(output.clone()); }
        Ok(config)
    }
}



/// Defines the jobs `vm-spinner` can run.
#[derive(Debug, Subcommand)]
pub enum JobSubcommand {
    #[clap(name = "bpf", about = "Builds the falcosecurity eBPF probe on every image and runs it through the verifier.")]
    Bpf {
        #[clap(short, long, help = "The commit of the falcosecurity/libs repository to build. Defaults to 'master'.")]
        commithash : Option<String>,
    },
    #[clap(name = "kmod", about = "Builds the falcosecurity kernel module on every image and loads it.")]
    Kmod {
        #[clap(short, long, help = "The commit of the falcosecurity/libs repository to build. Defaults to 'master'.")]
        commithash : Option<String>,
    },
    #[clap(name = "cmd", about = "Runs the given command on every image.")]
    Cmd {
        #[clap(short, long, help = "The command to run.")]
        line : String,
    },
    #[clap(name = "stdin", about = "Runs the command read from stdin on every image.")]
    Stdin,
    #[clap(name = "script", about = "Runs the given script on every image.")]
    Script {
        #[clap(short, long, help = "The script file to run.")]
        file : PathBuf,
    },
}

impl From<JobSubcommand> for JobSpec {
    fn from(value: JobSubcommand) -> Self {
        match value {
            JobSubcommand::Bpf{ commithash }  => JobSpec::Bpf{ commit: commithash },
            JobSubcommand::Kmod{ commithash } => JobSpec::Kmod{ commit: commithash },
            JobSubcommand::Cmd{ line }        => JobSpec::Cmd{ line },
            JobSubcommand::Stdin              => JobSpec::Stdin,
            JobSubcommand::Script{ file }     => JobSpec::Script{ file },
        }
    }
}
