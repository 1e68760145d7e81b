//  MAIN.rs
//
//  Created:
//    14 Feb 2023, 10:38:19
//  Last edited:
//    22 Feb 2023, 11:20:54
//  Auto updated?
//    Yes
//
//  Description:
//!   Entrypoint to the `vm-spinner` executable.
//

#[macro_use]
extern crate human_panic;

use std::process;
use std::sync::Arc;

use clap::Parser;
use console::style;
use dotenvy::dotenv;
use log::{debug, info};

use spinner_cfg::SpinnerConfig;
use spinner_cfg::errors::ValidationWarning;
use spinner_cfg::spinner::host_cpus;
use spinner_drv::Orchestrator;
use spinner_job::{Job, VmJob};
use spinner_vm::VagrantRuntime;

use spinner_cli::errors::CliError;
use spinner_cli::logging::init_logger;
use spinner_cli::options::Arguments;


/***** ENTRYPOINT *****/
#[tokio::main]
async fn main() {
    // Parse the CLI arguments
    dotenv().ok();
    let args: Arguments = Arguments::parse();

    setup_panic!(Metadata {
        name: "vm-spinner".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    });

    match run(args).await {
        Ok(_) => process::exit(0),
        Err(err) => {
            eprintln!("{}: {}", style("error").bold().red(), err);
            process::exit(1);
        }
    }
}



/// Runs the job given on the command line.
///
/// # Arguments
/// - `args`: The parsed Arguments.
///
/// # Errors
/// This function errors if the configuration is invalid or the job could not be built. Errors within VMs are only logged.
async fn run(args: Arguments) -> Result<(), CliError> {
    // Resolve and check the configuration before anything else happens
    let config: SpinnerConfig = args.config()?;
    let host: usize = host_cpus();
    let warnings: Vec<ValidationWarning> = match config.validate(host) {
        Ok(warnings) => warnings,
        Err(err)     => { return Err(CliError::InvalidConfig{ err }); },
    };
    for warning in warnings {
        eprintln!("{}: {}", style("warning").bold().yellow(), warning);
    }

    // Only now do we know where to log to
    init_logger(&config.log)?;
    debug!("Host has {} CPU(s); running with {:?}", host, config);

    // Build the job
    let job: VmJob = match VmJob::new(args.job.into(), args.images) {
        Ok(job)  => job,
        Err(err) => { return Err(CliError::JobCreateError{ err }); },
    };
    info!("Running '{}' job on {} image(s)", job.kind(), job.images().len());

    // Run it
    let runtime: Arc<VagrantRuntime> = Arc::new(VagrantRuntime::new(&config.workdir, &config.vagrant, config.keep_vms));
    let orchestrator: Orchestrator<VagrantRuntime> = Orchestrator::new(runtime, Arc::new(config));
    match orchestrator.run(job).await {
        Ok(_)    => Ok(()),
        Err(err) => Err(CliError::JobRunError{ err }),
    }
}
