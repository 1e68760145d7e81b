//  VAGRANT.rs
//
//  Created:
//    07 Feb 2023, 11:18:52
//  Last edited:
//    20 Feb 2023, 14:21:09
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements a VmRuntime that boots VMs with Vagrant: it writes a
//!   Vagrantfile per instance, runs `vagrant up`, runs the command over
//!   `vagrant ssh` and destroys the VM afterwards.
//

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use log::debug;
use tokio::fs as tfs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::errors::VmError;
use crate::spec::{session, SessionSenders, VmConfig, VmEvent, VmRuntime, VmSession};


/***** TESTS *****/





/***** CONSTANTS *****/
/// The number of events every channel of a Vagrant session buffers.
pub const SESSION_CAPACITY: usize = 64;





/***** HELPER FUNCTIONS *****/
/// Generates the Vagrantfile for the given VM.
///
/// # Arguments
/// - `config`: The VmConfig describing the VM.
///
/// # Returns
/// The contents of the Vagrantfile, as a string.
fn vagrantfile(config: &VmConfig) -> String {
    format!(r#"Vagrant.configure("2") do |config|
  config.vm.box = "{image}"
  config.vm.synced_folder ".", "/vagrant", disabled: true
  config.vm.provider "{provider}" do |p|
    p.cpus = {cpus}
    p.memory = {memory}
  end
end
"#,
        image    = config.image,
        provider = config.provider,
        cpus     = config.cpus,
        memory   = config.memory,
    )
}

/// Returns a human-readable version of the given command, for logging and errors.
fn describe(cmd: &Command) -> String {
    let cmd = cmd.as_std();
    let mut res: String = cmd.get_program().to_string_lossy().to_string();
    for arg in cmd.get_args() {
        res.push(' ');
        res.push_str(&arg.to_string_lossy());
    }
    res
}

/// Which kind of event to turn a line of output into.
#[derive(Clone, Copy, Debug)]
enum Route {
    CommandOutput,
    Info,
    Debug,
}

impl Route {
    /// Wraps the given line in an event of this kind.
    #[inline]
    fn event(&self, line: String) -> VmEvent {
        match self {
            Self::CommandOutput => VmEvent::CommandOutput(line),
            Self::Info          => VmEvent::Info(line),
            Self::Debug         => VmEvent::Debug(line),
        }
    }
}



/// Runs the given command to completion, turning every line it prints into an event.
///
/// # Arguments
/// - `cmd`: The command to run.
/// - `tx`: The session to emit events on.
/// - `stdout`: What to turn lines on stdout into.
/// - `stderr`: What to turn lines on stderr into.
/// - `interruptible`: If true, the command is killed once the session's kill switch fires.
/// - `name`: The name of the VM we are running this for (used for debugging).
///
/// # Returns
/// The exit status of the command.
///
/// # Errors
/// This function errors if we failed to launch the command, read its output or wait for it, or if it was killed.
async fn run_streamed(mut cmd: Command, tx: &mut SessionSenders, stdout: Route, stderr: Route, interruptible: bool, name: &str) -> Result<ExitStatus, VmError> {
    let scmd: String = describe(&cmd);
    debug!("[{}] Running '{}'", name, scmd);

    // Launch the command with its outputs captured
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err)  => { return Err(VmError::SpawnError{ command: scmd, err }); },
    };
    let out = match child.stdout.take() {
        Some(out) => out,
        None      => { return Err(VmError::PipeError{ command: scmd, what: "stdout" }); },
    };
    let err = match child.stderr.take() {
        Some(err) => err,
        None      => { return Err(VmError::PipeError{ command: scmd, what: "stderr" }); },
    };
    let mut out_lines = BufReader::new(out).lines();
    let mut err_lines = BufReader::new(err).lines();

    // Forward lines until both streams are exhausted
    let (mut out_open, mut err_open): (bool, bool) = (true, true);
    while out_open || err_open {
        tokio::select! {
            line = out_lines.next_line(), if out_open => match line {
                Ok(Some(line)) => { tx.emit(stdout.event(line)).await; },
                Ok(None)       => { out_open = false; },
                Err(err)       => { out_open = false; tx.emit(VmEvent::Error(VmError::ReadError{ command: scmd.clone(), err })).await; },
            },
            line = err_lines.next_line(), if err_open => match line {
                Ok(Some(line)) => { tx.emit(stderr.event(line)).await; },
                Ok(None)       => { err_open = false; },
                Err(err)       => { err_open = false; tx.emit(VmEvent::Error(VmError::ReadError{ command: scmd.clone(), err })).await; },
            },
            _ = tx.kill.fired(), if interruptible => {
                // Dropping the child kills it
                return Err(VmError::Killed{ name: name.into() });
            },
        }
    }

    // Now wait for it to exit
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => Ok(status),
            Err(err)   => Err(VmError::WaitError{ command: scmd, err }),
        },
        _ = tx.kill.fired(), if interruptible => Err(VmError::Killed{ name: name.into() }),
    }
}

/// Runs the given command to completion and turns a non-zero exit code into an error.
async fn run_checked(cmd: Command, tx: &mut SessionSenders, stdout: Route, stderr: Route, interruptible: bool, name: &str) -> Result<(), VmError> {
    let scmd: String = describe(&cmd);
    let status: ExitStatus = run_streamed(cmd, tx, stdout, stderr, interruptible, name).await?;
    if status.success() {
        Ok(())
    } else {
        Err(VmError::CommandFailed{ command: scmd, code: status.code() })
    }
}





/***** LIBRARY *****/
/// A VmRuntime that uses Vagrant to manage VMs.
#[derive(Clone, Debug)]
pub struct VagrantRuntime {
    /// The directory in which every VM gets its own instance directory (with its Vagrantfile).
    workdir    : PathBuf,
    /// The Vagrant executable to call.
    executable : PathBuf,
    /// Whether to leave VMs (and their directories) alive after their session.
    keep_vms   : bool,
}

impl VagrantRuntime {
    /// Constructor for the VagrantRuntime.
    ///
    /// # Arguments
    /// - `workdir`: The directory in which every VM gets its own instance directory.
    /// - `executable`: The Vagrant executable to call.
    /// - `keep_vms`: If true, VMs are not destroyed after their session. This is very useful for debugging.
    ///
    /// # Returns
    /// A new VagrantRuntime instance.
    #[inline]
    pub fn new(workdir: impl Into<PathBuf>, executable: impl Into<PathBuf>, keep_vms: bool) -> Self {
        Self {
            workdir    : workdir.into(),
            executable : executable.into(),
            keep_vms,
        }
    }



    /// Builds a Vagrant command that operates on the VM in the given directory.
    fn command(&self, dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(args);
        cmd.current_dir(dir);
        cmd
    }

    /// Runs a single session from start to end. Always ends with `VmEvent::Done`.
    ///
    /// # Arguments
    /// - `config`: The VmConfig describing the VM to run.
    /// - `tx`: The session to emit events on.
    async fn run_session(self, config: VmConfig, mut tx: SessionSenders) {
        let dir: PathBuf = self.workdir.join(&config.name);

        // Prepare the instance directory
        let prepared: Result<(), VmError> = async {
            if let Err(err) = tfs::create_dir_all(&dir).await { return Err(VmError::WorkdirCreateError{ path: dir.clone(), err }); }
            let file: PathBuf = dir.join("Vagrantfile");
            if let Err(err) = tfs::write(&file, vagrantfile(&config)).await { return Err(VmError::VagrantfileWriteError{ path: file, err }); }
            Ok(())
        }.await;
        if let Err(err) = prepared {
            tx.emit(VmEvent::Error(err)).await;
            tx.emit(VmEvent::Done).await;
            return;
        }

        // Boot the VM, then run the command in it
        tx.emit(VmEvent::Info(format!("Booting VM '{}' ({}, provider '{}', {} CPUs, {} MiB)", config.name, config.image, config.provider, config.cpus, config.memory))).await;
        let up = self.command(&dir, &["up", "--provider", &config.provider]);
        match run_checked(up, &mut tx, Route::Debug, Route::Debug, true, &config.name).await {
            Ok(_) => {
                tx.emit(VmEvent::Info("Running command...".into())).await;
                let ssh = self.command(&dir, &["ssh", "-c", &config.command]);
                if let Err(err) = run_checked(ssh, &mut tx, Route::CommandOutput, Route::Info, true, &config.name).await {
                    tx.emit(VmEvent::Error(err)).await;
                }
            },
            Err(err) => { tx.emit(VmEvent::Error(err)).await; },
        }

        // Tear it down again, even if we were killed
        if !self.keep_vms {
            tx.emit(VmEvent::Info("Destroying VM...".into())).await;
            let destroy = self.command(&dir, &["destroy", "-f"]);
            if let Err(err) = run_checked(destroy, &mut tx, Route::Debug, Route::Debug, false, &config.name).await {
                tx.emit(VmEvent::Error(err)).await;
            }
            if let Err(err) = tfs::remove_dir_all(&dir).await {
                tx.emit(VmEvent::Error(VmError::WorkdirRemoveError{ path: dir, err })).await;
            }
        } else {
            tx.emit(VmEvent::Info(format!("Keeping VM in '{}'", dir.display()))).await;
        }

        tx.emit(VmEvent::Done).await;
    }
}

impl VmRuntime for VagrantRuntime {
    fn start(&self, config: VmConfig) -> VmSession {
        let (tx, session) = session(SESSION_CAPACITY);
        tokio::spawn(self.clone().run_session(config, tx));
        session
    }
}
