//  SPEC.rs
//
//  Created:
//    07 Feb 2023, 09:40:19
//  Last edited:
//    20 Feb 2023, 14:25:44
//  Auto updated?
//    Yes
//
//  Description:
//!   Defines the interface between the orchestrator and a VM runtime: the
//!   configuration of a single VM, the events a session produces and the
//!   channels they travel over.
//

use std::fmt::{Display, Formatter, Result as FResult};

use log::trace;
use tokio::sync::{mpsc, oneshot};

use crate::errors::VmError;


/***** TESTS *****/





/***** HELPER FUNCTIONS *****/
/// Derives the name of a VM instance from its image and its position in the list of images.
///
/// Characters that would not be valid in a single directory name are replaced by dashes.
///
/// # Arguments
/// - `image`: The image the VM boots.
/// - `index`: The position of the image in the list of images to run on.
///
/// # Returns
/// A name that is unique among all VMs of a run, even if the same image occurs multiple times.
pub fn instance_name(image: &str, index: usize) -> String {
    let image: String = image.chars().map(|c| if c == '/' || c == '\\' || c == ':' { '-' } else { c }).collect();
    format!("{}-{}", image, index)
}





/***** LIBRARY *****/
/// Defines everything a runtime needs to know to run a single VM. Never changes after creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VmConfig {
    /// The unique name of this VM instance.
    pub name     : String,
    /// The image (i.e., Vagrant box) to boot.
    pub image    : String,
    /// The provider to boot the image with.
    pub provider : String,
    /// The number of CPUs to give the VM.
    pub cpus     : usize,
    /// The amount of memory (in MiB) to give the VM.
    pub memory   : usize,
    /// The command to run in the VM once it booted.
    pub command  : String,
}

impl VmConfig {
    /// Constructor for the VmConfig.
    ///
    /// # Arguments
    /// - `image`: The image (i.e., Vagrant box) to boot.
    /// - `index`: The position of the image in the list of images of this run, used to derive a unique instance name.
    /// - `provider`: The provider to boot the image with.
    /// - `cpus`: The number of CPUs to give the VM.
    /// - `memory`: The amount of memory (in MiB) to give the VM.
    /// - `command`: The command to run in the VM once it booted.
    ///
    /// # Returns
    /// A new VmConfig instance.
    pub fn new(image: impl Into<String>, index: usize, provider: impl Into<String>, cpus: usize, memory: usize, command: impl Into<String>) -> Self {
        let image: String = image.into();
        Self {
            name     : instance_name(&image, index),
            image,
            provider : provider.into(),
            cpus,
            memory,
            command  : command.into(),
        }
    }
}



/// Defines the events a VM session may produce.
#[derive(Debug)]
pub enum VmEvent {
    /// The session completed. Nothing comes after this.
    Done,
    /// A single line of output of the command run in the VM.
    CommandOutput(String),
    /// Informational message about the session.
    Info(String),
    /// Verbose message about the session (e.g., raw provisioning output).
    Debug(String),
    /// Something went wrong, but the session goes on until it's done.
    Error(VmError),
}

impl Display for VmEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use VmEvent::*;
        match self {
            Done => write!(f, "Done"),

            CommandOutput(_) => write!(f, "CommandOutput"),
            Info(_)          => write!(f, "Info"),
            Debug(_)         => write!(f, "Debug"),
            Error(_)         => write!(f, "Error"),
        }
    }
}



/// The runtime-side end of the kill signal of a session.
///
/// Fires when the orchestrator asks to kill the session, or when it stopped listening to the session altogether.
#[derive(Debug)]
pub struct KillSwitch {
    /// The receiver that resolves once the session should die, or None if it already did.
    rx        : Option<oneshot::Receiver<()>>,
    /// Whether the switch has fired.
    has_fired : bool,
}

impl KillSwitch {
    /// Waits until the switch fires. If it already fired, this never returns, so it can be used in a `select!` over and over.
    pub async fn fired(&mut self) {
        match self.rx.as_mut() {
            Some(rx) => {
                // Both a signal and a dropped session mean nobody wants us to continue
                let _ = rx.await;
                self.rx        = None;
                self.has_fired = true;
            },
            None => std::future::pending().await,
        }
    }

    /// Returns whether the switch fired (as far as we have observed by calling `fired()`).
    #[inline]
    pub fn is_fired(&self) -> bool { self.has_fired }
}



/// The runtime-side ends of the channels of a single session.
#[derive(Debug)]
pub struct SessionSenders {
    /// Sends the completion signal. None once it has been sent.
    done       : Option<oneshot::Sender<()>>,
    /// Sends command output.
    cmd_output : mpsc::Sender<String>,
    /// Sends debug messages.
    debug      : mpsc::Sender<String>,
    /// Sends informational messages.
    info       : mpsc::Sender<String>,
    /// Sends (non-fatal) errors.
    error      : mpsc::Sender<VmError>,

    /// Tells the runtime when to stop early.
    pub kill : KillSwitch,
}

impl SessionSenders {
    /// Sends the given event on the appropriate channel.
    ///
    /// Waits if that channel is full. Events after `VmEvent::Done` are dropped, as are events nobody listens to anymore.
    ///
    /// # Arguments
    /// - `event`: The VmEvent to send.
    pub async fn emit(&mut self, event: VmEvent) {
        if self.done.is_none() {
            trace!("Dropping {} event emitted after completion", event);
            return;
        }

        // The receiving side may have given up on us (killed session), in which case there is nobody left to tell
        match event {
            VmEvent::Done => {
                if let Some(done) = self.done.take() { let _ = done.send(()); }
            },

            VmEvent::CommandOutput(line) => { let _ = self.cmd_output.send(line).await; },
            VmEvent::Info(line)          => { let _ = self.info.send(line).await; },
            VmEvent::Debug(line)         => { let _ = self.debug.send(line).await; },
            VmEvent::Error(err)          => { let _ = self.error.send(err).await; },
        }
    }

    /// Returns whether `VmEvent::Done` has been emitted.
    #[inline]
    pub fn is_done(&self) -> bool { self.done.is_none() }
}



/// The orchestrator-side ends of the channels of a single session, as returned by `VmRuntime::start()`.
#[derive(Debug)]
pub struct VmSession {
    /// Resolves once the session completed.
    pub done       : oneshot::Receiver<()>,
    /// Lines of output of the command run in the VM.
    pub cmd_output : mpsc::Receiver<String>,
    /// Debug messages.
    pub debug      : mpsc::Receiver<String>,
    /// Informational messages.
    pub info       : mpsc::Receiver<String>,
    /// Non-fatal errors.
    pub error      : mpsc::Receiver<VmError>,

    /// Tells the runtime to kill the session. None once used.
    kill : Option<oneshot::Sender<()>>,
}

impl VmSession {
    /// Asks the runtime to kill this session.
    ///
    /// # Returns
    /// Whether this was the first time we asked.
    pub fn kill(&mut self) -> bool {
        match self.kill.take() {
            Some(kill) => { let _ = kill.send(()); true },
            None       => false,
        }
    }
}



/// Defines a VM runtime, i.e., something that can boot a VM, run a command in it and tear it down again.
pub trait VmRuntime: 'static + Send + Sync {
    /// Starts a new session for the given VM.
    ///
    /// This function does not wait for the VM; its lifecycle is reported through the returned channels, which end with exactly one completion signal.
    ///
    /// # Arguments
    /// - `config`: The VmConfig describing the VM to run.
    ///
    /// # Returns
    /// The VmSession over which the session's events will arrive.
    fn start(&self, config: VmConfig) -> VmSession;
}



/// Creates a linked pair of session channels.
///
/// # Arguments
/// - `capacity`: The number of events every channel may buffer before senders have to wait.
///
/// # Returns
/// The runtime-side and orchestrator-side ends, in that order.
pub fn session(capacity: usize) -> (SessionSenders, VmSession) {
    let capacity: usize = capacity.max(1);
    let (done_tx, done_rx)     = oneshot::channel();
    let (kill_tx, kill_rx)     = oneshot::channel();
    let (output_tx, output_rx) = mpsc::channel(capacity);
    let (debug_tx, debug_rx)   = mpsc::channel(capacity);
    let (info_tx, info_rx)     = mpsc::channel(capacity);
    let (error_tx, error_rx)   = mpsc::channel(capacity);

    (
        SessionSenders {
            done       : Some(done_tx),
            cmd_output : output_tx,
            debug      : debug_tx,
            info       : info_tx,
            error      : error_tx,

            kill : KillSwitch{ rx: Some(kill_rx), has_fired: false },
        },
        VmSession {
            done       : done_rx,
            cmd_output : output_rx,
            debug      : debug_rx,
            info       : info_rx,
            error      : error_rx,

            kill : Some(kill_tx),
        },
    )
}
