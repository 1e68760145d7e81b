//  WORKER.rs
//
//  Created:
//    10 Feb 2023, 11:05:21
//  Last edited:
//    22 Feb 2023, 09:47:36
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the per-VM control loop, which owns a single VM session
//!   and forwards its events to the log and the aggregator.
//

use std::fmt::{Display, Formatter, Result as FResult};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, trace};
use tokio::sync::mpsc;
use tokio::time::Instant;

use spinner_job::VmOutput;
use spinner_vm::{VmConfig, VmRuntime, VmSession};

use crate::scheduler::AdmissionToken;


/***** HELPER FUNCTIONS *****/
/// Forwards a single line of command output to the aggregator, waiting while it's busy.
///
/// # Arguments
/// - `results`: The channel to the aggregator.
/// - `name`: The name of the VM instance, for logging.
/// - `image`: The image of the VM, which is what the job knows it by.
/// - `line`: The line to forward.
async fn forward(results: &mpsc::Sender<VmOutput>, name: &str, image: &str, line: String) {
    info!("[{}] {}", name, line);
    if results.send(VmOutput::new(image, line)).await.is_err() {
        // Only happens if the aggregator died on us, in which case the orchestrator reports it
        error!("[{}] Output aggregator is gone; dropping output line", name);
    }
}

/// Handles every event that is already buffered in the session without waiting for more.
///
/// Output and log events travel over different channels than the completion signal, so the latter may overtake the former.
///
/// # Arguments
/// - `session`: The VmSession to drain.
/// - `results`: The channel to the aggregator.
/// - `name`: The name of the VM instance, for logging.
/// - `image`: The image of the VM.
async fn drain(session: &mut VmSession, results: &mpsc::Sender<VmOutput>, name: &str, image: &str) {
    while let Ok(line) = session.cmd_output.try_recv() { forward(results, name, image, line).await; }
    while let Ok(msg) = session.info.try_recv() { debug!("[{}] {}", name, msg); }
    while let Ok(msg) = session.debug.try_recv() { trace!("[{}] {}", name, msg); }
    while let Ok(err) = session.error.try_recv() { error!("[{}] {}", name, err); }
}





/***** LIBRARY *****/
/// Describes how a session ended, as far as the worker is concerned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionEnd {
    /// The runtime signalled completion.
    Completed,
    /// The runtime went away without signalling completion.
    Abandoned,
    /// The session did not complete in time and was killed. Reported once the runtime tore it down.
    TimedOut,
}

impl Display for SessionEnd {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use SessionEnd::*;
        match self {
            Completed => write!(f, "completed"),
            Abandoned => write!(f, "abandoned"),
            TimedOut  => write!(f, "timed out"),
        }
    }
}



/// Owns a single VM session from start to completion.
#[derive(Debug)]
pub struct Worker {
    /// The configuration of the VM to run.
    config  : VmConfig,
    /// The time the session gets to complete, if limited.
    timeout : Option<Duration>,
}

impl Worker {
    /// Constructor for the Worker.
    ///
    /// # Arguments
    /// - `config`: The VmConfig of the VM to run.
    /// - `timeout`: If given, the session is killed when it did not complete within this time. Otherwise, a session that never completes blocks this worker forever.
    ///
    /// # Returns
    /// A new Worker instance.
    #[inline]
    pub fn new(config: VmConfig, timeout: Option<Duration>) -> Self {
        Self { config, timeout }
    }



    /// Runs the session to completion.
    ///
    /// Command output is forwarded to the aggregator in the order in which the session produced it; everything else is logged. Errors reported by the session never stop it.
    ///
    /// # Arguments
    /// - `runtime`: The VmRuntime to start the session on.
    /// - `results`: The channel to the aggregator.
    /// - `token`: The AdmissionToken that allowed us to run. Released when this function returns, which, for a killed session, is only after the runtime tore the VM down.
    ///
    /// # Returns
    /// How the session ended.
    pub async fn run<R: VmRuntime>(self, runtime: Arc<R>, results: mpsc::Sender<VmOutput>, token: AdmissionToken) -> SessionEnd {
        let name: String  = self.config.name.clone();
        let image: String = self.config.image.clone();

        info!("[{}] Starting VM with image '{}' ({} CPU(s), {} MiB)...", name, image, self.config.cpus, self.config.memory);
        let mut session: VmSession = runtime.start(self.config);

        // Without a deadline, this simply never fires
        let deadline: Option<Instant> = self.timeout.map(|timeout| Instant::now() + timeout);
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None           => std::future::pending().await,
            }
        };
        tokio::pin!(expired);

        // Once killed, we keep going until the runtime confirms the VM is gone
        let mut killed: bool = false;
        let end: SessionEnd = loop {
            tokio::select! {
                res = &mut session.done => match res {
                    Ok(())  => {
                        if killed {
                            info!("[{}] VM torn down after kill.", name);
                        } else {
                            info!("[{}] Job finished.", name);
                        }
                        drain(&mut session, &results, &name, &image).await;
                        break if killed { SessionEnd::TimedOut } else { SessionEnd::Completed };
                    },
                    Err(_) => {
                        error!("[{}] VM runtime stopped without signalling completion; considering session finished", name);
                        drain(&mut session, &results, &name, &image).await;
                        break if killed { SessionEnd::TimedOut } else { SessionEnd::Abandoned };
                    },
                },

                Some(line) = session.cmd_output.recv() => forward(&results, &name, &image, line).await,
                Some(msg) = session.info.recv()        => debug!("[{}] {}", name, msg),
                Some(msg) = session.debug.recv()       => trace!("[{}] {}", name, msg),
                Some(err) = session.error.recv()       => error!("[{}] {}", name, err),

                _ = &mut expired, if !killed => {
                    error!("[{}] Session did not complete within {:?}; killing VM", name, self.timeout.unwrap_or_default());
                    session.kill();
                    killed = true;
                },
            }
        };

        debug!("[{}] Session {}; releasing admission token", name, end);
        drop(token);
        end
    }
}
