//  SCHEDULER.rs
//
//  Created:
//    10 Feb 2023, 09:30:55
//  Last edited:
//    21 Feb 2023, 15:12:08
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the admission gate that bounds the number of VM sessions
//!   running at the same time.
//

use std::future::Future;
use std::sync::Arc;

use log::{debug, error};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;


/***** TESTS *****/





/***** LIBRARY *****/
/// Proof that its holder was admitted by a Scheduler. Dropping it gives the capacity back.
#[derive(Debug)]
pub struct AdmissionToken {
    /// The permit we hold on the admission gate.
    _permit : OwnedSemaphorePermit,
}



/// Admits workers one at a time, such that no more than a fixed number of them hold an AdmissionToken at once.
///
/// The gate is fair: workers are admitted in the order in which they asked.
#[derive(Debug)]
pub struct Scheduler {
    /// The counting semaphore that guards admission.
    gate    : Arc<Semaphore>,
    /// The workers started so far, in dispatch order.
    workers : Vec<(String, JoinHandle<()>)>,
}

impl Scheduler {
    /// Constructor for the Scheduler.
    ///
    /// # Arguments
    /// - `parallelism`: The number of workers that may run at the same time. Note that zero never admits anyone.
    ///
    /// # Returns
    /// A new Scheduler instance.
    pub fn new(parallelism: usize) -> Self {
        Self {
            gate    : Arc::new(Semaphore::new(parallelism)),
            workers : vec![],
        }
    }



    /// Waits until there is room for another worker, then spawns it.
    ///
    /// Does not wait for the worker itself.
    ///
    /// # Arguments
    /// - `label`: Some name for the worker to use in log messages.
    /// - `worker`: A closure that builds the worker's future from its AdmissionToken. The worker is responsible for dropping the token once it's done; a panicking worker drops it while unwinding.
    pub async fn admit<F, Fut>(&mut self, label: impl Into<String>, worker: F)
    where
        F   : FnOnce(AdmissionToken) -> Fut,
        Fut : 'static + Send + Future<Output = ()>,
    {
        let label: String = label.into();
        debug!("Waiting for admission of worker '{}'...", label);
        let permit: OwnedSemaphorePermit = self.gate.clone().acquire_owned().await.expect("Admission gate was closed; this should never happen!");

        debug!("Admitted worker '{}'", label);
        let handle: JoinHandle<()> = tokio::spawn(worker(AdmissionToken{ _permit: permit }));
        self.workers.push((label, handle));
    }

    /// Waits until every worker admitted so far has returned.
    ///
    /// # Returns
    /// The number of workers that were joined.
    pub async fn join_all(&mut self) -> usize {
        let mut joined: usize = 0;
        for (label, handle) in self.workers.drain(..) {
            if let Err(err) = handle.await {
                error!("Worker '{}' did not return normally: {}", label, err);
            }
            joined += 1;
        }
        joined
    }

    /// Returns the number of workers admitted and not yet joined.
    #[inline]
    pub fn dispatched(&self) -> usize { self.workers.len() }
}
