//  AGGREGATOR.rs
//
//  Created:
//    10 Feb 2023, 14:22:09
//  Last edited:
//    20 Feb 2023, 10:51:44
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the single consumer that feeds the output of all VMs to
//!   the job, one line at a time.
//

use log::debug;
use tokio::sync::mpsc;

use spinner_job::{Job, VmOutput};


/***** TESTS *****/





/***** LIBRARY *****/
/// Feeds the output of all workers to a job.
///
/// There is only ever one of these per run, so the job never processes two lines at the same time.
#[derive(Debug)]
pub struct Aggregator<J> {
    /// The receiving end of the channel all workers send their output on.
    rx  : mpsc::Receiver<VmOutput>,
    /// The job to feed.
    job : J,
}

impl<J: Job> Aggregator<J> {
    /// Constructor for the Aggregator.
    ///
    /// # Arguments
    /// - `job`: The job to feed the output to.
    /// - `capacity`: The number of lines that may be waiting for the job before workers have to wait.
    ///
    /// # Returns
    /// A new Aggregator, and the sending end of its input channel. The aggregator stops once every clone of the latter is dropped.
    pub fn new(job: J, capacity: usize) -> (Self, mpsc::Sender<VmOutput>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { rx, job }, tx)
    }



    /// Processes lines until the input channel is closed and empty.
    ///
    /// # Returns
    /// The job (so it can be finalized) and the number of lines it processed.
    pub async fn run(mut self) -> (J, usize) {
        let mut processed: usize = 0;
        while let Some(output) = self.rx.recv().await {
            self.job.process(output);
            processed += 1;
        }
        debug!("Output channel closed; processed {} line(s)", processed);
        (self.job, processed)
    }
}
