//  ORCHESTRATOR.rs
//
//  Created:
//    13 Feb 2023, 09:02:50
//  Last edited:
//    22 Feb 2023, 10:01:17
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements the top-level driver of a run: it dispatches a worker per
//!   image, waits for all of them, drains their output and then finalizes
//!   the job.
//

use std::fmt::{Display, Formatter, Result as FResult};
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use spinner_cfg::SpinnerConfig;
use spinner_job::{Job, VmOutput};
use spinner_vm::{VmConfig, VmRuntime};

pub use crate::errors::DriverError as Error;
use crate::aggregator::Aggregator;
use crate::scheduler::Scheduler;
use crate::worker::Worker;


/***** TESTS *****/
#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::dummy::{DummyJob, DummyRuntime, Step};

    /// Builds a config with the given parallelism and timeout (in seconds).
    fn config(parallelism: usize, timeout: Option<u64>) -> Arc<SpinnerConfig> {
        Arc::new(SpinnerConfig {
            cpus : 1,
            parallelism,
            timeout,
            ..Default::default()
        })
    }

    /// Polls the given condition until it holds, panicking if that takes unreasonably long.
    async fn wait_until(mut cond: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while !cond() { tokio::time::sleep(Duration::from_millis(5)).await; }
        }).await.expect("Condition did not become true in time");
    }

    fn events() -> Arc<Mutex<Vec<String>>> { Arc::new(Mutex::new(vec![])) }

    fn setup_logging() {
        #[cfg(feature = "test_logging")]
        if let Err(err) = simplelog::TermLogger::init(log::LevelFilter::Trace, Default::default(), simplelog::TerminalMode::Mixed, simplelog::ColorChoice::Auto) {
            eprintln!("WARNING: Failed to setup logger: {} (no logging for this session)", err);
        }
    }



    #[test]
    fn states_advance_once() {
        let mut state = OrchestratorState::Dispatching;
        let mut seen  = vec![ state ];
        while state != OrchestratorState::Finalized {
            state = state.advance();
            seen.push(state);
        }
        assert_eq!(seen, vec![ OrchestratorState::Dispatching, OrchestratorState::AwaitingWorkers, OrchestratorState::Draining, OrchestratorState::Finalized ]);
        assert_eq!(OrchestratorState::Finalized.advance(), OrchestratorState::Finalized);
    }

    #[tokio::test]
    async fn third_image_waits_for_a_token() {
        setup_logging();
        let events  = events();
        let runtime = Arc::new(DummyRuntime::new(events.clone())
            .script("A", vec![ Step::Output("a"), Step::WaitRelease, Step::Done ])
            .script("B", vec![ Step::Output("b"), Step::WaitRelease, Step::Done ])
            .script("C", vec![ Step::Output("c"), Step::Done ]));
        let orchestrator = Orchestrator::new(runtime.clone(), config(2, None));
        let job = DummyJob::with_events(vec![ "A", "B", "C" ], events.clone());
        let handle = tokio::spawn(async move { orchestrator.run(job).await });

        // A and B start right away, C has to wait
        wait_until(|| runtime.started().len() == 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let started = runtime.started();
        assert_eq!(started.len(), 2);
        assert!(started.contains(&"A-0".to_string()));
        assert!(started.contains(&"B-1".to_string()));

        // One of them completing lets C in
        runtime.release(1);
        wait_until(|| runtime.started().len() == 3).await;
        assert_eq!(runtime.started()[2], "C-2");
        runtime.release(1);

        let job = handle.await.unwrap().unwrap();
        assert_eq!(job.lines.len(), 3);
        assert_eq!(job.done_calls(), 1);
        assert!(runtime.max_active() <= 2);
    }

    #[tokio::test]
    async fn errors_are_logged_not_forwarded() {
        setup_logging();
        let runtime = Arc::new(DummyRuntime::new(events())
            .script("A", vec![ Step::Output("x"), Step::Error("transient"), Step::Output("y"), Step::Done ]));
        let orchestrator = Orchestrator::new(runtime, config(1, None));

        let job = orchestrator.run(DummyJob::new(vec![ "A" ])).await.unwrap();
        assert_eq!(job.lines, vec![ VmOutput::new("A", "x"), VmOutput::new("A", "y") ]);
        assert_eq!(job.done_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn out_of_order_completion_keeps_per_vm_order() {
        setup_logging();
        let events  = events();
        let runtime = Arc::new(DummyRuntime::new(events.clone())
            .script("A", vec![ Step::Output("a1"), Step::Sleep(Duration::from_millis(100)), Step::Output("a2"), Step::Done ])
            .script("B", vec![ Step::Output("b1"), Step::Output("b2"), Step::Done ]));
        let orchestrator = Orchestrator::new(runtime, config(2, None));

        let job = orchestrator.run(DummyJob::with_events(vec![ "A", "B" ], events.clone())).await.unwrap();
        assert_eq!(job.lines_of("A"), vec![ "a1", "a2" ]);
        assert_eq!(job.lines_of("B"), vec![ "b1", "b2" ]);

        let events = events.lock().unwrap();
        let a: usize = events.iter().position(|e| e == "finished A").unwrap();
        let b: usize = events.iter().position(|e| e == "finished B").unwrap();
        assert!(b < a);
    }

    #[tokio::test]
    async fn missing_completion_blocks_without_timeout() {
        setup_logging();
        let runtime = Arc::new(DummyRuntime::new(events())
            .script("A", vec![ Step::Output("x"), Step::Hang ]));
        let orchestrator = Orchestrator::new(runtime.clone(), config(1, None));
        let job  = DummyJob::new(vec![ "A" ]);
        let done = job.done_counter();

        assert!(tokio::time::timeout(Duration::from_millis(300), orchestrator.run(job)).await.is_err());
        assert_eq!(done.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(runtime.killed().is_empty());
    }

    #[tokio::test]
    async fn timeout_kills_stalled_session() {
        setup_logging();
        let runtime = Arc::new(DummyRuntime::new(events())
            .script("A", vec![ Step::Output("x"), Step::Hang ])
            .script("B", vec![ Step::Output("y"), Step::Done ]));
        // A single token: B only runs if A's is released
        let orchestrator = Orchestrator::new(runtime.clone(), config(1, Some(1)));

        let job = tokio::time::timeout(Duration::from_secs(10), orchestrator.run(DummyJob::new(vec![ "A", "B" ]))).await.unwrap().unwrap();
        assert_eq!(job.lines_of("A"), vec![ "x" ]);
        assert_eq!(job.lines_of("B"), vec![ "y" ]);
        assert_eq!(job.done_calls(), 1);
        wait_until(|| runtime.killed() == vec![ "A-0".to_string() ]).await;
    }

    #[tokio::test]
    async fn killed_session_holds_its_token_until_torn_down() {
        setup_logging();
        let events  = events();
        let runtime = Arc::new(DummyRuntime::new(events.clone())
            .script("A", vec![ Step::Output("a"), Step::Hang, Step::Sleep(Duration::from_millis(500)), Step::Done ])
            .script("B", vec![ Step::Sleep(Duration::from_millis(200)), Step::Output("b"), Step::Done ]));
        let orchestrator = Orchestrator::new(runtime.clone(), config(1, Some(1)));

        let job = tokio::time::timeout(Duration::from_secs(10), orchestrator.run(DummyJob::new(vec![ "A", "B" ]))).await.unwrap().unwrap();
        assert_eq!(runtime.killed(), vec![ "A-0".to_string() ]);
        assert!(runtime.max_active() <= 1);
        assert_eq!(job.lines_of("A"), vec![ "a" ]);
        assert_eq!(job.lines_of("B"), vec![ "b" ]);

        let events = events.lock().unwrap();
        assert_eq!(*events, vec![ "finished A".to_string(), "finished B".to_string() ]);
    }

    #[tokio::test]
    async fn output_after_kill_is_forwarded() {
        setup_logging();
        let runtime = Arc::new(DummyRuntime::new(events())
            .script("A", vec![ Step::Output("x"), Step::Hang, Step::Output("last words"), Step::Done ]));
        let orchestrator = Orchestrator::new(runtime.clone(), config(1, Some(1)));

        let job = tokio::time::timeout(Duration::from_secs(10), orchestrator.run(DummyJob::new(vec![ "A" ]))).await.unwrap().unwrap();
        assert_eq!(job.lines_of("A"), vec![ "x", "last words" ]);
        assert_eq!(job.done_calls(), 1);
        assert_eq!(runtime.active(), 0);
    }

    #[tokio::test]
    async fn zero_images() {
        setup_logging();
        let runtime = Arc::new(DummyRuntime::new(events()));
        let orchestrator = Orchestrator::new(runtime.clone(), config(2, None));

        let job = orchestrator.run(DummyJob::new(vec![])).await.unwrap();
        assert!(job.lines.is_empty());
        assert_eq!(job.done_calls(), 1);
        assert!(runtime.started().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn admission_bound_holds() {
        setup_logging();
        for parallelism in 1..=3 {
            let mut runtime = DummyRuntime::new(events());
            let images: Vec<&str> = vec![ "a", "b", "c", "d", "e", "f", "g" ];
            for image in &images {
                runtime = runtime.script(*image, vec![ Step::Sleep(Duration::from_millis(10)), Step::Output("hi"), Step::Done ]);
            }
            let runtime = Arc::new(runtime);
            let orchestrator = Orchestrator::new(runtime.clone(), config(parallelism, None));

            let job = orchestrator.run(DummyJob::new(images)).await.unwrap();
            assert_eq!(job.lines.len(), 7);
            assert_eq!(runtime.started().len(), 7);
            assert!(runtime.max_active() <= parallelism);
            assert_eq!(runtime.active(), 0);
        }
    }

    #[tokio::test]
    async fn errors_do_not_leak_tokens() {
        setup_logging();
        let script = vec![ Step::Error("first"), Step::Output("o"), Step::Error("second"), Step::Done ];
        let runtime = Arc::new(DummyRuntime::new(events())
            .script("A", script.clone())
            .script("B", script.clone())
            .script("C", script));
        let orchestrator = Orchestrator::new(runtime.clone(), config(1, None));

        let job = tokio::time::timeout(Duration::from_secs(10), orchestrator.run(DummyJob::new(vec![ "A", "B", "C" ]))).await.unwrap().unwrap();
        assert_eq!(runtime.started(), vec![ "A-0", "B-1", "C-2" ]);
        assert_eq!(job.lines.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_output_is_lost() {
        setup_logging();
        // Tiny buffers everywhere, so everybody has to wait on everybody
        let runtime = Arc::new(DummyRuntime::new(events())
            .capacity(1)
            .script("A", vec![ Step::Count("a", 250), Step::Done ])
            .script("B", vec![ Step::Count("b", 250), Step::Done ])
            .script("C", vec![ Step::Count("c", 250), Step::Done ]));
        let mut config = (*config(3, None)).clone();
        config.buffer = 1;
        let orchestrator = Orchestrator::new(runtime, Arc::new(config));

        let job = orchestrator.run(DummyJob::new(vec![ "A", "B", "C" ])).await.unwrap();
        assert_eq!(job.lines.len(), 750);
        for (image, prefix) in [ ("A", "a"), ("B", "b"), ("C", "c") ] {
            let expected: Vec<String> = (0..250).map(|i| format!("{} {}", prefix, i)).collect();
            assert_eq!(job.lines_of(image), expected);
        }
    }

    #[tokio::test]
    async fn abandoned_session_counts_as_finished() {
        setup_logging();
        // No Step::Done: the runtime drops its channels
        let runtime = Arc::new(DummyRuntime::new(events())
            .script("A", vec![ Step::Output("x"), Step::Output("y") ]));
        let orchestrator = Orchestrator::new(runtime, config(1, None));

        let job = tokio::time::timeout(Duration::from_secs(10), orchestrator.run(DummyJob::new(vec![ "A" ]))).await.unwrap().unwrap();
        assert_eq!(job.lines_of("A"), vec![ "x", "y" ]);
        assert_eq!(job.done_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn done_comes_last() {
        setup_logging();
        let events  = events();
        let runtime = Arc::new(DummyRuntime::new(events.clone())
            .script("A", vec![ Step::Count("a", 20), Step::Done ])
            .script("B", vec![ Step::Info("booting"), Step::Count("b", 20), Step::Debug("tearing down"), Step::Done ])
            .script("C", vec![ Step::Count("c", 20), Step::Done ]));
        let orchestrator = Orchestrator::new(runtime, config(2, None));

        let job = orchestrator.run(DummyJob::with_events(vec![ "A", "B", "C" ], events.clone())).await.unwrap();
        assert_eq!(job.done_calls(), 1);

        let events = events.lock().unwrap();
        assert_eq!(events.last().map(String::as_str), Some("done"));
        assert_eq!(events.iter().filter(|e| *e == "done").count(), 1);
        assert_eq!(events.iter().filter(|e| e.starts_with("process ")).count(), 60);
        assert_eq!(events.iter().filter(|e| e.starts_with("finished ")).count(), 3);
    }

    #[tokio::test]
    async fn errors_stay_in_their_session() {
        setup_logging();
        let solo = Arc::new(DummyRuntime::new(events())
            .script("B", vec![ Step::Output("b1"), Step::Output("b2"), Step::Done ]));
        let solo = Orchestrator::new(solo, config(2, None)).run(DummyJob::new(vec![ "B" ])).await.unwrap();

        let runtime = Arc::new(DummyRuntime::new(events())
            .script("A", vec![ Step::Error("boom"), Step::Error("boom again"), Step::Output("a1"), Step::Error("still going"), Step::Done ])
            .script("B", vec![ Step::Output("b1"), Step::Output("b2"), Step::Done ]));
        let job = Orchestrator::new(runtime, config(2, None)).run(DummyJob::new(vec![ "A", "B" ])).await.unwrap();

        assert_eq!(job.lines_of("B"), solo.lines_of("B"));
        assert_eq!(job.lines_of("A"), vec![ "a1" ]);
    }
}





/***** LIBRARY *****/
/// The phases of a single run, in order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrchestratorState {
    /// Workers are being admitted and started.
    Dispatching,
    /// Every image has a worker; waiting for all of them to return.
    AwaitingWorkers,
    /// Every worker returned; waiting for the aggregator to process what is left.
    Draining,
    /// The job has been told we're done.
    Finalized,
}

impl OrchestratorState {
    /// Returns the state that follows this one. `Finalized` is final.
    pub fn advance(self) -> Self {
        use OrchestratorState::*;
        let next: Self = match self {
            Dispatching     => AwaitingWorkers,
            AwaitingWorkers => Draining,
            Draining        => Finalized,
            Finalized       => Finalized,
        };
        if next != self { debug!("Orchestrator: {} -> {}", self, next); }
        next
    }
}

impl Display for OrchestratorState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        use OrchestratorState::*;
        match self {
            Dispatching     => write!(f, "Dispatching"),
            AwaitingWorkers => write!(f, "AwaitingWorkers"),
            Draining        => write!(f, "Draining"),
            Finalized       => write!(f, "Finalized"),
        }
    }
}



/// Runs jobs on a VmRuntime.
#[derive(Debug)]
pub struct Orchestrator<R> {
    /// The runtime to start VMs on.
    runtime : Arc<R>,
    /// The configuration of the run (VM sizes, parallelism, timeouts...).
    config  : Arc<SpinnerConfig>,
}

impl<R: VmRuntime> Orchestrator<R> {
    /// Constructor for the Orchestrator.
    ///
    /// # Arguments
    /// - `runtime`: The VmRuntime to start VMs on.
    /// - `config`: The SpinnerConfig to take VM sizes, parallelism and the like from. Assumed to be validated.
    ///
    /// # Returns
    /// A new Orchestrator instance.
    #[inline]
    pub fn new(runtime: Arc<R>, config: Arc<SpinnerConfig>) -> Self {
        Self { runtime, config }
    }



    /// Runs the given job on every image it names, at most `parallelism` at a time.
    ///
    /// Returns only once every VM session has ended, every line of output has been processed and the job has been finalized. Note that a session that never ends (and has no timeout) means this never returns either.
    ///
    /// # Arguments
    /// - `job`: The Job to run.
    ///
    /// # Returns
    /// The job after its `done()` has been called, so its results may be inspected.
    ///
    /// # Errors
    /// This function only errors if the task feeding output to the job died, in which case the job is lost.
    pub async fn run<J: Job>(&self, job: J) -> Result<J, Error> {
        let images: Vec<String> = job.images().to_vec();
        let command: String     = job.command().to_string();
        info!("Running job on {} image(s), {} at a time", images.len(), self.config.parallelism);

        // Dispatching
        let mut state: OrchestratorState = OrchestratorState::Dispatching;
        let (aggregator, results): (Aggregator<J>, mpsc::Sender<VmOutput>) = Aggregator::new(job, self.config.buffer);
        let aggregator: JoinHandle<(J, usize)> = tokio::spawn(aggregator.run());
        let mut scheduler: Scheduler = Scheduler::new(self.config.parallelism);
        for (i, image) in images.iter().enumerate() {
            let config: VmConfig = VmConfig::new(image.clone(), i, self.config.provider.clone(), self.config.cpus, self.config.memory, command.clone());
            let label: String    = config.name.clone();
            let worker: Worker   = Worker::new(config, self.config.timeout());

            let runtime: Arc<R>                   = self.runtime.clone();
            let results: mpsc::Sender<VmOutput> = results.clone();
            scheduler.admit(label, move |token| async move {
                worker.run(runtime, results, token).await;
            }).await;
        }

        // AwaitingWorkers
        state = state.advance();
        let joined: usize = scheduler.join_all().await;
        debug!("All {} worker(s) returned", joined);

        // Draining; every worker's sender is gone by now, so this closes the channel
        state = state.advance();
        drop(results);
        let (mut job, processed): (J, usize) = match aggregator.await {
            Ok(res)  => res,
            Err(err) => { return Err(Error::AggregatorPanicked{ err }); },
        };
        debug!("Aggregator drained {} line(s) of output", processed);

        // Finalized
        state = state.advance();
        job.done();
        debug!("Orchestrator {}", state);
        Ok(job)
    }
}
