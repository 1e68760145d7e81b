//  DUMMY.rs
//
//  Created:
//    13 Feb 2023, 10:21:37
//  Last edited:
//    22 Feb 2023, 09:58:12
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements a scripted VM runtime and a recording job for unit test
//!   purposes only.
//

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::info;
use tokio::sync::Semaphore;

use spinner_job::{Job, VmOutput};
use spinner_vm::{session, VmConfig, VmError, VmEvent, VmRuntime, VmSession};


/***** LIBRARY *****/
/// A single thing a DummyRuntime session does.
#[derive(Clone, Debug)]
pub enum Step {
    /// Emits a line of command output.
    Output(&'static str),
    /// Emits the given number of lines of command output, numbered from zero and prefixed with the given string.
    Count(&'static str, usize),
    /// Emits an info message.
    Info(&'static str),
    /// Emits a debug message.
    Debug(&'static str),
    /// Emits an error.
    Error(&'static str),
    /// Emits the completion signal.
    Done,
    /// Waits until the test releases a session with `DummyRuntime::release()`.
    WaitRelease,
    /// Waits for some time.
    Sleep(Duration),
    /// Waits until the session is killed, then reports the kill as an error and plays the rest of the script.
    Hang,
}



/// Defines a VM runtime that plays back a script of events per image, and keeps track of what it did.
///
/// Sessions that run out of script without emitting `Step::Done` drop their channels without completing.
#[derive(Debug)]
pub struct DummyRuntime {
    /// The script to play per image. Images without one just complete.
    scripts  : HashMap<String, Vec<Step>>,
    /// The buffer size of the session channels.
    capacity : usize,
    /// The gate sessions wait on at `Step::WaitRelease`.
    release  : Arc<Semaphore>,

    /// The number of sessions currently running.
    active  : Arc<AtomicUsize>,
    /// The highest number of sessions that ran at the same time.
    max     : Arc<AtomicUsize>,
    /// The instances started, in order.
    started : Arc<Mutex<Vec<String>>>,
    /// The instances that were killed.
    killed  : Arc<Mutex<Vec<String>>>,
    /// A log shared with the DummyJob, to check the order of things.
    events  : Arc<Mutex<Vec<String>>>,
}

impl DummyRuntime {
    /// Constructor for the DummyRuntime.
    ///
    /// # Arguments
    /// - `events`: The event log to write to, typically shared with a DummyJob.
    pub fn new(events: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            scripts  : HashMap::new(),
            capacity : 4,
            release  : Arc::new(Semaphore::new(0)),

            active  : Arc::new(AtomicUsize::new(0)),
            max     : Arc::new(AtomicUsize::new(0)),
            started : Arc::new(Mutex::new(vec![])),
            killed  : Arc::new(Mutex::new(vec![])),
            events,
        }
    }

    /// Sets the script for the given image.
    pub fn script(mut self, image: impl Into<String>, steps: Vec<Step>) -> Self {
        self.scripts.insert(image.into(), steps);
        self
    }

    /// Sets the buffer size of the session channels.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }



    /// Lets `n` sessions waiting at `Step::WaitRelease` continue.
    pub fn release(&self, n: usize) { self.release.add_permits(n); }

    /// Returns the instances started so far, in order.
    pub fn started(&self) -> Vec<String> { self.started.lock().unwrap().clone() }

    /// Returns the instances that were killed.
    pub fn killed(&self) -> Vec<String> { self.killed.lock().unwrap().clone() }

    /// Returns the number of sessions currently running.
    pub fn active(&self) -> usize { self.active.load(Ordering::SeqCst) }

    /// Returns the highest number of sessions that ran at the same time.
    pub fn max_active(&self) -> usize { self.max.load(Ordering::SeqCst) }
}

impl VmRuntime for DummyRuntime {
    fn start(&self, config: VmConfig) -> VmSession {
        info!("Starting dummy session '{}'", config.name);
        let (mut tx, session) = session(self.capacity);
        let steps: Vec<Step> = self.scripts.get(&config.image).cloned().unwrap_or_else(|| vec![ Step::Done ]);

        self.started.lock().unwrap().push(config.name.clone());
        let now: usize = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);

        let release = self.release.clone();
        let active  = self.active.clone();
        let killed  = self.killed.clone();
        let events  = self.events.clone();
        tokio::spawn(async move {
            for step in steps {
                match step {
                    Step::Output(line) => tx.emit(VmEvent::CommandOutput(line.into())).await,
                    Step::Count(prefix, n) => {
                        for i in 0..n { tx.emit(VmEvent::CommandOutput(format!("{} {}", prefix, i))).await; }
                    },
                    Step::Info(msg)    => tx.emit(VmEvent::Info(msg.into())).await,
                    Step::Debug(msg)   => tx.emit(VmEvent::Debug(msg.into())).await,
                    Step::Error(msg)   => tx.emit(VmEvent::Error(VmError::Custom{ msg: msg.into() })).await,
                    Step::Done         => {
                        events.lock().unwrap().push(format!("finished {}", config.image));
                        // Counts as stopped before anyone can see the completion
                        active.fetch_sub(1, Ordering::SeqCst);
                        tx.emit(VmEvent::Done).await;
                        return;
                    },

                    Step::WaitRelease => release.acquire().await.unwrap().forget(),
                    Step::Sleep(dur)  => tokio::time::sleep(dur).await,
                    Step::Hang        => {
                        tx.kill.fired().await;
                        killed.lock().unwrap().push(config.name.clone());
                        tx.emit(VmEvent::Error(VmError::Killed{ name: config.name.clone() })).await;
                    },
                }
            }
            events.lock().unwrap().push(format!("abandoned {}", config.image));
            active.fetch_sub(1, Ordering::SeqCst);
        });
        session
    }
}



/// Defines a job that simply remembers everything that happens to it.
#[derive(Debug)]
pub struct DummyJob {
    /// The images to run on.
    images : Vec<String>,

    /// The lines processed so far, in order.
    pub lines : Vec<VmOutput>,
    /// The number of times `done()` was called. Shared, so it can be inspected even if the job is lost.
    done   : Arc<AtomicUsize>,
    /// A log shared with the DummyRuntime, to check the order of things.
    events : Arc<Mutex<Vec<String>>>,
}

impl DummyJob {
    /// Constructor for the DummyJob with its own event log.
    #[inline]
    pub fn new(images: Vec<&str>) -> Self { Self::with_events(images, Arc::new(Mutex::new(vec![]))) }

    /// Constructor for the DummyJob that writes to the given event log.
    pub fn with_events(images: Vec<&str>, events: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            images : images.into_iter().map(String::from).collect(),

            lines  : vec![],
            done   : Arc::new(AtomicUsize::new(0)),
            events,
        }
    }

    /// Returns a handle to the counter of `done()` calls.
    #[inline]
    pub fn done_counter(&self) -> Arc<AtomicUsize> { self.done.clone() }

    /// Returns the number of times `done()` was called.
    #[inline]
    pub fn done_calls(&self) -> usize { self.done.load(Ordering::SeqCst) }

    /// Returns the lines processed for the given image, in order.
    pub fn lines_of(&self, vm: &str) -> Vec<&str> {
        self.lines.iter().filter(|o| o.vm == vm).map(|o| o.line.as_str()).collect()
    }
}

impl Job for DummyJob {
    #[inline]
    fn images(&self) -> &[String] { &self.images }

    #[inline]
    fn command(&self) -> &str { "echo dummy" }

    fn process(&mut self, output: VmOutput) {
        self.events.lock().unwrap().push(format!("process {} {}", output.vm, output.line));
        self.lines.push(output);
    }

    fn done(&mut self) {
        self.events.lock().unwrap().push("done".into());
        self.done.fetch_add(1, Ordering::SeqCst);
    }
}
