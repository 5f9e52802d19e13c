//! Worker pool for asynchronous native calls

use crate::error::{BridgeError, Result};
use crossbeam_channel::{unbounded, Sender};
use std::thread::{self, JoinHandle};

/// A unit of work for a worker thread
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of named worker threads sharing one job channel.
///
/// Jobs already queued when the pool shuts down still run.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `threads` workers named `{name}-{n}`
    pub fn new(threads: usize, name: &str) -> Result<Self> {
        let (sender, receiver) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(threads);

        for n in 0..threads {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, n))
                .spawn(move || {
                    for job in receiver.iter() {
                        job();
                    }
                })
                .map_err(|e| BridgeError::WorkerSpawn(e.to_string()))?;
            workers.push(handle);
        }

        log::debug!("Started {} bridge workers", threads);
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Queue a job. Returns `false` if the pool has shut down.
    pub fn execute(&self, job: Job) -> bool {
        match &self.sender {
            Some(sender) if !self.workers.is_empty() => sender.send(job).is_ok(),
            _ => false,
        }
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Whether jobs can still be queued
    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }

    /// Stop accepting jobs, finish queued ones and join every worker
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Bridge worker exited with a panic");
            }
        }
        log::debug!("Bridge workers stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("running", &self.is_running())
            .finish()
    }
}
