use crate::{Context, CurrentCtx, DriverError};
use std::{
    io,
    sync::mpsc::{Receiver, SyncSender, channel, sync_channel},
    thread::{self, JoinHandle},
};

type Job = Box<dyn FnOnce(&CurrentCtx) + Send>;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("failed to spawn context worker: {0}")]
    Spawn(#[from] io::Error),
    #[error("context worker exited during startup")]
    Startup,
}

/// A thread that keeps one context current and runs submitted jobs in order.
///
/// At most `depth` jobs wait in the queue; submitting beyond that blocks.
pub struct Worker {
    queue: Option<SyncSender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Context {
    #[inline]
    pub fn into_worker(self, depth: usize) -> Result<Worker, WorkerError> {
        Worker::new(self, depth)
    }
}

impl Worker {
    pub fn new(ctx: Context, depth: usize) -> Result<Self, WorkerError> {
        let (queue, jobs) = sync_channel::<Job>(depth);
        let (ready, startup) = channel();
        let thread = thread::Builder::new()
            .name(format!("ctx-{}", ctx.device()))
            .spawn(move || {
                let current = match ctx.push() {
                    Ok(current) => {
                        let _ = ready.send(Ok(()));
                        current
                    }
                    Err(e) => {
                        let _ = ready.send(Err(e));
                        return;
                    }
                };
                for job in jobs {
                    job(&*current)
                }
                log::debug!("context worker on {} drained", ctx.device())
            })?;

        let worker = Self {
            queue: Some(queue),
            thread: Some(thread),
        };
        match startup.recv() {
            Ok(Ok(())) => Ok(worker),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(WorkerError::Startup),
        }
    }

    /// Queues `f` and returns the receiver its result will arrive on.
    ///
    /// If the worker is gone the job is dropped and the receiver disconnects.
    pub fn run<T, F>(&self, f: F) -> Receiver<T>
    where
        T: Send + 'static,
        F: FnOnce(&CurrentCtx) -> T + Send + 'static,
    {
        let (answer, receiver) = channel();
        let job: Job = Box::new(move |ctx: &CurrentCtx| {
            let _ = answer.send(f(ctx));
        });
        if let Some(queue) = &self.queue {
            if queue.send(job).is_err() {
                log::warn!("context worker stopped, job dropped")
            }
        }
        receiver
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        drop(self.queue.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("context worker panicked")
            }
        }
    }
}

#[test]
fn test_run_in_order() {
    use crate::Device;

    let Some(dev) = Device::all().unwrap().into_iter().next() else {
        return;
    };
    let worker = dev.context().unwrap().into_worker(2).unwrap();
    let receivers = (0..8)
        .map(|i| worker.run(move |ctx| ctx.dev().map(|d| (i, d))))
        .collect::<Vec<_>>();
    for (i, receiver) in receivers.into_iter().enumerate() {
        let (j, d) = receiver.recv().unwrap().unwrap();
        assert_eq!(i, j);
        assert_eq!(d, dev);
    }
}
