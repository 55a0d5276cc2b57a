use std::thread;

use crossbeam::channel::{Receiver, Sender};
use thiserror::Error;

use crate::transport::TransportError;

use super::DeviceError;

/// Failure of a task executing on the stream worker, reported back to the
/// host at the next synchronization point.
#[derive(Debug, Clone, Error)]
pub enum StreamTaskError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

enum WorkItem {
    Task(Box<dyn FnOnce() -> Result<(), StreamTaskError> + Send + 'static>),
    Fence(Sender<Option<StreamTaskError>>),
    Shutdown,
}

/// In-order execution queue standing in for a device stream: `enqueue` never
/// blocks the issuing thread, the worker runs tasks strictly in issue order,
/// and the first task failure poisons the queue so that later tasks are
/// skipped rather than run against undefined buffer contents.
pub struct Stream {
    tx: Sender<WorkItem>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Stream {
    pub fn new() -> Stream {
        let (tx, rx) = crossbeam::channel::unbounded();
        let worker = thread::spawn(move || stream_worker(rx));
        Stream {
            tx,
            worker: Some(worker),
        }
    }

    /// Append a task to the queue without waiting for it to run.
    pub fn enqueue<F>(&self, task: F) -> Result<(), DeviceError>
    where
        F: FnOnce() -> Result<(), StreamTaskError> + Send + 'static,
    {
        self.tx
            .send(WorkItem::Task(Box::new(task)))
            .map_err(|_| DeviceError::StreamTerminated)
    }

    /// Block until every task issued so far has completed. Returns the first
    /// failure observed since the stream was created, if any.
    pub fn synchronize(&self) -> Result<(), StreamTaskError> {
        let (tx, rx) = crossbeam::channel::bounded(1);
        self.tx
            .send(WorkItem::Fence(tx))
            .map_err(|_| DeviceError::StreamTerminated)?;
        match rx.recv() {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(err),
            Err(_) => Err(DeviceError::StreamTerminated.into()),
        }
    }
}

impl Default for Stream {
    fn default() -> Self {
        Stream::new()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        let _ = self.tx.send(WorkItem::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn stream_worker(rx: Receiver<WorkItem>) {
    let mut failed: Option<StreamTaskError> = None;
    for item in rx.iter() {
        match item {
            WorkItem::Task(task) => {
                if failed.is_some() {
                    continue;
                }
                if let Err(err) = task() {
                    log::error!("stream task failed: {}", err);
                    failed = Some(err);
                }
            }
            WorkItem::Fence(reply) => {
                let _ = reply.send(failed.clone());
            }
            WorkItem::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn tasks_run_in_issue_order() {
        let stream = Stream::new();
        let trace = Arc::new(std::sync::Mutex::new(Vec::new()));
        for i in 0..8 {
            let trace = Arc::clone(&trace);
            stream
                .enqueue(move || {
                    trace.lock().unwrap().push(i);
                    Ok(())
                })
                .unwrap();
        }
        stream.synchronize().unwrap();
        assert_eq!(*trace.lock().unwrap(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn first_failure_poisons_stream() {
        let stream = Stream::new();
        let ran = Arc::new(AtomicUsize::new(0));

        stream.enqueue(|| Ok(())).unwrap();
        stream
            .enqueue(|| {
                Err(DeviceError::OutOfBounds {
                    offset: 4,
                    len: 4,
                    size: 4,
                }
                .into())
            })
            .unwrap();
        let ran2 = Arc::clone(&ran);
        stream
            .enqueue(move || {
                ran2.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        let err = stream.synchronize().unwrap_err();
        assert!(matches!(
            err,
            StreamTaskError::Device(DeviceError::OutOfBounds { .. })
        ));
        // the task behind the failed one must not have run
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        // the stream stays poisoned
        assert!(stream.synchronize().is_err());
    }
}
