//! Fixed-size pool of worker threads fed through a bounded queue.

use crate::error::{NpSearchError, Result};
use crossbeam_channel::{Sender, bounded};
use std::{
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};

type Job<T> = Box<dyn FnOnce() -> Result<Option<T>> + Send>;

/// Results of finished jobs, tagged with the order in which they were scheduled.
type Results<T> = Arc<Mutex<Vec<(usize, T)>>>;

pub struct WorkerPool<T: Send + 'static> {
    sender: Option<Sender<(usize, Job<T>)>>,
    workers: Vec<JoinHandle<()>>,
    results: Results<T>,
    first_error: Arc<Mutex<Option<NpSearchError>>>,
    next_ordinal: usize,
}

fn record_outcome<T>(
    ordinal: usize,
    outcome: Result<Option<T>>,
    results: &Mutex<Vec<(usize, T)>>,
    first_error: &Mutex<Option<NpSearchError>>,
) {
    match outcome {
        Ok(Some(value)) => results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((ordinal, value)),
        Ok(None) => {}
        Err(e) => {
            let mut guard = first_error.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.is_none() {
                log::error!("Job {ordinal} failed: {e}");
                *guard = Some(e);
            }
        }
    }
}

fn has_failed(first_error: &Mutex<Option<NpSearchError>>) -> bool {
    first_error
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Starts `num_threads` workers. With a single thread no worker is
    /// started and jobs run on the scheduling thread.
    pub fn new(num_threads: usize, queue_capacity: usize) -> Result<Self> {
        let results: Results<T> = Arc::new(Mutex::new(vec![]));
        let first_error = Arc::new(Mutex::new(None));
        if num_threads <= 1 {
            return Ok(Self {
                sender: None,
                workers: vec![],
                results,
                first_error,
                next_ordinal: 0,
            });
        }

        let (sender, receiver) = bounded::<(usize, Job<T>)>(queue_capacity.max(1));
        let mut workers = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let receiver = receiver.clone();
            let results = results.clone();
            let first_error = first_error.clone();
            let handle = thread::Builder::new()
                .name(format!("npsearch-worker-{i}"))
                .spawn(move || {
                    for (ordinal, job) in receiver.iter() {
                        // After a failure the queue is drained without running anything
                        if has_failed(&first_error) {
                            continue;
                        }
                        record_outcome(ordinal, job(), &results, &first_error);
                    }
                })?;
            workers.push(handle);
        }
        Ok(Self {
            sender: Some(sender),
            workers,
            results,
            first_error,
            next_ordinal: 0,
        })
    }

    /// Queues `job(item)`, blocking while the queue is full.
    ///
    /// A job returning `Ok(None)` contributes no result. The first job error
    /// stops further jobs from running and is returned by [`Self::shutdown`].
    pub fn schedule<I, F>(&mut self, item: I, job: F) -> Result<()>
    where
        I: Send + 'static,
        F: FnOnce(I) -> Result<Option<T>> + Send + 'static,
    {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        match &self.sender {
            None => {
                if !has_failed(&self.first_error) {
                    record_outcome(ordinal, job(item), &self.results, &self.first_error);
                }
                Ok(())
            }
            Some(sender) => {
                let job: Job<T> = Box::new(move || job(item));
                sender.send((ordinal, job)).map_err(|_| {
                    NpSearchError::Internal("All workers have stopped".to_string())
                })
            }
        }
    }

    fn join_workers(&mut self) -> Result<()> {
        drop(self.sender.take());
        let mut panicked = 0;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(NpSearchError::Internal(format!(
                "{panicked} worker thread(s) panicked"
            )));
        }
        Ok(())
    }

    /// Waits for all queued work and returns the results with their scheduling ordinals.
    pub fn shutdown(mut self) -> Result<Vec<(usize, T)>> {
        self.join_workers()?;
        if let Some(e) = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(e);
        }
        let results = std::mem::take(
            &mut *self.results.lock().unwrap_or_else(PoisonError::into_inner),
        );
        Ok(results)
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            let _ = self.join_workers();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashSet, time::Duration};

    #[test]
    fn test_concurrent_results_complete() {
        let mut pool = WorkerPool::new(4, 8).unwrap();
        for i in 0..100usize {
            pool.schedule(i, |i| {
                thread::sleep(Duration::from_millis((i % 7) as u64));
                Ok(Some(format!("candidate_{i}")))
            })
            .unwrap();
        }
        let results = pool.shutdown().unwrap();
        assert_eq!(results.len(), 100);
        let names: HashSet<&String> = results.iter().map(|(_, name)| name).collect();
        assert_eq!(names.len(), 100);
        for (ordinal, name) in &results {
            assert_eq!(*name, format!("candidate_{ordinal}"));
        }
    }

    #[test]
    fn test_single_thread_is_sequential() {
        let mut pool = WorkerPool::new(1, 2).unwrap();
        for i in 0..10usize {
            pool.schedule(i, |i| Ok(if i % 2 == 0 { Some(i) } else { None }))
                .unwrap();
        }
        let results = pool.shutdown().unwrap();
        assert_eq!(results, vec![(0, 0), (2, 2), (4, 4), (6, 6), (8, 8)]);
    }

    #[test]
    fn test_small_queue_applies_backpressure() {
        let mut pool = WorkerPool::new(2, 1).unwrap();
        for i in 0..20usize {
            pool.schedule(i, |i| {
                thread::sleep(Duration::from_millis(2));
                Ok(Some(i))
            })
            .unwrap();
        }
        assert_eq!(pool.shutdown().unwrap().len(), 20);
    }

    #[test]
    fn test_first_error_is_reported() {
        let mut pool = WorkerPool::new(3, 4).unwrap();
        for i in 0..30usize {
            pool.schedule(i, |i| {
                if i == 5 {
                    Err(NpSearchError::ExternalTool("predictor crashed".to_string()))
                } else {
                    Ok(Some(i))
                }
            })
            .unwrap();
        }
        assert!(matches!(
            pool.shutdown(),
            Err(NpSearchError::ExternalTool(_))
        ));
    }

    #[test]
    fn test_panicking_job_is_internal_error() {
        let mut pool: WorkerPool<usize> = WorkerPool::new(2, 2).unwrap();
        pool.schedule(0usize, |_| panic!("boom")).unwrap();
        assert!(matches!(pool.shutdown(), Err(NpSearchError::Internal(_))));
    }
}
