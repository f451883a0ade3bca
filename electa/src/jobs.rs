use crate::*;
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A unit of background work
pub type BoxedJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs background work for the service. Deployments plug in their own worker pool here.
pub trait JobExecutor: Send + Sync {
    fn execute(&self, job: BoxedJob);
}

/// Runs every job immediately on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl JobExecutor for InlineExecutor {
    fn execute(&self, job: BoxedJob) {
        job()
    }
}

/// Runs every job on its own OS thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl JobExecutor for ThreadExecutor {
    fn execute(&self, job: BoxedJob) {
        std::thread::spawn(job);
    }
}

/// Handle to the eventual result of a submitted job.
///
/// Resolves to `Error::JobCancelled` if the job is dropped without running to completion
/// (for example if it panics on a worker thread).
#[must_use = "jobs do nothing observable unless awaited or polled"]
pub struct Job<T> {
    rx: oneshot::Receiver<Result<T, Error>>,
}

impl<T> Future for Job<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| match res {
            Ok(res) => res,
            Err(oneshot::Canceled) => Err(Error::JobCancelled),
        })
    }
}

/// Hand `f` to the executor and return a handle to its result
pub fn submit<T, F>(executor: &dyn JobExecutor, f: F) -> Job<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, Error> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    executor.execute(Box::new(move || {
        // The receiver may have been dropped; the work is still done
        let _ = tx.send(f());
    }));
    Job { rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    struct DroppingExecutor;

    impl JobExecutor for DroppingExecutor {
        fn execute(&self, _job: BoxedJob) {}
    }

    #[test]
    fn test_inline() {
        let job = submit(&InlineExecutor, || Ok(2 + 2));
        assert_eq!(block_on(job).unwrap(), 4);

        let job: Job<()> = submit(&InlineExecutor, || Err(Error::AlreadyReleased));
        assert!(matches!(block_on(job), Err(Error::AlreadyReleased)));
    }

    #[test]
    fn test_thread() {
        let jobs: Vec<Job<u64>> = (0..4u64)
            .map(|i| submit(&ThreadExecutor, move || Ok(i * 10)))
            .collect();
        let results: Vec<u64> = jobs.into_iter().map(|j| block_on(j).unwrap()).collect();
        assert_eq!(results, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_cancelled() {
        let job = submit(&DroppingExecutor, || Ok(1));
        assert!(matches!(block_on(job), Err(Error::JobCancelled)));
    }
}
