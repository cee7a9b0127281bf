//! Debounced push scheduling.
//!
//! [`PushScheduler`] owns a single pending slot. `schedule()` (re)arms a quiet
//! period timer; when it elapses without another `schedule()`, the job runs.
//! `flush()` runs a pending job right away. Job runs never overlap.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Default quiet period before a scheduled push goes out.
pub const DEFAULT_PUSH_DELAY: Duration = Duration::from_secs(5);

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Job = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    pending: bool,
}

struct Inner {
    delay: Duration,
    job: Job,
    slot: Mutex<Slot>,
    run_lock: tokio::sync::Mutex<()>,
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_pending(&self) -> bool {
        std::mem::take(&mut self.slot().pending)
    }

    async fn flush(&self) -> bool {
        let _running = self.run_lock.lock().await;
        if !self.take_pending() {
            return false;
        }
        (self.job)().await;
        true
    }
}

/// Single-slot debouncer for outbound pushes.
///
/// Cloning shares the slot.
#[derive(Clone)]
pub struct PushScheduler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PushScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushScheduler")
            .field("delay", &self.inner.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl PushScheduler {
    /// Create a scheduler that runs `job` after `delay` of quiet.
    pub fn new<F, Fut>(delay: Duration, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Arc::new(move || Box::pin(job()) as BoxFuture);
        Self {
            inner: Arc::new(Inner {
                delay,
                job,
                slot: Mutex::new(Slot::default()),
                run_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Whether a job is waiting to run.
    pub fn is_pending(&self) -> bool {
        self.inner.slot().pending
    }

    /// Mark the job pending and restart the quiet period.
    ///
    /// Outside a tokio runtime no timer is armed; the job stays pending until
    /// the next `flush()`.
    pub fn schedule(&self) {
        let generation = {
            let mut slot = self.inner.slot();
            slot.generation = slot.generation.wrapping_add(1);
            slot.pending = true;
            slot.generation
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no runtime for push timer, waiting for flush");
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // A later schedule() or cancel() superseded this timer.
            let superseded = inner.slot().generation != generation;
            if superseded {
                return;
            }
            inner.flush().await;
        });
    }

    /// Run the pending job now. Returns whether it ran.
    pub async fn flush(&self) -> bool {
        self.inner.flush().await
    }

    /// Mark the job pending and run it immediately, bypassing the quiet period.
    pub async fn run_now(&self) -> bool {
        {
            let mut slot = self.inner.slot();
            slot.generation = slot.generation.wrapping_add(1);
            slot.pending = true;
        }
        self.inner.flush().await
    }

    /// Drop the pending job and disarm the timer.
    pub fn cancel(&self) {
        let mut slot = self.inner.slot();
        slot.generation = slot.generation.wrapping_add(1);
        slot.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(delay: Duration) -> (PushScheduler, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let scheduler = PushScheduler::new(delay, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (scheduler, runs)
    }

    // ===========================================
    // Debounce Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn runs_after_quiet_period() {
        let (scheduler, runs) = counting(DEFAULT_PUSH_DELAY);

        scheduler.schedule();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_collapse_into_one_run() {
        let (scheduler, runs) = counting(Duration::from_secs(5));

        for _ in 0..4 {
            scheduler.schedule();
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    // ===========================================
    // Flush and Cancel Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn flush_runs_pending_job_once() {
        let (scheduler, runs) = counting(Duration::from_secs(5));

        scheduler.schedule();
        assert!(scheduler.flush().await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // The armed timer finds nothing pending
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn flush_without_pending_is_noop() {
        let (scheduler, runs) = counting(Duration::from_secs(5));

        assert!(!scheduler.flush().await);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn run_now_bypasses_delay() {
        let (scheduler, runs) = counting(Duration::from_secs(60));

        assert!(scheduler.run_now().await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_job() {
        let (scheduler, runs) = counting(Duration::from_secs(5));

        scheduler.schedule();
        scheduler.cancel();
        assert!(!scheduler.is_pending());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!scheduler.flush().await);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_flushes_run_job_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let scheduler = PushScheduler::new(Duration::from_secs(5), move || {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        scheduler.schedule();
        let (a, b) = tokio::join!(scheduler.flush(), scheduler.flush());

        assert!(a ^ b);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn schedule_outside_runtime_stays_pending() {
        let (scheduler, _runs) = counting(Duration::from_secs(5));
        scheduler.schedule();
        assert!(scheduler.is_pending());
    }
}
