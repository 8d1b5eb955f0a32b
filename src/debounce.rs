use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Trailing-edge debouncer: only the last value scheduled within a quiet period is delivered.
///
/// The pending delivery runs as a Tokio task. Dropping the debouncer cancels it, so the
/// owner's lifetime bounds the timer's.
pub struct Debouncer<T> {
    delay: Duration,
    sink: Arc<dyn Fn(T) + Send + Sync>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration, sink: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            sink: Arc::new(sink),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restarts the quiet period with `value` as the candidate to deliver.
    ///
    /// Outside a Tokio runtime there is no timer to wait on and the value is delivered
    /// immediately.
    pub fn schedule(&self, value: T) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime for debounce timer, delivering immediately");
            self.cancel();
            (self.sink)(value);
            return;
        };
        let sink = Arc::clone(&self.sink);
        let delay = self.delay;
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            sink(value);
        });
        if let Some(previous) = self.pending.lock().replace(task) {
            previous.abort();
        }
    }

    /// Drops the pending value, if any. Returns whether a delivery was still outstanding.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(task) => {
                let outstanding = !task.is_finished();
                task.abort();
                outstanding
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(task) = self.pending.get_mut().take() {
            task.abort();
        }
    }
}
