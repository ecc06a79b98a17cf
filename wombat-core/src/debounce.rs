use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, unbounded};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Trailing-edge debouncer: every [`Debouncer::call`] supersedes the previous
/// pending callback, and only the last call within the window actually runs,
/// once the window has elapsed with no further calls.
///
/// Dropping the debouncer cancels whatever is pending and shuts the worker
/// down.
pub struct Debouncer {
    tx: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        let (tx, rx) = unbounded::<Job>();
        let worker = std::thread::spawn(move || {
            loop {
                let Ok(mut job) = rx.recv() else {
                    break;
                };
                loop {
                    match rx.recv_timeout(window) {
                        // A newer call arrived inside the window; the old one
                        // is cancelled and the window restarts.
                        Ok(next) => job = next,
                        Err(RecvTimeoutError::Timeout) => {
                            job();
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            }
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Schedules `f` to run after the window elapses, cancelling any pending
    /// callback.
    pub fn call(&self, f: impl FnOnce() + Send + 'static) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Box::new(f));
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        // Closing the channel wakes the worker; a pending job is discarded.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Instant;

    #[test]
    fn only_the_last_call_in_the_window_fires() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let (tx, rx) = unbounded();
        let start = Instant::now();

        for tag in ["first", "second", "third"] {
            let tx = tx.clone();
            debouncer.call(move || {
                let _ = tx.send(tag);
            });
            if tag != "third" {
                sleep(Duration::from_millis(100));
            }
        }

        // Fires roughly 300ms after the third call (issued at ~200ms).
        let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fired, "third");
        assert!(start.elapsed() >= Duration::from_millis(400));

        // And nothing else fires afterwards.
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    }

    #[test]
    fn separate_bursts_each_fire_once() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let (tx, rx) = unbounded();

        for round in 0..2 {
            let tx = tx.clone();
            debouncer.call(move || {
                let _ = tx.send(round);
            });
            assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), round);
        }
    }

    #[test]
    fn dropping_cancels_the_pending_call() {
        let (tx, rx) = unbounded();
        {
            let debouncer = Debouncer::new(Duration::from_millis(200));
            debouncer.call(move || {
                let _ = tx.send(());
            });
        }
        assert!(rx.recv_timeout(Duration::from_millis(400)).is_err());
    }
}
