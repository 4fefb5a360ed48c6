//! The per-endpoint callback pipeline (§4.4): a single-worker, strictly
//! FIFO task queue that decouples user listener callbacks from the
//! polling thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Entry {
    handle: u64,
    task: Task,
}

struct Shared {
    queue: Mutex<VecDeque<Entry>>,
    condvar: Condvar,
    stopped: AtomicBool,
    next_handle: AtomicU64,
}

/// A handle to a not-yet-executed task, usable with [`TaskQueue::cancel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskHandle(u64);

/// Single-worker FIFO executor used to deliver listener callbacks off the
/// reactor thread. One instance is owned per endpoint.
pub struct TaskQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskQueue {
    pub fn new() -> TaskQueue {
        TaskQueue {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                condvar: Condvar::new(),
                stopped: AtomicBool::new(true),
                next_handle: AtomicU64::new(1),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Start the worker thread. A no-op if already started.
    pub fn start(&self) {
        let mut worker = self.worker.lock().unwrap();
        if worker.is_some() {
            return;
        }
        self.shared.stopped.store(false, Ordering::SeqCst);
        let shared = self.shared.clone();
        *worker = Some(
            std::thread::Builder::new()
                .name("endpoint-callbacks".into())
                .spawn(move || run_worker(shared))
                .expect("failed to spawn task queue worker"),
        );
    }

    /// Enqueue a task; returns a handle that can later be passed to
    /// [`TaskQueue::cancel`].
    pub fn enqueue<F: FnOnce() + Send + 'static>(&self, task: F) -> TaskHandle {
        let handle = self.shared.next_handle.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.shared.queue.lock().unwrap();
        queue.push_back(Entry {
            handle,
            task: Box::new(task),
        });
        self.shared.condvar.notify_one();
        TaskHandle(handle)
    }

    /// Remove a not-yet-executed task. Idempotent: cancelling an unknown or
    /// already-run handle is a no-op.
    pub fn cancel(&self, handle: TaskHandle) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.retain(|entry| entry.handle != handle.0);
    }

    /// Stop the worker: sets a shutdown flag, notifies, and joins. Any
    /// tasks still queued at that point are discarded without running.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.condvar.notify_all();
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        self.shared.queue.lock().unwrap().clear();
    }

    pub fn is_running(&self) -> bool {
        !self.shared.stopped.load(Ordering::SeqCst)
    }
}

impl Default for TaskQueue {
    fn default() -> TaskQueue {
        TaskQueue::new()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    #[test]
    fn tasks_run_in_fifo_order() {
        let queue = TaskQueue::new();
        queue.start();
        let (tx, rx) = channel();
        for i in 0..100 {
            let tx = tx.clone();
            queue.enqueue(move || tx.send(i).unwrap());
        }
        for expected in 0..100 {
            assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), expected);
        }
        queue.stop();
    }

    #[test]
    fn cancel_removes_a_not_yet_run_task() {
        let queue = TaskQueue::new();
        // Hold the worker back with a task that blocks on this channel so
        // the cancelled entry is still sitting in the queue when cancelled.
        let (gate_tx, gate_rx) = channel::<()>();
        queue.start();
        queue.enqueue(move || {
            let _ = gate_rx.recv();
        });

        let (tx, rx) = channel();
        let handle = queue.enqueue(move || tx.send("ran").unwrap());
        queue.cancel(handle);

        gate_tx.send(()).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        queue.stop();
    }

    #[test]
    fn stop_discards_tasks_still_queued() {
        let queue = TaskQueue::new();
        let (gate_tx, gate_rx) = channel::<()>();
        queue.start();
        queue.enqueue(move || {
            let _ = gate_rx.recv();
        });
        let (tx, rx) = channel();
        queue.enqueue(move || tx.send(()).unwrap());

        queue.stop();
        let _ = gate_tx.send(());
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}

fn run_worker(shared: Arc<Shared>) {
    loop {
        let entry = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(entry) = queue.pop_front() {
                    break Some(entry);
                }
                if shared.stopped.load(Ordering::SeqCst) {
                    break None;
                }
                queue = shared.condvar.wait(queue).unwrap();
            }
        };
        match entry {
            Some(entry) => (entry.task)(),
            None => return,
        }
    }
}
