//! Delivery of callbacks onto the host's main thread.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle used by worker threads to schedule work on the main loop.
#[derive(Clone)]
pub struct MainContext {
    tx: Sender<Task>,
}

impl MainContext {
    /// Queue `f` for the main loop. Returns false if the loop is gone.
    pub fn post<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(f)).is_ok()
    }
}

/// Receiving end, driven by the thread that owns it.
pub struct MainLoop {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

impl MainLoop {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn context(&self) -> MainContext {
        MainContext { tx: self.tx.clone() }
    }

    /// Run everything already queued. Returns how many callbacks ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one callback and run it.
    pub fn run_one(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}
