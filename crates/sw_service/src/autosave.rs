//! Debounced autosave.
//!
//! Edits are pushed as whole values; only the latest one is committed, once
//! no new value arrived for `delay`. Every push restarts the timer.
//! `flush` commits the pending value now. Dropping the handle cancels a
//! pending commit; a commit already running completes.
//!
//! A failed commit is reported through the status channel and the value is
//! dropped. The next push starts over.

use std::fmt::Display;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    /// A value is waiting for the timer.
    Pending,
    Saving,
    Saved,
    Error(String),
}

enum Command<T> {
    Push(T),
    Flush(oneshot::Sender<()>),
}

pub struct DebouncedCommit<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
    status: watch::Receiver<SaveStatus>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> DebouncedCommit<T> {
    /// Spawn the commit task on the current tokio runtime.
    pub fn spawn<F, E>(delay: Duration, commit: F) -> Self
    where
        F: FnMut(T) -> Result<(), E> + Send + 'static,
        E: Display + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let task = tokio::spawn(run(rx, status_tx, delay, commit));
        Self { tx, status, task }
    }

    /// Replace the pending value and restart the timer.
    pub fn push(&self, value: T) {
        // The task only stops when the handle is dropped.
        let _ = self.tx.send(Command::Push(value));
    }

    /// Commit the pending value, if any, without waiting for the timer.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }
}

impl<T> Drop for DebouncedCommit<T> {
    fn drop(&mut self) {
        self.task.abort();
        debug!("autosave dropped, pending commit cancelled");
    }
}

async fn run<T, F, E>(
    mut rx: mpsc::UnboundedReceiver<Command<T>>,
    status: watch::Sender<SaveStatus>,
    delay: Duration,
    mut commit: F,
) where
    F: FnMut(T) -> Result<(), E>,
    E: Display,
{
    let mut pending: Option<T> = None;
    let mut deadline = Instant::now();

    let fire = |value: T, commit: &mut F| {
        status.send_replace(SaveStatus::Saving);
        match commit(value) {
            Ok(()) => {
                status.send_replace(SaveStatus::Saved);
            }
            Err(e) => {
                warn!(error = %e, "autosave commit failed");
                status.send_replace(SaveStatus::Error(e.to_string()));
            }
        }
    };

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                None => break,
                Some(Command::Push(v)) => {
                    pending = Some(v);
                    deadline = Instant::now() + delay;
                    status.send_replace(SaveStatus::Pending);
                }
                Some(Command::Flush(ack)) => {
                    if let Some(v) = pending.take() {
                        fire(v, &mut commit);
                    }
                    let _ = ack.send(());
                }
            },
            _ = sleep_until(deadline), if pending.is_some() => {
                if let Some(v) = pending.take() {
                    fire(v, &mut commit);
                }
            }
        }
    }
}
