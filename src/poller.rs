//! Re-fetches one thread's messages on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::models::Message;
use crate::repo::MessageRepo;

/// Shortest interval a poller will tick at; smaller values are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

pub struct ThreadPoller<R: MessageRepo + ?Sized + 'static> {
    repo: Arc<R>,
    every: Duration,
    task: Option<JoinHandle<()>>,
}

impl<R: MessageRepo + ?Sized + 'static> ThreadPoller<R> {
    pub fn new(repo: Arc<R>, every: Duration) -> Self {
        if every < MIN_INTERVAL {
            warn!(?every, "poll interval too short, using {MIN_INTERVAL:?}");
        }
        Self { repo, every: every.max(MIN_INTERVAL), task: None }
    }

    /// Starts polling `thread_id`, replacing whatever was being watched.
    /// The first fetch happens immediately. Must be called inside a tokio runtime.
    pub fn watch<F>(&mut self, thread_id: impl Into<String>, on_messages: F)
    where
        F: Fn(Vec<Message>) + Send + Sync + 'static,
    {
        self.stop();
        let thread_id = thread_id.into();
        let repo = Arc::clone(&self.repo);
        let mut ticker = tokio::time::interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(thread_id = %thread_id, "start polling");
        self.task = Some(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                match repo.list_messages(&thread_id).await {
                    Ok(msgs) => on_messages(msgs),
                    Err(e) => warn!(thread_id = %thread_id, "message poll failed: {e}"),
                }
            }
        }));
    }

    pub fn interval(&self) -> Duration {
        self.every
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl<R: MessageRepo + ?Sized + 'static> Drop for ThreadPoller<R> {
    fn drop(&mut self) {
        self.stop();
    }
}
