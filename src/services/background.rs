//! Tracking for detached background work.
//!
//! Turns never await persistence, but shutdown must not drop it. Every
//! detached task goes into a [`JoinSet`]; finished tasks are reaped whenever a
//! new one is spawned, and [`BackgroundTasks::drain`] awaits the rest.

use std::future::Future;
use std::sync::Mutex;

use tokio::task::JoinSet;
use tracing::{debug, error};

#[derive(Debug, Default)]
pub struct BackgroundTasks {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current runtime and track it.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        reap(&mut tasks);
        tasks.spawn(task);
        debug!(task = name, pending = tasks.len(), "background task spawned");
    }

    /// Number of tracked tasks still running.
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        reap(&mut tasks);
        tasks.len()
    }

    /// Await every tracked task, including ones spawned while draining.
    ///
    /// Panicked tasks are logged and otherwise ignored.
    pub async fn drain(&self) -> usize {
        let mut completed = 0;
        loop {
            let mut batch = {
                let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
                std::mem::take(&mut *tasks)
            };
            if batch.is_empty() {
                break;
            }
            while let Some(result) = batch.join_next().await {
                if let Err(e) = result {
                    error!("Background task failed: {}", e);
                }
                completed += 1;
            }
        }
        completed
    }
}

fn reap(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(e) = result {
            error!("Background task failed: {}", e);
        }
    }
}
