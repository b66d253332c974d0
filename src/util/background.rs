//! A small supervised background-task runner.
//!
//! Every discovery loop, health monitor and reaper task in this codebase is
//! spawned through a [`BackgroundRunner`] rather than bare `tokio::spawn`, so
//! that shutdown has a single place to signal "must exit" and a single place
//! to join every task before the process actually exits. This mirrors the
//! `watch::Receiver<bool>` + `join!` pattern the teacher's cluster membership
//! manager uses for its own discovery/status loops.

use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct BackgroundRunner {
	must_exit_tx: watch::Sender<bool>,
	must_exit_rx: watch::Receiver<bool>,
}

impl Default for BackgroundRunner {
	fn default() -> Self {
		Self::new()
	}
}

impl BackgroundRunner {
	pub fn new() -> Self {
		let (must_exit_tx, must_exit_rx) = watch::channel(false);
		BackgroundRunner {
			must_exit_tx,
			must_exit_rx,
		}
	}

	/// A receiver tasks can `.changed().await` or inspect with `.borrow()` to
	/// learn that shutdown has started.
	pub fn must_exit(&self) -> watch::Receiver<bool> {
		self.must_exit_rx.clone()
	}

	/// Spawn a task and keep its handle so that [`shutdown`] can join it.
	/// The task is responsible for observing `must_exit()` itself.
	pub fn spawn<F>(&self, name: &'static str, fut: F) -> JoinHandle<()>
	where
		F: std::future::Future<Output = ()> + Send + 'static,
	{
		tokio::spawn(async move {
			trace!("background task '{}' started", name);
			fut.await;
			trace!("background task '{}' exited", name);
		})
	}

	/// Signal all tasks to exit. Does not wait for them; callers that need to
	/// wait should `.await` the `JoinHandle`s returned by `spawn`.
	pub fn begin_shutdown(&self) {
		let _ = self.must_exit_tx.send(true);
	}

	pub fn is_exiting(&self) -> bool {
		*self.must_exit_rx.borrow()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, Ordering};
	use std::sync::Arc;

	#[tokio::test]
	async fn shutdown_is_observed_by_spawned_task() {
		let bg = BackgroundRunner::new();
		let observed = Arc::new(AtomicBool::new(false));
		let observed2 = observed.clone();
		let mut must_exit = bg.must_exit();
		let handle = bg.spawn("t", async move {
			must_exit.changed().await.unwrap();
			observed2.store(true, Ordering::SeqCst);
		});

		bg.begin_shutdown();
		handle.await.unwrap();
		assert!(observed.load(Ordering::SeqCst));
	}
}
