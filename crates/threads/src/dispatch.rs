//! Posting work to well-known threads by identifier.
//!
//! # Lock elision
//!
//! Threads shut down from the highest ordinal to the lowest, so a thread with
//! an ordinal lower than or equal to the caller's is still registered for as
//! long as the caller runs. Posting to such a target reads its slot without
//! taking the registry mutex. Every other post, including posts from threads
//! that are not well-known, reads the slot under the mutex and holds it while
//! enqueueing.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::id::WellKnownId;
use crate::registry::ThreadRegistry;
use crate::task::{Nesting, Task};

impl ThreadRegistry {
	/// Posts `work` to run on `id` as soon as possible.
	///
	/// Returns false, dropping `work` unrun, when `id` is not registered.
	#[track_caller]
	pub fn post_task<F>(&self, id: WellKnownId, work: F) -> bool
	where
		F: FnOnce() + Send + 'static,
	{
		self.submit(id, Task::new(work), Duration::ZERO, Nesting::Nestable)
	}

	/// Posts `work` to run on `id` after `delay`.
	#[track_caller]
	pub fn post_delayed_task<F>(&self, id: WellKnownId, work: F, delay: Duration) -> bool
	where
		F: FnOnce() + Send + 'static,
	{
		self.submit(id, Task::new(work), delay, Nesting::Nestable)
	}

	/// Posts `work` to run on `id` outside of any nested run.
	#[track_caller]
	pub fn post_non_nestable_task<F>(&self, id: WellKnownId, work: F) -> bool
	where
		F: FnOnce() + Send + 'static,
	{
		self.submit(id, Task::new(work), Duration::ZERO, Nesting::NonNestable)
	}

	/// Posts `work` to run on `id` after `delay`, outside of any nested run.
	#[track_caller]
	pub fn post_non_nestable_delayed_task<F>(&self, id: WellKnownId, work: F, delay: Duration) -> bool
	where
		F: FnOnce() + Send + 'static,
	{
		self.submit(id, Task::new(work), delay, Nesting::NonNestable)
	}

	/// Runs `work` on `id` and hands its result back through a oneshot.
	///
	/// Returns `None` when `id` is not registered. The receiver reports an
	/// error if the target tears its queue down before running the task.
	#[track_caller]
	pub fn post_with_reply<F, R>(&self, id: WellKnownId, work: F) -> Option<oneshot::Receiver<R>>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		let (tx, rx) = oneshot::channel();
		let task = Task::new(move || {
			let _ = tx.send(work());
		});
		self.submit(id, task, Duration::ZERO, Nesting::Nestable).then_some(rx)
	}

	/// Moves `value` to `id` and drops it there.
	///
	/// When `id` is not registered the value is dropped on the caller before
	/// this returns false.
	#[track_caller]
	pub fn drop_soon<T>(&self, id: WellKnownId, value: T) -> bool
	where
		T: Send + 'static,
	{
		self.submit(id, Task::new(move || drop(value)), Duration::ZERO, Nesting::NonNestable)
	}

	/// Hands `task` to the queue registered for `id`.
	///
	/// Returns true when a queue was registered and took ownership of the
	/// task. Otherwise the task is dropped before this returns.
	pub fn submit(&self, id: WellKnownId, task: Task, delay: Duration, nesting: Nesting) -> bool {
		let target_outlives_caller = self.outlives_current(id);
		let locked = (!target_outlives_caller).then(|| self.inner.lock.lock());
		let outcome = match &*self.slot(id).load() {
			Some(registration) => Ok(registration.queue.post(task, delay, nesting).err()),
			None => Err(task),
		};
		// Task destructors may post again, so they run after the mutex is released.
		drop(locked);

		match outcome {
			Ok(None) => true,
			Ok(Some(refused)) => {
				tracing::debug!(thread = %id, origin = %refused.origin(), "threads.post.queue_closed");
				drop(refused);
				true
			}
			Err(task) => {
				tracing::trace!(thread = %id, origin = %task.origin(), elided = target_outlives_caller, "threads.post.unregistered");
				drop(task);
				false
			}
		}
	}

	/// Whether `target` is guaranteed to stay registered while the calling
	/// thread runs.
	pub(crate) fn outlives_current(&self, target: WellKnownId) -> bool {
		self.current_id().is_some_and(|current| current >= target)
	}
}
