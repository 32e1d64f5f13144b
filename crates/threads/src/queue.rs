//! Boundary to the single-threaded task queues that actually run work.
//!
//! The registry never looks inside a queue. It needs three things: a way to
//! enqueue with a delay and nesting mode, a stable identity to compare
//! handles, and the queue bound to the calling thread.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use crate::task::{Nesting, Task};

/// A single-threaded cooperative task queue owned by one thread.
pub trait TaskQueue: Send + Sync + 'static {
	/// Enqueues `task` to run after `delay`.
	///
	/// Returns the task back when the queue no longer accepts work, so the
	/// caller can drop it outside of any lock it holds.
	fn post(&self, task: Task, delay: Duration, nesting: Nesting) -> Result<(), Task>;

	/// Human-readable queue name for logs and snapshots.
	fn label(&self) -> &str;
}

/// Shared handle to a task queue. Identity is pointer identity.
pub type QueueHandle = Arc<dyn TaskQueue>;

/// Returns true when both handles point at the same queue.
pub fn same_queue(lhs: &QueueHandle, rhs: &QueueHandle) -> bool {
	std::ptr::addr_eq(Arc::as_ptr(lhs), Arc::as_ptr(rhs))
}

thread_local! {
	static CURRENT: RefCell<Option<QueueHandle>> = const { RefCell::new(None) };
}

/// The queue bound to the calling thread, if any.
pub fn current() -> Option<QueueHandle> {
	CURRENT.with(|current| current.borrow().clone())
}

/// Binds `queue` as the calling thread's current queue until the guard drops.
///
/// Guards nest; dropping one restores whatever was bound before it.
pub fn enter(queue: QueueHandle) -> EnterGuard {
	let previous = CURRENT.with(|current| current.borrow_mut().replace(queue));
	EnterGuard {
		previous,
		_not_send: std::marker::PhantomData,
	}
}

/// Restores the previously bound queue on drop. See [`enter`].
#[must_use = "the queue is unbound as soon as the guard drops"]
pub struct EnterGuard {
	previous: Option<QueueHandle>,
	_not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for EnterGuard {
	fn drop(&mut self) {
		let previous = self.previous.take();
		CURRENT.with(|current| *current.borrow_mut() = previous);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct NullQueue;

	impl TaskQueue for NullQueue {
		fn post(&self, task: Task, _delay: Duration, _nesting: Nesting) -> Result<(), Task> {
			Err(task)
		}

		fn label(&self) -> &str {
			"null"
		}
	}

	#[test]
	fn identity_is_per_allocation() {
		let a: QueueHandle = Arc::new(NullQueue);
		let b: QueueHandle = Arc::new(NullQueue);
		assert!(same_queue(&a, &Arc::clone(&a)));
		assert!(!same_queue(&a, &b));
	}

	#[test]
	fn enter_guards_nest_and_restore() {
		let outer: QueueHandle = Arc::new(NullQueue);
		let inner: QueueHandle = Arc::new(NullQueue);
		assert!(current().is_none());

		let outer_guard = enter(Arc::clone(&outer));
		{
			let _inner_guard = enter(Arc::clone(&inner));
			assert!(current().is_some_and(|q| same_queue(&q, &inner)));
		}
		assert!(current().is_some_and(|q| same_queue(&q, &outer)));
		drop(outer_guard);
		assert!(current().is_none());
	}

	#[test]
	fn binding_is_per_thread() {
		let queue: QueueHandle = Arc::new(NullQueue);
		let _guard = enter(queue);
		let seen_elsewhere = std::thread::spawn(|| current().is_some()).join().unwrap();
		assert!(!seen_elsewhere);
	}
}
