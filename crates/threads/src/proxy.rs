//! Work sinks bound to one well-known thread.

use std::sync::Arc;
use std::time::Duration;

use crate::id::WellKnownId;
use crate::registry::ThreadRegistry;
use crate::task::{Nesting, Task};

/// Something that accepts tasks for one thread.
///
/// Every method returns false, having dropped the task, when the thread
/// behind the runner is not accepting work.
pub trait TaskRunner: Send + Sync {
	/// Posts `task` to run as soon as possible.
	fn post_task(&self, task: Task) -> bool;

	/// Posts `task` to run after `delay`.
	fn post_delayed_task(&self, task: Task, delay: Duration) -> bool;

	/// Posts `task` to run outside of any nested run.
	fn post_non_nestable_task(&self, task: Task) -> bool;

	/// Posts `task` to run after `delay`, outside of any nested run.
	fn post_non_nestable_delayed_task(&self, task: Task, delay: Duration) -> bool;

	/// Whether the calling thread is the one this runner posts to.
	fn belongs_to_current_thread(&self) -> bool;
}

/// [`TaskRunner`] that dispatches through the registry by identifier.
///
/// Holds no reference to the target thread, so it stays valid across the
/// target's whole lifecycle and simply reports rejection while it is down.
#[derive(Debug, Clone)]
pub struct ThreadProxy {
	registry: ThreadRegistry,
	id: WellKnownId,
}

impl ThreadProxy {
	/// Identifier this proxy posts to.
	pub fn id(&self) -> WellKnownId {
		self.id
	}
}

impl TaskRunner for ThreadProxy {
	fn post_task(&self, task: Task) -> bool {
		self.registry.submit(self.id, task, Duration::ZERO, Nesting::Nestable)
	}

	fn post_delayed_task(&self, task: Task, delay: Duration) -> bool {
		self.registry.submit(self.id, task, delay, Nesting::Nestable)
	}

	fn post_non_nestable_task(&self, task: Task) -> bool {
		self.registry.submit(self.id, task, Duration::ZERO, Nesting::NonNestable)
	}

	fn post_non_nestable_delayed_task(&self, task: Task, delay: Duration) -> bool {
		self.registry.submit(self.id, task, delay, Nesting::NonNestable)
	}

	fn belongs_to_current_thread(&self) -> bool {
		self.registry.currently_on(self.id)
	}
}

impl ThreadRegistry {
	/// Proxy posting to `id`.
	pub fn proxy(&self, id: WellKnownId) -> ThreadProxy {
		ThreadProxy {
			registry: self.clone(),
			id,
		}
	}

	/// Type-erased runner posting to `id`.
	pub fn task_runner(&self, id: WellKnownId) -> Arc<dyn TaskRunner> {
		Arc::new(self.proxy(id))
	}
}
