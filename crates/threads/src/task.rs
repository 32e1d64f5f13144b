use std::fmt;
use std::panic::Location;

/// Whether a task may run inside a nested run of its target loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Nesting {
	/// May run at any run depth.
	#[default]
	Nestable,
	/// Deferred until the loop is back at its outermost run level.
	NonNestable,
}

/// An exclusively owned unit of work bound for one task queue.
///
/// Dropping a task without running it destroys everything the closure
/// captured; that is how rejected submissions are disposed of.
pub struct Task {
	work: Box<dyn FnOnce() + Send + 'static>,
	origin: &'static Location<'static>,
}

impl Task {
	/// Wraps `work`, recording the caller as the task's origin.
	#[track_caller]
	pub fn new<F>(work: F) -> Self
	where
		F: FnOnce() + Send + 'static,
	{
		Self {
			work: Box::new(work),
			origin: Location::caller(),
		}
	}

	/// Source location that created the task.
	pub fn origin(&self) -> &'static Location<'static> {
		self.origin
	}

	/// Consumes and runs the task.
	pub fn run(self) {
		(self.work)()
	}
}

impl fmt::Debug for Task {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task").field("origin", &self.origin).finish_non_exhaustive()
	}
}
