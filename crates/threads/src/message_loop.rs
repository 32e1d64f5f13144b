//! Reference single-threaded task queue.
//!
//! # Invariants
//!
//! - Tasks run in (due time, submission sequence) order, so tasks posted with
//!   the same delay run in submission order.
//! - Non-nestable tasks only run at the outermost run level. A nested run
//!   defers them, and they run once control is back at depth one.
//! - Task destructors never run while the loop's state lock is held, so a
//!   dropped task may post again without deadlocking.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::queue::{self, QueueHandle, TaskQueue};
use crate::task::{Nesting, Task};

/// Upper bound on how far in the future a task may be scheduled.
const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
	UntilQuit,
	UntilIdle,
}

struct PendingTask {
	due: Instant,
	seq: u64,
	nesting: Nesting,
	task: Task,
}

impl PartialEq for PendingTask {
	fn eq(&self, other: &Self) -> bool {
		self.due == other.due && self.seq == other.seq
	}
}

impl Eq for PendingTask {}

impl PartialOrd for PendingTask {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for PendingTask {
	// Reversed: the heap yields the earliest due, lowest sequence first.
	fn cmp(&self, other: &Self) -> Ordering {
		other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
	}
}

struct LoopState {
	pending: BinaryHeap<PendingTask>,
	deferred: VecDeque<PendingTask>,
	next_seq: u64,
	depth: usize,
	quit_requested: bool,
	accepting: bool,
}

/// A cooperative task queue driven by whichever thread calls [`MessageLoop::run`].
pub struct MessageLoop {
	label: String,
	state: Mutex<LoopState>,
	wake: Condvar,
}

impl std::fmt::Debug for MessageLoop {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MessageLoop").field("label", &self.label).finish_non_exhaustive()
	}
}

impl MessageLoop {
	/// Creates an idle loop that accepts work.
	pub fn new(label: impl Into<String>) -> Arc<Self> {
		Arc::new(Self {
			label: label.into(),
			state: Mutex::new(LoopState {
				pending: BinaryHeap::new(),
				deferred: VecDeque::new(),
				next_seq: 0,
				depth: 0,
				quit_requested: false,
				accepting: true,
			}),
			wake: Condvar::new(),
		})
	}

	/// Type-erased handle for registration.
	pub fn handle(self: &Arc<Self>) -> QueueHandle {
		Arc::clone(self) as QueueHandle
	}

	/// Runs tasks on the calling thread until [`Self::quit`] or [`Self::shut_down`].
	///
	/// Delayed tasks are waited for.
	pub fn run(self: &Arc<Self>) {
		self.run_with(RunMode::UntilQuit);
	}

	/// Runs every task that is ready now, then returns.
	///
	/// Calling this from inside a running task is a nested run.
	pub fn run_until_idle(self: &Arc<Self>) {
		self.run_with(RunMode::UntilIdle);
	}

	/// Makes the innermost blocking [`Self::run`] return after its current task.
	///
	/// Idle runs nested inside it return as well, without consuming the request.
	pub fn quit(&self) {
		self.state.lock().quit_requested = true;
		self.wake.notify_all();
	}

	/// Stops accepting work and drops every pending task.
	///
	/// Any active run returns after its current task.
	pub fn shut_down(&self) {
		let (pending, deferred) = {
			let mut state = self.state.lock();
			state.accepting = false;
			(std::mem::take(&mut state.pending), std::mem::take(&mut state.deferred))
		};
		self.wake.notify_all();

		let dropped = pending.len() + deferred.len();
		tracing::debug!(queue = %self.label, dropped, "threads.loop.shut_down");
		drop(pending);
		drop(deferred);
	}

	/// Whether posts are still accepted.
	pub fn is_accepting(&self) -> bool {
		self.state.lock().accepting
	}

	/// Number of tasks waiting to run, deferred ones included.
	pub fn pending_len(&self) -> usize {
		let state = self.state.lock();
		state.pending.len() + state.deferred.len()
	}

	/// Current run nesting depth; zero when the loop is not running.
	pub fn run_depth(&self) -> usize {
		self.state.lock().depth
	}

	fn run_with(self: &Arc<Self>, mode: RunMode) {
		let _entered = queue::enter(self.handle());
		let _depth = DepthGuard::enter(self);
		while let Some(task) = self.next_task(mode) {
			task.run();
		}
	}

	fn next_task(&self, mode: RunMode) -> Option<Task> {
		let mut state = self.state.lock();
		loop {
			if !state.accepting {
				return None;
			}
			if state.quit_requested {
				// Only a blocking run consumes the request. An idle run nested
				// inside it returns early and leaves the request for it.
				if mode == RunMode::UntilQuit {
					state.quit_requested = false;
				}
				return None;
			}
			if state.depth == 1
				&& let Some(deferred) = state.deferred.pop_front()
			{
				return Some(deferred.task);
			}

			let now = Instant::now();
			match state.pending.peek().map(|next| next.due) {
				Some(due) if due <= now => {
					if let Some(next) = state.pending.pop() {
						if next.nesting == Nesting::NonNestable && state.depth > 1 {
							state.deferred.push_back(next);
						} else {
							return Some(next.task);
						}
					}
				}
				_ if mode == RunMode::UntilIdle => return None,
				Some(due) => {
					self.wake.wait_until(&mut state, due);
				}
				None => self.wake.wait(&mut state),
			}
		}
	}
}

impl TaskQueue for MessageLoop {
	fn post(&self, task: Task, delay: Duration, nesting: Nesting) -> Result<(), Task> {
		let mut state = self.state.lock();
		if !state.accepting {
			drop(state);
			tracing::trace!(queue = %self.label, origin = %task.origin(), "threads.loop.post_rejected");
			return Err(task);
		}
		let seq = state.next_seq;
		state.next_seq = seq.wrapping_add(1);
		let due = Instant::now() + delay.min(MAX_DELAY);
		state.pending.push(PendingTask { due, seq, nesting, task });
		drop(state);
		self.wake.notify_one();
		Ok(())
	}

	fn label(&self) -> &str {
		&self.label
	}
}

struct DepthGuard<'a> {
	owner: &'a MessageLoop,
}

impl<'a> DepthGuard<'a> {
	fn enter(owner: &'a MessageLoop) -> Self {
		owner.state.lock().depth += 1;
		Self { owner }
	}
}

impl Drop for DepthGuard<'_> {
	fn drop(&mut self) {
		self.owner.state.lock().depth -= 1;
	}
}
