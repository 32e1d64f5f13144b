//! Hosting well-known identifiers on dedicated OS threads.
//!
//! A [`WellKnownThread`] owns a [`MessageLoop`] and the [`ThreadRecord`] that
//! registers it. Stopping quits the loop, joins the thread and unregisters.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{ThreadError, panic_message};
use crate::id::WellKnownId;
use crate::message_loop::MessageLoop;
use crate::queue::TaskQueue;
use crate::registry::{ThreadRecord, ThreadRegistry};
use crate::task::{Nesting, Task};

/// Startup options for one well-known thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSpec {
	/// Identifier the thread serves.
	pub id: WellKnownId,
	/// OS thread name. Defaults to [`WellKnownId::thread_name`], then the label.
	pub name: Option<String>,
	/// Stack size in bytes. `None` keeps the platform default.
	pub stack_size: Option<usize>,
}

impl ThreadSpec {
	/// Spec with default name and stack size.
	pub fn new(id: WellKnownId) -> Self {
		Self {
			id,
			name: None,
			stack_size: None,
		}
	}

	/// Overrides the OS thread name.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Overrides the stack size.
	pub fn stack_size(mut self, bytes: usize) -> Self {
		self.stack_size = Some(bytes);
		self
	}

	fn resolved_name(&self) -> String {
		match (&self.name, self.id.thread_name()) {
			(Some(name), _) => name.clone(),
			(None, Some(name)) => name.to_owned(),
			(None, None) => self.id.as_str().to_owned(),
		}
	}
}

/// A dedicated OS thread running the message loop for one identifier.
///
/// The loop is registered before the thread starts, so work posted right
/// after [`WellKnownThread::start`] returns is queued, not rejected. Stop
/// threads from the highest ordinal down; dropping a thread stops it.
pub struct WellKnownThread {
	id: WellKnownId,
	name: String,
	message_loop: Arc<MessageLoop>,
	join: Option<JoinHandle<()>>,
	record: Option<ThreadRecord>,
}

impl std::fmt::Debug for WellKnownThread {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WellKnownThread")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("running", &self.is_running())
			.finish()
	}
}

impl WellKnownThread {
	/// Registers a fresh loop for `spec.id` and starts a thread running it.
	///
	/// # Panics
	///
	/// Panics if `spec.id` is already registered.
	pub fn start(registry: &ThreadRegistry, spec: ThreadSpec) -> Result<Self, ThreadError> {
		let id = spec.id;
		if !id.is_supported() {
			return Err(ThreadError::Unsupported(id));
		}

		let name = spec.resolved_name();
		let message_loop = MessageLoop::new(id.as_str());
		let record = ThreadRecord::new(registry, id, message_loop.handle());

		let mut builder = std::thread::Builder::new().name(name.clone());
		if let Some(bytes) = spec.stack_size {
			builder = builder.stack_size(bytes);
		}
		let runner = Arc::clone(&message_loop);
		let join = match builder.spawn(move || runner.run()) {
			Ok(join) => join,
			Err(source) => {
				message_loop.shut_down();
				drop(record);
				return Err(ThreadError::Spawn { id, source });
			}
		};

		tracing::debug!(thread = %id, name = %name, "threads.thread.start");
		Ok(Self {
			id,
			name,
			message_loop,
			join: Some(join),
			record: Some(record),
		})
	}

	/// Identifier this thread serves.
	pub fn id(&self) -> WellKnownId {
		self.id
	}

	/// OS thread name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The loop this thread runs.
	pub fn message_loop(&self) -> &Arc<MessageLoop> {
		&self.message_loop
	}

	/// Whether the thread has been started and not yet stopped.
	pub fn is_running(&self) -> bool {
		self.join.is_some()
	}

	/// Runs all work queued so far, then ends the thread and unregisters it.
	///
	/// Delayed work that is not yet due is dropped. Calling this again is a
	/// no-op.
	pub fn stop(&mut self) -> Result<(), ThreadError> {
		let Some(join) = self.join.take() else {
			return Ok(());
		};

		let quitter = Arc::clone(&self.message_loop);
		if let Err(refused) = self.message_loop.post(Task::new(move || quitter.quit()), Duration::ZERO, Nesting::Nestable) {
			drop(refused);
			self.message_loop.quit();
		}
		let joined = join.join();

		self.message_loop.shut_down();
		drop(self.record.take());
		tracing::debug!(thread = %self.id, "threads.thread.stop");

		joined.map_err(|payload| ThreadError::Panicked {
			id: self.id,
			message: panic_message(payload.as_ref()),
		})
	}
}

impl Drop for WellKnownThread {
	fn drop(&mut self) {
		if let Err(err) = self.stop() {
			tracing::warn!(thread = %self.id, error = %err, "threads.thread.stop_failed");
		}
	}
}

#[cfg(test)]
mod tests;
