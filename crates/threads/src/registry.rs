//! Process-wide table of well-known threads.
//!
//! # Role
//!
//! Maps each [`WellKnownId`] to the task queue of the thread currently
//! serving it. The table is a fixed array indexed by ordinal; one mutex
//! serializes every mutation and every read that cannot prove it is stable.
//!
//! # Invariants
//!
//! - At most one live registration per identifier.
//! - Identifiers unregister from the highest ordinal down. When `k` leaves,
//!   nothing above `k` may still be registered (checked in debug builds).
//! - An owner stops its queue before unregistering, so no task runs against
//!   a thread that is being torn down.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::id::WellKnownId;
use crate::message_loop::MessageLoop;
use crate::queue::{self, QueueHandle};

/// One live registration.
pub(crate) struct Registration {
	pub(crate) queue: QueueHandle,
}

pub(crate) struct RegistryInner {
	pub(crate) lock: Mutex<()>,
	pub(crate) slots: [ArcSwapOption<Registration>; WellKnownId::COUNT],
}

/// Snapshot of one registered thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationSnapshot {
	/// Registered identifier.
	pub id: WellKnownId,
	/// Label of the queue serving it.
	pub queue: String,
}

/// Shared handle to the well-known thread table.
///
/// Create one at process start and pass clones down to everything that
/// starts threads or posts work. It must outlive every registration.
#[derive(Clone)]
pub struct ThreadRegistry {
	pub(crate) inner: Arc<RegistryInner>,
}

impl Default for ThreadRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for ThreadRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ThreadRegistry").field("registered", &self.snapshot()).finish()
	}
}

impl ThreadRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self {
			inner: Arc::new(RegistryInner {
				lock: Mutex::new(()),
				slots: std::array::from_fn(|_| ArcSwapOption::empty()),
			}),
		}
	}

	/// Records `queue` as the queue serving `id`.
	///
	/// # Panics
	///
	/// Panics if `id` is already registered.
	pub fn register(&self, id: WellKnownId, queue: QueueHandle) {
		let _guard = self.inner.lock.lock();
		let slot = self.slot(id);
		assert!(slot.load().is_none(), "well-known thread `{id}` is already registered");
		tracing::debug!(thread = %id, queue = queue.label(), "threads.register");
		slot.store(Some(Arc::new(Registration { queue })));
	}

	/// Removes the registration for `id`.
	///
	/// The owner must have stopped its queue first.
	///
	/// # Panics
	///
	/// In debug builds, panics if a higher-ordinal identifier is still registered.
	pub fn unregister(&self, id: WellKnownId) {
		let previous = {
			let _guard = self.inner.lock.lock();
			let previous = self.slot(id).swap(None);
			if cfg!(debug_assertions) && !std::thread::panicking() {
				for later in id.shuts_down_after() {
					assert!(
						self.slot(later).load().is_none(),
						"well-known threads must shut down in reverse declaration order: `{id}` unregistered while `{later}` is still registered"
					);
				}
			}
			previous
		};
		tracing::debug!(thread = %id, was_registered = previous.is_some(), "threads.unregister");
		// The last queue reference may go here, and its pending tasks with it.
		drop(previous);
	}

	/// Whether `id` currently has a registered queue.
	pub fn is_registered(&self, id: WellKnownId) -> bool {
		let _guard = self.inner.lock.lock();
		self.slot(id).load().is_some()
	}

	/// Whether the calling thread is running the queue registered for `id`.
	pub fn currently_on(&self, id: WellKnownId) -> bool {
		let Some(current) = queue::current() else {
			return false;
		};
		let _guard = self.inner.lock.lock();
		self.serves(id, &current)
	}

	/// Identifier served by the calling thread's current queue, if any.
	///
	/// Linear over a handful of slots. Slot reads are atomic loads, so this
	/// takes no lock.
	pub fn current_id(&self) -> Option<WellKnownId> {
		let current = queue::current()?;
		WellKnownId::ALL.into_iter().find(|id| self.serves(*id, &current))
	}

	/// Registered threads in ordinal order.
	pub fn snapshot(&self) -> Vec<RegistrationSnapshot> {
		let _guard = self.inner.lock.lock();
		WellKnownId::ALL
			.into_iter()
			.filter_map(|id| {
				self.slot(id).load_full().map(|registration| RegistrationSnapshot {
					id,
					queue: registration.queue.label().to_owned(),
				})
			})
			.collect()
	}

	fn serves(&self, id: WellKnownId, queue: &QueueHandle) -> bool {
		match &*self.slot(id).load() {
			Some(registration) => queue::same_queue(&registration.queue, queue),
			None => false,
		}
	}

	pub(crate) fn slot(&self, id: WellKnownId) -> &ArcSwapOption<Registration> {
		&self.inner.slots[id.ordinal()]
	}
}

/// Registration owned by the thread serving one identifier.
///
/// Registers on construction and unregisters on drop. Use it directly to
/// adopt a queue driven elsewhere, such as the main thread's loop.
#[must_use = "the identifier is unregistered as soon as the record drops"]
pub struct ThreadRecord {
	registry: ThreadRegistry,
	id: WellKnownId,
	queue: QueueHandle,
	shutdown: Option<Box<dyn FnOnce() + Send>>,
}

impl std::fmt::Debug for ThreadRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ThreadRecord")
			.field("id", &self.id)
			.field("queue", &self.queue.label())
			.finish()
	}
}

impl ThreadRecord {
	/// Registers `queue` as the queue serving `id`.
	///
	/// Dropping the record only unregisters. The caller must stop `queue`
	/// from accepting and running work before that, or use
	/// [`Self::adopt_loop`] to have the drop do it.
	///
	/// # Panics
	///
	/// Panics if `id` is already registered.
	pub fn new(registry: &ThreadRegistry, id: WellKnownId, queue: QueueHandle) -> Self {
		registry.register(id, Arc::clone(&queue));
		Self {
			registry: registry.clone(),
			id,
			queue,
			shutdown: None,
		}
	}

	/// Registers `message_loop` for `id` and shuts it down when the record drops.
	///
	/// The loop stops accepting work and drops its pending tasks before the
	/// identifier is unregistered.
	///
	/// # Panics
	///
	/// Panics if `id` is already registered.
	pub fn adopt_loop(registry: &ThreadRegistry, id: WellKnownId, message_loop: &Arc<MessageLoop>) -> Self {
		let mut record = Self::new(registry, id, message_loop.handle());
		let owned = Arc::clone(message_loop);
		record.shutdown = Some(Box::new(move || owned.shut_down()));
		record
	}

	/// Identifier this record serves.
	pub fn id(&self) -> WellKnownId {
		self.id
	}

	/// The registered queue.
	pub fn queue(&self) -> &QueueHandle {
		&self.queue
	}
}

impl Drop for ThreadRecord {
	fn drop(&mut self) {
		if let Some(shutdown) = self.shutdown.take() {
			shutdown();
		}
		self.registry.unregister(self.id);
	}
}
