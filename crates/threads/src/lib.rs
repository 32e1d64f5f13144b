//! Well-known threads and cross-thread task dispatch.
//!
//! A small, fixed set of named threads each run one single-threaded
//! [`MessageLoop`]. Any thread can post work to any of them by
//! [`WellKnownId`] through a shared [`ThreadRegistry`], without holding a
//! reference to the target:
//! * [`ThreadRegistry`]: identifier to queue table plus the `post_*` family
//! * [`WellKnownThread`]: hosts one identifier on a dedicated OS thread
//! * [`ThreadRecord`]: registers a queue driven elsewhere, such as the main loop
//! * [`ThreadProxy`]: a [`TaskRunner`] bound to one identifier
//!
//! Threads must shut down in reverse declaration order of [`WellKnownId`].
//! Posting to a thread that is not running is not an error: the task is
//! dropped and the call returns false.

#![warn(missing_docs)]

mod dispatch;
mod error;
mod id;
pub mod message_loop;
mod proxy;
pub mod queue;
mod registry;
mod task;
mod thread;

pub use error::ThreadError;
pub use id::WellKnownId;
pub use message_loop::MessageLoop;
pub use proxy::{TaskRunner, ThreadProxy};
pub use queue::{QueueHandle, TaskQueue};
pub use registry::{RegistrationSnapshot, ThreadRecord, ThreadRegistry};
pub use task::{Nesting, Task};
pub use thread::{ThreadSpec, WellKnownThread};
