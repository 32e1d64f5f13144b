//! Errors from starting and stopping well-known threads.

use std::any::Any;

use thiserror::Error;

use crate::id::WellKnownId;

/// Failure while hosting a well-known thread.
#[derive(Debug, Error)]
pub enum ThreadError {
	/// The OS refused to create the thread.
	#[error("failed to spawn thread for `{id}`: {source}")]
	Spawn {
		/// Identifier the thread would have served.
		id: WellKnownId,
		/// Underlying spawn error.
		#[source]
		source: std::io::Error,
	},

	/// The identifier has no thread on this platform.
	#[error("`{0}` is not hosted on this platform")]
	Unsupported(WellKnownId),

	/// The thread's loop panicked.
	#[error("thread for `{id}` panicked: {}", .message.as_deref().unwrap_or("<non-string payload>"))]
	Panicked {
		/// Identifier the thread served.
		id: WellKnownId,
		/// Panic message, when the payload was a string.
		message: Option<String>,
	},
}

/// Extracts the message from a panic payload, if it is a string.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		return Some((*message).to_owned());
	}
	payload.downcast_ref::<String>().cloned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_static_str_payload() {
		let payload = std::thread::spawn(|| panic!("boom-str")).join().unwrap_err();
		let message = panic_message(payload.as_ref()).expect("string payload");
		assert!(message.contains("boom-str"), "got: {message}");
	}

	#[test]
	fn extracts_string_payload() {
		let payload = std::thread::spawn(|| panic!("{}", String::from("boom-string"))).join().unwrap_err();
		let message = panic_message(payload.as_ref()).expect("string payload");
		assert!(message.contains("boom-string"), "got: {message}");
	}

	#[test]
	fn other_payloads_have_no_message() {
		let payload = std::thread::spawn(|| std::panic::panic_any(7_u32)).join().unwrap_err();
		assert!(panic_message(payload.as_ref()).is_none());
	}

	#[test]
	fn panicked_display_falls_back_for_opaque_payloads() {
		let err = ThreadError::Panicked {
			id: WellKnownId::FileIo,
			message: None,
		};
		assert_eq!(err.to_string(), "thread for `file_io` panicked: <non-string payload>");
	}
}
