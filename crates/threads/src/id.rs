use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// Identifier of one well-known thread.
///
/// Declaration order is shutdown precedence: a thread is always torn down
/// before every thread with a lower ordinal, so [`WellKnownId::Ui`] is the last
/// to die. The dispatcher relies on this to skip locking when posting to a
/// thread that outlives the caller; new identifiers must be inserted where
/// their lifetime fits, not appended blindly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumCount, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum WellKnownId {
	/// The main thread. Its loop is driven by the embedder.
	Ui,
	/// Persistent storage access.
	Database,
	/// Helper work for renderer processes.
	RendererSupport,
	/// Blocking filesystem access.
	FileIo,
	/// Child process creation and teardown.
	ProcessLaunch,
	/// Sockets and IPC.
	NetworkIo,
	/// Display-server round trips. Only hosted on X11 platforms.
	BackgroundX11,
}

impl WellKnownId {
	/// Number of identifiers, i.e. the registry capacity.
	pub const COUNT: usize = <Self as EnumCount>::COUNT;

	/// Every identifier in ordinal order, usable in const contexts.
	///
	/// Matches [`strum::IntoEnumIterator::iter`].
	pub const ALL: [Self; Self::COUNT] = [
		Self::Ui,
		Self::Database,
		Self::RendererSupport,
		Self::FileIo,
		Self::ProcessLaunch,
		Self::NetworkIo,
		Self::BackgroundX11,
	];

	/// Position in the shutdown order.
	pub const fn ordinal(self) -> usize {
		self as usize
	}

	/// Looks up an identifier from an untyped ordinal.
	pub fn from_ordinal(ordinal: usize) -> Option<Self> {
		Self::ALL.get(ordinal).copied()
	}

	/// Stable label used in logs and config.
	pub fn as_str(self) -> &'static str {
		self.into()
	}

	/// Default OS thread name. `None` for the main thread, which the embedder names.
	pub const fn thread_name(self) -> Option<&'static str> {
		match self {
			Self::Ui => None,
			Self::Database => Some("xeno-db"),
			Self::RendererSupport => Some("xeno-renderer-support"),
			Self::FileIo => Some("xeno-file"),
			Self::ProcessLaunch => Some("xeno-process-launcher"),
			Self::NetworkIo => Some("xeno-io"),
			Self::BackgroundX11 => Some("xeno-background-x11"),
		}
	}

	/// Whether this platform hosts the thread at all.
	pub const fn is_supported(self) -> bool {
		match self {
			Self::BackgroundX11 => cfg!(all(unix, not(target_os = "macos"))),
			_ => true,
		}
	}

	/// Identifiers that must already be gone when `self` shuts down.
	pub fn shuts_down_after(self) -> impl Iterator<Item = Self> {
		Self::ALL.into_iter().skip(self.ordinal() + 1)
	}
}
