//! The crate's error taxonomy.
//!
//! The public API is bound by an existing ABI: every mutating operation
//! reports failure as one of three small negative integers. [`FsError`]
//! keeps that mapping internal and tagged; [`FsError::code`] is the only
//! place the `-1`/`-2`/`-3` values are spelled out.

/// A failure from one of the crate's public entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FsError {
	/// Target entity not found, or an "already exists" conflict.
	NotFoundOrExists = -1,
	/// Resource exhaustion: no free inode, or not enough free blocks.
	Exhausted = -2,
	/// Invalid argument, unmounted volume, or underlying device error.
	Invalid = -3,
}

impl FsError {
	/// Returns the ABI-stable error code.
	pub fn code(self) -> i32 {
		self as i32
	}
}

impl From<FsError> for i32 {
	fn from(e: FsError) -> i32 {
		e.code()
	}
}

/// A device I/O error during a mutating operation always surfaces as
/// [`FsError::Invalid`], matching `fs_write`'s C behaviour of returning
/// `-3` on a failed `write()`.
impl From<std::io::Error> for FsError {
	fn from(_: std::io::Error) -> Self {
		FsError::Invalid
	}
}
