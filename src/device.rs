//! A thin positioned-I/O wrapper around the host image file.
//!
//! Mirrors `ext2.rs`'s pattern of `seek` + `read_exact`/`write_all` at a
//! fixed offset rather than reaching for `FileExt::read_at`/`write_at`:
//! the image is accessed strictly sequentially within one call, so a
//! `Seek` + `Read`/`Write` device is all the device adapter needs, and it
//! keeps the adapter generic over anything that implements those traits
//! (not just a real `File`) for testing.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Positioned read/write of fixed-size regions against the mounted image.
///
/// A short read or write is reported as an [`io::Error`] (via
/// `read_exact`/`write_all`'s `UnexpectedEof`/`WriteZero` kinds) rather than
/// silently returning a partial count, so callers can treat any `Err` here
/// as an unrecoverable condition.
pub struct ImageDevice<D> {
	inner: D,
}

impl<D: Read + Write + Seek> ImageDevice<D> {
	pub fn new(inner: D) -> Self {
		Self { inner }
	}

	/// Reads exactly `buf.len()` bytes starting at `offset`.
	pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		self.inner.seek(SeekFrom::Start(offset))?;
		self.inner.read_exact(buf)
	}

	/// Writes all of `buf` starting at `offset`.
	pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
		self.inner.seek(SeekFrom::Start(offset))?;
		self.inner.write_all(buf)
	}

	/// Gives back the wrapped device, e.g. to close the file on unmount.
	pub fn into_inner(self) -> D {
		self.inner
	}
}
