//! A minimal, single-volume, flat file system backed by one fixed-size
//! image file.
//!
//! The crate exposes seven entry points — [`format`], [`mount`],
//! [`unmount`], [`create`], [`delete`], [`list`], [`write`], [`read`] —
//! sharing one process-wide [`Volume`] behind a mutex. There is no
//! directory hierarchy, no permissions, no links, and no concurrent
//! multi-process access.
//!
//! The [`volume`] module exposes the same operations as methods on a
//! standalone, independently mountable [`Volume`] for callers (and tests)
//! that would rather not go through the global singleton.

mod bitmap;
mod device;
mod error;
mod inode;
mod superblock;
mod util;
pub mod volume;

use std::fs::File;
use std::sync::{Mutex, MutexGuard, OnceLock};

pub use error::FsError;
pub use superblock::{
	BLOCK_SIZE, MAX_BLOCKS, MAX_DIRECT_BLOCKS, MAX_FILENAME, MAX_FILE_SIZE, MAX_FILES,
};
pub use volume::Volume;

fn singleton() -> &'static Mutex<Option<Volume<File>>> {
	static VOLUME: OnceLock<Mutex<Option<Volume<File>>>> = OnceLock::new();
	VOLUME.get_or_init(|| Mutex::new(None))
}

/// Locks the singleton, recovering the guard from a poisoned mutex instead
/// of panicking: a panic inside one call must not take down every
/// subsequent call in the process.
fn lock_singleton() -> MutexGuard<'static, Option<Volume<File>>> {
	singleton().lock().unwrap_or_else(|e| e.into_inner())
}

/// Creates or truncates the image file at `path` and writes a fresh,
/// empty volume onto it. Fails (returns `-3`) if `path` is empty or a
/// volume is already mounted in this process; never leaves the volume
/// mounted on success.
pub fn format(path: &str) -> i32 {
	let guard = lock_singleton();
	if guard.is_some() {
		return FsError::Invalid.code();
	}
	drop(guard);
	match Volume::format(path) {
		Ok(()) => 0,
		Err(e) => e.code(),
	}
}

/// Mounts the image file at `path`, loading its superblock, bitmap and
/// inode table into memory. Fails (returns `-3`) if a volume is already
/// mounted, or the image cannot be opened or fails validation.
pub fn mount(path: &str) -> i32 {
	let mut guard = lock_singleton();
	if guard.is_some() {
		return FsError::Invalid.code();
	}
	match Volume::mount(path) {
		Ok(volume) => {
			*guard = Some(volume);
			0
		}
		Err(e) => e.code(),
	}
}

/// Flushes metadata and closes the image. Idempotent: a second call (or
/// a call while unmounted) is a silent no-op. Never fails.
pub fn unmount() {
	let mut guard = lock_singleton();
	if let Some(volume) = guard.take() {
		volume.unmount();
	}
}

/// Creates an empty file named `name`. See [`FsError`] for the meaning of
/// a negative return.
pub fn create(name: &str) -> i32 {
	with_mounted(|volume| volume.create(name.as_bytes()).map(|()| 0))
}

/// Deletes the file named `name`, freeing its data blocks.
pub fn delete(name: &str) -> i32 {
	with_mounted(|volume| volume.delete(name.as_bytes()).map(|()| 0))
}

/// Writes up to `max` used file names into `buffer`. Returns the number
/// of names written, or a negative error code.
pub fn list(buffer: &mut [[u8; MAX_FILENAME + 1]], max: i32) -> i32 {
	let mut guard = lock_singleton();
	match guard.as_mut() {
		Some(volume) => match volume.list(buffer, max) {
			Ok(n) => n,
			Err(e) => e.code(),
		},
		None => {
			if max == 0 {
				0
			} else {
				FsError::Invalid.code()
			}
		}
	}
}

/// Replaces the entire content of file `name` with `data`.
pub fn write(name: &str, data: &[u8]) -> i32 {
	with_mounted(|volume| match volume.write(name.as_bytes(), data) {
		Ok(()) => Ok(0),
		Err(e) => Err(e),
	})
}

/// Reads up to `buffer.len()` bytes from file `name` into `buffer`.
/// Returns the number of bytes actually delivered, or a negative error
/// code.
pub fn read(name: &str, buffer: &mut [u8]) -> i32 {
	with_mounted(|volume| volume.read(name.as_bytes(), buffer))
}

/// Runs `op` against the mounted volume, or returns `-3` ("unmounted")
/// if there isn't one.
fn with_mounted(op: impl FnOnce(&mut Volume<File>) -> Result<i32, FsError>) -> i32 {
	let mut guard = lock_singleton();
	match guard.as_mut() {
		Some(volume) => match op(volume) {
			Ok(n) => n,
			Err(e) => e.code(),
		},
		None => FsError::Invalid.code(),
	}
}
