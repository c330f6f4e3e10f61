//! Lifecycle (format/mount/unmount) and file-level operations
//! (create/delete/list/write/read), all operating on one in-memory
//! [`Volume`]: the superblock, bitmap and inode table mirrors plus the
//! open image device.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};

use crate::bitmap::Bitmap;
use crate::device::ImageDevice;
use crate::error::FsError;
use crate::inode::{Inode, InodeTable, UNALLOCATED};
use crate::superblock::{
	Superblock, BITMAP_OFFSET, BLOCK_SIZE, DATA_REGION_OFFSET, IMAGE_SIZE, INODE_TABLE_OFFSET,
	MAX_BLOCKS, MAX_DIRECT_BLOCKS, MAX_FILENAME, MAX_FILES, SUPERBLOCK_OFFSET,
};
use crate::util::reinterpret_mut;

/// A mounted volume: the in-memory mirrors of the superblock, bitmap and
/// inode table, plus the open image device. Its presence (as opposed to
/// absence) is what "mounted" means — see `lib.rs`'s `Mutex<Option<Volume>>`
/// singleton.
pub struct Volume<D: Read + Write + Seek> {
	device: ImageDevice<D>,
	superblock: Superblock,
	bitmap: Bitmap,
	inodes: InodeTable,
}

fn block_offset(index: i32) -> u64 {
	index as u64 * BLOCK_SIZE as u64
}

impl Volume<File> {
	/// Creates or truncates the image file at `path` and initializes a
	/// fresh volume on it. Does not leave the volume mounted: the handle
	/// is dropped at the end of this call.
	pub fn format(path: &str) -> Result<(), FsError> {
		if path.is_empty() {
			return Err(FsError::Invalid);
		}
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(true)
			.open(path)
			.map_err(|_| FsError::Invalid)?;
		file.set_len(IMAGE_SIZE).map_err(|_| FsError::Invalid)?;
		let mut volume = Self::new_formatted(file).map_err(FsError::from)?;
		volume.sync_metadata().map_err(FsError::from)?;
		Ok(())
	}

	/// Opens the image file at `path` and loads the superblock, bitmap and
	/// inode table into memory.
	pub fn mount(path: &str) -> Result<Self, FsError> {
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.open(path)
			.map_err(|_| FsError::Invalid)?;
		Self::load(file)
	}
}

impl<D: Read + Write + Seek> Volume<D> {
	/// Builds a freshly formatted in-memory volume over `device`, without
	/// writing anything yet (the caller syncs once geometry is settled).
	fn new_formatted(device: D) -> io::Result<Self> {
		Ok(Self {
			device: ImageDevice::new(device),
			superblock: Superblock::formatted(),
			bitmap: Bitmap::formatted(),
			inodes: InodeTable::formatted(),
		})
	}

	/// Reads the superblock, bitmap and inode table off an already-open
	/// device and validates geometry.
	fn load(device: D) -> Result<Self, FsError> {
		let mut image = ImageDevice::new(device);

		let mut superblock = Superblock {
			total_blocks: 0,
			block_size: 0,
			free_blocks: 0,
			total_inodes: 0,
			free_inodes: 0,
		};
		image
			.read_at(SUPERBLOCK_OFFSET, reinterpret_mut(&mut superblock))
			.map_err(|_| FsError::Invalid)?;
		superblock.validate()?;

		let mut bitmap_bytes = [0u8; BLOCK_SIZE];
		image
			.read_at(BITMAP_OFFSET, &mut bitmap_bytes)
			.map_err(|_| FsError::Invalid)?;
		let bitmap = Bitmap::from_bytes(bitmap_bytes);

		let mut entries = [Inode::empty(); MAX_FILES];
		image
			.read_at(INODE_TABLE_OFFSET, reinterpret_mut(&mut entries))
			.map_err(|_| FsError::Invalid)?;
		let inodes = InodeTable::from_entries(entries);

		Ok(Self {
			device: image,
			superblock,
			bitmap,
			inodes,
		})
	}

	/// Writes the superblock, bitmap and inode table back to their fixed
	/// offsets. Invoked at the tail of every mutating operation and from
	/// `unmount`, so a clean process exit after a successful call leaves
	/// the image consistent without an explicit unmount.
	pub fn sync_metadata(&mut self) -> io::Result<()> {
		self.device
			.write_at(SUPERBLOCK_OFFSET, self.superblock.as_bytes())?;
		self.device.write_at(BITMAP_OFFSET, self.bitmap.as_bytes())?;
		self.device
			.write_at(INODE_TABLE_OFFSET, self.inodes.as_bytes())?;
		Ok(())
	}

	/// Flushes metadata and drops the device. Never fails: a failed flush
	/// is swallowed here, the same as `fs_unmount`'s `perror`-and-continue
	/// in the reference, just routed through a real `io::Result` first.
	pub fn unmount(mut self) {
		let _ = self.sync_metadata();
	}

	fn validate_name(name: &[u8]) -> Result<(), FsError> {
		if name.is_empty() || name.len() > MAX_FILENAME {
			Err(FsError::Invalid)
		} else {
			Ok(())
		}
	}

	/// Creates an empty file named `name`.
	pub fn create(&mut self, name: &[u8]) -> Result<(), FsError> {
		Self::validate_name(name)?;
		if self.inodes.find_by_name(name).is_some() {
			return Err(FsError::NotFoundOrExists);
		}
		if self.superblock.free_inodes == 0 {
			return Err(FsError::Exhausted);
		}
		let slot = self.inodes.find_free().ok_or(FsError::Exhausted)?;
		let delta = self.inodes.write_inode(slot, Inode::new_file(name));
		self.superblock.free_inodes += delta;
		self.sync_metadata()?;
		Ok(())
	}

	/// Deletes the file named `name`, freeing its data blocks.
	///
	/// Per `fs_delete`, an invalid name and a missing file share the same
	/// `-1` code rather than `-3` — ABI overloading that is part of the
	/// contract, not a bug to fix.
	pub fn delete(&mut self, name: &[u8]) -> Result<(), FsError> {
		if name.is_empty() || name.len() > MAX_FILENAME {
			return Err(FsError::NotFoundOrExists);
		}
		let slot = self
			.inodes
			.find_by_name(name)
			.ok_or(FsError::NotFoundOrExists)?;
		let inode = *self.inodes.get(slot);
		for &block in inode.blocks.iter() {
			if block != UNALLOCATED {
				self.superblock.free_blocks += self.bitmap.mark_free(block as usize);
			}
		}
		let delta = self.inodes.write_inode(slot, Inode::empty());
		self.superblock.free_inodes += delta;
		self.sync_metadata()?;
		Ok(())
	}

	/// Writes up to `max` used file names into `buffer`, one per row,
	/// null-terminated unless the name fills all 28 bytes. Returns the
	/// number of names written.
	pub fn list(&mut self, buffer: &mut [[u8; MAX_FILENAME + 1]], max: i32) -> Result<i32, FsError> {
		if max == 0 {
			return Ok(0);
		}
		if max < 0 || max as usize > MAX_FILES {
			return Err(FsError::NotFoundOrExists);
		}
		let limit = (max as usize).min(buffer.len()).min(MAX_FILES);
		let mut count = 0;
		for slot in 0..MAX_FILES {
			if count >= limit {
				break;
			}
			let inode = self.inodes.get(slot);
			if inode.used != 1 {
				continue;
			}
			let name = inode.name_bytes();
			let row = &mut buffer[count];
			*row = [0u8; MAX_FILENAME + 1];
			row[..name.len()].copy_from_slice(name);
			count += 1;
		}
		Ok(count as i32)
	}

	/// Replaces the file's entire content with `data`, atomically: the new
	/// blocks are allocated and written before the inode is swapped, and
	/// the old blocks are only freed once the swap has landed. Check order
	/// follows `fs_write`'s literal sequence: not-found (-1), then
	/// insufficient free blocks (-2), then oversize (-3) — a write against a
	/// missing file never reaches the size checks at all.
	pub fn write(&mut self, name: &[u8], data: &[u8]) -> Result<(), FsError> {
		Self::validate_name(name)?;
		let slot = self
			.inodes
			.find_by_name(name)
			.ok_or(FsError::NotFoundOrExists)?;

		let blocks_needed = crate::util::ceil_division(data.len() as u32, BLOCK_SIZE as u32) as usize;
		if blocks_needed as i32 > self.superblock.free_blocks {
			return Err(FsError::Exhausted);
		}
		if blocks_needed > MAX_DIRECT_BLOCKS {
			return Err(FsError::Invalid);
		}

		let original = *self.inodes.get(slot);

		let mut new_blocks = Vec::with_capacity(blocks_needed);
		for _ in 0..blocks_needed {
			match self.bitmap.find_free() {
				Some(index) => {
					self.superblock.free_blocks += self.bitmap.mark_used(index);
					new_blocks.push(index as i32);
				}
				None => {
					self.rollback_allocation(&new_blocks);
					return Err(FsError::Exhausted);
				}
			}
		}

		for (i, &block) in new_blocks.iter().enumerate() {
			let start = i * BLOCK_SIZE;
			let end = (start + BLOCK_SIZE).min(data.len());
			let chunk = &data[start..end];
			if let Err(e) = self.device.write_at(block_offset(block), chunk) {
				self.rollback_allocation(&new_blocks);
				return Err(if e.kind() == io::ErrorKind::WriteZero {
					FsError::Exhausted
				} else {
					FsError::Invalid
				});
			}
		}

		let mut blocks = [UNALLOCATED; MAX_DIRECT_BLOCKS];
		blocks[..blocks_needed].copy_from_slice(&new_blocks);
		let mut updated = original;
		updated.blocks = blocks;
		updated.size = data.len() as i32;
		let delta = self.inodes.write_inode(slot, updated);
		self.superblock.free_inodes += delta;

		for &block in original.blocks.iter() {
			if block != UNALLOCATED {
				self.superblock.free_blocks += self.bitmap.mark_free(block as usize);
			}
		}

		self.sync_metadata()?;
		Ok(())
	}

	fn rollback_allocation(&mut self, new_blocks: &[i32]) {
		for &block in new_blocks {
			self.superblock.free_blocks += self.bitmap.mark_free(block as usize);
		}
	}

	/// Copies up to `min(buffer.len(), file size)` bytes from `name`'s
	/// data blocks into `buffer`, in order, stopping early if a sentinel
	/// slot is reached before the requested length is satisfied.
	pub fn read(&mut self, name: &[u8], buffer: &mut [u8]) -> Result<i32, FsError> {
		Self::validate_name(name)?;
		let slot = self
			.inodes
			.find_by_name(name)
			.ok_or(FsError::NotFoundOrExists)?;
		let inode = *self.inodes.get(slot);

		let want = buffer.len().min(inode.size.max(0) as usize);
		let mut read_so_far = 0usize;
		for &block in inode.blocks.iter() {
			if read_so_far >= want {
				break;
			}
			if block == UNALLOCATED {
				break;
			}
			if block < 0 || block as usize >= MAX_BLOCKS {
				return Err(FsError::Invalid);
			}
			let remaining = want - read_so_far;
			let chunk_len = remaining.min(BLOCK_SIZE);
			let dest = &mut buffer[read_so_far..read_so_far + chunk_len];
			self.device
				.read_at(block_offset(block), dest)
				.map_err(|_| FsError::Invalid)?;
			read_so_far += chunk_len;
		}
		Ok(read_so_far as i32)
	}
}

/// Sanity check referenced by `lib.rs`: the data region begins right
/// after the reserved metadata blocks.
#[allow(dead_code)]
const fn _data_region_starts_after_reserved() -> bool {
	DATA_REGION_OFFSET as usize == 10 * BLOCK_SIZE
}
