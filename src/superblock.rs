//! Volume geometry constants and the on-disk superblock record.

use crate::error::FsError;
use crate::util::reinterpret;

/// The size of a data block, in bytes.
pub const BLOCK_SIZE: usize = 4096;
/// The total number of blocks in the volume's address space, including the
/// 10 reserved metadata blocks.
pub const MAX_BLOCKS: usize = 2560;
/// The size of the inode table, in entries.
pub const MAX_FILES: usize = 256;
/// The maximum length of a file name, in bytes.
pub const MAX_FILENAME: usize = 28;
/// The number of direct block pointers held by one inode.
pub const MAX_DIRECT_BLOCKS: usize = 12;
/// The number of blocks reserved for volume metadata: block 0 (superblock),
/// block 1 (free-block bitmap), blocks 2–9 (inode table).
pub const RESERVED_BLOCKS: usize = 10;
/// The largest size a single file may hold.
pub const MAX_FILE_SIZE: usize = MAX_DIRECT_BLOCKS * BLOCK_SIZE;

/// Byte offset of the superblock region.
pub const SUPERBLOCK_OFFSET: u64 = 0;
/// Byte offset of the free-block bitmap region.
pub const BITMAP_OFFSET: u64 = BLOCK_SIZE as u64;
/// Byte offset of the inode table region.
pub const INODE_TABLE_OFFSET: u64 = 2 * BLOCK_SIZE as u64;
/// Byte offset of the first data block (block index [`RESERVED_BLOCKS`]).
pub const DATA_REGION_OFFSET: u64 = RESERVED_BLOCKS as u64 * BLOCK_SIZE as u64;
/// The total size of the image file, in bytes.
pub const IMAGE_SIZE: u64 = MAX_BLOCKS as u64 * BLOCK_SIZE as u64;

/// The on-disk superblock record.
///
/// Counters are authoritative metadata: they must always equal the
/// population obtained by scanning the bitmap and the inode table.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
	pub total_blocks: i32,
	pub block_size: i32,
	pub free_blocks: i32,
	pub total_inodes: i32,
	pub free_inodes: i32,
}

impl Superblock {
	/// Builds the superblock for a freshly formatted volume: all reserved
	/// blocks accounted for, every inode free.
	pub fn formatted() -> Self {
		Self {
			total_blocks: MAX_BLOCKS as i32,
			block_size: BLOCK_SIZE as i32,
			free_blocks: (MAX_BLOCKS - RESERVED_BLOCKS) as i32,
			total_inodes: MAX_FILES as i32,
			free_inodes: MAX_FILES as i32,
		}
	}

	/// Validates the geometry fields read back from a mounted image,
	/// mirroring `fs_mount`'s range checks exactly: no stricter
	/// cross-checking against the bitmap's popcount is performed.
	pub fn validate(&self) -> Result<(), FsError> {
		let blocks_in_range = (0..=MAX_BLOCKS as i32).contains(&self.free_blocks);
		let inodes_in_range = (0..=MAX_FILES as i32).contains(&self.free_inodes);
		if self.total_blocks == MAX_BLOCKS as i32
			&& self.block_size == BLOCK_SIZE as i32
			&& self.total_inodes == MAX_FILES as i32
			&& blocks_in_range
			&& inodes_in_range
		{
			Ok(())
		} else {
			Err(FsError::Invalid)
		}
	}

	/// Returns the raw bytes to write at [`SUPERBLOCK_OFFSET`].
	pub fn as_bytes(&self) -> &[u8] {
		reinterpret(self)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn formatted_matches_geometry() {
		let sb = Superblock::formatted();
		assert_eq!(sb.total_blocks, MAX_BLOCKS as i32);
		assert_eq!(sb.block_size, BLOCK_SIZE as i32);
		assert_eq!(sb.total_inodes, MAX_FILES as i32);
		assert_eq!(sb.free_inodes, MAX_FILES as i32);
		assert_eq!(sb.free_blocks, (MAX_BLOCKS - RESERVED_BLOCKS) as i32);
		assert!(sb.validate().is_ok());
	}

	#[test]
	fn validate_rejects_bad_geometry() {
		let mut sb = Superblock::formatted();
		sb.total_blocks = 1;
		assert_eq!(sb.validate(), Err(FsError::Invalid));

		let mut sb = Superblock::formatted();
		sb.free_blocks = -1;
		assert_eq!(sb.validate(), Err(FsError::Invalid));

		let mut sb = Superblock::formatted();
		sb.free_inodes = MAX_FILES as i32 + 1;
		assert_eq!(sb.validate(), Err(FsError::Invalid));
	}

	#[test]
	fn layout_offsets_are_disjoint_and_ordered() {
		assert!(SUPERBLOCK_OFFSET < BITMAP_OFFSET);
		assert!(BITMAP_OFFSET < INODE_TABLE_OFFSET);
		assert!(INODE_TABLE_OFFSET < DATA_REGION_OFFSET);
		assert_eq!(DATA_REGION_OFFSET, RESERVED_BLOCKS as u64 * BLOCK_SIZE as u64);
	}
}
