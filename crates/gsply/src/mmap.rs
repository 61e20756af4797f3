// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::{fs::File, io, path::Path};

use memmap2::Mmap;

/// Memory-maps a file for efficient read-only access.
#[inline]
pub fn mmap<F>(filepath: F) -> io::Result<Mmap>
where
	F: AsRef<Path>,
{
	let infile = File::open(&filepath)?;

	unsafe { Mmap::map(&infile) }
}

/// Memory-maps a byte range of a file for efficient read-only access.
#[inline]
pub fn mmap_range<F>(filepath: F, offset: usize, len: usize) -> io::Result<Mmap>
where
	F: AsRef<Path>,
{
	let infile = File::open(&filepath)?;

	unsafe {
		memmap2::MmapOptions::new()
			.offset(offset as u64)
			.len(len)
			.map(&infile)
	}
}

/// Memory-maps at most `max_len` bytes from the start of the file, clamped
/// to the file's actual length. Used by the format probe (§4.3), which only
/// needs a bounded prefix.
pub fn mmap_prefix<F>(filepath: F, max_len: usize) -> io::Result<Mmap>
where
	F: AsRef<Path>,
{
	let infile = File::open(&filepath)?;
	let file_len = infile.metadata()?.len() as usize;
	let len = max_len.min(file_len);

	unsafe { memmap2::MmapOptions::new().offset(0).len(len).map(&infile) }
}
