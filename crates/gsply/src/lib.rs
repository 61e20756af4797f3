//! Codec for the fixed-schema Gaussian Splat point cloud format used by 3D
//! Gaussian Splatting pipelines: an uncompressed binary little-endian PLY
//! and a chunked, quantized PLY compatible with the PlayCanvas SuperSplat
//! encoding.
//!
//! [`read`]/[`write`] dispatch between the two wire formats via
//! [`probe::probe_file`]; [`bytes::compress_to_bytes`]/
//! [`bytes::decompress_from_bytes`] are the in-memory equivalents for the
//! chunked format.

pub mod bytes;
pub mod chunked;
pub mod consts;
pub mod container;
pub mod error;
pub mod header;
pub mod mmap;
pub mod numerics;
pub mod probe;
pub mod uncompressed;

pub mod prelude {
	pub use super::container::{FormatState, GsContainer, MaskMode, OpacityFormat, ScaleFormat, Sh0Format};
	pub use super::error::{GsplyError, Result};
	pub use super::probe::{FormatKind, ProbeResult};
	pub use super::{read, write};
}

use std::path::Path;

use error::Result;
use probe::FormatKind;

/// Reads a GS point cloud from `path`, probing the header to decide whether
/// it's the uncompressed or chunked wire format (§2's control flow).
pub fn read(path: impl AsRef<Path>) -> Result<container::GsContainer> {
	let path = path.as_ref();
	let probed = probe::probe_file(path)?;

	match probed.kind {
		FormatKind::Uncompressed => uncompressed::read(path),
		FormatKind::Chunked => chunked::read(path),
	}
}

/// Writes `container` to `path`, normalizing to PLY format-state first.
/// `compressed = true` selects the chunked/quantized codec; `false` selects
/// the uncompressed fixed-record codec.
pub fn write(path: impl AsRef<Path>, container: &mut container::GsContainer, compressed: bool) -> Result<()> {
	container.ensure_ply_state()?;

	if compressed {
		chunked::write(path, container)
	} else {
		uncompressed::write(path, container)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::container::{FormatState, OpacityFormat, ScaleFormat, Sh0Format};

	fn single_point() -> container::GsContainer {
		container::GsContainer::from_arrays(
			vec![1.0, 2.0, 3.0],
			vec![0.0, 0.0, 0.0],
			vec![1.0, 0.0, 0.0, 0.0],
			vec![0.0],
			vec![0.0, 0.0, 0.0],
			vec![],
			FormatState {
				scales: ScaleFormat::Log,
				opacities: OpacityFormat::Logit,
				sh0: Sh0Format::Sh,
			},
		)
		.unwrap()
	}

	#[test]
	fn test_write_then_read_uncompressed_dispatches_correctly() {
		let dir = std::env::temp_dir();
		let path = dir.join(format!("gsply_lib_test_uncompressed_{}.ply", std::process::id()));

		let mut c = single_point();
		write(&path, &mut c, false).unwrap();

		let loaded = read(&path).unwrap();
		std::fs::remove_file(&path).ok();

		assert_eq!(loaded.n(), 1);
		assert_eq!(loaded.means().row(0), [1.0, 2.0, 3.0]);
	}

	#[test]
	fn test_write_then_read_chunked_dispatches_correctly() {
		let dir = std::env::temp_dir();
		let path = dir.join(format!("gsply_lib_test_chunked_{}.ply", std::process::id()));

		let mut c = single_point();
		write(&path, &mut c, true).unwrap();

		let loaded = read(&path).unwrap();
		std::fs::remove_file(&path).ok();

		assert_eq!(loaded.n(), 1);
	}
}
