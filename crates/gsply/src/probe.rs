// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Format detection (C3): is a file the uncompressed fixed-record PLY or the
//! chunked/quantized PLY, and (for the uncompressed path) what SH degree.
//!
//! Grounded in the donor's `MultiDecoder`-style magic sniffing
//! (`decoder.rs` in the retrieval pack's `spark-lib`), adapted to this
//! format's textual header rather than a binary magic number.

use std::path::Path;

use crate::error::{GsplyError, Result};
use crate::header::{PlyHeader, PROBE_WINDOW};
use crate::mmap;
use crate::numerics;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatKind {
	Uncompressed,
	Chunked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeResult {
	pub kind: FormatKind,
	/// SH degree, when it can be inferred from the header alone. Always
	/// `Some` for the uncompressed path; `None` for the chunked path, since
	/// degree isn't recoverable from the header (§4.3).
	pub degree: Option<u8>,
	pub header_len: usize,
}

const CHUNK_ELEMENT_MIN_PROPERTIES: usize = 18;

/// Classifies the header found at the start of `bytes`, which must contain
/// at least the header (callers typically pass [`PROBE_WINDOW`] bytes read
/// from the start of the file via [`probe_file`]).
pub fn probe_bytes(bytes: &[u8]) -> Result<ProbeResult> {
	let header = PlyHeader::parse(bytes)?;

	let has_chunk_element = header
		.element("chunk")
		.map(|e| e.properties.len() >= CHUNK_ELEMENT_MIN_PROPERTIES)
		.unwrap_or(false);

	if has_chunk_element {
		let vertex = header
			.element("vertex")
			.ok_or_else(|| GsplyError::HeaderMalformed("chunked header missing vertex element".into()))?;
		let expected = ["packed_position", "packed_rotation", "packed_scale", "packed_color"];
		let has_all = expected.iter().all(|name| vertex.property(name).is_some());

		if !has_all {
			return Err(GsplyError::HeaderMalformed(
				"chunk element present but vertex element lacks the packed_* properties".into(),
			));
		}

		return Ok(ProbeResult {
			kind: FormatKind::Chunked,
			degree: None,
			header_len: header.header_len,
		});
	}

	let vertex = header
		.element("vertex")
		.ok_or_else(|| GsplyError::HeaderMalformed("header declares no vertex element".into()))?;

	if header.elements.len() != 1 {
		return Err(GsplyError::HeaderMalformed(
			"uncompressed header must declare exactly one element (vertex)".into(),
		));
	}

	let p = vertex.properties.len();
	let degree = numerics::degree_for_property_count(p)
		.ok_or_else(|| GsplyError::UnsupportedSchema(format!("vertex property count {p} not in {{14,23,38,59}}")))?;

	Ok(ProbeResult {
		kind: FormatKind::Uncompressed,
		degree: Some(degree),
		header_len: header.header_len,
	})
}

/// Reads a bounded prefix of `path` and classifies it.
pub fn probe_file(path: impl AsRef<Path>) -> Result<ProbeResult> {
	let prefix = mmap::mmap_prefix(path, PROBE_WINDOW)?;

	probe_bytes(&prefix)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_probe_uncompressed_degree0() {
		let bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nproperty float f_dc_0\nproperty float f_dc_1\nproperty float f_dc_2\nproperty float opacity\nproperty float scale_0\nproperty float scale_1\nproperty float scale_2\nproperty float rot_0\nproperty float rot_1\nproperty float rot_2\nproperty float rot_3\nend_header\n";
		let result = probe_bytes(bytes).unwrap();

		assert_eq!(result.kind, FormatKind::Uncompressed);
		assert_eq!(result.degree, Some(0));
	}

	#[test]
	fn test_probe_uncompressed_wrong_property_count_is_unsupported_schema() {
		let bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 1\nproperty float x\nproperty float y\nend_header\n";
		let err = probe_bytes(bytes).unwrap_err();

		assert!(matches!(err, GsplyError::UnsupportedSchema(_)));
	}

	#[test]
	fn test_probe_chunked() {
		let mut bytes = b"ply\nformat binary_little_endian 1.0\nelement chunk 1\n".to_vec();
		for name in ["min_x", "min_y", "min_z", "max_x", "max_y", "max_z", "min_scale_x", "min_scale_y", "min_scale_z", "max_scale_x", "max_scale_y", "max_scale_z", "min_r", "min_g", "min_b", "max_r", "max_g", "max_b"] {
			bytes.extend_from_slice(format!("property float {name}\n").as_bytes());
		}
		bytes.extend_from_slice(b"element vertex 256\nproperty uint packed_position\nproperty uint packed_rotation\nproperty uint packed_scale\nproperty uint packed_color\nend_header\n");

		let result = probe_bytes(&bytes).unwrap();

		assert_eq!(result.kind, FormatKind::Chunked);
		assert_eq!(result.degree, None);
	}
}
