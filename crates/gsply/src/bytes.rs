// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Byte-level API (C6): assemble or parse a complete chunked PLY file in
//! memory, with no filesystem I/O. [`crate::chunked::read`]/`write` are thin
//! wrappers over this module plus [`crate::mmap`]/[`std::fs::write`].
//!
//! Grounded in the donor's `gaussian_splat.rs` `serialize_as_packed_bytes`/
//! `load_packed` pair (pack to an owned buffer, parse from a borrowed one),
//! adapted to this format's textual PLY header instead of the donor's binary
//! `#[repr(C)]` one.

use tracing::debug;

use crate::chunked::bounds::ChunkBounds;
use crate::chunked::{self, EncodedParts};
use crate::consts::CHUNK_SIZE;
use crate::container::GsContainer;
use crate::error::{GsplyError, Result};
use crate::header::{self, PlyHeader};
use crate::numerics;

const CHUNK_PROPERTY_NAMES: [&str; 18] = [
	"min_x",
	"min_y",
	"min_z",
	"max_x",
	"max_y",
	"max_z",
	"min_scale_x",
	"min_scale_y",
	"min_scale_z",
	"max_scale_x",
	"max_scale_y",
	"max_scale_z",
	"min_r",
	"min_g",
	"min_b",
	"max_r",
	"max_g",
	"max_b",
];

const PACKED_PROPERTY_NAMES: [&str; 4] = ["packed_position", "packed_rotation", "packed_scale", "packed_color"];

fn write_chunked_header(out: &mut Vec<u8>, n: usize, c: usize, degree: u8, sh_min: &[f32], sh_max: &[f32]) {
	let k = numerics::bands_for_degree(degree).unwrap_or(0);

	header::write_header(out, |out| {
		out.extend_from_slice(format!("element chunk {c}\n").as_bytes());
		for name in CHUNK_PROPERTY_NAMES {
			out.extend_from_slice(format!("property float {name}\n").as_bytes());
		}
		out.extend_from_slice(format!("element vertex {n}\n").as_bytes());
		for name in PACKED_PROPERTY_NAMES {
			out.extend_from_slice(format!("property uint {name}\n").as_bytes());
		}
		if k > 0 {
			out.extend_from_slice(format!("element sh {n}\n").as_bytes());
			for i in 0..3 * k {
				out.extend_from_slice(format!("property uchar f_rest_{i}\n").as_bytes());
			}
			// One (min,max) pair per coefficient column (§4.5's "per-coefficient
			// globally"), not one pair shared across all 3K columns.
			for (i, v) in sh_min.iter().enumerate() {
				out.extend_from_slice(format!("comment gsply sh_min_{i} {v}\n").as_bytes());
			}
			for (i, v) in sh_max.iter().enumerate() {
				out.extend_from_slice(format!("comment gsply sh_max_{i} {v}\n").as_bytes());
			}
		}
	});
}

fn bounds_to_bytes(bounds: &[ChunkBounds]) -> Vec<u8> {
	let mut out = Vec::with_capacity(bounds.len() * 18 * 4);

	for b in bounds {
		for v in b.to_flat() {
			out.extend_from_slice(&v.to_le_bytes());
		}
	}
	out
}

fn packed_to_bytes(packed: &[u32]) -> Vec<u8> {
	let mut out = Vec::with_capacity(packed.len() * 4);

	for w in packed {
		out.extend_from_slice(&w.to_le_bytes());
	}
	out
}

/// Splits `encode`'s output into the four pieces a caller might want to
/// assemble by hand: header bytes, the flattened `(C,18)` bounds as raw
/// little-endian f32 bytes, the `(N,4)` packed words as raw little-endian
/// u32 bytes, and the optional `(N,3K)` SH bytes.
pub fn compress_to_parts(container: &mut GsContainer) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>, Option<Vec<u8>>)> {
	let parts = chunked::encode(container)?;
	let c = parts.bounds.len();

	debug!(n = parts.n, chunks = c, degree = parts.degree, "chunked encode: emitting parts");

	let mut header_bytes = Vec::with_capacity(512);
	write_chunked_header(&mut header_bytes, parts.n, c, parts.degree, &parts.sh_min, &parts.sh_max);

	let bounds_bytes = bounds_to_bytes(&parts.bounds);
	let packed_bytes = packed_to_bytes(&parts.packed);

	Ok((header_bytes, bounds_bytes, packed_bytes, parts.sh))
}

/// Assembles a complete chunked PLY file image: `header | bounds | packed |
/// sh`, byte-identical to concatenating [`compress_to_parts`]'s pieces
/// (§4.6's `compress_to_parts` symmetry law).
pub fn compress_to_bytes(container: &mut GsContainer) -> Result<Vec<u8>> {
	let (header_bytes, bounds_bytes, packed_bytes, sh_bytes) = compress_to_parts(container)?;

	let mut out = Vec::with_capacity(header_bytes.len() + bounds_bytes.len() + packed_bytes.len() + sh_bytes.as_ref().map_or(0, Vec::len));

	out.extend_from_slice(&header_bytes);
	out.extend_from_slice(&bounds_bytes);
	out.extend_from_slice(&packed_bytes);
	if let Some(sh) = &sh_bytes {
		out.extend_from_slice(sh);
	}
	Ok(out)
}

/// Parses a complete chunked PLY file image produced by [`compress_to_bytes`]
/// (or a compatible external encoder) back into a container.
pub fn decompress_from_bytes(bytes: &[u8]) -> Result<GsContainer> {
	let header = PlyHeader::parse(bytes)?;

	let chunk_el = header
		.element("chunk")
		.ok_or_else(|| GsplyError::HeaderMalformed("chunked file missing chunk element".into()))?;
	let vertex_el = header
		.element("vertex")
		.ok_or_else(|| GsplyError::HeaderMalformed("chunked file missing vertex element".into()))?;

	if chunk_el.properties.len() < 18 {
		return Err(GsplyError::HeaderMalformed(format!(
			"chunk element has {} properties, expected at least 18",
			chunk_el.properties.len()
		)));
	}
	for name in PACKED_PROPERTY_NAMES {
		if vertex_el.property(name).is_none() {
			return Err(GsplyError::HeaderMalformed(format!("vertex element missing property '{name}'")));
		}
	}

	let c = chunk_el.count;
	let n = vertex_el.count;

	let sh_el = header.element("sh");
	let k = sh_el.map(|e| e.properties.len() / 3).unwrap_or(0);
	let degree = numerics::degree_for_bands(k)
		.ok_or_else(|| GsplyError::UnsupportedSchema(format!("sh element implies {k} bands, not in {{0,9,24,45}}")))?;

	let body = &bytes[header.header_len..];
	let bounds_len = c * 18 * 4;
	let packed_len = n * 4 * 4;
	let sh_len = if k > 0 { n * 3 * k } else { 0 };
	let expected_total = bounds_len + packed_len + sh_len;

	if body.len() != expected_total {
		return Err(GsplyError::SizeMismatch {
			expected: expected_total,
			actual: body.len(),
			context: "chunked payload length (bounds+packed+sh)".into(),
		});
	}

	let mut bounds = Vec::with_capacity(c);
	for chunk_idx in 0..c {
		let start = chunk_idx * 18 * 4;
		let mut flat = [0.0_f32; 18];

		for (i, slot) in flat.iter_mut().enumerate() {
			let off = start + i * 4;
			*slot = f32::from_le_bytes(body[off..off + 4].try_into().unwrap());
		}
		bounds.push(ChunkBounds::from_flat(&flat));
	}

	let packed_start = bounds_len;
	let mut packed = Vec::with_capacity(n * 4);
	for i in 0..n * 4 {
		let off = packed_start + i * 4;
		packed.push(u32::from_le_bytes(body[off..off + 4].try_into().unwrap()));
	}

	let sh = if k > 0 {
		let sh_start = bounds_len + packed_len;
		Some(body[sh_start..sh_start + sh_len].to_vec())
	} else {
		None
	};

	let (sh_min, sh_max) = if k > 0 {
		let sh_el = sh_el.expect("k > 0 implies an sh element was found above");
		let width = 3 * k;

		let read_bounds = |prefix: &str| -> Result<Vec<f32>> {
			(0..width)
				.map(|i| {
					header.comment_f32(&format!("{prefix}_{i}")).ok_or_else(|| {
						GsplyError::HeaderMalformed(format!("sh element present but 'comment gsply {prefix}_{i}' missing"))
					})
				})
				.collect()
		};

		let min = read_bounds("sh_min")?;
		let max = read_bounds("sh_max")?;

		debug!(bands = sh_el.properties.len() / 3, "chunked decode: sh bounds from header comments");
		(min, max)
	} else {
		(Vec::new(), Vec::new())
	};

	if n > 0 {
		let expected_chunks = n.div_ceil(CHUNK_SIZE);

		if c != expected_chunks {
			return Err(GsplyError::SizeMismatch {
				expected: expected_chunks,
				actual: c,
				context: "chunk element count vs vertex count / CHUNK_SIZE".into(),
			});
		}
	}

	let parts = EncodedParts {
		degree,
		n,
		bounds,
		packed,
		sh,
		sh_min,
		sh_max,
	};

	chunked::decode(&parts)
}
