// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The chunked (quantized, SuperSplat-compatible) codec (C5): chunking,
//! per-chunk bounds, Morton+radix sort, parallel bit-packing, SH
//! quantization, and their inverses.
//!
//! This module works purely in terms of [`EncodedParts`] — the typed,
//! in-memory result of the §4.5 state machine. Byte assembly/parsing of a
//! complete chunked PLY file is [`crate::bytes`] (C6), which calls into this
//! module and then concatenates the pieces.

pub mod bounds;
pub mod morton;
pub mod pack;

use rayon::prelude::*;
use tracing::debug;

use crate::consts::CHUNK_SIZE;
use crate::container::{FormatState, GsContainer};
use crate::error::{GsplyError, Result};
use crate::numerics;
use bounds::ChunkBounds;

/// The fully-encoded chunked representation of a container: everything
/// [`crate::bytes::compress_to_parts`] needs to serialize, with no byte
/// layout decisions left to make.
pub struct EncodedParts {
	pub degree: u8,
	pub n: usize,
	pub bounds: Vec<ChunkBounds>,
	/// `N*4` words per point, in `position, rotation, scale, color` order.
	pub packed: Vec<u32>,
	pub sh: Option<Vec<u8>>,
	/// Per-coefficient global min/max, one pair per column of the wire's
	/// interleaved `(K,3)` row (length `3*bands(degree)`; empty at degree 0).
	pub sh_min: Vec<f32>,
	pub sh_max: Vec<f32>,
}

/// Converts one point's planar (all-R, all-G, all-B) SH-rest row into the
/// wire's interleaved row-major `(K, 3)` order, i.e. `[R0,G0,B0,R1,G1,B1,...]`.
fn planar_to_interleaved(planar: &[f32], k: usize) -> Vec<f32> {
	let mut out = vec![0.0_f32; 3 * k];

	for j in 0..k {
		for c in 0..3 {
			out[3 * j + c] = planar[c * k + j];
		}
	}
	out
}

/// Inverse of [`planar_to_interleaved`].
fn interleaved_to_planar(interleaved: &[f32], k: usize) -> Vec<f32> {
	let mut out = vec![0.0_f32; 3 * k];

	for j in 0..k {
		for c in 0..3 {
			out[c * k + j] = interleaved[3 * j + c];
		}
	}
	out
}

fn gather(values: &[f32], width: usize, perm: &[usize]) -> Vec<f32> {
	let mut out = Vec::with_capacity(perm.len() * width);

	for &i in perm {
		out.extend_from_slice(&values[i * width..i * width + width]);
	}
	out
}

/// Runs the §4.5 encoder state machine: `VALIDATE -> NORMALIZE -> COMPUTE
/// GLOBAL BOUNDS -> MORTON+RADIX SORT -> PER-CHUNK BOUNDS -> PACK -> QUANTIZE
/// SH`. `EMIT` is [`crate::bytes::compress_to_parts`]'s job.
pub fn encode(container: &mut GsContainer) -> Result<EncodedParts> {
	container.ensure_ply_state()?;

	let degree = container.get_sh_degree();
	let n = container.n();
	let k = numerics::bands_for_degree(degree).unwrap_or(0);

	if n == 0 {
		return Ok(EncodedParts {
			degree,
			n: 0,
			bounds: Vec::new(),
			packed: Vec::new(),
			sh: if k > 0 { Some(Vec::new()) } else { None },
			sh_min: vec![0.0; 3 * k],
			sh_max: vec![0.0; 3 * k],
		});
	}

	let means = container.means().to_owned_vec();
	let scales = container.scales().to_owned_vec();
	let opacities = container.opacities().to_owned_vec();
	let sh0 = container.sh0().to_owned_vec();
	let sh_rest = container.sh_rest().to_owned_vec();
	let quats = container.quats().to_owned_vec();

	debug!(n, degree, "chunked encode: computing global bounds");
	let (global_min, global_max) = bounds::compute_global_mean_bounds(&means);

	debug!("chunked encode: morton + radix sort by chunk");
	let codes = morton::codes_for(&means, global_min, global_max);
	let morton_order = morton::sort_order(&codes);
	let perm = morton::radix_sort_by_chunk(&morton_order, CHUNK_SIZE);

	let means_s = gather(&means, 3, &perm);
	let scales_s = gather(&scales, 3, &perm);
	let opacities_s = gather(&opacities, 1, &perm);
	let sh0_s = gather(&sh0, 3, &perm);
	let sh_rest_s = gather(&sh_rest, 3 * k, &perm);
	let quats_s = gather(&quats, 4, &perm);

	let rgb_s: Vec<f32> = sh0_s.iter().map(|&x| numerics::sh2rgb(x)).collect();

	debug!(chunks = n.div_ceil(CHUNK_SIZE), "chunked encode: computing per-chunk bounds");
	let chunk_bounds = bounds::compute_chunk_bounds(&means_s, &scales_s, &rgb_s, CHUNK_SIZE);

	debug!("chunked encode: packing position/scale/color/rotation");
	let packed: Vec<u32> = (0..n)
		.into_par_iter()
		.flat_map(|i| {
			let cb = &chunk_bounds[i / CHUNK_SIZE];
			let mean = &means_s[i * 3..i * 3 + 3];
			let scale = &scales_s[i * 3..i * 3 + 3];
			let rgb = &rgb_s[i * 3..i * 3 + 3];
			let opacity = numerics::sigmoid(opacities_s[i]);
			let quat = [quats_s[i * 4], quats_s[i * 4 + 1], quats_s[i * 4 + 2], quats_s[i * 4 + 3]];

			let qx = pack::quantize_unsigned(mean[0], cb.mean_min[0], cb.mean_max[0], 11);
			let qy = pack::quantize_unsigned(mean[1], cb.mean_min[1], cb.mean_max[1], 10);
			let qz = pack::quantize_unsigned(mean[2], cb.mean_min[2], cb.mean_max[2], 11);
			let packed_position = pack::pack_11_10_11(qx, qy, qz);

			let qsx = pack::quantize_unsigned(scale[0], cb.scale_min[0], cb.scale_max[0], 11);
			let qsy = pack::quantize_unsigned(scale[1], cb.scale_min[1], cb.scale_max[1], 10);
			let qsz = pack::quantize_unsigned(scale[2], cb.scale_min[2], cb.scale_max[2], 11);
			let packed_scale = pack::pack_11_10_11(qsx, qsy, qsz);

			let qr = pack::quantize_unsigned(rgb[0], cb.rgb_min[0], cb.rgb_max[0], 8) as u8;
			let qg = pack::quantize_unsigned(rgb[1], cb.rgb_min[1], cb.rgb_max[1], 8) as u8;
			let qb = pack::quantize_unsigned(rgb[2], cb.rgb_min[2], cb.rgb_max[2], 8) as u8;
			let qa = pack::quantize_unsigned(opacity, 0.0, 1.0, 8) as u8;
			let packed_color = pack::pack_color(qr, qg, qb, qa);

			let packed_rotation = pack::pack_rotation_largest_three(quat);

			vec![packed_position, packed_rotation, packed_scale, packed_color]
		})
		.collect();

	// §4.5 quantizes each of the 3K coefficients "per-coefficient globally":
	// one (min,max) pair per column of the wire's interleaved (K,3) row,
	// shared across every point, not one pair shared across all 3K columns.
	let width = 3 * k;
	let interleaved_rows: Vec<Vec<f32>> = if k > 0 {
		(0..n)
			.into_par_iter()
			.map(|i| planar_to_interleaved(&sh_rest_s[i * width..i * width + width], k))
			.collect()
	} else {
		Vec::new()
	};

	let (sh_min, sh_max): (Vec<f32>, Vec<f32>) = if k > 0 {
		let mut raw_min = vec![f32::INFINITY; width];
		let mut raw_max = vec![f32::NEG_INFINITY; width];

		for row in &interleaved_rows {
			for (col, &v) in row.iter().enumerate() {
				raw_min[col] = raw_min[col].min(v);
				raw_max[col] = raw_max[col].max(v);
			}
		}
		let min: Vec<f32> = raw_min.iter().zip(&raw_max).map(|(&lo, &hi)| bounds::nudge_degenerate(lo, hi)).collect();
		(min, raw_max)
	} else {
		(Vec::new(), Vec::new())
	};

	let sh = if k > 0 {
		let sh_bytes: Vec<u8> = interleaved_rows
			.into_par_iter()
			.flat_map(|row| {
				row.into_iter()
					.enumerate()
					.map(|(col, v)| pack::quantize_sh_byte(v, sh_min[col], sh_max[col]))
					.collect::<Vec<_>>()
			})
			.collect();

		Some(sh_bytes)
	} else {
		None
	};

	Ok(EncodedParts {
		degree,
		n,
		bounds: chunk_bounds,
		packed,
		sh,
		sh_min,
		sh_max,
	})
}

/// Runs the §4.5 decoder: reverses chunking, bit-packing, and SH
/// quantization, returning a fresh-backing container in PLY format-state.
pub fn decode(parts: &EncodedParts) -> Result<GsContainer> {
	debug!(n = parts.n, chunks = parts.bounds.len(), degree = parts.degree, "chunked decode: unpacking points");

	let k = numerics::bands_for_degree(parts.degree)
		.ok_or_else(|| GsplyError::UnsupportedSchema(format!("invalid sh degree {}", parts.degree)))?;
	let n = parts.n;

	if parts.packed.len() != n * 4 {
		return Err(GsplyError::SizeMismatch {
			expected: n * 4,
			actual: parts.packed.len(),
			context: "chunked packed word count".into(),
		});
	}
	let expected_chunks = n.div_ceil(CHUNK_SIZE);
	if n > 0 && parts.bounds.len() != expected_chunks {
		return Err(GsplyError::SizeMismatch {
			expected: expected_chunks,
			actual: parts.bounds.len(),
			context: "chunk bounds count".into(),
		});
	}
	if let Some(sh) = &parts.sh {
		if sh.len() != n * 3 * k {
			return Err(GsplyError::SizeMismatch {
				expected: n * 3 * k,
				actual: sh.len(),
				context: "sh byte count".into(),
			});
		}
		if parts.sh_min.len() != 3 * k || parts.sh_max.len() != 3 * k {
			return Err(GsplyError::SizeMismatch {
				expected: 3 * k,
				actual: parts.sh_min.len().max(parts.sh_max.len()),
				context: "per-coefficient sh bounds count".into(),
			});
		}
	}

	let mut means = vec![0.0_f32; n * 3];
	let mut scales = vec![0.0_f32; n * 3];
	let mut opacities = vec![0.0_f32; n];
	let mut sh0 = vec![0.0_f32; n * 3];
	let mut quats = vec![0.0_f32; n * 4];

	for i in 0..n {
		let cb = &parts.bounds[i / CHUNK_SIZE];
		let word = &parts.packed[i * 4..i * 4 + 4];
		let (packed_position, packed_rotation, packed_scale, packed_color) = (word[0], word[1], word[2], word[3]);

		let (qx, qy, qz) = pack::unpack_11_10_11(packed_position);
		means[i * 3] = pack::dequantize_unsigned(qx, cb.mean_min[0], cb.mean_max[0], 11);
		means[i * 3 + 1] = pack::dequantize_unsigned(qy, cb.mean_min[1], cb.mean_max[1], 10);
		means[i * 3 + 2] = pack::dequantize_unsigned(qz, cb.mean_min[2], cb.mean_max[2], 11);

		let (qsx, qsy, qsz) = pack::unpack_11_10_11(packed_scale);
		scales[i * 3] = pack::dequantize_unsigned(qsx, cb.scale_min[0], cb.scale_max[0], 11);
		scales[i * 3 + 1] = pack::dequantize_unsigned(qsy, cb.scale_min[1], cb.scale_max[1], 10);
		scales[i * 3 + 2] = pack::dequantize_unsigned(qsz, cb.scale_min[2], cb.scale_max[2], 11);

		let (qr, qg, qb, qa) = pack::unpack_color(packed_color);
		let r = pack::dequantize_unsigned(qr as u32, cb.rgb_min[0], cb.rgb_max[0], 8);
		let g = pack::dequantize_unsigned(qg as u32, cb.rgb_min[1], cb.rgb_max[1], 8);
		let b = pack::dequantize_unsigned(qb as u32, cb.rgb_min[2], cb.rgb_max[2], 8);
		sh0[i * 3] = numerics::rgb2sh(r);
		sh0[i * 3 + 1] = numerics::rgb2sh(g);
		sh0[i * 3 + 2] = numerics::rgb2sh(b);

		let opacity_linear = pack::dequantize_unsigned(qa as u32, 0.0, 1.0, 8);
		opacities[i] = numerics::logit(opacity_linear, 1e-4);

		let q = pack::unpack_rotation_largest_three(packed_rotation);
		quats[i * 4] = q[0];
		quats[i * 4 + 1] = q[1];
		quats[i * 4 + 2] = q[2];
		quats[i * 4 + 3] = q[3];
	}

	let sh_rest = match &parts.sh {
		Some(bytes) if k > 0 => {
			let mut planar = vec![0.0_f32; n * 3 * k];

			for i in 0..n {
				let interleaved: Vec<f32> = bytes[i * 3 * k..i * 3 * k + 3 * k]
					.iter()
					.enumerate()
					.map(|(col, &b)| pack::dequantize_sh_byte(b, parts.sh_min[col], parts.sh_max[col]))
					.collect();
				let row = interleaved_to_planar(&interleaved, k);

				planar[i * 3 * k..i * 3 * k + 3 * k].copy_from_slice(&row);
			}
			planar
		},
		_ => Vec::new(),
	};

	GsContainer::from_arrays(means, scales, quats, opacities, sh0, sh_rest, FormatState::PLY)
}

/// Reads a complete chunked PLY file from `path`.
pub fn read(path: impl AsRef<std::path::Path>) -> Result<GsContainer> {
	crate::bytes::decompress_from_bytes(&crate::mmap::mmap(path)?)
}

/// Writes `container` as a complete chunked PLY file, normalizing to PLY
/// format-state first if needed.
pub fn write(path: impl AsRef<std::path::Path>, container: &mut GsContainer) -> Result<()> {
	let bytes = crate::bytes::compress_to_bytes(container)?;

	std::fs::write(path, bytes).map_err(GsplyError::IoError)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::container::{OpacityFormat, ScaleFormat, Sh0Format};

	fn make_points(n: usize, degree: u8) -> GsContainer {
		let k = numerics::bands_for_degree(degree).unwrap();
		let mut means = Vec::with_capacity(n * 3);
		let mut scales = Vec::with_capacity(n * 3);
		let mut quats = Vec::with_capacity(n * 4);
		let mut opacities = Vec::with_capacity(n);
		let mut sh0 = Vec::with_capacity(n * 3);

		for i in 0..n {
			let f = i as f32;
			means.extend_from_slice(&[f * 0.1, -f * 0.2, f * 0.05]);
			scales.extend_from_slice(&[0.0, 0.0, 0.0]); // log(1)
			quats.extend_from_slice(&[1.0, 0.0, 0.0, 0.0]);
			opacities.push(0.0); // logit(0.5)
			sh0.extend_from_slice(&[0.1, 0.2, 0.3]);
		}

		GsContainer::from_arrays(
			means,
			scales,
			quats,
			opacities,
			sh0,
			vec![0.0; n * 3 * k],
			FormatState {
				scales: ScaleFormat::Log,
				opacities: OpacityFormat::Logit,
				sh0: Sh0Format::Sh,
			},
		)
		.unwrap()
	}

	#[test]
	fn test_planar_interleaved_roundtrip() {
		let k = 9;
		let planar: Vec<f32> = (0..3 * k).map(|i| i as f32).collect();
		let interleaved = planar_to_interleaved(&planar, k);
		let back = interleaved_to_planar(&interleaved, k);

		assert_eq!(back, planar);
	}

	#[test]
	fn test_encode_n_zero_produces_empty_parts() {
		let mut c = make_points(0, 0);
		let parts = encode(&mut c).unwrap();

		assert_eq!(parts.n, 0);
		assert!(parts.bounds.is_empty());
		assert!(parts.packed.is_empty());
	}

	#[test]
	fn test_encode_chunk_count_matches_spec_boundaries() {
		// N=256 -> C=1, N=257 -> C=2.
		let mut c256 = make_points(256, 0);
		let parts256 = encode(&mut c256).unwrap();
		assert_eq!(parts256.bounds.len(), 1);

		let mut c257 = make_points(257, 0);
		let parts257 = encode(&mut c257).unwrap();
		assert_eq!(parts257.bounds.len(), 2);
	}

	#[test]
	fn test_encode_decode_roundtrip_positions_within_chunk_bounds() {
		let mut c = make_points(300, 1);
		let parts = encode(&mut c).unwrap();
		let decoded = decode(&parts).unwrap();

		assert_eq!(decoded.n(), 300);
		assert_eq!(decoded.get_sh_degree(), 1);

		let means = decoded.means();
		for row in means.iter() {
			for &v in row {
				assert!(v.is_finite());
			}
		}
	}

	#[test]
	fn test_decode_rejects_packed_length_mismatch() {
		let parts = EncodedParts {
			degree: 0,
			n: 2,
			bounds: vec![ChunkBounds {
				mean_min: [0.0; 3],
				mean_max: [1.0; 3],
				scale_min: [0.0; 3],
				scale_max: [1.0; 3],
				rgb_min: [0.0; 3],
				rgb_max: [1.0; 3],
			}],
			packed: vec![0; 3], // wrong: should be 8
			sh: None,
			sh_min: Vec::new(),
			sh_max: Vec::new(),
		};

		let err = decode(&parts).unwrap_err();
		assert!(matches!(err, GsplyError::SizeMismatch { .. }));
	}
}
