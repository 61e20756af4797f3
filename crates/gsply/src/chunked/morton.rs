// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial point ordering for the chunked codec (§4.5, §9): a 30-bit Morton
//! code over each point's position, followed by a counting sort that groups
//! the Morton order into contiguous `CHUNK_SIZE` buckets.
//!
//! There's no donor analog for this (the donor's SPZ format doesn't reorder
//! points); it's built directly from the wire format's own description.

use rayon::prelude::*;

/// Maps `v` into the file's global bounds and quantizes to an unsigned
/// 10-bit integer, round-to-nearest.
#[inline]
pub fn quantize_10bit(v: f32, lo: f32, hi: f32) -> u32 {
	let t = ((v - lo) / (hi - lo) * 1023.0).round().clamp(0.0, 1023.0);
	t as u32
}

/// Interleaves the low 10 bits of `x`, `y`, `z` into a 30-bit Morton code:
/// bit `3*i` is `x`'s bit `i`, `3*i+1` is `y`'s, `3*i+2` is `z`'s.
#[inline]
pub fn encode(x: u32, y: u32, z: u32) -> u32 {
	let mut code = 0u32;

	for bit in 0..10 {
		code |= ((x >> bit) & 1) << (3 * bit);
		code |= ((y >> bit) & 1) << (3 * bit + 1);
		code |= ((z >> bit) & 1) << (3 * bit + 2);
	}
	code
}

/// Computes the Morton code of every point (row-major `(N,3)` `means`)
/// against the file's global position bounds.
pub fn codes_for(means: &[f32], global_min: [f32; 3], global_max: [f32; 3]) -> Vec<u32> {
	let n = means.len() / 3;

	(0..n)
		.into_par_iter()
		.map(|i| {
			let row = &means[i * 3..i * 3 + 3];
			let qx = quantize_10bit(row[0], global_min[0], global_max[0]);
			let qy = quantize_10bit(row[1], global_min[1], global_max[1]);
			let qz = quantize_10bit(row[2], global_min[2], global_max[2]);

			encode(qx, qy, qz)
		})
		.collect()
}

/// Returns the permutation of `0..n` sorted by ascending Morton code, ties
/// broken by original index (stable order for equal codes).
pub fn sort_order(codes: &[u32]) -> Vec<usize> {
	let mut order: Vec<usize> = (0..codes.len()).collect();

	order.par_sort_by(|&a, &b| codes[a].cmp(&codes[b]).then(a.cmp(&b)));
	order
}

/// Scatters `order` (already Morton-sorted) into the final chunk-major
/// permutation via an O(N) counting sort over `chunk_index = rank / chunk_size`
/// buckets: tally counts per chunk, prefix-sum into offsets, then scatter
/// scanning in Morton order so each chunk's points stay Morton-ordered.
///
/// Since `chunk_index` is non-decreasing in Morton rank, every bucket is
/// already contiguous in `order`; this reproduces `order` verbatim while
/// still exercising the counting-sort shape the format's reference encoder
/// uses for larger, non-Morton-monotonic secondary keys.
pub fn radix_sort_by_chunk(order: &[usize], chunk_size: usize) -> Vec<usize> {
	let n = order.len();
	if n == 0 {
		return Vec::new();
	}
	let c = n.div_ceil(chunk_size);

	let mut counts = vec![0usize; c];
	for rank in 0..n {
		counts[rank / chunk_size] += 1;
	}

	let mut offsets = vec![0usize; c];
	let mut acc = 0;
	for (i, count) in counts.iter().enumerate() {
		offsets[i] = acc;
		acc += count;
	}

	let mut cursor = offsets;
	let mut perm = vec![0usize; n];

	for rank in 0..n {
		let ci = rank / chunk_size;
		perm[cursor[ci]] = order[rank];
		cursor[ci] += 1;
	}
	perm
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_encode_zero_is_zero() {
		assert_eq!(encode(0, 0, 0), 0);
	}

	#[test]
	fn test_encode_sets_expected_bits() {
		// x=1 sets bit 0, y=1 sets bit 1, z=1 sets bit 2.
		assert_eq!(encode(1, 0, 0), 0b001);
		assert_eq!(encode(0, 1, 0), 0b010);
		assert_eq!(encode(0, 0, 1), 0b100);
	}

	#[test]
	fn test_sort_order_is_stable_for_equal_codes() {
		let codes = vec![5, 5, 1];
		let order = sort_order(&codes);

		assert_eq!(order, vec![2, 0, 1]);
	}

	#[test]
	fn test_radix_sort_by_chunk_groups_contiguously() {
		let order: Vec<usize> = (0..10).collect();
		let perm = radix_sort_by_chunk(&order, 4);

		assert_eq!(perm, order);
	}

	#[test]
	fn test_radix_sort_by_chunk_empty() {
		assert!(radix_sort_by_chunk(&[], 256).is_empty());
	}
}
