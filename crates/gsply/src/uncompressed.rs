// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The uncompressed codec (C4): fixed-record binary little-endian PLY.
//!
//! Read loads the entire vertex block as one contiguous row-major float32
//! buffer (one bulk read via [`crate::mmap`]) and builds a
//! [`GsContainer::from_base`] window over it — the donor's zero-copy-mmap
//! ethos from `mmap.rs`/`header.rs`, retargeted at a textual header and a
//! flat float32 record instead of a `#[repr(C)]` binary header.

use std::path::Path;

use crate::container::GsContainer;
use crate::error::{GsplyError, Result};
use crate::header::{self, PlyHeader};
use crate::mmap;
use crate::numerics;

fn canonical_property_names(degree: u8) -> Vec<String> {
	let k = numerics::bands_for_degree(degree).unwrap_or(0);
	let mut names = vec!["x".to_string(), "y".to_string(), "z".to_string()];

	for i in 0..3 {
		names.push(format!("f_dc_{i}"));
	}
	for i in 0..3 * k {
		names.push(format!("f_rest_{i}"));
	}
	names.push("opacity".to_string());
	for i in 0..3 {
		names.push(format!("scale_{i}"));
	}
	for i in 0..4 {
		names.push(format!("rot_{i}"));
	}
	names
}

fn validate_vertex_schema(header: &PlyHeader, degree: u8) -> Result<()> {
	let vertex = header
		.element("vertex")
		.ok_or_else(|| GsplyError::HeaderMalformed("missing vertex element".into()))?;
	let expected = canonical_property_names(degree);

	if vertex.properties.len() != expected.len() {
		return Err(GsplyError::SizeMismatch {
			expected: expected.len(),
			actual: vertex.properties.len(),
			context: "uncompressed vertex property count".into(),
		});
	}
	for (prop, name) in vertex.properties.iter().zip(expected.iter()) {
		if prop.type_name != "float" {
			return Err(GsplyError::HeaderMalformed(format!(
				"property '{}' has non-float type '{}'",
				prop.name, prop.type_name
			)));
		}
		if &prop.name != name {
			return Err(GsplyError::HeaderMalformed(format!(
				"expected property '{name}' at this position, found '{}'",
				prop.name
			)));
		}
	}
	Ok(())
}

/// Reads an uncompressed PLY file into a [`GsContainer`].
pub fn read(path: impl AsRef<Path>) -> Result<GsContainer> {
	let file = mmap::mmap(path.as_ref())?;
	let bytes: &[u8] = &file;

	let header = PlyHeader::parse(bytes)?;
	let vertex = header
		.element("vertex")
		.ok_or_else(|| GsplyError::HeaderMalformed("missing vertex element".into()))?;
	let n = vertex.count;
	let p = vertex.properties.len();
	let degree = numerics::degree_for_property_count(p)
		.ok_or_else(|| GsplyError::UnsupportedSchema(format!("vertex property count {p} not in {{14,23,38,59}}")))?;

	validate_vertex_schema(&header, degree)?;

	let payload = &bytes[header.header_len..];
	let expected_len = n * p * 4;

	if payload.len() != expected_len {
		return Err(GsplyError::SizeMismatch {
			expected: expected_len,
			actual: payload.len(),
			context: "uncompressed vertex payload length".into(),
		});
	}

	let mut buf = Vec::with_capacity(n * p);
	for chunk in payload.chunks_exact(4) {
		buf.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
	}

	let k = numerics::bands_for_degree(degree).unwrap_or(0);
	let rot_col = 10 + 3 * k; // means(3) + f_dc(3) + f_rest(3k) + opacity(1) + scale(3)
	let mut quats_wire = Vec::with_capacity(n * 4);
	for i in 0..n {
		let row = &buf[i * p + rot_col..i * p + rot_col + 4];
		quats_wire.extend_from_slice(row);
	}

	GsContainer::from_base(buf, n, degree, &quats_wire)
}

/// Writes `container` as an uncompressed PLY file, normalizing to PLY
/// format-state first if needed (§3).
pub fn write(path: impl AsRef<Path>, container: &mut GsContainer) -> Result<()> {
	let bytes = to_bytes(container)?;

	std::fs::write(path, bytes).map_err(GsplyError::IoError)
}

/// Assembles the complete uncompressed PLY byte image for `container`.
pub fn to_bytes(container: &mut GsContainer) -> Result<Vec<u8>> {
	container.ensure_ply_state()?;

	let degree = container.get_sh_degree();
	let n = container.n();
	let k = numerics::bands_for_degree(degree).unwrap_or(0);
	let p = 14 + 3 * k;

	let mut out = Vec::with_capacity(256 + n * p * 4);

	header::write_header(&mut out, |out| {
		out.extend_from_slice(format!("element vertex {n}\n").as_bytes());
		for name in canonical_property_names(degree) {
			out.extend_from_slice(format!("property float {name}\n").as_bytes());
		}
	});

	let means = container.means();
	let sh0 = container.sh0();
	let sh_rest = container.sh_rest();
	let opacities = container.opacities();
	let scales = container.scales();
	let quats = container.quats();

	for i in 0..n {
		for v in means.row(i) {
			out.extend_from_slice(&v.to_le_bytes());
		}
		for v in sh0.row(i) {
			out.extend_from_slice(&v.to_le_bytes());
		}
		for v in sh_rest.row(i) {
			out.extend_from_slice(&v.to_le_bytes());
		}
		out.extend_from_slice(&opacities.row(i)[0].to_le_bytes());
		for v in scales.row(i) {
			out.extend_from_slice(&v.to_le_bytes());
		}

		let q = quats.row(i); // w,x,y,z
		for v in [q[1], q[2], q[3], q[0]] {
			// wire order x,y,z,w
			out.extend_from_slice(&v.to_le_bytes());
		}
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::container::{FormatState, OpacityFormat, ScaleFormat, Sh0Format};

	fn single_point_degree0() -> GsContainer {
		GsContainer::from_arrays(
			vec![0.0, 0.0, 0.0],
			vec![0.0, 0.0, 0.0], // log(1) == 0
			vec![1.0, 0.0, 0.0, 0.0],
			vec![0.0], // logit(0.5) == 0
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
	fn test_s1_uncompressed_write_then_read_roundtrip() {
		let mut c = single_point_degree0();
		let bytes = to_bytes(&mut c).unwrap();

		let header = PlyHeader::parse(&bytes).unwrap();
		let vertex = header.element("vertex").unwrap();

		assert_eq!(vertex.count, 1);
		assert_eq!(vertex.properties.len(), 14);

		let payload = &bytes[header.header_len..];
		assert_eq!(payload.len(), 14 * 4);

		// All-zero record: means=0,0,0 sh0=0,0,0 opacity=0 scales=0,0,0
		// rot=(x,y,z,w)=(0,0,0,1).
		for chunk in payload[..13 * 4].chunks_exact(4) {
			assert_eq!(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]), 0.0);
		}
		let w = &payload[13 * 4..14 * 4];
		assert_eq!(f32::from_le_bytes([w[0], w[1], w[2], w[3]]), 1.0);
	}

	#[test]
	fn test_read_rejects_bad_property_order() {
		let bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 0\nproperty float y\nproperty float x\nproperty float z\nproperty float f_dc_0\nproperty float f_dc_1\nproperty float f_dc_2\nproperty float opacity\nproperty float scale_0\nproperty float scale_1\nproperty float scale_2\nproperty float rot_0\nproperty float rot_1\nproperty float rot_2\nproperty float rot_3\nend_header\n";
		let header = PlyHeader::parse(bytes).unwrap();

		assert!(validate_vertex_schema(&header, 0).is_err());
	}

	#[test]
	fn test_n_zero_round_trips_to_empty_container() {
		let mut c = GsContainer::from_arrays(
			vec![],
			vec![],
			vec![],
			vec![],
			vec![],
			vec![],
			FormatState {
				scales: ScaleFormat::Log,
				opacities: OpacityFormat::Logit,
				sh0: Sh0Format::Sh,
			},
		)
		.unwrap();
		let bytes = to_bytes(&mut c).unwrap();
		let header = PlyHeader::parse(&bytes).unwrap();

		assert_eq!(header.element("vertex").unwrap().count, 0);
		assert_eq!(bytes.len(), header.header_len);
	}

	#[test]
	fn test_s6_degree_mismatch_payload_is_size_mismatch() {
		// Header says degree 0 (P=14, so N*14*4 bytes expected) but only
		// provide a payload sized for one degree-1 point (P=23).
		let mut bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 1\n".to_vec();
		for name in canonical_property_names(0) {
			bytes.extend_from_slice(format!("property float {name}\n").as_bytes());
		}
		bytes.extend_from_slice(b"end_header\n");
		bytes.extend(std::iter::repeat(0u8).take(23 * 4));

		let tmp = std::env::temp_dir().join(format!("gsply_test_s6_{}.ply", std::process::id()));
		std::fs::write(&tmp, &bytes).unwrap();

		let err = read(&tmp).unwrap_err();
		std::fs::remove_file(&tmp).ok();

		assert!(matches!(err, GsplyError::SizeMismatch { .. }));
	}
}
