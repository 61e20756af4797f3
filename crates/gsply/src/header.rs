// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ASCII PLY header parsing and serialization, shared by the format probe
//! (C3) and both codecs (C4/C5).
//!
//! Unlike the donor crate's fixed 16-byte `#[repr(C)]` header, this wire
//! format's header is a textual, line-oriented block terminated by
//! `end_header\n`; parsing and serialization are correspondingly textual
//! rather than a `transmute`. The zero-copy-read spirit of the donor's
//! `Header::from_file` is kept: callers read a bounded prefix of the file
//! (via [`crate::mmap`]) and hand it to [`PlyHeader::parse`] once.

use crate::error::{GsplyError, Result};

/// Bytes read up-front when probing a file for its header (§4.3).
pub const PROBE_WINDOW: usize = 8 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlyProperty {
	pub type_name: String,
	pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlyElement {
	pub name: String,
	pub count: usize,
	pub properties: Vec<PlyProperty>,
}

impl PlyElement {
	pub fn property(&self, name: &str) -> Option<&PlyProperty> {
		self.properties.iter().find(|p| p.name == name)
	}
}

/// A parsed ASCII PLY header: the element/property schema, any `comment`
/// lines (used to carry the chunked codec's SH-rest min/max, see
/// `SPEC_FULL.md`), and the byte length of the header block including the
/// `end_header\n` terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlyHeader {
	pub elements: Vec<PlyElement>,
	pub comments: Vec<String>,
	pub header_len: usize,
}

impl PlyHeader {
	pub fn element(&self, name: &str) -> Option<&PlyElement> {
		self.elements.iter().find(|e| e.name == name)
	}

	/// Looks up `comment gsply <key> <value>` and parses `<value>` as f32.
	pub fn comment_f32(&self, key: &str) -> Option<f32> {
		let prefix = format!("gsply {key} ");

		self.comments.iter().find_map(|c| c.strip_prefix(&prefix)?.trim().parse().ok())
	}

	/// Parses the ASCII header from the start of `bytes`. `bytes` must
	/// contain at least the full header (use [`PROBE_WINDOW`] as a starting
	/// guess and grow if `end_header` isn't found).
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		let end_marker = b"end_header\n";
		let end_pos = bytes
			.windows(end_marker.len())
			.position(|w| w == end_marker)
			.ok_or_else(|| GsplyError::HeaderMalformed("end_header not found within probe window".into()))?;
		let header_len = end_pos + end_marker.len();

		// Only the header prefix needs to be valid UTF-8; the binary payload
		// that follows `end_header\n` never is on a real file.
		let header_text = std::str::from_utf8(&bytes[..end_pos])
			.map_err(|_| GsplyError::HeaderMalformed("header is not valid utf-8".into()))?;

		let mut lines = header_text.lines();

		let magic = lines.next().unwrap_or("").trim();
		if magic != "ply" {
			return Err(GsplyError::HeaderMalformed(format!("expected 'ply' magic line, got '{magic}'")));
		}

		let format_line = lines
			.next()
			.ok_or_else(|| GsplyError::HeaderMalformed("missing format line".into()))?
			.trim();
		if format_line != "format binary_little_endian 1.0" {
			return Err(GsplyError::HeaderMalformed(format!(
				"unsupported format line '{format_line}'; only 'binary_little_endian 1.0' is supported"
			)));
		}

		let mut elements: Vec<PlyElement> = Vec::new();
		let mut comments: Vec<String> = Vec::new();

		for line in lines {
			let line = line.trim();
			if line.is_empty() {
				continue;
			}
			let mut parts = line.split_whitespace();
			let tag = parts.next().unwrap_or("");

			match tag {
				"comment" => {
					comments.push(parts.collect::<Vec<_>>().join(" "));
				},
				"element" => {
					let name = parts
						.next()
						.ok_or_else(|| GsplyError::HeaderMalformed("element line missing name".into()))?;
					let count: usize = parts
						.next()
						.ok_or_else(|| GsplyError::HeaderMalformed("element line missing count".into()))?
						.parse()
						.map_err(|_| GsplyError::HeaderMalformed("element count not an integer".into()))?;

					elements.push(PlyElement {
						name: name.to_string(),
						count,
						properties: Vec::new(),
					});
				},
				"property" => {
					let type_name = parts
						.next()
						.ok_or_else(|| GsplyError::HeaderMalformed("property line missing type".into()))?;
					let name = parts
						.next()
						.ok_or_else(|| GsplyError::HeaderMalformed("property line missing name".into()))?;
					let current = elements
						.last_mut()
						.ok_or_else(|| GsplyError::HeaderMalformed("property line before any element".into()))?;

					current.properties.push(PlyProperty {
						type_name: type_name.to_string(),
						name: name.to_string(),
					});
				},
				other => {
					return Err(GsplyError::HeaderMalformed(format!("unrecognized header line tag '{other}'")));
				},
			}
		}

		Ok(Self {
			elements,
			comments,
			header_len,
		})
	}
}

/// Renders a textual PLY header. `body` is a closure writing `element`/
/// `property` lines (and any extra `comment` lines) between the format line
/// and `end_header`; this mirrors the donor's `Header::serialize_to` in
/// spirit (one pass, no intermediate allocation of the element list) while
/// matching the textual wire format.
pub fn write_header(out: &mut Vec<u8>, body: impl FnOnce(&mut Vec<u8>)) {
	out.extend_from_slice(b"ply\n");
	out.extend_from_slice(b"format binary_little_endian 1.0\n");
	body(out);
	out.extend_from_slice(b"end_header\n");
}

#[cfg(test)]
mod tests {
	use super::*;

	const UNCOMPRESSED_DEGREE0: &[u8] = b"ply\nformat binary_little_endian 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n";

	#[test]
	fn test_parse_rejects_missing_magic() {
		let err = PlyHeader::parse(b"format binary_little_endian 1.0\nend_header\n").unwrap_err();

		assert!(matches!(err, GsplyError::HeaderMalformed(_)));
	}

	#[test]
	fn test_parse_rejects_wrong_format_line() {
		let err = PlyHeader::parse(b"ply\nformat ascii 1.0\nend_header\n").unwrap_err();

		assert!(matches!(err, GsplyError::HeaderMalformed(_)));
	}

	#[test]
	fn test_parse_basic_element() {
		let header = PlyHeader::parse(UNCOMPRESSED_DEGREE0).unwrap();
		let vertex = header.element("vertex").unwrap();

		assert_eq!(vertex.count, 3);
		assert_eq!(vertex.properties.len(), 3);
		assert_eq!(vertex.properties[0].name, "x");
	}

	#[test]
	fn test_comment_f32_roundtrip() {
		let bytes = b"ply\nformat binary_little_endian 1.0\ncomment gsply sh_min -1.5\ncomment gsply sh_max 2.25\nelement vertex 0\nend_header\n";
		let header = PlyHeader::parse(bytes).unwrap();

		assert_eq!(header.comment_f32("sh_min"), Some(-1.5));
		assert_eq!(header.comment_f32("sh_max"), Some(2.25));
	}

	#[test]
	fn test_header_len_excludes_payload() {
		let mut bytes = UNCOMPRESSED_DEGREE0.to_vec();
		bytes.extend_from_slice(&[0u8; 37]);

		let header = PlyHeader::parse(&bytes).unwrap();

		assert_eq!(header.header_len, UNCOMPRESSED_DEGREE0.len());
	}
}
