// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fuzz target for the chunked (quantized) PLY parser: arbitrary bytes
//! fed to [`gsply::bytes::decompress_from_bytes`] must never panic, only
//! return a typed error or a valid container.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
	let _ = gsply::bytes::decompress_from_bytes(data);
});
