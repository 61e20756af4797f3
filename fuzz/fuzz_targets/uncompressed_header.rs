// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fuzz target for the uncompressed PLY header parser and schema
//! classification: arbitrary bytes must never panic, only return a typed
//! error or a valid [`gsply::probe::ProbeResult`].

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
	let _ = gsply::probe::probe_bytes(data);
});
