// SPDX-License-Identifier: Apache-2.0 OR MIT

pub mod chunked;
pub mod uncompressed;
