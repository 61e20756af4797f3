// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The typed error boundary for every fallible operation in this crate.
//!
//! Every public function that can fail returns `Result<T, GsplyError>`.
//! Callers that want path context on top (the CLI, tests) layer
//! `anyhow::Context` over that, rather than this crate growing its own
//! ad hoc string errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GsplyError {
	#[error("io error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("malformed ply header: {0}")]
	HeaderMalformed(String),

	#[error("unsupported schema: {0}")]
	UnsupportedSchema(String),

	#[error("size mismatch: expected {expected}, got {actual} ({context})")]
	SizeMismatch {
		expected: usize,
		actual: usize,
		context: String,
	},

	#[error("domain error: {0}")]
	DomainError(String),

	#[error("state error: {0}")]
	StateError(String),
}

pub type Result<T> = std::result::Result<T, GsplyError>;
