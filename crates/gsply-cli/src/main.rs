// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gsply::prelude::*;

/// CLI for gsply (Gaussian Splat PLY) files: out-of-scope "external
/// collaborator" surface over the `gsply` core, kept deliberately thin.
#[derive(Parser, Debug)]
#[command(name = "gsply")]
#[command(author, version, about, long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Classify a file's wire format (uncompressed vs chunked) without
	/// loading the vertex payload, by probing the header alone.
	Probe {
		/// Path to the PLY file.
		path: PathBuf,
	},
	/// Load a file fully and print its point count, SH degree, and
	/// format-state.
	Info {
		/// Path to the PLY file.
		path: PathBuf,
	},
	/// Convert a file between the uncompressed and chunked wire formats.
	Convert {
		/// Path to the input PLY file.
		input: PathBuf,
		/// Path to write the output PLY file.
		output: PathBuf,
		/// Write the chunked (quantized) format instead of uncompressed.
		#[arg(long)]
		compressed: bool,
	},
}

fn main() -> Result<ExitCode> {
	tracing_subscriber::fmt::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	match run() {
		Ok(()) => Ok(ExitCode::SUCCESS),
		Err(err) => {
			eprintln!("error: {err:#}");

			Ok(ExitCode::FAILURE)
		},
	}
}

fn run() -> Result<()> {
	let cli = Cli::parse();

	match cli.command {
		Commands::Probe { path } => cmd_probe(&path),
		Commands::Info { path } => cmd_info(&path),
		Commands::Convert {
			input,
			output,
			compressed,
		} => cmd_convert(&input, &output, compressed),
	}
}

fn cmd_probe<P>(path: P) -> Result<()>
where
	P: AsRef<Path>,
{
	let result = gsply::probe::probe_file(path.as_ref())
		.with_context(|| format!("failed to probe {:?}", path.as_ref()))?;

	match result.kind {
		FormatKind::Uncompressed => {
			println!("kind: uncompressed");
			println!("degree: {}", result.degree.expect("uncompressed probe always yields a degree"));
		},
		FormatKind::Chunked => {
			println!("kind: chunked");
			println!("degree: unknown (not recoverable from header)");
		},
	}
	println!("header_len: {}", result.header_len);

	Ok(())
}

fn cmd_info<P>(path: P) -> Result<()>
where
	P: AsRef<Path>,
{
	let container = gsply::read(path.as_ref()).with_context(|| format!("failed to read {:?}", path.as_ref()))?;

	println!("points: {}", container.n());
	println!("sh_degree: {}", container.get_sh_degree());
	println!("format_state: {:?}", container.format_state());

	Ok(())
}

fn cmd_convert<P>(input: P, output: P, compressed: bool) -> Result<()>
where
	P: AsRef<Path>,
{
	let mut container =
		gsply::read(input.as_ref()).with_context(|| format!("failed to read {:?}", input.as_ref()))?;

	gsply::write(output.as_ref(), &mut container, compressed)
		.with_context(|| format!("failed to write {:?}", output.as_ref()))?;

	Ok(())
}
