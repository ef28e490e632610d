//! Print JSON documents in canonical form, or compare two of them.
//!
//! Usage:
//!   `gql-canon response.json`
//!   `gql-canon --check approved.json < response.json`

#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use graphql_testkit::assertions::{AssertionFailure, Expectation};
use graphql_testkit::canonical::canonicalize_str;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gql-canon")]
#[command(about = "Canonicalize JSON for order-insensitive comparison", long_about = None)]
struct Args {
    /// JSON document to read; stdin when omitted
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Compare the input against this document instead of printing it
    #[arg(long, value_name = "EXPECTED")]
    check: Option<PathBuf>,
}

fn read_document(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn canonical(path: Option<&Path>) -> anyhow::Result<String> {
    let label = path.map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
    canonicalize_str(&read_document(path)?).with_context(|| format!("{label} is not valid JSON"))
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let actual = canonical(args.input.as_deref())?;

    let Some(expected_path) = args.check else {
        println!("{actual}");
        return Ok(ExitCode::SUCCESS);
    };

    let expected = canonical(Some(expected_path.as_path()))?;
    if actual == expected {
        tracing::info!(expected = %expected_path.display(), "Documents are similar");
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!(
        "{}",
        AssertionFailure::new(Expectation::Similar { expected, actual })
    );
    Ok(ExitCode::FAILURE)
}
