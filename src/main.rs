#![allow(clippy::result_large_err)]

use std::process::ExitCode;

use api_spec_test::HttpSuite;
use api_spec_test::SequenceMatch;
use api_spec_test::outputter::OutPutter;
use api_spec_test::parser::SpecFile;
use api_spec_test::run_suite;
use api_spec_test::runner::RunEvent;
use api_spec_test::runner::RunnerError;
use api_spec_test::validator::ValidatedSpecs;
use api_spec_test::validator::ValidationError;
use api_spec_test::validator::Validator;
use clap::Parser;
use miette::Diagnostic;
use miette::Result;
use thiserror::Error;

use crate::cli::Cli;

mod cli;

#[derive(Error, Debug, Diagnostic)]
pub enum AppError {
    #[error("Failed to read spec file")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse spec file")]
    TomlParsing(#[from] toml::de::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ValidationError(#[from] ValidationError),

    #[error("Failed while running specs: {0}")]
    RunnerError(#[from] RunnerError),
}

/// Reads the spec file named on the command line and validates it.
///
/// # Errors
/// Returns an `AppError` if the file cannot be read, the TOML fails to parse
/// or a spec is invalid (unsupported method, bad endpoint, unknown actor...).
fn load_and_validate_specs(cli: &Cli) -> Result<ValidatedSpecs, AppError> {
    let contents = std::fs::read_to_string(&cli.path)?;
    let spec_file: SpecFile = toml::from_str(&contents)?;

    let validator = Validator::new(&spec_file, contents.as_str(), cli.path.as_str());

    Ok(validator.validate()?)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let validated = load_and_validate_specs(&cli)?;

    let mut suite = HttpSuite::new(validated);
    if cli.strict_sequences {
        suite.set_sequence_match(SequenceMatch::Strict);
    }

    // The runner calls the specs one after the other, the outputter prints
    // progress as results come in.
    let (runner_tx, outputter_rx) = flume::unbounded::<RunEvent>();
    let path = cli.path.clone();
    let outputter_handle = tokio::spawn(async move { OutPutter::start(outputter_rx, &path).await });

    let result = run_suite(&suite, &runner_tx).await;
    drop(runner_tx);

    if let Err(error) = outputter_handle.await {
        eprintln!("Outputter task failed: {error}");
    }
    let summary = result.map_err(AppError::RunnerError)?;

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
