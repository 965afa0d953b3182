//! Command-line entry point for the s3-extract pipeline step.
//!
//! Every input can be given as a flag or through the `INPUT_*` environment
//! variable a CI runner sets for a step. On success the copied destinations
//! are printed as JSON; on failure the error is reported as a workflow
//! `::error::` command and the process exits with status 1.

use clap::Parser;
use s3_extract::{ActionInputs, CopyOutcome, S3ObjectStore};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "s3-extract")]
#[command(
    version,
    about = "Download a zip archive from S3 and copy selected files out of it",
    long_about = None
)]
struct Cli {
    /// Bucket holding the archive
    #[arg(long, env = "INPUT_BUCKET")]
    bucket: Option<String>,

    /// Key of the archive in the bucket
    #[arg(long, env = "INPUT_KEY")]
    key: Option<String>,

    /// Directory inside the archive that sources are relative to
    #[arg(long, env = "INPUT_SOURCE_BASE_DIRECTORY")]
    source_base_directory: Option<String>,

    /// Directory that destinations are relative to
    #[arg(long, env = "INPUT_TARGET_BASE_DIRECTORY")]
    target_base_directory: Option<String>,

    /// Alias of --target-base-directory
    #[arg(long, env = "INPUT_DIRECTORY", hide = true)]
    directory: Option<String>,

    /// Newline-separated `source=destination` file mappings
    #[arg(long, env = "INPUT_FILES")]
    files: Option<String>,

    /// Newline-separated `source=destination` directory mappings
    #[arg(long, env = "INPUT_DIRECTORIES")]
    directories: Option<String>,

    /// Fail when a mapped source is missing: true or false
    #[arg(long, env = "INPUT_FAIL_ON_NOT_FOUND")]
    fail_on_not_found: Option<String>,

    /// Where temporary download and extraction directories are created
    #[arg(long, env = "INPUT_WORKSPACE_DIRECTORY")]
    workspace_directory: Option<String>,
}

impl From<Cli> for ActionInputs {
    fn from(cli: Cli) -> Self {
        ActionInputs {
            bucket: cli.bucket,
            key: cli.key,
            source_base_directory: cli.source_base_directory,
            target_base_directory: cli.target_base_directory,
            directory: cli.directory,
            files: cli.files,
            directories: cli.directories,
            fail_on_not_found: cli.fail_on_not_found,
            workspace_directory: cli.workspace_directory,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing; stdout is reserved for the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = tokio::select! {
        result = handle_copy(cli.into()) => result,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the pipeline future above unwinds its scoped directories;
            // an unpacking thread still running removes its own on exit
            Err("Interrupted".into())
        }
    };

    // No process::exit: runtime shutdown has to wait for blocking tasks
    match result {
        Ok(outcome) => match serde_json::to_string_pretty(&outcome) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e.to_string()),
        },
        Err(e) => fail(&e.to_string()),
    }
}

async fn handle_copy(inputs: ActionInputs) -> Result<CopyOutcome, Box<dyn std::error::Error>> {
    let config = inputs.into_config()?;
    tracing::info!(
        object = %config.object,
        files = config.files.len(),
        directories = config.directories.len(),
        fail_on_not_found = config.fail_on_not_found,
        "starting"
    );

    let store = S3ObjectStore::from_env().await;
    let outcome = s3_extract::run(&config, &store).await?;
    Ok(outcome)
}

fn fail(message: &str) -> ExitCode {
    tracing::error!("{}", message);
    // Workflow command understood by CI runners; newlines must be escaped
    println!("::error::{}", escape_workflow_data(message));
    ExitCode::FAILURE
}

fn escape_workflow_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
