//! `xo` binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use xo_cli::cli::Cli;
use xo_cli::commands;
use xo_cli::output::OutputFormat;
use xo_cli::CliError;
use xo_client::XoClient;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_status())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.raw_config().validate()?;
    let format = OutputFormat::new(cli.format);

    let client = XoClient::connect(config).await?;
    let mut stdout = io::stdout().lock();
    let result = commands::execute(&client, &mut stdout, &format, &cli.command).await;
    client.close().await;
    result
}
