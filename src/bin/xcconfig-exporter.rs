use std::process::ExitCode;

use clap::Parser;
use xchammer::exporter::{dispatch, ExporterCli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    xchammer::init_tracing();

    let cli = ExporterCli::parse();
    tracing::debug!(?cli, "Exporter arguments parsed");
    dispatch(cli).await
}
