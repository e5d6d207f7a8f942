use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    xchammer::init_tracing();
    tracing::debug!("CLI application startup: tracing initialised");

    let code = xchammer::dispatch(std::env::args_os()).await;
    tracing::debug!(?code, "CLI finished");
    code
}
