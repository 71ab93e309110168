use clap::Parser;
use jeka_runner::Jeka;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Jeka::parse();

    // RUST_LOG wins over -v/-vv
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.verbosity().filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let stacktrace = cli.wants_stacktrace();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", jeka_runner::display::format_error(&err, stacktrace));
            ExitCode::FAILURE
        }
    }
}
