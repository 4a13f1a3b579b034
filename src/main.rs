//! ayd-mailto-alert - e-mail alert plugin for Ayd?.

use anyhow::Result;
use clap::Parser;

use ayd_mailto_alert::cli::{Cli, Command, LogFormat, usage, version_string};
use ayd_mailto_alert::{Dispatcher, JsonLineReporter};

/// Exit code for argument errors.
const EXIT_USAGE: i32 = 2;

/// Initialize the tracing subscriber with the specified log format.
///
/// Logs go to stderr; stdout carries the outcome line read by Ayd.
fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy();

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .flatten_event(true)
                .with_env_filter(filter)
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            eprintln!("{}", e);
            std::process::exit(EXIT_USAGE);
        }
        // --help
        Err(e) => e.exit(),
    };
    let log_format = cli.log_format;

    let invocation = match cli.into_command() {
        Ok(Command::Version) => {
            println!("{}", version_string());
            return Ok(());
        }
        Ok(Command::Dispatch(invocation)) => invocation,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("{}", usage());
            std::process::exit(EXIT_USAGE);
        }
    };

    init_logging(log_format);

    let dispatcher = Dispatcher::new(Box::new(JsonLineReporter::stdout()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let state = runtime.block_on(dispatcher.dispatch(&invocation));

    tracing::debug!(state = ?state, "dispatch finished");
    Ok(())
}
