//! downpore - Main entry point
//!
//! Drives an aria2 daemon over JSON-RPC. Prints one JSON document on stdout;
//! logs and errors go to stderr.

use std::process::ExitCode;

use anyhow::{Context, Result};
use downpore::{execute, Aria2Session, CliArgs, ClientError, Command, Config, Report, TokioClock};
use tracing::{debug, error};

/// Set up panic handler for unexpected errors
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();
        match panic_info.location() {
            Some(location) => error!(
                "PANIC occurred at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            None => error!("PANIC occurred at unknown location"),
        }
        let payload = panic_info.payload();
        if let Some(s) = payload.downcast_ref::<&str>() {
            error!("Panic message: {}", s);
        } else if let Some(s) = payload.downcast_ref::<String>() {
            error!("Panic message: {}", s);
        } else {
            error!("Panic message: unknown");
        }
        error!("Backtrace:\n{:?}", backtrace);
    }));
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_panic_handler();

    let args = CliArgs::parse_args();
    init_logging(&args);
    debug!("CLI arguments: {:?}", args);

    match run(&args).await {
        Ok(report) => match report.to_json_pretty() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => fail(anyhow::Error::from(e).context("Failed to render output")),
        },
        Err(e) => fail(e),
    }
}

/// Initialize logging based on verbosity settings
fn init_logging(args: &CliArgs) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    if args.verbose {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

async fn run(args: &CliArgs) -> Result<Report> {
    let config = Config::from_args(args);
    config.validate().context("Invalid configuration")?;
    let command = Command::from_config(&config).context("Invalid arguments")?;

    let session = Aria2Session::connect(&config.session_config())
        .await
        .context("Failed to connect to aria2")?;

    let report = execute(&session, &TokioClock::new(), &command)
        .await
        .with_context(|| format!("{:?} action failed", config.action))?;
    Ok(report)
}

/// Report an error on stderr and map it to the exit code of its kind
fn fail(err: anyhow::Error) -> ExitCode {
    eprintln!("Error: {:#}", err);
    let code = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ClientError>())
        .map_or(1, ClientError::exit_code);
    ExitCode::from(code as u8)
}
