//! ScribeRecorder CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use scribe_recorder::cli::{
    app::{load_merged_config, parse_record_options, run_record, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    devices_cmd::handle_devices_command,
    presenter::Presenter,
    recover_cmd::handle_recover_command,
};
use scribe_recorder::domain::config::AppConfig;
use scribe_recorder::infrastructure::{CpalCapture, XdgConfigStore};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut presenter = Presenter::new();

    match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Devices => {
            handle_devices_command(&CpalCapture::new(), &presenter);
            ExitCode::SUCCESS
        }
        Commands::Recover { action } => {
            let config = load_merged_config(AppConfig::empty()).await;
            if let Err(e) = handle_recover_command(action, &config, &mut presenter).await {
                presenter.error(&e);
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Record(args) => {
            // Build CLI config from args
            let cli_config = AppConfig {
                source: args.source.clone(),
                max_duration: args.max_duration.clone(),
                visualizer: args.visualizer.clone(),
                ..AppConfig::empty()
            };
            let config = load_merged_config(cli_config).await;

            let options = match parse_record_options(&config, args.title, !args.no_upload) {
                Ok(options) => options,
                Err(e) => {
                    presenter.error(&e);
                    return ExitCode::from(EXIT_USAGE_ERROR);
                }
            };

            run_record(options, config).await
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the `-v` level
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("scribe_recorder={},warn", level))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
