//! voice-recorder CLI entry point

use std::process::ExitCode;

use clap::Parser;

use voice_recorder::cli::{
    app::{
        load_merged_config, run_devices, run_session, SessionOptions, EXIT_ERROR,
        EXIT_USAGE_ERROR,
    },
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    logging::init_logging,
    presenter::Presenter,
};
use voice_recorder::domain::config::AppConfig;
use voice_recorder::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let presenter = Presenter::new();
    let store = XdgConfigStore::new();

    // Handle subcommands
    match cli.command {
        Some(Commands::Config { action }) => {
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            return ExitCode::SUCCESS;
        }
        Some(Commands::Devices) => return run_devices(&presenter),
        None => {}
    }

    let cli_config = AppConfig {
        countdown: cli.countdown,
        tick: cli.tick.clone(),
        max_duration: cli.max_duration.clone(),
        cues: if cli.cues { Some(true) } else { None },
        device: cli.device.clone(),
    };
    let config = load_merged_config(&store, cli_config).await;

    let options = match SessionOptions::from_config(&config) {
        Ok(options) => options,
        Err(e) => {
            presenter.error(&e);
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    run_session(options).await
}
