//! CLI argument definitions using Clap

use clap::{ArgAction, Parser, Subcommand};

/// voice-recorder - countdown-gated microphone recorder
#[derive(Parser, Debug)]
#[command(name = "voice-recorder")]
#[command(version)]
#[command(about = "Record from the microphone after a short countdown, then review, resume or discard")]
#[command(long_about = None)]
pub struct Cli {
    /// Countdown ticks before recording begins
    #[arg(short = 'c', long, value_name = "N")]
    pub countdown: Option<u32>,

    /// Time between countdown ticks (e.g., 1s, 500ms)
    #[arg(short = 't', long, value_name = "TIME")]
    pub tick: Option<String>,

    /// Stop a recording automatically after this long (e.g., 30s, 5m)
    #[arg(short = 'm', long, value_name = "TIME")]
    pub max_duration: Option<String>,

    /// Play audible cues for the countdown and recording events
    #[arg(long)]
    pub cues: bool,

    /// Input device name (see `voice-recorder devices`)
    #[arg(short = 'D', long, value_name = "NAME", env = "VOICE_RECORDER_DEVICE")]
    pub device: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// List audio input devices
    Devices,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &["countdown", "tick", "max_duration", "cues", "device"];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["voice-recorder"]);
        assert!(cli.countdown.is_none());
        assert!(cli.tick.is_none());
        assert!(cli.max_duration.is_none());
        assert!(!cli.cues);
        assert_eq!(cli.verbose, 0);
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_session_options() {
        let cli = Cli::parse_from([
            "voice-recorder",
            "--countdown",
            "5",
            "-t",
            "500ms",
            "--max-duration",
            "30s",
            "--cues",
            "--device",
            "USB Mic",
        ]);
        assert_eq!(cli.countdown, Some(5));
        assert_eq!(cli.tick, Some("500ms".to_string()));
        assert_eq!(cli.max_duration, Some("30s".to_string()));
        assert!(cli.cues);
        assert_eq!(cli.device, Some("USB Mic".to_string()));
    }

    #[test]
    fn cli_counts_verbosity() {
        let cli = Cli::parse_from(["voice-recorder", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_parses_devices() {
        let cli = Cli::parse_from(["voice-recorder", "devices", "-v"]);
        assert!(matches!(cli.command, Some(Commands::Devices)));
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["voice-recorder", "config", "set", "countdown", "5"]);
        if let Some(Commands::Config {
            action: ConfigAction::Set { key, value },
        }) = cli.command
        {
            assert_eq!(key, "countdown");
            assert_eq!(value, "5");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn cli_rejects_negative_countdown() {
        assert!(Cli::try_parse_from(["voice-recorder", "--countdown", "-1"]).is_err());
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("countdown"));
        assert!(is_valid_config_key("max_duration"));
        assert!(is_valid_config_key("device"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
