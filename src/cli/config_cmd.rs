//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;
    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;
    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    ensure_known_key(key)?;
    let config = store.load().await?;
    presenter.output(read_value(&config, key).as_deref().unwrap_or(NOT_SET));
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    for key in VALID_CONFIG_KEYS {
        presenter.key_value(key, read_value(&config, key).as_deref().unwrap_or(NOT_SET));
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn ensure_known_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Validate `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "countdown" => {
            let n = value
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("Value must be a whole number of at least 1".to_string()))?;
            config.countdown = Some(n);
        }
        "tick" | "max_duration" => {
            value
                .parse::<Duration>()
                .map_err(|e| invalid(e.to_string()))?;
            if key == "tick" {
                config.tick = Some(value.to_string());
            } else {
                config.max_duration = Some(value.to_string());
            }
        }
        "cues" => {
            let enabled = parse_bool(value)
                .map_err(|_| invalid("Value must be 'true' or 'false'".to_string()))?;
            config.cues = Some(enabled);
        }
        "device" => config.device = Some(value.to_string()),
        _ => return Err(invalid("Unknown key".to_string())),
    }
    Ok(())
}

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "countdown" => config.countdown.map(|n| n.to_string()),
        "tick" => config.tick.clone(),
        "max_duration" => config.max_duration.clone(),
        "cues" => config.cues.map(|b| b.to_string()),
        "device" => config.device.clone(),
        _ => None,
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("true"), Ok(true));
        assert_eq!(parse_bool("no"), Ok(false));
        assert_eq!(parse_bool("1"), Ok(true));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn countdown_must_be_positive() {
        let mut config = AppConfig::empty();
        assert!(apply_value(&mut config, "countdown", "0").is_err());
        assert!(apply_value(&mut config, "countdown", "three").is_err());
        apply_value(&mut config, "countdown", "5").unwrap();
        assert_eq!(config.countdown, Some(5));
    }

    #[test]
    fn durations_are_validated() {
        let mut config = AppConfig::empty();
        assert!(apply_value(&mut config, "tick", "soon").is_err());
        apply_value(&mut config, "tick", "500ms").unwrap();
        apply_value(&mut config, "max_duration", "2m30s").unwrap();
        assert_eq!(config.tick, Some("500ms".to_string()));
        assert_eq!(config.max_duration, Some("2m30s".to_string()));
    }

    #[test]
    fn cues_accept_bool_words() {
        let mut config = AppConfig::empty();
        apply_value(&mut config, "cues", "yes").unwrap();
        assert_eq!(config.cues, Some(true));
        let err = apply_value(&mut config, "cues", "loud").unwrap_err();
        assert!(err.to_string().contains("cues"));
    }

    #[test]
    fn read_back_every_key() {
        let config = AppConfig {
            device: Some("USB Mic".to_string()),
            ..AppConfig::defaults()
        };
        assert_eq!(read_value(&config, "countdown"), Some("3".to_string()));
        assert_eq!(read_value(&config, "tick"), Some("1s".to_string()));
        assert_eq!(read_value(&config, "max_duration"), Some("5m".to_string()));
        assert_eq!(read_value(&config, "cues"), Some("false".to_string()));
        assert_eq!(read_value(&config, "device"), Some("USB Mic".to_string()));
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(ensure_known_key("api_key").is_err());
        assert!(ensure_known_key("tick").is_ok());
    }
}
