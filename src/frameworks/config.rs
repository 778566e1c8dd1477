use crate::domain::{SimulationTuning, TuningError};
use crate::use_cases::TargetSelection;
use std::{env, fs, io, path::PathBuf, time::Duration};
use thiserror::Error;

// Runtime constants (not simulation tuning).

/// Well-known port the telemetry server pushes to after registration.
pub const LISTENER_PORT: u16 = 12110;
pub const MESSAGE_CHANNEL_CAPACITY: usize = 1024;
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("SWARM_SERVER_PORT is required")]
    MissingServerPort,
    #[error("SWARM_SERVER_PORT {0:?} is not a valid port")]
    InvalidServerPort(String),
    #[error("failed to read tuning file {path}")]
    TuningRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse tuning file {path}")]
    TuningParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid tuning in {path}")]
    TuningInvalid {
        path: PathBuf,
        #[source]
        source: TuningError,
    },
    #[error("SWARM_TARGET_SELECTION {0:?} is not one of \"peer\" or \"random\"")]
    InvalidTargetSelection(String),
}

pub fn server_address() -> String {
    env::var("SWARM_SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string())
}

pub fn server_port() -> Result<u16, ConfigurationError> {
    parse_server_port(env::var("SWARM_SERVER_PORT").ok())
}

pub fn parse_server_port(value: Option<String>) -> Result<u16, ConfigurationError> {
    let value = value.ok_or(ConfigurationError::MissingServerPort)?;
    value
        .trim()
        .parse()
        .map_err(|_| ConfigurationError::InvalidServerPort(value))
}

/// Simulation tuning from `SWARM_TUNING_PATH`, or defaults when unset.
pub fn tuning() -> Result<SimulationTuning, ConfigurationError> {
    match env::var_os("SWARM_TUNING_PATH") {
        Some(path) => load_tuning(PathBuf::from(path)),
        None => Ok(SimulationTuning::default()),
    }
}

pub fn load_tuning(path: PathBuf) -> Result<SimulationTuning, ConfigurationError> {
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(source) => return Err(ConfigurationError::TuningRead { path, source }),
    };
    let tuning = match parse_tuning(&text) {
        Ok(tuning) => tuning,
        Err(source) => return Err(ConfigurationError::TuningParse { path, source }),
    };
    tuning
        .validate()
        .map_err(|source| ConfigurationError::TuningInvalid { path, source })?;
    Ok(tuning)
}

/// Which emitter a chunk attracts; the triggering peer unless overridden.
pub fn target_selection() -> Result<TargetSelection, ConfigurationError> {
    parse_target_selection(env::var("SWARM_TARGET_SELECTION").ok())
}

pub fn parse_target_selection(value: Option<String>) -> Result<TargetSelection, ConfigurationError> {
    let Some(value) = value else {
        return Ok(TargetSelection::default());
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "peer" => Ok(TargetSelection::TriggeringPeer),
        "random" => Ok(TargetSelection::RandomKnownPeer),
        _ => Err(ConfigurationError::InvalidTargetSelection(value)),
    }
}

pub fn parse_tuning(text: &str) -> Result<SimulationTuning, toml::de::Error> {
    toml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_port_is_missing_then_returns_missing_server_port() {
        assert!(matches!(
            parse_server_port(None),
            Err(ConfigurationError::MissingServerPort)
        ));
    }

    #[test]
    fn when_port_is_not_numeric_then_returns_invalid_server_port() {
        assert!(matches!(
            parse_server_port(Some("eighty".into())),
            Err(ConfigurationError::InvalidServerPort(value)) if value == "eighty"
        ));
        assert!(parse_server_port(Some("70000".into())).is_err());
    }

    #[test]
    fn when_port_is_numeric_then_it_is_parsed() {
        assert_eq!(parse_server_port(Some(" 9000 ".into())).ok(), Some(9000));
    }

    #[test]
    fn when_tuning_overrides_some_fields_then_others_keep_defaults() {
        let tuning = parse_tuning(
            r#"
            seed = 42

            [force]
            repulsion = 4.0

            [world]
            width = 640.0
            "#,
        )
        .expect("valid tuning");

        assert_eq!(tuning.seed, Some(42));
        assert_eq!(tuning.force.repulsion, 4.0);
        assert_eq!(tuning.force.max_force, 50.0);
        assert_eq!(tuning.world.width, 640.0);
        assert_eq!(tuning.world.height, 800.0);
        assert_eq!(tuning.emitter.radius_min, 10.0);
    }

    #[test]
    fn when_tuning_file_is_missing_then_returns_read_error() {
        let result = load_tuning(PathBuf::from("/nonexistent/swarm-tuning.toml"));

        assert!(matches!(result, Err(ConfigurationError::TuningRead { .. })));
    }

    #[test]
    fn when_tuning_file_has_empty_charge_range_then_returns_invalid() {
        let path = env::temp_dir().join(format!("swarm-tuning-{}.toml", std::process::id()));
        fs::write(&path, "[emitter]\ncharge_min = 0.5\ncharge_max = 0.5\n").expect("temp dir is writable");

        let result = load_tuning(path.clone());
        let _ = fs::remove_file(&path);

        assert!(matches!(
            result,
            Err(ConfigurationError::TuningInvalid {
                source: TuningError::EmptyChargeRange { .. },
                ..
            })
        ));
    }

    #[test]
    fn when_target_selection_is_unset_then_triggering_peer_is_used() {
        assert_eq!(
            parse_target_selection(None).ok(),
            Some(TargetSelection::TriggeringPeer)
        );
    }

    #[test]
    fn when_target_selection_is_random_then_random_known_peer_is_used() {
        assert_eq!(
            parse_target_selection(Some(" Random ".into())).ok(),
            Some(TargetSelection::RandomKnownPeer)
        );
        assert!(matches!(
            parse_target_selection(Some("nearest".into())),
            Err(ConfigurationError::InvalidTargetSelection(value)) if value == "nearest"
        ));
    }

    #[test]
    fn when_tuning_has_wrong_types_then_parse_fails() {
        assert!(parse_tuning("[force]\nrepulsion = \"strong\"").is_err());
    }
}
