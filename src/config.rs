//! Runtime configuration for a race session, including timing knobs.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the embedder looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/race.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RACE_SESSION_CONFIG_PATH";

const DEFAULT_ROOM_SIZE: usize = 2;
const DEFAULT_COUNTDOWN_MS: u64 = 5_000;
const DEFAULT_COUNTDOWN_TICK_MS: u64 = 100;
const DEFAULT_EVENT_CAPACITY: usize = 64;
const DEFAULT_TRANSITION_TIMEOUT_MS: u64 = 5_000;

/// Immutable runtime configuration shared across a session.
#[derive(Debug, Clone)]
pub struct RaceConfig {
    /// Number of participants a room holds; the countdown starts once the
    /// roster reaches this size.
    pub room_size: usize,
    /// Total countdown length before the race begins.
    pub countdown: Duration,
    /// Granularity of the countdown timer task.
    pub countdown_tick: Duration,
    /// Capacity of the outbound event broadcast channel.
    pub event_capacity: usize,
    /// Upper bound on the in-memory work attached to a phase transition.
    pub transition_timeout: Option<Duration>,
}

impl RaceConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), ?config, "loaded race session config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Convenience constructor used when the embedder already knows the room size.
    pub fn with_room_size(room_size: usize) -> Self {
        Self {
            room_size,
            ..Self::default()
        }
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            room_size: DEFAULT_ROOM_SIZE,
            countdown: Duration::from_millis(DEFAULT_COUNTDOWN_MS),
            countdown_tick: Duration::from_millis(DEFAULT_COUNTDOWN_TICK_MS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            transition_timeout: Some(Duration::from_millis(DEFAULT_TRANSITION_TIMEOUT_MS)),
        }
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Deserialize)]
struct RawConfig {
    room_size: usize,
    countdown_ms: Option<u64>,
    countdown_tick_ms: Option<u64>,
    event_capacity: Option<usize>,
    transition_timeout_ms: Option<u64>,
}

impl From<RawConfig> for RaceConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = RaceConfig::default();
        Self {
            room_size: value.room_size,
            countdown: value
                .countdown_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.countdown),
            countdown_tick: value
                .countdown_tick_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.countdown_tick),
            event_capacity: value.event_capacity.unwrap_or(defaults.event_capacity),
            transition_timeout: value
                .transition_timeout_ms
                .map(Duration::from_millis)
                .or(defaults.transition_timeout),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
