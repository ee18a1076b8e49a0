//! Process configuration read from the environment.
//!
//! | Variable           | Meaning                                   |
//! |--------------------|-------------------------------------------|
//! | `RECEPTIONIST_KEY` | secret for `front-desk` (required)        |
//! | `SAFETY_KEY`       | secret for `race-control` (required)      |
//! | `OBSERVER_KEY`     | secret for `lap-line-tracker` (required)  |
//! | `DEV_MODE`         | `true` for one-minute races               |
//! | `PORT`             | listen port, default 3000                 |

use std::num::ParseIntError;

use racetrack_auth::RoleKeys;
use racetrack_race::RaceConfig;

/// Environment variable holding the front desk secret.
pub const RECEPTIONIST_KEY: &str = "RECEPTIONIST_KEY";
/// Environment variable holding the race control secret.
pub const SAFETY_KEY: &str = "SAFETY_KEY";
/// Environment variable holding the lap-line tracker secret.
pub const OBSERVER_KEY: &str = "OBSERVER_KEY";

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Why the configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One or more role secrets are unset or empty.
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingKeys(Vec<&'static str>),

    /// `PORT` is not a valid port number.
    #[error("invalid PORT `{value}`")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub keys: RoleKeys,
    pub race: RaceConfig,
    pub dev_mode: bool,
    pub port: u16,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// All missing secrets are reported together.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let front_desk = secret(RECEPTIONIST_KEY);
        let race_control = secret(SAFETY_KEY);
        let lap_line_tracker = secret(OBSERVER_KEY);

        let (Some(front_desk), Some(race_control), Some(lap_line_tracker)) =
            (&front_desk, &race_control, &lap_line_tracker)
        else {
            let missing = [
                (RECEPTIONIST_KEY, front_desk.is_none()),
                (SAFETY_KEY, race_control.is_none()),
                (OBSERVER_KEY, lap_line_tracker.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            return Err(ConfigError::MissingKeys(missing));
        };

        let dev_mode = lookup("DEV_MODE").is_some_and(|v| v == "true");

        let port = match lookup("PORT").filter(|value| !value.trim().is_empty()) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidPort { value, source })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            keys: RoleKeys::new(front_desk, race_control, lap_line_tracker),
            race: RaceConfig::for_mode(dev_mode),
            dev_mode,
            port,
        })
    }

    /// The address to listen on: every interface, configured port.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
