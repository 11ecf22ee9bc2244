use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_PATH: &str = "/etc/conveyor/conveyor.toml";
const ENV_PREFIX: &str = "CONVEYOR_";

/// Various configurations needed by the api.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub event_bus: EventBusConfig,
    pub fanout: FanoutConfig,
    pub vcs: VcsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// How many events the broadcast channel buffers per subscriber before
    /// slow subscribers start lagging.
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    /// Number of background workers draining the fan-out queue.
    pub workers: usize,

    /// How many accepted reports may wait for fan-out before new ones are
    /// dropped.
    pub queue_capacity: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 128,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VcsConfig {
    /// Prefix for the commit status descriptions we own on the host. The
    /// full description doubles as the correlation key during
    /// reconciliation, so changing this orphans previously pushed statuses.
    pub status_prefix: String,

    /// Capacity of the failed-push retry queue.
    pub retry_queue_capacity: usize,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            status_prefix: "conveyor".to_string(),
            retry_queue_capacity: 256,
        }
    }
}

impl Config {
    /// Returns a correctly deserialized config from defaults, the TOML file
    /// at `path_override` (or the default path), and `CONVEYOR_`-prefixed
    /// environment variables, in ascending order of precedence.
    pub fn parse(path_override: Option<&str>) -> Result<Config, figment::Error> {
        let path = path_override.unwrap_or(DEFAULT_CONFIG_PATH);

        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}
