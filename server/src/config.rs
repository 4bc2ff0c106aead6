//! Runtime settings for the server.
//!
//! `main` fills a [`ServerConfig`] from command-line arguments; tests build
//! one directly, usually starting from `ServerConfig::default()`.

use shared::{PORT, TIME_STEP_MSEC};
use std::path::PathBuf;
use std::time::Duration;

/// Map loaded when `--map` is not given. Absolute, so the server finds it
/// from any working directory.
pub const DEFAULT_MAP_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/resources/antworld.png");

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub map_path: PathBuf,
    pub tick_duration: Duration,
    /// A socket read blocked for longer than this closes the connection.
    pub read_timeout: Duration,
    /// A nest silent for longer than this has its ants sent underground.
    pub underground_timeout: Duration,
    pub headless: bool,
    /// Seeds every random source in the simulation. `None` draws from entropy.
    pub seed: Option<u64>,
    pub spawner: SpawnerConfig,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: PORT,
            map_path: PathBuf::from(DEFAULT_MAP_PATH),
            tick_duration: Duration::from_millis(TIME_STEP_MSEC),
            read_timeout: Duration::from_secs(120),
            underground_timeout: Duration::from_secs(300),
            headless: false,
            seed: None,
            spawner: SpawnerConfig::default(),
        }
    }
}

/// Placement rules for food spawn sites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnerConfig {
    /// Sites are kept at least this far (on one axis) from every nest center.
    pub min_distance_to_nest: i32,
    /// Sites are kept at least this far (on one axis) from each other.
    pub min_distance_between_sites: i32,
    /// Random candidates tried before placement gives up.
    pub max_placement_attempts: u32,
    /// Chance per tick that one random site tries to spawn a pile.
    pub spawn_probability: f64,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            min_distance_to_nest: 150,
            min_distance_between_sites: 500,
            max_placement_attempts: 100_000,
            spawn_probability: 0.005,
        }
    }
}
