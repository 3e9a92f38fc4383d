use std::path::PathBuf;
use std::time::Duration;

use crate::game::constants::{net, timing, world};

/// Configuration problems found by [`ClientConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("server URL must start with ws:// or wss://, got '{0}'")]
    BadServerUrl(String),
    #[error("tick_rate must be 1-1000")]
    BadTickRate,
    #[error("frame_rate must be at least tick_rate")]
    FrameRateBelowTickRate,
    #[error("water_radius must be 0-16")]
    BadWaterRadius,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the game server
    pub server_url: String,
    /// Simulation steps per second
    pub tick_rate: u32,
    /// Display callbacks per second (native host only)
    pub frame_rate: u32,
    /// Commands buffered while connecting
    pub pending_capacity: usize,
    /// Neighbourhood radius for water depth
    pub water_radius: i32,
    /// Optional plain-text tile grid to load at startup
    pub map_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: net::DEFAULT_ENDPOINT.to_string(),
            tick_rate: timing::TICK_RATE,
            frame_rate: timing::FRAME_RATE,
            pending_capacity: net::PENDING_CAPACITY,
            water_radius: world::DEFAULT_WATER_RADIUS,
            map_path: None,
        }
    }
}

impl ClientConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary variable lookup; invalid values warn and
    /// keep the default
    pub fn load_from(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = var("SERVER_URL") {
            config.server_url = url;
        }

        if let Some(rate) = var("TICK_RATE") {
            match rate.parse::<u32>() {
                Ok(parsed) if (1..=1000).contains(&parsed) => config.tick_rate = parsed,
                Ok(_) => tracing::warn!("TICK_RATE must be 1-1000, using default"),
                Err(_) => tracing::warn!("Invalid TICK_RATE '{}', using default", rate),
            }
        }

        if let Some(rate) = var("FRAME_RATE") {
            match rate.parse::<u32>() {
                Ok(parsed) if parsed > 0 => config.frame_rate = parsed,
                Ok(_) => tracing::warn!("FRAME_RATE must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid FRAME_RATE '{}', using default", rate),
            }
        }

        if let Some(capacity) = var("PENDING_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(parsed) => config.pending_capacity = parsed,
                Err(_) => tracing::warn!("Invalid PENDING_CAPACITY '{}', using default", capacity),
            }
        }

        if let Some(radius) = var("WATER_RADIUS") {
            match radius.parse::<i32>() {
                Ok(parsed) if (0..=16).contains(&parsed) => config.water_radius = parsed,
                Ok(_) => tracing::warn!("WATER_RADIUS must be 0-16, using default"),
                Err(_) => tracing::warn!("Invalid WATER_RADIUS '{}', using default", radius),
            }
        }

        if let Some(path) = var("MAP_PATH") {
            if !path.is_empty() {
                config.map_path = Some(PathBuf::from(path));
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("ws://") || self.server_url.starts_with("wss://")) {
            return Err(ConfigError::BadServerUrl(self.server_url.clone()));
        }
        if !(1..=1000).contains(&self.tick_rate) {
            return Err(ConfigError::BadTickRate);
        }
        if self.frame_rate < self.tick_rate {
            return Err(ConfigError::FrameRateBelowTickRate);
        }
        if !(0..=16).contains(&self.water_radius) {
            return Err(ConfigError::BadWaterRadius);
        }
        Ok(())
    }

    /// Simulation step interval
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }

    /// Display callback interval
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}
