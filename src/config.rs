use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::opc_client::OpcClient;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:7890";
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_QUEUE_CAPACITY: usize = 25;

/// Client settings. Zero durations fall back to their defaults, except the
/// write timeout where zero disables the deadline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// OPC server as `host:port`
    pub address: String,
    pub width: usize,
    pub height: usize,
    pub flush_interval_ms: u64,
    /// Pending frames held before new submissions are dropped
    pub queue_capacity: usize,
    pub connect_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            address: DEFAULT_ADDRESS.to_string(),
            width: 0,
            height: 0,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL.as_millis() as u64,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            connect_timeout_ms: 1000,
            write_timeout_ms: 1000,
        }
    }
}

impl ClientConfig {
    pub fn new(address: impl Into<String>, width: usize, height: usize) -> Self {
        ClientConfig {
            address: address.into(),
            width,
            height,
            ..Default::default()
        }
    }

    /// Set the flush interval. Sub-millisecond periods round up to 1 ms so
    /// only an exact zero selects the default.
    pub fn set_flush_interval(&mut self, interval: Duration) {
        self.flush_interval_ms = interval.as_nanos().div_ceil(1_000_000) as u64;
    }

    pub fn flush_interval(&self) -> Duration {
        match self.flush_interval_ms {
            0 => DEFAULT_FLUSH_INTERVAL,
            ms => Duration::from_millis(ms),
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }

    pub fn connect_timeout(&self) -> Duration {
        match self.connect_timeout_ms {
            0 => Duration::from_millis(1000),
            ms => Duration::from_millis(ms),
        }
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        match self.write_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.address.rsplit_once(':').map_or(true, |(host, port)| {
            host.is_empty() || port.parse::<u16>().is_err()
        }) {
            return Err(ConfigError::InvalidAddress {
                address: self.address.clone(),
                reason: "expected host:port".to_string(),
            });
        }
        Ok(())
    }
}

/// A strip of evenly spaced LEDs, see [`crate::Layout::register_strip`]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripConfig {
    pub index: usize,
    pub count: usize,
    pub x: f64,
    pub y: f64,
    pub spacing: f64,
    /// Radians from the x axis
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub reversed: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedConfig {
    pub index: usize,
    pub x: usize,
    pub y: usize,
}

/// LED layout loaded from JSON
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub strips: Vec<StripConfig>,
    #[serde(default)]
    pub leds: Vec<LedConfig>,
}

impl LayoutConfig {
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Register every strip, then every single LED, on `client`
    pub fn apply<C: crate::Connector>(&self, client: &mut OpcClient<C>) {
        for strip in &self.strips {
            client.register_strip(
                strip.index,
                strip.count,
                strip.x,
                strip.y,
                strip.spacing,
                strip.angle,
                strip.reversed,
            );
        }
        for led in &self.leds {
            client.register_led(led.index, led.x, led.y);
        }
    }
}
