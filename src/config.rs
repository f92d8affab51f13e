//! Environment configuration for board clients and the relay.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default (see `canvas::consts`). An unset or
//! unparsable variable falls back to that default; a parsed value that
//! breaks an invariant (zero tick, inverted bounds, ...) is a `ConfigError`.
//! Lookups go through a closure so tests never touch the process
//! environment.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use canvas::consts::{INTERPOLATION_WINDOW_MS, PRESENCE_KEEPALIVE_MS, PRESENCE_TICK_MS, SNAP_EPSILON_PX};
use canvas::doc::ElementBounds;

use crate::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS, RetryPolicy};

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be positive")]
    NotPositive { key: &'static str },
    #[error("MOODBOARD_PRESENCE_KEEPALIVE_MS ({keepalive_ms}) must not be shorter than the tick ({tick_ms})")]
    KeepaliveShorterThanTick { keepalive_ms: u128, tick_ms: u128 },
    #[error("element bounds are inconsistent: {0:?}")]
    InvalidBounds(ElementBounds),
}

fn env_parse<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// =============================================================================
// CANVAS
// =============================================================================

/// Tuning for one mounted board surface.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    /// How often the presence loop considers publishing.
    pub presence_tick: Duration,
    /// Re-publish a still pointer at least this often.
    pub presence_keepalive: Duration,
    pub interpolation_window_ms: f64,
    pub snap_epsilon_px: f64,
    pub bounds: ElementBounds,
    /// Applied to gesture-end writes and removals.
    pub retry: RetryPolicy,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            presence_tick: Duration::from_millis(PRESENCE_TICK_MS),
            presence_keepalive: Duration::from_millis(PRESENCE_KEEPALIVE_MS.unsigned_abs()),
            interpolation_window_ms: INTERPOLATION_WINDOW_MS,
            snap_epsilon_px: SNAP_EPSILON_PX,
            bounds: ElementBounds::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl CanvasConfig {
    /// Read `MOODBOARD_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a value parses but is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Same as [`CanvasConfig::from_env`] over an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a value parses but is out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let bounds = ElementBounds {
            min_w: env_parse(&lookup, "MOODBOARD_ELEMENT_MIN_W", defaults.bounds.min_w),
            max_w: env_parse(&lookup, "MOODBOARD_ELEMENT_MAX_W", defaults.bounds.max_w),
            min_h: env_parse(&lookup, "MOODBOARD_ELEMENT_MIN_H", defaults.bounds.min_h),
            max_h: env_parse(&lookup, "MOODBOARD_ELEMENT_MAX_H", defaults.bounds.max_h),
        };
        let retry = RetryPolicy {
            max_attempts: env_parse(&lookup, "MOODBOARD_RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts),
            base_delay: Duration::from_millis(env_parse(&lookup, "MOODBOARD_RETRY_BASE_MS", DEFAULT_BASE_DELAY_MS)),
            max_delay: Duration::from_millis(env_parse(&lookup, "MOODBOARD_RETRY_MAX_MS", DEFAULT_MAX_DELAY_MS)),
            jitter: defaults.retry.jitter,
        };

        let config = Self {
            presence_tick: Duration::from_millis(env_parse(&lookup, "MOODBOARD_PRESENCE_TICK_MS", PRESENCE_TICK_MS)),
            presence_keepalive: Duration::from_millis(env_parse(
                &lookup,
                "MOODBOARD_PRESENCE_KEEPALIVE_MS",
                PRESENCE_KEEPALIVE_MS.unsigned_abs(),
            )),
            interpolation_window_ms: env_parse(&lookup, "MOODBOARD_INTERP_WINDOW_MS", defaults.interpolation_window_ms),
            snap_epsilon_px: env_parse(&lookup, "MOODBOARD_SNAP_EPSILON_PX", defaults.snap_epsilon_px),
            bounds,
            retry,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.presence_tick.is_zero() {
            return Err(ConfigError::NotPositive { key: "MOODBOARD_PRESENCE_TICK_MS" });
        }
        if self.presence_keepalive < self.presence_tick {
            return Err(ConfigError::KeepaliveShorterThanTick {
                keepalive_ms: self.presence_keepalive.as_millis(),
                tick_ms: self.presence_tick.as_millis(),
            });
        }
        if !(self.interpolation_window_ms.is_finite() && self.interpolation_window_ms > 0.0) {
            return Err(ConfigError::NotPositive { key: "MOODBOARD_INTERP_WINDOW_MS" });
        }
        if !(self.snap_epsilon_px.is_finite() && self.snap_epsilon_px > 0.0) {
            return Err(ConfigError::NotPositive { key: "MOODBOARD_SNAP_EPSILON_PX" });
        }
        if !self.bounds.is_valid() {
            return Err(ConfigError::InvalidBounds(self.bounds));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::NotPositive { key: "MOODBOARD_RETRY_MAX_ATTEMPTS" });
        }
        if self.retry.base_delay.is_zero() {
            return Err(ConfigError::NotPositive { key: "MOODBOARD_RETRY_BASE_MS" });
        }
        Ok(())
    }

    /// Keep-alive in the millisecond unit the pointer tracker works in.
    #[must_use]
    pub fn keepalive_ms(&self) -> i64 {
        i64::try_from(self.presence_keepalive.as_millis()).unwrap_or(i64::MAX)
    }
}

// =============================================================================
// RELAY
// =============================================================================

/// Listen address of the relay binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: DEFAULT_PORT }
    }
}

impl RelayConfig {
    /// Read `BIND_ADDR` and `PORT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bind_addr: env_parse(&lookup, "BIND_ADDR", defaults.bind_addr),
            port: env_parse(&lookup, "PORT", defaults.port),
        }
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
