//! Typed configuration for the emoji gravity world.
//!
//! All fields carry serde defaults so a config file can override any
//! subset. The defaults mirror the tuning of the original installation:
//! bouncy bodies (restitution 0.75), almost frictionless contact, light
//! air drag, five-minute body lifetime.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for a [`SimulationWorld`](crate::SimulationWorld).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// World width in pixels.
    #[serde(default = "default_width")]
    pub width: f64,

    /// World height in pixels.
    #[serde(default = "default_height")]
    pub height: f64,

    /// Downward acceleration in pixels per second squared.
    #[serde(default = "default_gravity")]
    pub gravity: f64,

    /// Radius of one emoji body in pixels.
    #[serde(default = "default_body_radius")]
    pub body_radius: f64,

    /// Fraction of normal velocity retained after a bounce (0 = dead stop,
    /// 1 = fully elastic).
    #[serde(default = "default_restitution")]
    pub restitution: f64,

    /// Tangential velocity fraction lost per contact.
    #[serde(default = "default_friction")]
    pub friction: f64,

    /// Velocity fraction lost to air drag per simulation tick.
    #[serde(default = "default_friction_air")]
    pub friction_air: f64,

    /// Vertical spawn position above the visible area (negative = above
    /// the top edge).
    #[serde(default = "default_spawn_height")]
    pub spawn_height: f64,

    /// Seconds a body lives before it is removed from the world.
    #[serde(default = "default_body_ttl_seconds")]
    pub body_ttl_seconds: u64,

    /// Milliseconds between simulation ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seed for the spawn-position generator. `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl WorldConfig {
    /// Body time-to-live as a [`Duration`].
    pub const fn body_ttl(&self) -> Duration {
        Duration::from_secs(self.body_ttl_seconds)
    }

    /// Tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            gravity: default_gravity(),
            body_radius: default_body_radius(),
            restitution: default_restitution(),
            friction: default_friction(),
            friction_air: default_friction_air(),
            spawn_height: default_spawn_height(),
            body_ttl_seconds: default_body_ttl_seconds(),
            tick_interval_ms: default_tick_interval_ms(),
            seed: None,
        }
    }
}

const fn default_width() -> f64 {
    800.0
}

const fn default_height() -> f64 {
    600.0
}

const fn default_gravity() -> f64 {
    900.0
}

const fn default_body_radius() -> f64 {
    15.0
}

const fn default_restitution() -> f64 {
    0.75
}

const fn default_friction() -> f64 {
    0.001
}

const fn default_friction_air() -> f64 {
    0.01
}

const fn default_spawn_height() -> f64 {
    -30.0
}

const fn default_body_ttl_seconds() -> u64 {
    300
}

const fn default_tick_interval_ms() -> u64 {
    16
}
