//! Tunables for the simulation and the evaluator.
//!
//! Defaults reproduce the classic 800x600 field: gravity 0.8 per tick, a
//! terminal velocity of 15 and pipes scrolling left at 3 px per tick.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Every numeric constant the simulation reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Play field width; obstacles spawn at this x.
    pub field_width: f32,
    /// Bodies leaving `[0, field_height]` die.
    pub field_height: f32,

    pub body_x: f32,
    pub body_y: f32,
    pub body_width: u32,
    pub body_height: u32,
    /// Velocity a body starts each generation with (negative is upward).
    pub initial_velocity: f32,
    pub gravity: f32,
    pub terminal_velocity: f32,
    pub flap_impulse: f32,

    pub obstacle_width: u32,
    /// Height of each pipe segment sprite.
    pub segment_height: u32,
    pub gap_height: i32,
    /// Inclusive lower bound of the random gap center.
    pub gap_center_min: i32,
    /// Exclusive upper bound of the random gap center.
    pub gap_center_max: i32,
    pub obstacle_velocity: f32,
    /// A new obstacle spawns once the newest one is this far left of the right edge.
    pub spawn_trigger_distance: f32,

    pub decision_threshold: f32,
    pub survival_bonus: f64,
    pub pass_bonus: f64,
    pub death_penalty: f64,

    /// Optional cap on ticks per generation. `None` runs until extinction.
    pub tick_limit: Option<u64>,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            field_width: 800.0,
            field_height: 600.0,
            body_x: 100.0,
            body_y: 300.0,
            body_width: 68,
            body_height: 48,
            initial_velocity: -5.0,
            gravity: 0.8,
            terminal_velocity: 15.0,
            flap_impulse: -15.0,
            obstacle_width: 104,
            segment_height: 640,
            gap_height: 215,
            gap_center_min: 100,
            gap_center_max: 300,
            obstacle_velocity: 3.0,
            spawn_trigger_distance: 300.0,
            decision_threshold: 0.4,
            survival_bonus: 0.1,
            pass_bonus: 5.0,
            death_penalty: 1.0,
            tick_limit: None,
        }
    }
}

impl Tunables {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let tunables: Tunables = serde_json::from_str(&contents)?;
        tunables.validate()?;
        Ok(tunables)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Rejects values that would break the obstacle stream or make flapping
    /// unobservable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_width <= 0.0 || self.field_height <= 0.0 {
            return Err(ConfigError::Invalid("field dimensions must be positive"));
        }
        if self.body_width == 0 || self.body_height == 0 {
            return Err(ConfigError::Invalid("body sprite must not be empty"));
        }
        if self.obstacle_width == 0 || self.segment_height == 0 {
            return Err(ConfigError::Invalid("obstacle sprite must not be empty"));
        }
        if self.gap_center_min >= self.gap_center_max {
            return Err(ConfigError::Invalid(
                "gap_center_min must be below gap_center_max",
            ));
        }
        if self.gap_height <= 0 {
            return Err(ConfigError::Invalid("gap_height must be positive"));
        }
        if self.gravity <= 0.0 || self.terminal_velocity <= 0.0 {
            return Err(ConfigError::Invalid(
                "gravity and terminal_velocity must be positive",
            ));
        }
        if self.flap_impulse >= 0.0 || -self.flap_impulse <= self.gravity {
            return Err(ConfigError::Invalid(
                "flap_impulse must be upward and stronger than one gravity step",
            ));
        }
        if self.obstacle_velocity <= 0.0 || self.obstacle_velocity >= self.obstacle_width as f32 {
            return Err(ConfigError::Invalid(
                "obstacle_velocity must be positive and below obstacle_width",
            ));
        }
        if self.spawn_trigger_distance <= 0.0 || self.spawn_trigger_distance > self.field_width {
            return Err(ConfigError::Invalid(
                "spawn_trigger_distance must lie within the field width",
            ));
        }
        if self.tick_limit == Some(0) {
            return Err(ConfigError::Invalid("tick_limit must be at least 1"));
        }
        Ok(())
    }
}
