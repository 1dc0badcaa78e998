//! Session configuration.

use std::time::Duration;

use coinrush_protocol::Vec2;
use serde::{Deserialize, Serialize};

use crate::SessionError;

// ---------------------------------------------------------------------------
// SpawnArea
// ---------------------------------------------------------------------------

/// The rectangle collectibles spawn in. Both corners are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnArea {
    pub min: Vec2,
    pub max: Vec2,
}

impl SpawnArea {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        (self.min.x..=self.max.x).contains(&point.x) && (self.min.y..=self.max.y).contains(&point.y)
    }
}

impl Default for SpawnArea {
    fn default() -> Self {
        Self {
            min: Vec2::new(-8.0, -4.0),
            max: Vec2::new(8.0, 4.0),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Settings for the single session a server runs.
///
/// Every field has a default, so a JSON config may name only the fields
/// it wants to change:
///
/// ```json
/// { "duration_secs": 30, "rng_seed": 7 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session length in seconds.
    pub duration_secs: f32,

    /// Seconds of session time between collectible spawns.
    pub spawn_interval_secs: f32,

    pub spawn_area: SpawnArea,

    /// Seed for spawn positions. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60.0,
            spawn_interval_secs: 1.0,
            spawn_area: SpawnArea::default(),
            rng_seed: None,
        }
    }
}

impl SessionConfig {
    /// Checks that a session can run with these settings.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] when a duration is not a positive
    /// finite number of seconds, or the spawn area is inverted or not
    /// finite.
    pub fn validate(&self) -> Result<(), SessionError> {
        positive_secs("duration_secs", self.duration_secs)?;
        positive_secs("spawn_interval_secs", self.spawn_interval_secs)?;

        let SpawnArea { min, max } = self.spawn_area;
        if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
            return Err(SessionError::InvalidConfig(
                "spawn_area corners must be finite".into(),
            ));
        }
        if min.x > max.x || min.y > max.y {
            return Err(SessionError::InvalidConfig(format!(
                "spawn_area min ({}, {}) exceeds max ({}, {})",
                min.x, min.y, max.x, max.y
            )));
        }
        Ok(())
    }

    /// The spawn interval as a [`Duration`]. Only meaningful once
    /// [`validate`](Self::validate) has passed.
    pub fn spawn_interval(&self) -> Duration {
        Duration::try_from_secs_f32(self.spawn_interval_secs).unwrap_or(Duration::ZERO)
    }
}

fn positive_secs(field: &str, value: f32) -> Result<(), SessionError> {
    if value.is_finite() && value > 0.0 && Duration::try_from_secs_f32(value).is_ok() {
        Ok(())
    } else {
        Err(SessionError::InvalidConfig(format!(
            "{field} must be a positive number of seconds, got {value}"
        )))
    }
}
