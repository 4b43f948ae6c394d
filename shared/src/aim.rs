//! Clock-driven aim point computation
//!
//! The aim reticle sweeps a circle as a pure function of elapsed unscaled
//! time and a fixed configuration, so the point a player sees when they
//! commit a throw can be reproduced exactly for debugging or recording.
//! Only the local client consumes this for ray construction; nothing here
//! is replicated.

use crate::math::Vec2;

#[derive(Debug, Clone, Copy)]
pub struct AimConfig {
    /// Radians per second of reticle sweep.
    pub angular_velocity: f32,
    /// Phase at `elapsed = 0`, radians.
    pub initial_angle: f32,
    /// Sweep radius in screen units.
    pub radius: f32,
    /// Fixed displacement of the sweep center from the given center.
    pub center_offset: Vec2,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            angular_velocity: 2.4,
            initial_angle: 0.0,
            radius: 0.45,
            center_offset: Vec2::new(0.0, 0.0),
        }
    }
}

/// `center + center_offset + radius * (cos θ, sin θ)` with
/// `θ = initial_angle + angular_velocity * elapsed`. Stateless.
pub fn aim_point(config: &AimConfig, center: Vec2, elapsed: f32) -> Vec2 {
    let theta = config.initial_angle + config.angular_velocity * elapsed;
    Vec2::new(
        center.x + config.center_offset.x + config.radius * theta.cos(),
        center.y + config.center_offset.y + config.radius * theta.sin(),
    )
}
