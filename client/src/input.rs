//! Throw input and the sweeping aim reticle
//!
//! The reticle position is a pure function of elapsed unscaled time
//! ([`shared::aim`]), so the point the player saw when they committed a
//! throw can be reproduced after the fact. Only this client consumes it;
//! the server re-derives everything that matters from the submitted ray.

use macroquad::prelude::{is_key_down, KeyCode};
use shared::aim::{aim_point, AimConfig};
use shared::{board_center, Vec2, Vec3, BOARD_PLANE_Z, THROW_HEIGHT_Y};
use std::time::Instant;

/// Edge-detected control events for one frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameInput {
    pub throw_pressed: bool,
    pub reconnect: bool,
}

pub struct InputManager {
    started: Instant,
    aim_config: AimConfig,

    // Previous frame key states for edge detection
    prev_throw: bool,
    prev_reconnect: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            aim_config: AimConfig::default(),
            prev_throw: false,
            prev_reconnect: false,
        }
    }

    /// Unscaled wall-clock seconds driving the aim sweep.
    pub fn elapsed_unscaled(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// World-space aim point, sweeping around the player's own board.
    pub fn current_aim(&self, board_index: u8) -> Vec2 {
        let center = board_center(board_index);
        aim_point(
            &self.aim_config,
            Vec2::new(center.x, center.y),
            self.elapsed_unscaled(),
        )
    }

    pub fn update(&mut self) -> FrameInput {
        let throw = is_key_down(KeyCode::Space);
        let reconnect = is_key_down(KeyCode::R);

        let input = FrameInput {
            throw_pressed: throw && !self.prev_throw,
            reconnect: reconnect && !self.prev_reconnect,
        };

        self.prev_throw = throw;
        self.prev_reconnect = reconnect;
        input
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Where this seat releases darts from: in front of its own board, at
/// hand height, on the throw line.
pub fn throw_origin(board_index: u8) -> Vec3 {
    let center = board_center(board_index);
    Vec3::new(center.x, THROW_HEIGHT_Y, 0.0)
}

/// Builds the throw ray for an aim point, world units on the board plane.
pub fn throw_ray(aim: Vec2, board_index: u8) -> (Vec3, Vec3) {
    let origin = throw_origin(board_index);
    let target = Vec3::new(aim.x, aim.y, BOARD_PLANE_Z);
    let direction = (target - origin).normalized().unwrap_or(Vec3::FORWARD);
    (origin, direction)
}
