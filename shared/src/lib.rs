pub mod aim;
pub mod flight;
pub mod math;
pub mod protocol;

pub use math::{Ray, Vec2, Vec3};
pub use protocol::{Packet, ProjectileRecord};

pub const PROTOCOL_VERSION: u32 = 1;

/// Number of independent scoring boards in the reference deployment.
pub const BOARD_COUNT: u8 = 5;
/// Every board starts a game at the traditional 501.
pub const STARTING_SCORE: u32 = 501;

pub const BOARD_PLANE_Z: f32 = 8.0;
pub const BOARD_RADIUS: f32 = 0.75;
pub const BOARD_SPACING: f32 = 2.0;
pub const BOARD_HEIGHT_Y: f32 = 1.6;

pub const PROJECTILE_SPEED: f32 = 40.0;
pub const MIN_TRAVEL_TIME: f32 = 0.05;
pub const MAX_THROW_DISTANCE: f32 = 25.0;
/// Distance along the ray a missed throw still visually lands at.
pub const MISS_FALLBACK_DISTANCE: f32 = 12.0;

pub const ARC_HEIGHT: f32 = 0.06;
pub const SPIN_RATE_DEG: f32 = 540.0;
pub const STICK_DEPTH: f32 = 0.04;
pub const LIFE_AFTER_STICK: f32 = 6.0;

pub const THROW_HEIGHT_Y: f32 = 1.5;

/// World-space center of a board, 1-based index. Boards hang in a row on the
/// plane `z = BOARD_PLANE_Z`, facing the throwers.
pub fn board_center(board_index: u8) -> Vec3 {
    let mid = (BOARD_COUNT as f32 + 1.0) / 2.0;
    Vec3 {
        x: (board_index as f32 - mid) * BOARD_SPACING,
        y: BOARD_HEIGHT_Y,
        z: BOARD_PLANE_Z,
    }
}
