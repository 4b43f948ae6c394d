//! Scoring collision layer
//!
//! Boards are one-sided discs. A cast only ever consults this layer; the
//! rest of the scene is invisible to resolution, so stray geometry can
//! never score.

use crate::scoring::{DecodeMode, ScoringSurface};
use shared::{board_center, Ray, Vec3, BOARD_COUNT, BOARD_RADIUS};

/// How a collider converts a hit into a point value.
#[derive(Debug, Clone)]
pub enum ScoreSource {
    /// Texture-backed region, decoded from the hit UV.
    Surface {
        surface: ScoringSurface,
        mode: DecodeMode,
    },
    /// Static per-collider annotation for regions with no texture.
    Static { value: u8 },
}

#[derive(Debug, Clone)]
pub struct BoardCollider {
    pub board_index: u8,
    pub center: Vec3,
    /// Unit normal of the scoring face; hits are front-face only.
    pub normal: Vec3,
    pub radius: f32,
    pub source: ScoreSource,
}

#[derive(Debug)]
pub struct RayHit<'a> {
    pub collider: &'a BoardCollider,
    pub point: Vec3,
    pub distance: f32,
    /// Position on the scoring face, both components in [0, 1].
    pub uv: (f32, f32),
}

pub struct World {
    boards: Vec<BoardCollider>,
}

impl World {
    pub fn new(boards: Vec<BoardCollider>) -> Self {
        Self { boards }
    }

    /// Reference deployment: BOARD_COUNT dartboards in a row facing the
    /// throwers, each with a generated encoded-channel surface and a
    /// radius-1 probe for the wire gaps.
    pub fn standard() -> Self {
        let surface = ScoringSurface::dartboard(256);
        let boards = (1..=BOARD_COUNT)
            .map(|board_index| BoardCollider {
                board_index,
                center: board_center(board_index),
                normal: Vec3::new(0.0, 0.0, -1.0),
                radius: BOARD_RADIUS,
                source: ScoreSource::Surface {
                    surface: surface.clone(),
                    mode: DecodeMode::EncodedChannel { probe_radius: 1 },
                },
            })
            .collect();
        Self::new(boards)
    }

    pub fn boards(&self) -> &[BoardCollider] {
        &self.boards
    }

    /// Nearest front-face intersection within `max_distance`, or None.
    pub fn cast_ray(&self, ray: &Ray, max_distance: f32) -> Option<RayHit<'_>> {
        let mut nearest: Option<RayHit> = None;

        for board in &self.boards {
            let denom = ray.direction.dot(board.normal);
            // Parallel rays and back-face approaches never hit.
            if denom >= -1e-6 {
                continue;
            }

            let t = (board.center - ray.origin).dot(board.normal) / denom;
            if t <= 0.0 || t > max_distance {
                continue;
            }

            let point = ray.at(t);
            let offset = point - board.center;
            if offset.length() > board.radius {
                continue;
            }

            if nearest.as_ref().is_some_and(|hit| hit.distance <= t) {
                continue;
            }

            let (u_axis, v_axis) = face_basis(board.normal);
            let uv = (
                0.5 + offset.dot(u_axis) / (2.0 * board.radius),
                0.5 + offset.dot(v_axis) / (2.0 * board.radius),
            );
            nearest = Some(RayHit {
                collider: board,
                point,
                distance: t,
                uv,
            });
        }

        nearest
    }
}

/// Orthonormal (right, up) basis on a board face. +v follows world up
/// projected onto the face; +u completes the right-handed frame.
fn face_basis(normal: Vec3) -> (Vec3, Vec3) {
    let v_axis = (Vec3::UP - normal * Vec3::UP.dot(normal))
        .normalized()
        .unwrap_or(Vec3::FORWARD);
    (normal.cross(v_axis), v_axis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{BOARD_HEIGHT_Y, BOARD_PLANE_Z, MAX_THROW_DISTANCE};

    fn straight_at(board_index: u8) -> Ray {
        let center = board_center(board_index);
        Ray::new(
            Vec3::new(center.x, center.y, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        )
    }

    #[test]
    fn test_center_hit() {
        let world = World::standard();
        let hit = world
            .cast_ray(&straight_at(3), MAX_THROW_DISTANCE)
            .expect("center throw must hit");
        assert_eq!(hit.collider.board_index, 3);
        assert_approx_eq!(hit.distance, BOARD_PLANE_Z, 1e-4);
        assert_approx_eq!(hit.uv.0, 0.5, 1e-4);
        assert_approx_eq!(hit.uv.1, 0.5, 1e-4);
    }

    #[test]
    fn test_miss_between_boards() {
        let world = World::standard();
        let mid = (board_center(1).x + board_center(2).x) / 2.0;
        let ray = Ray::new(
            Vec3::new(mid, BOARD_HEIGHT_Y, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        assert!(world.cast_ray(&ray, MAX_THROW_DISTANCE).is_none());
    }

    #[test]
    fn test_max_distance_is_respected() {
        let world = World::standard();
        assert!(world.cast_ray(&straight_at(3), 2.0).is_none());
    }

    #[test]
    fn test_back_face_is_ignored() {
        let world = World::standard();
        let center = board_center(3);
        let behind = Ray::new(
            Vec3::new(center.x, center.y, BOARD_PLANE_Z + 2.0),
            Vec3::new(0.0, 0.0, -1.0),
        );
        assert!(world.cast_ray(&behind, MAX_THROW_DISTANCE).is_none());
    }

    #[test]
    fn test_uv_orientation() {
        let world = World::standard();
        let center = board_center(2);

        // Above center should push v above 0.5.
        let high = Ray::new(
            Vec3::new(center.x, center.y + 0.3, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let hit = world.cast_ray(&high, MAX_THROW_DISTANCE).unwrap();
        assert!(hit.uv.1 > 0.5);
        assert_approx_eq!(hit.uv.0, 0.5, 1e-4);

        // To the thrower's right should push u above 0.5.
        let right = Ray::new(
            Vec3::new(center.x + 0.3, center.y, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let hit = world.cast_ray(&right, MAX_THROW_DISTANCE).unwrap();
        assert!(hit.uv.0 > 0.5);
    }

    #[test]
    fn test_uv_stays_in_unit_square() {
        let world = World::standard();
        let center = board_center(4);
        for (dx, dy) in [(0.7, 0.0), (-0.7, 0.0), (0.0, 0.7), (0.5, -0.5)] {
            let ray = Ray::new(
                Vec3::new(center.x + dx, center.y + dy, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
            );
            if let Some(hit) = world.cast_ray(&ray, MAX_THROW_DISTANCE) {
                assert!((0.0..=1.0).contains(&hit.uv.0));
                assert!((0.0..=1.0).contains(&hit.uv.1));
            }
        }
    }

    #[test]
    fn test_nearest_board_wins() {
        // Two overlapping colliders at different depths; the closer one
        // must take the hit.
        let near = BoardCollider {
            board_index: 1,
            center: Vec3::new(0.0, 0.0, 4.0),
            normal: Vec3::new(0.0, 0.0, -1.0),
            radius: 1.0,
            source: ScoreSource::Static { value: 10 },
        };
        let far = BoardCollider {
            board_index: 2,
            center: Vec3::new(0.0, 0.0, 9.0),
            normal: Vec3::new(0.0, 0.0, -1.0),
            radius: 1.0,
            source: ScoreSource::Static { value: 20 },
        };
        let world = World::new(vec![far, near]);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        let hit = world.cast_ray(&ray, 25.0).unwrap();
        assert_eq!(hit.collider.board_index, 1);
    }
}
