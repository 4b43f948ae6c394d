//! Presentation of boards, scores, darts, and the aim reticle
//!
//! Everything drawn here is derived per frame from replicated state plus
//! the clock; the renderer holds no animation state of its own.

use crate::game::DartView;
use crate::holster::HolsterState;
use macroquad::prelude::{
    clear_background, draw_circle, draw_circle_lines, draw_line, draw_text, is_key_down, Color,
    KeyCode,
};
use shared::{board_center, Vec2, Vec3, BOARD_COUNT, BOARD_PLANE_Z, BOARD_RADIUS, THROW_HEIGHT_Y};

const BACKGROUND: Color = Color::new(0.10, 0.10, 0.10, 1.0);
const BOARD_FACE: Color = Color::new(0.82, 0.76, 0.62, 1.0);
const BOARD_RIM: Color = Color::new(0.25, 0.25, 0.25, 1.0);
const BULL: Color = Color::new(0.75, 0.20, 0.18, 1.0);
const OWN_BOARD: Color = Color::new(0.30, 0.80, 0.35, 1.0);
const DART: Color = Color::new(0.95, 0.90, 0.30, 1.0);
const DART_STUCK: Color = Color::new(0.75, 0.65, 0.20, 1.0);
const RETICLE: Color = Color::new(0.95, 0.30, 0.30, 1.0);
const HUD: Color = Color::new(0.9, 0.9, 0.9, 1.0);

pub struct Renderer {
    width: f32,
    height: f32,
    /// Perspective strength; larger flattens the scene.
    focal: f32,
    /// Pixels per world unit at z = 0.
    pixels_per_unit: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Renderer {
            width: width as f32,
            height: height as f32,
            focal: 6.0,
            pixels_per_unit: 160.0,
        })
    }

    pub fn is_open(&self) -> bool {
        !is_key_down(KeyCode::Escape)
    }

    /// Projects a world point to (screen_x, screen_y, scale).
    pub fn project(&self, point: Vec3) -> (f32, f32, f32) {
        let scale = self.focal / (self.focal + point.z.max(0.0));
        let x = self.width / 2.0 + point.x * self.pixels_per_unit * scale;
        let y =
            self.height * 0.55 - (point.y - THROW_HEIGHT_Y) * self.pixels_per_unit * scale;
        (x, y, scale)
    }

    pub fn render(
        &mut self,
        scores: &[u32],
        darts: &[DartView],
        aim: Option<Vec2>,
        own_board: Option<u8>,
        holster: HolsterState,
        connected: bool,
    ) {
        clear_background(BACKGROUND);

        for board_index in 1..=BOARD_COUNT {
            self.draw_board(board_index, scores, own_board == Some(board_index));
        }

        for dart in darts {
            self.draw_dart(dart);
        }

        if let Some(aim) = aim {
            self.draw_reticle(aim);
        }

        self.draw_hud(holster, connected);
    }

    fn draw_board(&self, board_index: u8, scores: &[u32], own: bool) {
        let center = board_center(board_index);
        let (x, y, scale) = self.project(center);
        let r = BOARD_RADIUS * self.pixels_per_unit * scale;

        draw_circle(x, y, r * 1.08, BOARD_RIM);
        draw_circle(x, y, r, BOARD_FACE);
        draw_circle(x, y, r * 0.094, BULL);
        draw_circle(x, y, r * 0.037, Color::new(0.1, 0.35, 0.15, 1.0));
        if own {
            draw_circle_lines(x, y, r * 1.12, 3.0, OWN_BOARD);
        }

        let label = scores
            .get((board_index - 1) as usize)
            .map(|score| score.to_string())
            .unwrap_or_else(|| "-".to_string());
        draw_text(&label, x - 18.0, y - r - 14.0, 28.0, HUD);
    }

    fn draw_dart(&self, dart: &DartView) {
        let (x, y, scale) = self.project(dart.position);
        let tail = dart.position - dart.forward * 0.15;
        let (tx, ty, _) = self.project(tail);
        let color = if dart.stuck { DART_STUCK } else { DART };

        draw_line(tx, ty, x, y, 2.0 * scale.max(0.5), color);
        // Flights hinted by the spin phase.
        let flare = 1.5 + (dart.spin_deg.to_radians().sin().abs()) * 2.0;
        draw_circle(tx, ty, flare * scale, color);
        draw_circle(x, y, 2.5 * scale, color);
    }

    fn draw_reticle(&self, aim: Vec2) {
        let (x, y, _) = self.project(Vec3::new(aim.x, aim.y, BOARD_PLANE_Z));
        draw_line(x - 10.0, y, x + 10.0, y, 1.5, RETICLE);
        draw_line(x, y - 10.0, x, y + 10.0, 1.5, RETICLE);
        draw_circle_lines(x, y, 6.0, 1.5, RETICLE);
    }

    fn draw_hud(&self, holster: HolsterState, connected: bool) {
        let status = if connected {
            match holster {
                HolsterState::Empty => "Waiting for round",
                HolsterState::SlidingIn => "Drawing dart...",
                HolsterState::Ready => "SPACE to throw",
                HolsterState::Thrown => "Dart in flight",
            }
        } else {
            "Disconnected (R to reconnect)"
        };

        draw_text(status, 12.0, self.height - 36.0, 24.0, HUD);
        draw_text(
            "ESC to quit",
            12.0,
            self.height - 14.0,
            18.0,
            Color::new(0.6, 0.6, 0.6, 1.0),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Renderer {
        Renderer::new(800, 600).unwrap()
    }

    #[test]
    fn test_projection_centers_origin_column() {
        let r = renderer();
        let (x, _, _) = r.project(Vec3::new(0.0, THROW_HEIGHT_Y, 4.0));
        assert_eq!(x, 400.0);
    }

    #[test]
    fn test_projection_shrinks_with_depth() {
        let r = renderer();
        let (_, _, near) = r.project(Vec3::new(0.0, 0.0, 1.0));
        let (_, _, far) = r.project(Vec3::new(0.0, 0.0, BOARD_PLANE_Z));
        assert!(near > far);
        assert!(far > 0.0);
    }

    #[test]
    fn test_projection_higher_points_draw_higher() {
        let r = renderer();
        let (_, low, _) = r.project(Vec3::new(0.0, 1.0, 4.0));
        let (_, high, _) = r.project(Vec3::new(0.0, 2.0, 4.0));
        // Screen y grows downward.
        assert!(high < low);
    }
}
