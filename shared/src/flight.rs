//! Deterministic projectile flight rendering
//!
//! Every observer evaluates the same closed-form curve from a replicated
//! [`ProjectileRecord`] and its local clock. No per-frame state is kept and
//! no further network traffic is needed: rendering is idempotent, so missed
//! frames can never desynchronize the animation between observers.

use crate::math::Vec3;
use crate::protocol::ProjectileRecord;

/// Where a projectile is in its lifecycle at a given wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightPhase {
    /// Normalized flight progress in [0, 1).
    InFlight(f32),
    /// Impacted; `since` is seconds spent stuck so far.
    Stuck { since: f32 },
    /// Stick life elapsed; the record should be discarded.
    Expired,
}

fn clamp01(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Seconds since the record's spawn at `now_ms`, never negative.
pub fn elapsed_seconds(record: &ProjectileRecord, now_ms: u64) -> f32 {
    now_ms.saturating_sub(record.start_time_ms) as f32 / 1000.0
}

/// Normalized flight progress, clamped to [0, 1].
pub fn progress(record: &ProjectileRecord, now_ms: u64) -> f32 {
    if record.travel_time <= 0.0 {
        return 1.0;
    }
    clamp01(elapsed_seconds(record, now_ms) / record.travel_time)
}

pub fn phase(record: &ProjectileRecord, now_ms: u64) -> FlightPhase {
    let elapsed = elapsed_seconds(record, now_ms);
    if elapsed < record.travel_time {
        FlightPhase::InFlight(progress(record, now_ms))
    } else if elapsed < record.lifetime() {
        FlightPhase::Stuck {
            since: elapsed - record.travel_time,
        }
    } else {
        FlightPhase::Expired
    }
}

/// Bezier control point: chord midpoint raised along world up in proportion
/// to chord length, so longer throws arc visibly higher.
fn control_point(record: &ProjectileRecord) -> Vec3 {
    let chord = record.end - record.start;
    let mid = record.start + chord * 0.5;
    mid + Vec3::UP * (record.arc_height * chord.length())
}

/// Position along the quadratic Bezier at normalized progress `t`.
pub fn position_at(record: &ProjectileRecord, t: f32) -> Vec3 {
    let t = clamp01(t);
    let c = control_point(record);
    let u = 1.0 - t;
    record.start * (u * u) + c * (2.0 * u * t) + record.end * (t * t)
}

/// Unit tangent of the curve at `t`; orientation follows this. Falls back to
/// the chord, then to world forward, when the derivative degenerates.
pub fn tangent_at(record: &ProjectileRecord, t: f32) -> Vec3 {
    let t = clamp01(t);
    let c = control_point(record);
    let derivative = (c - record.start) * (2.0 * (1.0 - t)) + (record.end - c) * (2.0 * t);
    derivative
        .normalized()
        .or_else(|| (record.end - record.start).normalized())
        .unwrap_or(Vec3::FORWARD)
}

/// Spin around the forward axis, degrees in [0, 360). Recomputed from
/// elapsed time so all observers agree without replicating an angle; spin
/// freezes at impact.
pub fn spin_angle(record: &ProjectileRecord, now_ms: u64) -> f32 {
    let spun = elapsed_seconds(record, now_ms).min(record.travel_time);
    (record.spin_rate * spun).rem_euclid(360.0)
}

/// Resting position after impact: pulled back along the final approach by
/// `stick_depth` so the tip, not the midpoint, sits in the surface.
pub fn stuck_position(record: &ProjectileRecord) -> Vec3 {
    record.end - tangent_at(record, 1.0) * record.stick_depth
}

/// Render position for any wall-clock time, covering all phases.
pub fn render_position(record: &ProjectileRecord, now_ms: u64) -> Vec3 {
    match phase(record, now_ms) {
        FlightPhase::InFlight(t) => position_at(record, t),
        _ => stuck_position(record),
    }
}
