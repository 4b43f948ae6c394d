//! Client-side replicated state
//!
//! Scores and projectile records arrive from the server and are only ever
//! rendered here, never recomputed. The one piece of client-owned motion
//! is the cosmetic flight mirroring the player's own throw, which exists
//! so the holster's landed signal does not wait on the network.

use log::debug;
use shared::flight::{self, FlightPhase};
use shared::{
    ProjectileRecord, Vec3, ARC_HEIGHT, BOARD_PLANE_Z, LIFE_AFTER_STICK, MIN_TRAVEL_TIME,
    MISS_FALLBACK_DISTANCE, PROJECTILE_SPEED, SPIN_RATE_DEG, STICK_DEPTH,
};

/// Per-frame render view of one dart, derived from a record and the clock.
#[derive(Debug, Clone)]
pub struct DartView {
    pub position: Vec3,
    pub forward: Vec3,
    pub spin_deg: f32,
    pub stuck: bool,
}

pub struct ClientGameState {
    pub scores: Vec<u32>,
    pub generation: u64,
    /// Authoritative replicated projectiles, keyed by server id.
    projectiles: Vec<ProjectileRecord>,
    /// Locally spawned mirror of our own throw; cosmetic only.
    local_flight: Option<ProjectileRecord>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            scores: Vec::new(),
            generation: 0,
            projectiles: Vec::new(),
            local_flight: None,
        }
    }

    /// Adopts the server's score snapshot wholesale; clients never compute
    /// scores themselves.
    pub fn apply_score_state(&mut self, generation: u64, scores: Vec<u32>) {
        self.generation = generation;
        self.scores = scores;
    }

    pub fn spawn_projectile(&mut self, record: ProjectileRecord) {
        // Records are write-once; a duplicate id is a re-send, keep one.
        self.projectiles.retain(|p| p.id != record.id);
        self.projectiles.push(record);
    }

    pub fn despawn_projectile(&mut self, id: u32) {
        self.projectiles.retain(|p| p.id != id);
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Starts the cosmetic mirror of our own throw.
    pub fn begin_local_flight(&mut self, record: ProjectileRecord) {
        self.local_flight = Some(record);
    }

    pub fn local_flight_active(&self) -> bool {
        self.local_flight.is_some()
    }

    /// Advances bookkeeping for the current clock. Returns true exactly
    /// once per local flight, the frame it reaches its target; the caller
    /// forwards that to the holster.
    pub fn update(&mut self, now_ms: u64) -> bool {
        // Fallback self-destroy for records the despawn packet missed.
        self.projectiles.retain(|record| {
            let expired = flight::phase(record, now_ms) == FlightPhase::Expired;
            if expired {
                debug!("Self-destroying expired projectile {}", record.id);
            }
            !expired
        });

        let landed = self
            .local_flight
            .as_ref()
            .is_some_and(|record| !matches!(flight::phase(record, now_ms), FlightPhase::InFlight(_)));
        if landed {
            // The authoritative record keeps rendering the stuck dart;
            // the mirror's job ends at the landed signal.
            self.local_flight = None;
        }
        landed
    }

    /// Every dart to draw this frame, derived fresh from the clock.
    pub fn dart_views(&self, now_ms: u64) -> Vec<DartView> {
        self.projectiles
            .iter()
            .chain(self.local_flight.iter())
            .map(|record| DartView {
                position: flight::render_position(record, now_ms),
                forward: match flight::phase(record, now_ms) {
                    FlightPhase::InFlight(t) => flight::tangent_at(record, t),
                    _ => flight::tangent_at(record, 1.0),
                },
                spin_deg: flight::spin_angle(record, now_ms),
                stuck: !matches!(flight::phase(record, now_ms), FlightPhase::InFlight(_)),
            })
            .collect()
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the cosmetic mirror of our own throw from the local ray: flown
/// to the board plane with the same curve constants the server uses, so
/// it visually coincides with the authoritative record that follows. Id 0
/// marks it as never server-owned.
pub fn cosmetic_flight(origin: Vec3, direction: Vec3, now_ms: u64) -> ProjectileRecord {
    let direction = direction.normalized().unwrap_or(Vec3::FORWARD);
    let distance = if direction.z > 1e-4 {
        (BOARD_PLANE_Z - origin.z) / direction.z
    } else {
        MISS_FALLBACK_DISTANCE
    };
    let end = origin + direction * distance;

    ProjectileRecord {
        id: 0,
        start: origin,
        end,
        surface_normal: Vec3::new(0.0, 0.0, -1.0),
        start_time_ms: now_ms,
        travel_time: (distance / PROJECTILE_SPEED).max(MIN_TRAVEL_TIME),
        arc_height: ARC_HEIGHT,
        spin_rate: SPIN_RATE_DEG,
        stick_depth: STICK_DEPTH,
        life_after_stick: LIFE_AFTER_STICK,
    }
}
