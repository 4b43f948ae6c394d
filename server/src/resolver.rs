//! Server-authoritative throw resolution
//!
//! Clients only ever claim a ray; everything that matters (what was hit,
//! what it scores, when the score applies) is re-derived here. A throw that
//! fails any validation step still produces a visible flight so observers
//! see something land, but only a plausible decoded value produces a
//! deferred score commit.

use crate::scoring;
use crate::world::{RayHit, ScoreSource, World};
use log::debug;
use shared::{
    ProjectileRecord, Ray, Vec3, ARC_HEIGHT, LIFE_AFTER_STICK, MAX_THROW_DISTANCE,
    MIN_TRAVEL_TIME, MISS_FALLBACK_DISTANCE, PROJECTILE_SPEED, SPIN_RATE_DEG, STICK_DEPTH,
};

#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub max_distance: f32,
    pub projectile_speed: f32,
    pub min_travel_time: f32,
    /// Where a missed throw visually lands along its ray.
    pub fallback_distance: f32,
    pub arc_height: f32,
    pub spin_rate: f32,
    pub stick_depth: f32,
    pub life_after_stick: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_distance: MAX_THROW_DISTANCE,
            projectile_speed: PROJECTILE_SPEED,
            min_travel_time: MIN_TRAVEL_TIME,
            fallback_distance: MISS_FALLBACK_DISTANCE,
            arc_height: ARC_HEIGHT,
            spin_rate: SPIN_RATE_DEG,
            stick_depth: STICK_DEPTH,
            life_after_stick: LIFE_AFTER_STICK,
        }
    }
}

/// One client's claimed throw, alive only for the duration of resolution.
#[derive(Debug, Clone)]
pub struct ThrowRequest {
    pub origin: Vec3,
    pub direction: Vec3,
    pub requester_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrowOutcome {
    Scored { board_index: u8, value: u8 },
    Miss,
}

/// A score mutation to schedule `delay` seconds from resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingScore {
    pub board_index: u8,
    pub value: u8,
    pub delay: f32,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub outcome: ThrowOutcome,
    pub record: ProjectileRecord,
    pub pending: Option<PendingScore>,
}

/// Values a single dart can plausibly score: singles through trebles
/// (1..=60); the bulls (25, 50) fall inside that range.
pub fn is_plausible_value(value: u8) -> bool {
    (1..=60).contains(&value)
}

pub struct HitResolver {
    world: World,
    config: ResolverConfig,
}

impl HitResolver {
    pub fn new(world: World, config: ResolverConfig) -> Self {
        Self { world, config }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Resolves one throw request into an outcome, a write-once projectile
    /// record, and an optional pending score. Never fails: every invalid
    /// condition degrades to a miss.
    pub fn resolve(&self, request: &ThrowRequest, projectile_id: u32, now_ms: u64) -> Resolution {
        let ray = Ray::new(request.origin, request.direction);

        match self.world.cast_ray(&ray, self.config.max_distance) {
            Some(hit) => self.resolve_hit(request, &ray, hit, projectile_id, now_ms),
            None => {
                debug!(
                    "throw by {} missed the scoring layer entirely",
                    request.requester_id
                );
                let end = ray.at(self.config.fallback_distance);
                Resolution {
                    outcome: ThrowOutcome::Miss,
                    record: self.record(
                        projectile_id,
                        ray.origin,
                        end,
                        -ray.direction,
                        self.config.fallback_distance,
                        now_ms,
                    ),
                    pending: None,
                }
            }
        }
    }

    fn resolve_hit(
        &self,
        request: &ThrowRequest,
        ray: &Ray,
        hit: RayHit<'_>,
        projectile_id: u32,
        now_ms: u64,
    ) -> Resolution {
        let board_index = hit.collider.board_index;
        let value = match &hit.collider.source {
            ScoreSource::Surface { surface, mode } => {
                scoring::decode(surface, hit.uv, mode).unwrap_or(0)
            }
            ScoreSource::Static { value } => *value,
        };

        let travel_time = self.travel_time(hit.distance);
        let record = self.record(
            projectile_id,
            ray.origin,
            hit.point,
            hit.collider.normal,
            hit.distance,
            now_ms,
        );

        if !is_plausible_value(value) {
            debug!(
                "throw by {} hit board {} but decoded implausible value {}",
                request.requester_id, board_index, value
            );
            return Resolution {
                outcome: ThrowOutcome::Miss,
                record,
                pending: None,
            };
        }

        debug!(
            "throw by {} scored {} on board {} at {:.2}m, committing in {:.3}s",
            request.requester_id, value, board_index, hit.distance, travel_time
        );
        Resolution {
            outcome: ThrowOutcome::Scored { board_index, value },
            record,
            pending: Some(PendingScore {
                board_index,
                value,
                delay: travel_time,
            }),
        }
    }

    /// Simulated flight duration; farther hits always commit later.
    pub fn travel_time(&self, distance: f32) -> f32 {
        (distance / self.config.projectile_speed).max(self.config.min_travel_time)
    }

    fn record(
        &self,
        id: u32,
        start: Vec3,
        end: Vec3,
        surface_normal: Vec3,
        distance: f32,
        now_ms: u64,
    ) -> ProjectileRecord {
        ProjectileRecord {
            id,
            start,
            end,
            surface_normal,
            start_time_ms: now_ms,
            travel_time: self.travel_time(distance),
            arc_height: self.config.arc_height,
            spin_rate: self.config.spin_rate,
            stick_depth: self.config.stick_depth,
            life_after_stick: self.config.life_after_stick,
        }
    }
}
