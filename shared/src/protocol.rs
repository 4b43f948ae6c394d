//! Wire protocol between darts clients and the authoritative server

use crate::math::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // client -> server
    Connect {
        client_version: u32,
    },
    /// Fire-and-forget throw request. The server re-casts this ray
    /// authoritatively; no reply is required for gameplay correctness.
    Throw {
        origin: Vec3,
        direction: Vec3,
    },
    Disconnect,

    // server -> client
    Connected {
        client_id: u32,
        board_index: u8,
    },
    /// Full per-board score snapshot, broadcast whenever the ledger changes.
    ScoreState {
        generation: u64,
        scores: Vec<u32>,
    },
    ProjectileSpawn {
        record: ProjectileRecord,
    },
    ProjectileDespawn {
        id: u32,
    },
    Disconnected {
        reason: String,
    },
}

/// Closed-form description of one projectile flight. Written once by the
/// server at resolution time and never mutated afterwards; every observer
/// derives the full animation from these fields plus its local clock.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProjectileRecord {
    pub id: u32,
    pub start: Vec3,
    pub end: Vec3,
    pub surface_normal: Vec3,
    /// Unix milliseconds at spawn, server clock.
    pub start_time_ms: u64,
    /// Seconds from start to impact.
    pub travel_time: f32,
    pub arc_height: f32,
    /// Degrees per second around the forward axis; the absolute angle is
    /// recomputed locally from elapsed time, never replicated.
    pub spin_rate: f32,
    pub stick_depth: f32,
    pub life_after_stick: f32,
}

impl ProjectileRecord {
    /// Seconds after `start_time_ms` at which the server despawns the record.
    pub fn lifetime(&self) -> f32 {
        self.travel_time + self.life_after_stick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ProjectileRecord {
        ProjectileRecord {
            id: 7,
            start: Vec3::new(0.0, 1.5, 0.0),
            end: Vec3::new(0.2, 1.6, 8.0),
            surface_normal: Vec3::new(0.0, 0.0, -1.0),
            start_time_ms: 1_700_000_000_000,
            travel_time: 0.2,
            arc_height: 0.06,
            spin_rate: 540.0,
            stick_depth: 0.04,
            life_after_stick: 6.0,
        }
    }

    #[test]
    fn test_throw_roundtrip() {
        let packet = Packet::Throw {
            origin: Vec3::new(0.0, 1.5, 0.0),
            direction: Vec3::new(0.1, 0.0, 1.0),
        };
        let bytes = bincode::serialize(&packet).unwrap();
        match bincode::deserialize::<Packet>(&bytes).unwrap() {
            Packet::Throw { origin, direction } => {
                assert_eq!(origin, Vec3::new(0.0, 1.5, 0.0));
                assert_eq!(direction, Vec3::new(0.1, 0.0, 1.0));
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_score_state_roundtrip() {
        let packet = Packet::ScoreState {
            generation: 3,
            scores: vec![501, 441, 0, 40, 501],
        };
        let bytes = bincode::serialize(&packet).unwrap();
        match bincode::deserialize::<Packet>(&bytes).unwrap() {
            Packet::ScoreState { generation, scores } => {
                assert_eq!(generation, 3);
                assert_eq!(scores, vec![501, 441, 0, 40, 501]);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_projectile_spawn_roundtrip() {
        let record = sample_record();
        let packet = Packet::ProjectileSpawn {
            record: record.clone(),
        };
        let bytes = bincode::serialize(&packet).unwrap();
        match bincode::deserialize::<Packet>(&bytes).unwrap() {
            Packet::ProjectileSpawn { record: r } => assert_eq!(r, record),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_record_lifetime() {
        let record = sample_record();
        assert_eq!(record.lifetime(), 6.2);
    }
}
