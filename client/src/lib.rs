//! # Darts Client Library
//!
//! Client-side implementation of the multiplayer darts minigame. The
//! client owns presentation and responsiveness; it never owns an outcome.
//! Every score it shows arrived in a `ScoreState` broadcast, and every
//! dart it draws is derived from a write-once replicated record plus the
//! local clock.
//!
//! ## Responsiveness Without Authority
//!
//! Throwing feels immediate because two purely local mechanisms run ahead
//! of the network:
//!
//! - a **cosmetic flight** mirrors the player's own throw the instant it
//!   leaves the hand, flown with the same curve constants the server uses
//!   so the authoritative record that follows lands in the same place;
//! - the **holster** state machine re-arms off that local flight's landed
//!   signal, so throw cadence never depends on round-trip time.
//!
//! The authoritative outcome (projectile record, score change) arrives
//! asynchronously and simply replaces or confirms what the player already
//! saw.
//!
//! ## Module Organization
//!
//! - [`game`]: replicated scores and projectiles, the cosmetic flight,
//!   per-frame dart views.
//! - [`holster`]: client-local throwable availability FSM.
//! - [`input`]: the clock-driven aim sweep and throw ray construction.
//! - [`network`]: UDP client, packet handling, and the frame loop.
//! - [`rendering`]: macroquad presentation of boards, darts, and HUD.

pub mod game;
pub mod holster;
pub mod input;
pub mod network;
pub mod rendering;
