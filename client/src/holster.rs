//! Client-local throwable availability
//!
//! The holster decides when the player may throw again. It is gated on the
//! locally rendered cosmetic flight landing, never on the server round
//! trip, so responsiveness is independent of latency while the
//! authoritative outcome arrives asynchronously. Nothing here is ever
//! replicated.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolsterState {
    /// No throwable; the minigame is inactive.
    Empty,
    /// A fresh dart is sliding into the hand.
    SlidingIn,
    /// Armed; local input may throw.
    Ready,
    /// Thrown; waiting for the local flight's landed signal.
    Thrown,
}

#[derive(Debug)]
pub struct Holster {
    state: HolsterState,
    slide_duration: f32,
    slide_timer: f32,
}

impl Holster {
    pub fn new(slide_duration: f32) -> Self {
        Self {
            state: HolsterState::Empty,
            slide_duration,
            slide_timer: 0.0,
        }
    }

    pub fn state(&self) -> HolsterState {
        self.state
    }

    /// Minigame became active: start sliding in the first dart.
    pub fn activate(&mut self) {
        if self.state == HolsterState::Empty {
            self.begin_slide();
        }
    }

    /// Minigame ended: drop everything, further throws impossible.
    pub fn deactivate(&mut self) {
        self.state = HolsterState::Empty;
        self.slide_timer = 0.0;
    }

    pub fn update(&mut self, dt: f32) {
        if self.state == HolsterState::SlidingIn {
            self.slide_timer += dt;
            if self.slide_timer >= self.slide_duration {
                self.state = HolsterState::Ready;
            }
        }
    }

    /// Consumes the throwable if armed. Returns whether a throw happened;
    /// while the flight is out no second throwable exists.
    pub fn try_throw(&mut self) -> bool {
        if self.state == HolsterState::Ready {
            self.state = HolsterState::Thrown;
            true
        } else {
            false
        }
    }

    /// Landed signal from the local cosmetic flight.
    pub fn on_landed(&mut self) {
        if self.state == HolsterState::Thrown {
            self.begin_slide();
        }
    }

    fn begin_slide(&mut self) {
        self.state = HolsterState::SlidingIn;
        self.slide_timer = 0.0;
    }
}
