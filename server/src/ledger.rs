//! Server-owned score ledger
//!
//! The single writable copy of every board's running total. Only the
//! deferred-commit path mutates it; clients just render the values
//! broadcast after each change. A generation token lets commits scheduled
//! before a reset be recognized as stale and discarded.

use log::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreChange {
    pub board_index: u8,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommitOutcome {
    /// The board's total changed; broadcast the new state.
    Applied(ScoreChange),
    /// Legal throw, no effect: the value would take the board below zero
    /// under the exact-finish rule. Explicitly not an error.
    Bust,
    /// Unknown board index; nothing mutated.
    InvalidBoard,
}

#[derive(Debug)]
pub struct ScoreLedger {
    scores: Vec<u32>,
    exact_finish: bool,
    generation: u64,
}

impl ScoreLedger {
    pub fn new(board_count: u8, starting_score: u32, exact_finish: bool) -> Self {
        Self {
            scores: vec![starting_score; board_count as usize],
            exact_finish,
            generation: 0,
        }
    }

    /// Applies one resolved value to a board. Scores only ever count down;
    /// a commit can never increase a total or push it below zero.
    pub fn commit(&mut self, board_index: u8, value: u8) -> CommitOutcome {
        let Some(slot) = board_index
            .checked_sub(1)
            .and_then(|i| self.scores.get_mut(i as usize))
        else {
            return CommitOutcome::InvalidBoard;
        };

        let before = *slot;
        if self.exact_finish && u32::from(value) > before {
            info!(
                "board {} bust: {} thrown with {} remaining",
                board_index, value, before
            );
            return CommitOutcome::Bust;
        }

        *slot = before.saturating_sub(u32::from(value));
        info!("board {} scored {}: {} -> {}", board_index, value, before, *slot);
        CommitOutcome::Applied(ScoreChange {
            board_index,
            score: *slot,
        })
    }

    /// Restores every board and bumps the generation so outstanding
    /// pending commits from the previous game are discarded on arrival.
    pub fn reset(&mut self, starting_score: u32) -> u64 {
        self.scores.fill(starting_score);
        self.generation += 1;
        info!(
            "scores reset to {} (generation {})",
            starting_score, self.generation
        );
        self.generation
    }

    pub fn scores(&self) -> &[u32] {
        &self.scores
    }

    pub fn score(&self, board_index: u8) -> Option<u32> {
        board_index
            .checked_sub(1)
            .and_then(|i| self.scores.get(i as usize))
            .copied()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn board_count(&self) -> u8 {
        self.scores.len() as u8
    }
}
