// THEORY:
// The `exploration` state machine adds patience to the decision layer. A single
// lost frame is normal underwater (glare, a fish, a puff of silt) and should not
// make the vehicle spin. A long run of lost frames means the line is really gone
// and the vehicle must go looking for it.
//
//                 miss count > threshold
//     TRACKING  ------------------------->  SEARCHING
//               <-------------------------
//                  any region matches
//
// The counter grows on every cycle where neither region produced a contour and
// drops to zero on any match. While SEARCHING the raw direction is forced to
// SEARCH-TURN. There is no timer besides the counter.

use crate::core_modules::direction::DirectionCommand;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplorationMode {
    #[default]
    Tracking,
    Searching,
}

#[derive(Debug, Clone)]
pub struct ExplorationState {
    miss_threshold: u32,
    miss_count: u32,
    mode: ExplorationMode,
}

impl ExplorationState {
    pub fn new(miss_threshold: u32) -> Self {
        Self {
            miss_threshold,
            miss_count: 0,
            mode: ExplorationMode::Tracking,
        }
    }

    /// A contour was found in either region.
    pub fn record_match(&mut self) {
        if self.mode == ExplorationMode::Searching {
            info!(misses = self.miss_count, "line reacquired, resuming tracking");
        }
        self.miss_count = 0;
        self.mode = ExplorationMode::Tracking;
    }

    /// Neither region produced a contour.
    pub fn record_miss(&mut self) {
        self.miss_count = self.miss_count.saturating_add(1);
        if self.mode == ExplorationMode::Tracking && self.miss_count > self.miss_threshold {
            info!(misses = self.miss_count, "line lost, switching to search");
            self.mode = ExplorationMode::Searching;
        } else {
            debug!(misses = self.miss_count, "no line this cycle");
        }
    }

    /// Replaces `raw` with SEARCH-TURN while searching.
    pub fn apply(&self, raw: DirectionCommand) -> DirectionCommand {
        match self.mode {
            ExplorationMode::Searching => DirectionCommand::SearchTurn,
            ExplorationMode::Tracking => raw,
        }
    }

    pub fn miss_count(&self) -> u32 {
        self.miss_count
    }

    pub fn mode(&self) -> ExplorationMode {
        self.mode
    }

    pub fn is_searching(&self) -> bool {
        self.mode == ExplorationMode::Searching
    }
}
