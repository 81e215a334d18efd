// THEORY:
// The `stabilizer` is a majority vote over the last few raw decisions. Segmentation
// underwater flickers. One frame of glare can flip STRAIGHT to DRIFT-RIGHT and
// back. Voting over a short window removes that flicker while adding at most
// `depth` cycles of latency to a genuine change of direction.
//
// Tie-break: when several directions share the highest count, the one that
// appeared most recently wins. This leans toward fresh information without
// letting a single frame override an established plurality.

use crate::core_modules::direction::DirectionCommand;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct TemporalStabilizer {
    depth: usize,
    history: VecDeque<DirectionCommand>,
}

impl TemporalStabilizer {
    /// A stabilizer voting over `depth` decisions. A depth of zero is treated as one.
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            depth,
            history: VecDeque::with_capacity(depth),
        }
    }

    /// Records `raw` and returns the current winner of the vote.
    pub fn push(&mut self, raw: DirectionCommand) -> DirectionCommand {
        if self.history.len() == self.depth {
            self.history.pop_front();
        }
        self.history.push_back(raw);
        self.winner().unwrap_or(raw)
    }

    /// Most frequent direction in the buffer, ties going to the latest occurrence.
    pub fn winner(&self) -> Option<DirectionCommand> {
        let mut best: Option<(DirectionCommand, usize)> = None;
        // Newest first, so the first candidate reaching the top count is the latest.
        for &candidate in self.history.iter().rev() {
            if best.is_some_and(|(seen, _)| seen == candidate) {
                continue;
            }
            let count = self.history.iter().filter(|&&c| c == candidate).count();
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((candidate, count)),
            }
        }
        best.map(|(command, _)| command)
    }

    pub fn history(&self) -> &VecDeque<DirectionCommand> {
        &self.history
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::core_modules::direction::DirectionCommand::*;

    #[test]
    fn single_flicker_is_suppressed() {
        let mut stabilizer = TemporalStabilizer::new(5);
        for _ in 0..4 {
            stabilizer.push(Straight);
        }
        assert_eq!(stabilizer.push(DriftRight), Straight);
        assert_eq!(stabilizer.push(Straight), Straight);
    }

    #[test]
    fn buffer_evicts_oldest() {
        let mut stabilizer = TemporalStabilizer::new(3);
        for command in [TurnLeft, TurnLeft, Straight, Straight] {
            stabilizer.push(command);
        }
        assert_eq!(stabilizer.history().len(), 3);
        assert_eq!(stabilizer.history().front(), Some(&TurnLeft));
        assert_eq!(stabilizer.winner(), Some(Straight));
    }

    #[test]
    fn tie_goes_to_most_recent() {
        let mut stabilizer = TemporalStabilizer::new(4);
        stabilizer.push(DriftLeft);
        stabilizer.push(Straight);
        stabilizer.push(DriftLeft);
        assert_eq!(stabilizer.push(Straight), Straight);

        let mut stabilizer = TemporalStabilizer::new(4);
        stabilizer.push(Straight);
        stabilizer.push(DriftLeft);
        stabilizer.push(Straight);
        assert_eq!(stabilizer.push(DriftLeft), DriftLeft);
    }

    #[test]
    fn first_push_wins_immediately() {
        let mut stabilizer = TemporalStabilizer::new(5);
        assert_eq!(stabilizer.push(SearchTurn), SearchTurn);
    }

    #[test]
    fn zero_depth_behaves_as_one() {
        let mut stabilizer = TemporalStabilizer::new(0);
        assert_eq!(stabilizer.depth(), 1);
        stabilizer.push(Straight);
        assert_eq!(stabilizer.push(TurnRight), TurnRight);
    }

    fn any_command() -> impl Strategy<Value = DirectionCommand> {
        (0..DirectionCommand::ALL.len()).prop_map(|i| DirectionCommand::ALL[i])
    }

    proptest! {
        #[test]
        fn repeated_direction_fills_the_vote(
            prior in proptest::collection::vec(any_command(), 0..20),
            repeated in any_command(),
            extra in 0usize..5,
        ) {
            let mut stabilizer = TemporalStabilizer::new(5);
            for command in prior {
                stabilizer.push(command);
            }
            let mut last = None;
            for _ in 0..5 + extra {
                last = Some(stabilizer.push(repeated));
            }
            prop_assert_eq!(last, Some(repeated));
        }

        #[test]
        fn winner_is_always_in_history(
            commands in proptest::collection::vec(any_command(), 1..30)
        ) {
            let mut stabilizer = TemporalStabilizer::new(5);
            for command in commands {
                let out = stabilizer.push(command);
                prop_assert!(stabilizer.history().contains(&out));
            }
        }
    }
}
