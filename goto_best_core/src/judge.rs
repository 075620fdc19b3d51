use serde::{Deserialize, Serialize};

use crate::{Position, is_adjacent, scenario::Scenario, world::Action, world::BaseStep};

/// Fraction of the full reward granted for declaring done next to the wrong object.
pub const PARTIAL_CREDIT: f64 = 0.1;

/// Why a judged step ended the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    ReachedTarget,
    ReachedDistractor,
    /// Declared done away from every object.
    Missed,
    Toggled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub reward: f64,
    pub done: bool,
    /// `None` unless the action was toggle or done.
    pub outcome: Option<Outcome>,
}

/// Decides reward and termination for one step.
///
/// `full_reward` is the base reward earned by finishing on this step; `base` is
/// what the locomotion step returned and is passed through for every other action.
pub fn judge(
    action: Action,
    agent: Position,
    scenario: &Scenario,
    full_reward: f64,
    base: BaseStep,
) -> Verdict {
    match action {
        Action::Toggle => Verdict {
            reward: base.reward,
            done: true,
            outcome: Some(Outcome::Toggled),
        },
        Action::Done => {
            let (reward, outcome) = if is_adjacent(agent, scenario.target_position()) {
                (full_reward, Outcome::ReachedTarget)
            } else if scenario
                .positions()
                .iter()
                .any(|&pos| is_adjacent(agent, pos))
            {
                (full_reward * PARTIAL_CREDIT, Outcome::ReachedDistractor)
            } else {
                (base.reward, Outcome::Missed)
            };
            Verdict {
                reward,
                done: true,
                outcome: Some(outcome),
            }
        }
        Action::TurnLeft | Action::TurnRight | Action::MoveForward => Verdict {
            reward: base.reward,
            done: base.done,
            outcome: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ObjectColor, ObjectDescriptor, ObjectKind, target::ResolvedTarget};

    /// Target key at (1, 1), distractors at (5, 1) and (5, 5) on a 7x7 grid.
    fn scenario() -> Scenario {
        Scenario::from_parts(
            vec![
                ObjectDescriptor::new(ObjectKind::Key, ObjectColor::Red),
                ObjectDescriptor::new(ObjectKind::Ball, ObjectColor::Blue),
                ObjectDescriptor::new(ObjectKind::Box, ObjectColor::Grey),
            ],
            vec![Position::new(1, 1), Position::new(5, 1), Position::new(5, 5)],
            ResolvedTarget::Kind(ObjectKind::Key),
        )
    }

    fn idle() -> BaseStep {
        BaseStep {
            reward: 0.0,
            done: false,
        }
    }

    #[test]
    fn done_next_to_target_earns_full_reward() {
        let scenario = scenario();
        for agent in [Position::new(2, 2), Position::new(1, 2), Position::new(2, 1)] {
            let verdict = judge(Action::Done, agent, &scenario, 0.82, idle());
            assert_eq!(verdict.reward, 0.82);
            assert!(verdict.done);
            assert_eq!(verdict.outcome, Some(Outcome::ReachedTarget));
        }
    }

    #[test]
    fn done_next_to_distractor_earns_partial_credit() {
        let scenario = scenario();
        for agent in [Position::new(4, 2), Position::new(4, 4), Position::new(5, 4)] {
            let verdict = judge(Action::Done, agent, &scenario, 1.0, idle());
            assert!((verdict.reward - 0.1).abs() < 1e-12);
            assert!(verdict.done);
            assert_eq!(verdict.outcome, Some(Outcome::ReachedDistractor));
        }
    }

    #[test]
    fn adjacency_to_the_target_takes_precedence() {
        let scenario = Scenario::from_parts(
            vec![
                ObjectDescriptor::new(ObjectKind::Key, ObjectColor::Red),
                ObjectDescriptor::new(ObjectKind::Ball, ObjectColor::Blue),
            ],
            vec![Position::new(2, 2), Position::new(4, 2)],
            ResolvedTarget::Kind(ObjectKind::Key),
        );
        let verdict = judge(Action::Done, Position::new(3, 2), &scenario, 1.0, idle());
        assert_eq!(verdict.reward, 1.0);
        assert_eq!(verdict.outcome, Some(Outcome::ReachedTarget));
    }

    #[test]
    fn done_far_from_everything_ends_with_nothing() {
        let verdict = judge(Action::Done, Position::new(3, 3), &scenario(), 1.0, idle());
        assert_eq!(verdict.reward, 0.0);
        assert!(verdict.done);
        assert_eq!(verdict.outcome, Some(Outcome::Missed));
    }

    #[test]
    fn toggle_always_terminates_without_reward() {
        for agent in [Position::new(2, 2), Position::new(3, 3)] {
            let verdict = judge(Action::Toggle, agent, &scenario(), 1.0, idle());
            assert_eq!(verdict.reward, 0.0);
            assert!(verdict.done);
            assert_eq!(verdict.outcome, Some(Outcome::Toggled));
        }
    }

    #[test]
    fn locomotion_passes_the_base_step_through() {
        let scenario = scenario();
        let exhausted = BaseStep {
            reward: 0.0,
            done: true,
        };
        for action in [Action::TurnLeft, Action::TurnRight, Action::MoveForward] {
            let verdict = judge(action, Position::new(2, 2), &scenario, 1.0, idle());
            assert_eq!(
                verdict,
                Verdict {
                    reward: 0.0,
                    done: false,
                    outcome: None
                }
            );
            assert!(judge(action, Position::new(2, 2), &scenario, 1.0, exhausted).done);
        }
    }
}
