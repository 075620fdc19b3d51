use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, VecDeque},
};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Direction, ObjectDescriptor, Position,
    environment::EpisodeView,
    is_adjacent,
    world::{Action, AgentState, World},
};

/// Trait defining the behavior of an agent.
/// Agents decide which action to take based on the EpisodeView.
pub trait Agent {
    /// Determines the next action from the agent's view of the episode.
    /// `&mut self` allows the agent to keep state between steps (e.g., a planned path).
    fn act(&mut self, view: &EpisodeView) -> Action;
}

/// Parses a "go to the <color> <type>" mission back into the object it names.
pub fn parse_mission(mission: &str) -> Option<ObjectDescriptor> {
    let rest = mission.strip_prefix("go to the ")?;
    let (color, kind) = rest.split_once(' ')?;
    Some(ObjectDescriptor::new(kind.parse().ok()?, color.parse().ok()?))
}

/// An agent that picks uniformly among all actions.
#[derive(Debug)]
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn act(&mut self, _view: &EpisodeView) -> Action {
        Action::ALL[self.rng.random_range(0..Action::ALL.len())]
    }
}

/// An agent that reads the mission, finds the named object and walks next to it.
///
/// Declares done as soon as it stands within one cell of the object, or when no
/// path exists.
#[derive(Debug, Default)]
pub struct PlanningAgent {
    current_plan: VecDeque<Position>, // Queue of positions to visit
}

impl PlanningAgent {
    pub fn new() -> Self {
        Self::default()
    }

    fn locate(world: &World, wanted: ObjectDescriptor) -> Option<Position> {
        world
            .objects()
            .enumerate()
            .find_map(|(pos, object)| (*object == Some(wanted)).then_some(pos))
    }

    fn manhattan_distance(a: Position, b: Position) -> usize {
        a.x.abs_diff(b.x) + a.y.abs_diff(b.y)
    }

    /// Lower bound on the 4-connected steps needed to get within one cell of `target`.
    fn heuristic(from: Position, target: Position) -> usize {
        from.x.abs_diff(target.x).saturating_sub(1) + from.y.abs_diff(target.y).saturating_sub(1)
    }

    /// A* over walkable cells to the nearest cell adjacent to `target`.
    /// Returns the path excluding `start`.
    fn a_star_path(world: &World, start: Position, target: Position) -> Option<Vec<Position>> {
        // For priority queue
        #[derive(Clone, Eq, PartialEq)]
        struct PrioritizedItem {
            priority: usize,
            position: Position,
        }

        impl Ord for PrioritizedItem {
            fn cmp(&self, other: &Self) -> Ordering {
                // Reverse ordering for min-heap behavior
                other.priority.cmp(&self.priority)
            }
        }

        impl PartialOrd for PrioritizedItem {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut cost_so_far: HashMap<Position, usize> = HashMap::new();

        frontier.push(PrioritizedItem {
            priority: Self::heuristic(start, target),
            position: start,
        });
        cost_so_far.insert(start, 0);

        let mut reached = None;
        while let Some(PrioritizedItem {
            position: current, ..
        }) = frontier.pop()
        {
            if is_adjacent(current, target) {
                reached = Some(current);
                break;
            }

            let current_cost = cost_so_far[&current];
            for direction in Direction::ALL {
                let Some(neighbor) = current.step(direction) else {
                    continue;
                };
                if !world.is_walkable(neighbor) {
                    continue;
                }
                let new_cost = current_cost + 1;
                if cost_so_far
                    .get(&neighbor)
                    .is_none_or(|&known| new_cost < known)
                {
                    cost_so_far.insert(neighbor, new_cost);
                    frontier.push(PrioritizedItem {
                        priority: new_cost + Self::heuristic(neighbor, target),
                        position: neighbor,
                    });
                    came_from.insert(neighbor, current);
                }
            }
        }

        // Reconstruct path
        let mut current = reached?;
        let mut path = Vec::new();
        while current != start {
            path.push(current);
            current = *came_from.get(&current)?;
        }
        path.reverse();
        Some(path)
    }

    /// Turns towards `next`, or steps onto it when already facing it.
    fn head_towards(agent: AgentState, next: Position) -> Action {
        let wanted = Direction::ALL
            .into_iter()
            .find(|&direction| agent.position.step(direction) == Some(next));
        match wanted {
            Some(direction) if direction == agent.direction => Action::MoveForward,
            Some(direction) if agent.direction.turn_left() == direction => Action::TurnLeft,
            Some(_) => Action::TurnRight,
            // Not a neighbour; the caller replans.
            None => Action::Done,
        }
    }
}

impl Agent for PlanningAgent {
    fn act(&mut self, view: &EpisodeView) -> Action {
        let (Some(agent), Some(wanted)) = (view.world.agent(), parse_mission(view.mission)) else {
            return Action::Done;
        };
        let Some(target) = Self::locate(view.world, wanted) else {
            return Action::Done;
        };

        if is_adjacent(agent.position, target) {
            self.current_plan.clear();
            return Action::Done;
        }

        // Drop waypoints already reached
        while self.current_plan.front() == Some(&agent.position) {
            self.current_plan.pop_front();
        }

        let on_track = self
            .current_plan
            .front()
            .is_some_and(|&next| Self::manhattan_distance(agent.position, next) == 1);
        if !on_track {
            match Self::a_star_path(view.world, agent.position, target) {
                Some(path) if !path.is_empty() => self.current_plan = path.into(),
                _ => {
                    self.current_plan.clear();
                    return Action::Done;
                }
            }
        }

        match self.current_plan.front() {
            Some(&next) => Self::head_towards(agent, next),
            None => Action::Done,
        }
    }
}
