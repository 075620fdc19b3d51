use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    Direction, ObjectDescriptor, Position,
    map::{Grid, GridError},
};

/// Represents the static type of a cell in the world grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Floor,
    Wall,
}

/// The fixed action set available to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    TurnLeft,
    TurnRight,
    MoveForward,
    /// Interact with the cell in front. Ends the episode without reward.
    Toggle,
    /// Declare that the agent has arrived at the target.
    Done,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::TurnLeft,
        Action::TurnRight,
        Action::MoveForward,
        Action::Toggle,
        Action::Done,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("No free cell left to place {what}")]
    NoFreeCell { what: String },
    #[error("The agent has not been placed yet")]
    AgentNotPlaced,
}

/// Holds the agent's pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Position,
    pub direction: Direction,
}

/// Result of the locomotion step, before any task-specific judging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseStep {
    pub reward: f64,
    /// True once the step budget is exhausted.
    pub done: bool,
}

/// The grid, the objects on it and the single agent moving through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    terrain: Grid<CellType>,
    objects: Grid<Option<ObjectDescriptor>>,
    agent: Option<AgentState>,
    step_count: usize,
    max_steps: usize,
}

impl World {
    /// Creates an open floor of the given size with no walls, objects or agent.
    pub fn new(width: usize, height: usize, max_steps: usize) -> Self {
        World {
            terrain: Grid::new(width, height),
            objects: Grid::new(width, height),
            agent: None,
            step_count: 0,
            max_steps,
        }
    }

    pub fn width(&self) -> usize {
        self.terrain.width()
    }

    pub fn height(&self) -> usize {
        self.terrain.height()
    }

    pub fn terrain(&self) -> &Grid<CellType> {
        &self.terrain
    }

    pub fn objects(&self) -> &Grid<Option<ObjectDescriptor>> {
        &self.objects
    }

    pub fn object_at(&self, pos: Position) -> Option<ObjectDescriptor> {
        self.objects.get(pos).copied().flatten()
    }

    pub fn agent(&self) -> Option<AgentState> {
        self.agent
    }

    pub fn agent_position(&self) -> Option<Position> {
        self.agent.map(|agent| agent.position)
    }

    pub fn agent_direction(&self) -> Option<Direction> {
        self.agent.map(|agent| agent.direction)
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Draws the outline of a `width` x `height` rectangle of walls with its top-left at `(x, y)`.
    pub fn wall_rect(
        &mut self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<(), GridError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        for dx in 0..width {
            self.terrain.set(Position::new(x + dx, y), CellType::Wall)?;
            self.terrain
                .set(Position::new(x + dx, y + height - 1), CellType::Wall)?;
        }
        for dy in 0..height {
            self.terrain.set(Position::new(x, y + dy), CellType::Wall)?;
            self.terrain
                .set(Position::new(x + width - 1, y + dy), CellType::Wall)?;
        }
        Ok(())
    }

    /// A cell is free when it is floor with nothing on it and the agent is elsewhere.
    pub fn is_free(&self, pos: Position) -> bool {
        matches!(self.terrain.get(pos), Some(CellType::Floor))
            && self.object_at(pos).is_none()
            && self.agent_position() != Some(pos)
    }

    fn free_cells(&self) -> Vec<Position> {
        self.terrain
            .enumerate()
            .map(|(pos, _)| pos)
            .filter(|&pos| self.is_free(pos))
            .collect()
    }

    fn sample_free_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        let free = self.free_cells();
        if free.is_empty() {
            None
        } else {
            Some(free[rng.random_range(0..free.len())])
        }
    }

    /// Puts `descriptor` on a uniformly chosen free cell and returns where it landed.
    pub fn place_object<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        descriptor: ObjectDescriptor,
    ) -> Result<Position, WorldError> {
        let pos = self
            .sample_free_cell(rng)
            .ok_or_else(|| WorldError::NoFreeCell {
                what: descriptor.to_string(),
            })?;
        self.objects.set(pos, Some(descriptor))?;
        tracing::trace!(object = %descriptor, x = pos.x, y = pos.y, "placed object");
        Ok(pos)
    }

    /// Puts the agent on a uniformly chosen free cell facing a random direction.
    pub fn place_agent<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<AgentState, WorldError> {
        // Free-cell sampling must not see the previous pose.
        self.agent = None;
        let position = self
            .sample_free_cell(rng)
            .ok_or_else(|| WorldError::NoFreeCell {
                what: "the agent".to_string(),
            })?;
        let direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
        let agent = AgentState {
            position,
            direction,
        };
        self.agent = Some(agent);
        Ok(agent)
    }

    /// Puts `descriptor` on an exact cell, for scripted setups.
    pub fn put_object(
        &mut self,
        pos: Position,
        descriptor: ObjectDescriptor,
    ) -> Result<(), WorldError> {
        if !self.is_free(pos) {
            return Err(WorldError::NoFreeCell {
                what: format!("{descriptor} at ({}, {})", pos.x, pos.y),
            });
        }
        self.objects.set(pos, Some(descriptor))?;
        Ok(())
    }

    /// Places the agent at an exact pose, for scripted setups.
    pub fn set_agent(
        &mut self,
        position: Position,
        direction: Direction,
    ) -> Result<(), WorldError> {
        if !matches!(self.terrain.get(position), Some(CellType::Floor))
            || self.object_at(position).is_some()
        {
            return Err(WorldError::NoFreeCell {
                what: format!("the agent at ({}, {})", position.x, position.y),
            });
        }
        self.agent = Some(AgentState {
            position,
            direction,
        });
        Ok(())
    }

    /// The cell directly in front of the agent.
    pub fn front_position(&self) -> Option<Position> {
        let agent = self.agent?;
        agent.position.step(agent.direction)
    }

    /// True if the agent could stand on `pos`.
    pub fn is_walkable(&self, pos: Position) -> bool {
        matches!(self.terrain.get(pos), Some(CellType::Floor)) && self.object_at(pos).is_none()
    }

    /// Reward for finishing now: `1 - 0.9 * (steps taken / step budget)`.
    pub fn base_reward(&self) -> f64 {
        if self.max_steps == 0 {
            return 1.0;
        }
        1.0 - 0.9 * (self.step_count as f64 / self.max_steps as f64)
    }

    /// Applies locomotion for `action` and advances the step counter.
    ///
    /// Toggle and done have no effect on the world itself; judging them is up to the task.
    pub fn step(&mut self, action: Action) -> Result<BaseStep, WorldError> {
        let mut agent = self.agent.ok_or(WorldError::AgentNotPlaced)?;
        match action {
            Action::TurnLeft => agent.direction = agent.direction.turn_left(),
            Action::TurnRight => agent.direction = agent.direction.turn_right(),
            Action::MoveForward => {
                if let Some(front) = self.front_position() {
                    if self.is_walkable(front) {
                        agent.position = front;
                    }
                }
            }
            Action::Toggle | Action::Done => {}
        }
        self.agent = Some(agent);
        self.step_count += 1;

        Ok(BaseStep {
            reward: 0.0,
            done: self.step_count >= self.max_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{ObjectColor, ObjectKind};

    fn walled(size: usize) -> World {
        let mut world = World::new(size, size, 5 * size * size);
        world.wall_rect(0, 0, size, size).unwrap();
        world
    }

    #[test]
    fn a_new_world_is_open_floor() {
        let world = World::new(3, 2, 30);
        assert!(world.terrain().enumerate().all(|(_, cell)| *cell == CellType::Floor));
        assert_eq!(world.agent(), None);
    }

    #[test]
    fn wall_rect_builds_only_the_perimeter() {
        let world = walled(5);
        for (pos, cell) in world.terrain().enumerate() {
            let border = pos.x == 0 || pos.y == 0 || pos.x == 4 || pos.y == 4;
            assert_eq!(*cell == CellType::Wall, border, "{pos:?}");
        }
    }

    #[test]
    fn placement_fills_every_interior_cell_without_collisions() {
        let mut world = walled(4);
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = Vec::new();
        for color in [ObjectColor::Red, ObjectColor::Green, ObjectColor::Blue] {
            let pos = world
                .place_object(&mut rng, ObjectDescriptor::new(ObjectKind::Ball, color))
                .unwrap();
            assert_eq!(world.terrain()[pos], CellType::Floor);
            assert!(!seen.contains(&pos));
            seen.push(pos);
        }
        let agent = world.place_agent(&mut rng).unwrap();
        assert!(!seen.contains(&agent.position));

        let err = world
            .place_object(
                &mut rng,
                ObjectDescriptor::new(ObjectKind::Key, ObjectColor::Grey),
            )
            .unwrap_err();
        assert_eq!(
            err,
            WorldError::NoFreeCell {
                what: "grey key".to_string()
            }
        );
    }

    #[test]
    fn moving_forward_stops_at_walls_and_objects() {
        let mut world = walled(5);
        world.set_agent(Position::new(1, 1), Direction::Right).unwrap();
        world
            .put_object(
                Position::new(3, 1),
                ObjectDescriptor::new(ObjectKind::Box, ObjectColor::Red),
            )
            .unwrap();

        world.step(Action::MoveForward).unwrap();
        assert_eq!(world.agent_position(), Some(Position::new(2, 1)));
        world.step(Action::MoveForward).unwrap();
        assert_eq!(world.agent_position(), Some(Position::new(2, 1)));

        world.step(Action::TurnLeft).unwrap();
        assert_eq!(world.agent_direction(), Some(Direction::Up));
        world.step(Action::MoveForward).unwrap();
        assert_eq!(world.agent_position(), Some(Position::new(2, 1)));
        assert_eq!(world.step_count(), 4);
    }

    #[test]
    fn step_budget_ends_the_episode() {
        let mut world = World::new(3, 3, 2);
        world.set_agent(Position::new(1, 1), Direction::Up).unwrap();
        assert!(!world.step(Action::TurnLeft).unwrap().done);
        assert!(world.step(Action::TurnLeft).unwrap().done);
    }

    #[test]
    fn base_reward_decays_with_steps() {
        let mut world = World::new(3, 3, 10);
        world.set_agent(Position::new(1, 1), Direction::Up).unwrap();
        assert_eq!(world.base_reward(), 1.0);
        for _ in 0..5 {
            world.step(Action::TurnRight).unwrap();
        }
        assert!((world.base_reward() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn stepping_without_an_agent_fails() {
        let mut world = World::new(3, 3, 10);
        assert_eq!(world.step(Action::Done), Err(WorldError::AgentNotPlaced));
    }
}
