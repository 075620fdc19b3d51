use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod environment;
pub mod judge;
pub mod map;
pub mod registry;
pub mod scenario;
pub mod target;
pub mod world;

/// Represents a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the neighbouring position one step in `direction`, if it does not underflow.
    pub fn step(self, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.delta();
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

/// Chebyshev (chessboard) distance between two cells.
pub fn chebyshev_distance(a: Position, b: Position) -> usize {
    a.x.abs_diff(b.x).max(a.y.abs_diff(b.y))
}

/// True when `b` lies in the 8-connected neighbourhood of `a` or on `a` itself.
pub fn is_adjacent(a: Position, b: Position) -> bool {
    chebyshev_distance(a, b) <= 1
}

/// Facing of the agent. Ordered clockwise starting from east, with y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Up => (0, -1),
        }
    }

    pub fn turn_left(self) -> Direction {
        match self {
            Direction::Right => Direction::Up,
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
        }
    }

    pub fn turn_right(self) -> Direction {
        match self {
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
            Direction::Up => Direction::Right,
        }
    }
}

/// The shapes an object on the grid can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Key,
    Ball,
    Box,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 3] = [ObjectKind::Key, ObjectKind::Ball, ObjectKind::Box];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Key => "key",
            ObjectKind::Ball => "ball",
            ObjectKind::Box => "box",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// The fixed palette objects are painted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectColor {
    Red,
    Green,
    Blue,
    Purple,
    Yellow,
    Grey,
}

impl ObjectColor {
    pub const ALL: [ObjectColor; 6] = [
        ObjectColor::Red,
        ObjectColor::Green,
        ObjectColor::Blue,
        ObjectColor::Purple,
        ObjectColor::Yellow,
        ObjectColor::Grey,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectColor::Red => "red",
            ObjectColor::Green => "green",
            ObjectColor::Blue => "blue",
            ObjectColor::Purple => "purple",
            ObjectColor::Yellow => "yellow",
            ObjectColor::Grey => "grey",
        }
    }
}

impl fmt::Display for ObjectColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectColor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectColor::ALL
            .into_iter()
            .find(|color| color.as_str() == s)
            .ok_or(())
    }
}

/// A concrete object: one shape in one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub kind: ObjectKind,
    pub color: ObjectColor,
}

impl ObjectDescriptor {
    pub fn new(kind: ObjectKind, color: ObjectColor) -> Self {
        ObjectDescriptor { kind, color }
    }
}

/// Renders as "<color> <kind>", the form used in mission strings.
impl fmt::Display for ObjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacency_covers_the_eight_neighbourhood_and_the_cell_itself() {
        let center = Position::new(3, 3);
        for y in 2..=4 {
            for x in 2..=4 {
                assert!(is_adjacent(center, Position::new(x, y)), "({x}, {y})");
            }
        }
        assert!(!is_adjacent(center, Position::new(5, 3)));
        assert!(!is_adjacent(center, Position::new(1, 1)));
        assert_eq!(chebyshev_distance(center, Position::new(6, 1)), 3);
    }

    #[test]
    fn turning_four_times_returns_to_the_start() {
        for direction in Direction::ALL {
            let mut left = direction;
            let mut right = direction;
            for _ in 0..4 {
                left = left.turn_left();
                right = right.turn_right();
            }
            assert_eq!(left, direction);
            assert_eq!(right, direction);
            assert_eq!(direction.turn_left().turn_right(), direction);
        }
    }

    #[test]
    fn step_refuses_to_underflow() {
        assert_eq!(Position::new(0, 0).step(Direction::Up), None);
        assert_eq!(
            Position::new(2, 2).step(Direction::Down),
            Some(Position::new(2, 3))
        );
    }

    #[test]
    fn descriptor_renders_color_before_kind() {
        let descriptor = ObjectDescriptor::new(ObjectKind::Ball, ObjectColor::Purple);
        assert_eq!(descriptor.to_string(), "purple ball");
        assert_eq!("grey".parse::<ObjectColor>(), Ok(ObjectColor::Grey));
        assert_eq!("box".parse::<ObjectKind>(), Ok(ObjectKind::Box));
        assert!("Box".parse::<ObjectKind>().is_err());
    }
}
