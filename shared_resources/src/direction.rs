use super::floor::Floor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down,
    Idle,
    Up,
}

impl Direction {
    /// Travel direction from one floor to another; `Idle` when equal.
    pub fn between(from: Floor, to: Floor) -> Self {
        if to > from {
            Direction::Up
        } else if to < from {
            Direction::Down
        } else {
            Direction::Idle
        }
    }
}
