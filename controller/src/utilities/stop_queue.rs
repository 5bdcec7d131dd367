/// ----- STOP QUEUE MODULE -----
/// Per-car ordered list of pending stops. New calls are spliced in so
/// the car keeps serving floors in its current direction of travel and
/// picks up new passengers on the way (LOOK ordering): the pickup goes
/// before the first stop that lies beyond it, and the drop-off is
/// placed the same way but only after the pickup.

use shared_resources::direction::Direction;
use shared_resources::floor::Floor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop {
    pub floor: Floor,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default)]
pub struct StopQueue {
    stops: Vec<Stop>,
}

impl StopQueue {
    pub fn new() -> Self {
        StopQueue { stops: Vec::new() }
    }

    pub fn head(&self) -> Option<Stop> {
        self.stops.first().copied()
    }

    pub fn pop_head(&mut self) -> Option<Stop> {
        if self.stops.is_empty() {
            None
        } else {
            Some(self.stops.remove(0))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Insert the pickup and drop-off for one call. `direction` is the
    /// car's effective direction of travel. Returns true when the
    /// pickup became the new head of the queue.
    pub fn insert_call(&mut self, direction: Direction, source: Floor, destination: Floor) -> bool {
        let pickup = Stop {
            floor: source,
            direction,
        };
        let dropoff = Stop {
            floor: destination,
            direction: Direction::between(source, destination),
        };

        let pickup_index = self
            .stops
            .iter()
            .position(|stop| is_beyond(direction, source, stop.floor))
            .unwrap_or(self.stops.len());
        self.stops.insert(pickup_index, pickup);

        let dropoff_index = self.stops[pickup_index + 1..]
            .iter()
            .position(|stop| is_beyond(dropoff.direction, destination, stop.floor))
            .map(|offset| pickup_index + 1 + offset)
            .unwrap_or(self.stops.len());
        self.stops.insert(dropoff_index, dropoff);

        pickup_index == 0
    }
}

/// True when `candidate` lies past `floor` in the direction of travel.
fn is_beyond(direction: Direction, floor: Floor, candidate: Floor) -> bool {
    match direction {
        Direction::Up => floor < candidate,
        Direction::Down => floor > candidate,
        Direction::Idle => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(label: &str) -> Floor {
        Floor::parse(label).unwrap()
    }

    fn floors(queue: &StopQueue) -> Vec<String> {
        queue.stops.iter().map(|s| s.floor.as_string()).collect()
    }

    #[test]
    fn first_call_becomes_the_head() {
        let mut queue = StopQueue::new();
        assert!(queue.insert_call(Direction::Up, floor("2"), floor("4")));
        assert_eq!(floors(&queue), ["2", "4"]);
    }

    #[test]
    fn pickup_on_the_way_is_spliced_before_farther_stops() {
        let mut queue = StopQueue::new();
        queue.insert_call(Direction::Up, floor("3"), floor("6"));
        // A pickup at 2 going to 5 comes before both existing stops.
        assert!(queue.insert_call(Direction::Up, floor("2"), floor("5")));
        assert_eq!(floors(&queue), ["2", "3", "5", "6"]);
    }

    #[test]
    fn dropoff_is_only_placed_after_its_pickup() {
        let mut queue = StopQueue::new();
        queue.insert_call(Direction::Up, floor("5"), floor("6"));
        // Drop-off 4 sorts before 5 numerically but must follow its
        // own pickup at 3.
        queue.insert_call(Direction::Up, floor("3"), floor("4"));
        assert_eq!(floors(&queue), ["3", "4", "5", "6"]);
    }

    #[test]
    fn downward_calls_sort_in_descending_order() {
        let mut queue = StopQueue::new();
        queue.insert_call(Direction::Down, floor("5"), floor("1"));
        assert!(!queue.insert_call(Direction::Down, floor("4"), floor("2")));
        assert_eq!(floors(&queue), ["5", "4", "2", "1"]);
    }

    #[test]
    fn stops_past_every_queued_floor_are_appended() {
        let mut queue = StopQueue::new();
        queue.insert_call(Direction::Up, floor("2"), floor("3"));
        // Going up, nothing queued lies beyond 5, so the new call goes
        // to the back.
        assert!(!queue.insert_call(Direction::Up, floor("5"), floor("6")));
        assert_eq!(floors(&queue), ["2", "3", "5", "6"]);
    }

    #[test]
    fn pickup_short_of_the_whole_queue_becomes_the_new_head() {
        let mut queue = StopQueue::new();
        queue.insert_call(Direction::Up, floor("2"), floor("3"));
        assert!(queue.insert_call(Direction::Up, floor("1"), floor("2")));
        assert_eq!(floors(&queue), ["1", "2", "2", "3"]);
    }

    #[test]
    fn pop_removes_exactly_one_head() {
        let mut queue = StopQueue::new();
        queue.insert_call(Direction::Up, floor("2"), floor("4"));
        assert_eq!(queue.pop_head().map(|s| s.floor), Some(floor("2")));
        assert_eq!(queue.head().map(|s| s.floor), Some(floor("4")));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn basement_floors_order_correctly() {
        let mut queue = StopQueue::new();
        queue.insert_call(Direction::Up, floor("B2"), floor("2"));
        queue.insert_call(Direction::Up, floor("B1"), floor("1"));
        assert_eq!(floors(&queue), ["B2", "B1", "1", "2"]);
    }
}
