/// ----- FLEET MODULE -----
/// The controller's registry of connected cars. The fleet lock guards
/// membership; each car record carries its own lock for status and
/// stop-queue updates. The fleet lock is always taken before a record
/// lock, never the other way around.

use std::net::TcpStream;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use shared_resources::connection;
use shared_resources::direction::Direction;
use shared_resources::floor::Floor;
use shared_resources::message::Message;
use shared_resources::status::DoorStatus;

use super::stop_queue::StopQueue;

pub struct CarState {
    pub status: DoorStatus,
    pub current_floor: Floor,
    pub destination_floor: Floor,
    pub direction: Direction,
    pub stops: StopQueue,
    stream: TcpStream,
}

pub struct CarRecord {
    pub name: String,
    pub lowest_floor: Floor,
    pub highest_floor: Floor,
    pub state: Mutex<CarState>,
}

impl CarRecord {
    /// Apply a STATUS report. When the doors are opening at the head of
    /// the stop queue that stop is served: it is popped exactly once
    /// and the next stop (if any) is sent as the car's new destination.
    pub fn apply_status(&self, status: DoorStatus, current: Floor, destination: Floor) {
        let mut state = self.state.lock().unwrap();
        state.status = status;
        state.current_floor = current;
        state.destination_floor = destination;
        state.direction = Direction::between(current, destination);

        let serving_head = matches!(status, DoorStatus::Opening | DoorStatus::Open)
            && state.stops.head().map(|stop| stop.floor) == Some(current);
        if serving_head {
            state.stops.pop_head();
            match state.stops.head() {
                Some(next) => {
                    state.destination_floor = next.floor;
                    let directive = Message::Floor(next.floor).as_string();
                    if let Err(e) = connection::send_message(&mut state.stream, &directive) {
                        warn!("could not send directive to car {}: {}", self.name, e);
                    }
                }
                None => state.direction = Direction::Idle,
            }
        }
    }
}

pub struct Fleet {
    capacity: usize,
    cars: Mutex<Vec<Arc<CarRecord>>>,
}

impl Fleet {
    pub fn new(capacity: usize) -> Self {
        Fleet {
            capacity,
            cars: Mutex::new(Vec::new()),
        }
    }

    /// Admit a car after its handshake. `None` when the fleet is full;
    /// the caller closes the socket without a reply.
    pub fn register(
        &self,
        name: String,
        lowest_floor: Floor,
        highest_floor: Floor,
        stream: TcpStream,
    ) -> Option<Arc<CarRecord>> {
        let mut cars = self.cars.lock().unwrap();
        if cars.len() >= self.capacity {
            warn!("fleet is full, rejecting car {}", name);
            return None;
        }
        let record = Arc::new(CarRecord {
            name,
            lowest_floor,
            highest_floor,
            state: Mutex::new(CarState {
                status: DoorStatus::Closed,
                current_floor: lowest_floor,
                destination_floor: lowest_floor,
                direction: Direction::Idle,
                stops: StopQueue::new(),
                stream,
            }),
        });
        cars.push(record.clone());
        info!("car {} joined the fleet", record.name);
        Some(record)
    }

    /// Take a car out of service: its pending stops are discarded and
    /// the record is spliced out of the fleet.
    pub fn remove(&self, car: &Arc<CarRecord>) {
        let mut cars = self.cars.lock().unwrap();
        if let Some(index) = cars.iter().position(|other| Arc::ptr_eq(other, car)) {
            cars.remove(index);
            info!("car {} left the fleet", car.name);
        }
    }

    /// Select a car for a call and enqueue its two stops. The whole
    /// operation runs under the fleet lock so a car cannot be removed
    /// between selection and insertion. Returns the chosen car's name.
    pub fn assign_call(&self, source: Floor, destination: Floor) -> Option<String> {
        let cars = self.cars.lock().unwrap();
        let mut best: Option<(u32, &Arc<CarRecord>)> = None;
        for car in cars.iter() {
            if !source.is_within(car.lowest_floor, car.highest_floor)
                || !destination.is_within(car.lowest_floor, car.highest_floor)
            {
                continue;
            }
            let distance = {
                let state = car.state.lock().unwrap();
                state.current_floor.distance_to(source)
            };
            // Strict comparison keeps the earliest-registered candidate
            // on ties.
            if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                best = Some((distance, car));
            }
        }
        let (_, car) = best?;

        let mut state = car.state.lock().unwrap();
        let direction = match state.direction {
            Direction::Idle => {
                match Direction::between(state.current_floor, source) {
                    Direction::Idle => Direction::between(source, destination),
                    direction => direction,
                }
            }
            direction => direction,
        };
        state.direction = direction;
        let became_head = state.stops.insert_call(direction, source, destination);
        if became_head {
            state.destination_floor = source;
            let directive = Message::Floor(source).as_string();
            if let Err(e) = connection::send_message(&mut state.stream, &directive) {
                warn!("could not send directive to car {}: {}", car.name, e);
            }
        }
        Some(car.name.clone())
    }
}
