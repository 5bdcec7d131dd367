/// ----- DRIVER MODULE -----
/// The car's state machine. Runs one phase transition per iteration,
/// holding the record mutex while it decides; every transition that is
/// not instantaneous lasts one delay period. Priorities per iteration:
/// a latched emergency stop, then emergency mode, then individual
/// service mode, then normal operation. When there is nothing to do the
/// driver waits on the record's condition variable.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::error;

use shared_resources::floor::Floor;
use shared_resources::shared_mem::{CarSharedMem, SharedMemory};
use shared_resources::shutdown;
use shared_resources::status::DoorStatus;

enum Step {
    /// A transition was made; broadcast and let the phase run for one
    /// delay period.
    Advanced,
    /// Nothing to do; sleep on the condition variable.
    Idle,
}

pub fn main(
    shared: Arc<SharedMemory>,
    lowest_floor: Floor,
    highest_floor: Floor,
    delay: Duration,
    directive_rx: Receiver<Floor>,
) {
    while shutdown::keep_running() {
        let mut mem = match shared.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("record mutex is unusable: {}", e);
                break;
            }
        };

        let mut changed = false;
        if mem.emergency_stop == 1 && mem.emergency_mode == 0 {
            mem.emergency_mode = 1;
            changed = true;
        }

        let step = if mem.emergency_mode == 1 {
            emergency_step(&mut mem)
        } else if mem.individual_service_mode == 1 {
            service_step(&mut mem, lowest_floor, highest_floor)
        } else {
            normal_step(&mut mem, lowest_floor, highest_floor, &directive_rx)
        };

        match step {
            Step::Advanced => {
                mem.broadcast();
                drop(mem);
                thread::sleep(delay);
            }
            Step::Idle => {
                if changed {
                    mem.broadcast();
                }
                mem.timed_wait(delay);
            }
        }
    }
}

/// One door phase transition, shared by every mode. `None` when the
/// doors need no attention (Closed without a pending open, or the car
/// is between floors).
fn door_step(mem: &mut CarSharedMem) -> Option<()> {
    match mem.try_status() {
        Some(DoorStatus::Opening) => {
            mem.set_status(DoorStatus::Open);
            Some(())
        }
        Some(DoorStatus::Open) => {
            // Open wins when both buttons are latched; the close press
            // stays latched for the next decision point.
            if mem.open_button == 1 {
                // Consumed press keeps the doors open one more period.
                mem.open_button = 0;
            } else if mem.close_button == 1 {
                mem.close_button = 0;
                mem.set_status(DoorStatus::Closing);
            } else {
                mem.set_status(DoorStatus::Closing);
            }
            Some(())
        }
        Some(DoorStatus::Closing) => {
            if mem.door_obstruction == 1 || mem.open_button == 1 {
                if mem.open_button == 1 {
                    mem.open_button = 0;
                }
                mem.set_status(DoorStatus::Opening);
            } else {
                mem.set_status(DoorStatus::Closed);
            }
            Some(())
        }
        Some(DoorStatus::Closed) if mem.open_button == 1 => {
            mem.open_button = 0;
            mem.set_status(DoorStatus::Opening);
            Some(())
        }
        _ => None,
    }
}

fn normal_step(
    mem: &mut CarSharedMem,
    lowest_floor: Floor,
    highest_floor: Floor,
    directive_rx: &Receiver<Floor>,
) -> Step {
    if door_step(mem).is_some() {
        return Step::Advanced;
    }
    match mem.try_status() {
        Some(DoorStatus::Closed) => {
            let (current, destination) =
                match (mem.try_current_floor(), mem.try_destination_floor()) {
                    (Some(current), Some(destination)) => (current, destination),
                    _ => return Step::Idle,
                };
            // Directives are only actionable with the doors closed; a
            // directive naming this floor means the controller wants
            // the doors cycled here.
            let mut arrived_here = false;
            for directive in directive_rx.try_iter() {
                if directive == current {
                    arrived_here = true;
                }
            }
            if current == destination {
                if arrived_here {
                    mem.set_status(DoorStatus::Opening);
                    return Step::Advanced;
                }
                return Step::Idle;
            }
            if !destination.is_within(lowest_floor, highest_floor) {
                mem.set_destination_floor(current);
                return Step::Advanced;
            }
            if mem.overload == 1 {
                // Refuse to move until the overload clears.
                mem.set_status(DoorStatus::Open);
            } else {
                mem.set_status(DoorStatus::Between);
            }
            Step::Advanced
        }
        Some(DoorStatus::Between) => {
            match (mem.try_current_floor(), mem.try_destination_floor()) {
                (Some(current), Some(destination)) => {
                    let next = current.step_toward(destination);
                    mem.set_current_floor(next);
                    if next == destination {
                        mem.set_status(DoorStatus::Opening);
                    }
                    Step::Advanced
                }
                _ => Step::Idle,
            }
        }
        _ => Step::Idle,
    }
}

/// Individual service: doors behave as in normal operation, motion is
/// one floor at a time and never reopens the doors on arrival.
fn service_step(mem: &mut CarSharedMem, lowest_floor: Floor, highest_floor: Floor) -> Step {
    if door_step(mem).is_some() {
        return Step::Advanced;
    }
    match mem.try_status() {
        Some(DoorStatus::Closed) => {
            match (mem.try_current_floor(), mem.try_destination_floor()) {
                (Some(current), Some(destination)) if current != destination => {
                    if destination.is_within(lowest_floor, highest_floor) {
                        mem.set_status(DoorStatus::Between);
                    } else {
                        mem.set_destination_floor(current);
                    }
                    Step::Advanced
                }
                _ => Step::Idle,
            }
        }
        Some(DoorStatus::Between) => {
            match (mem.try_current_floor(), mem.try_destination_floor()) {
                (Some(current), Some(destination)) => {
                    let next = current.step_toward(destination);
                    mem.set_current_floor(next);
                    mem.set_status(DoorStatus::Closed);
                    mem.set_destination_floor(next);
                    Step::Advanced
                }
                _ => Step::Idle,
            }
        }
        _ => Step::Idle,
    }
}

/// Emergency: doors still answer the buttons, motion is forbidden. A
/// car caught between floors settles at the next floor boundary it
/// already passed.
fn emergency_step(mem: &mut CarSharedMem) -> Step {
    if mem.try_status() == Some(DoorStatus::Between) {
        mem.set_status(DoorStatus::Closed);
        if let Some(current) = mem.try_current_floor() {
            mem.set_destination_floor(current);
        }
        return Step::Advanced;
    }
    match door_step(mem) {
        Some(()) => Step::Advanced,
        None => Step::Idle,
    }
}
