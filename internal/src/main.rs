/// ----- INTERNAL CONTROLS -----
/// Simulates the car's internal control panel: attaches to the car's
/// shared record, applies exactly one operation under the mutex,
/// broadcasts, and exits. Precondition failures print their message
/// and exit nonzero, leaving the record untouched.

use std::env;
use std::process;

use shared_resources::shared_mem::{CarSharedMem, SharedMemory};
use shared_resources::status::DoorStatus;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let (name, operation) = match args.as_slice() {
        [name, operation] => (name.clone(), operation.clone()),
        _ => {
            eprintln!("Usage: {{internal}} {{car name}} {{operation}}");
            process::exit(1);
        }
    };
    // Guards must be dropped (and the mutex released) before exiting.
    let code = run(&name, &operation);
    process::exit(code);
}

fn run(name: &str, operation: &str) -> i32 {
    let shared = match SharedMemory::open(name) {
        Ok(shared) => shared,
        Err(_) => {
            println!("Unable to access car {}.", name);
            return 1;
        }
    };
    let mut mem = match shared.lock() {
        Ok(mem) => mem,
        Err(_) => {
            println!("Unable to access car {}.", name);
            return 1;
        }
    };
    match apply_operation(&mut mem, operation) {
        Ok(()) => {
            mem.broadcast();
            0
        }
        Err(message) => {
            println!("{}", message);
            1
        }
    }
}

fn apply_operation(mem: &mut CarSharedMem, operation: &str) -> Result<(), String> {
    match operation {
        "open" => mem.open_button = 1,
        "close" => mem.close_button = 1,
        "stop" => mem.emergency_stop = 1,
        "service_on" => {
            mem.individual_service_mode = 1;
            mem.emergency_mode = 0;
        }
        "service_off" => mem.individual_service_mode = 0,
        "up" => return set_adjacent_destination(mem, true),
        "down" => return set_adjacent_destination(mem, false),
        _ => return Err(String::from("Invalid operation.")),
    }
    Ok(())
}

/// `up` and `down` move the car one floor in individual service mode.
/// The record does not carry the car's floor range, so only label
/// bounds and an already-pending destination can be rejected here; the
/// driver enforces the real range.
fn set_adjacent_destination(mem: &mut CarSharedMem, up: bool) -> Result<(), String> {
    if mem.individual_service_mode == 0 {
        return Err(String::from("Operation only allowed in service mode."));
    }
    match mem.try_status() {
        Some(DoorStatus::Between) => {
            return Err(String::from("Operation not allowed while elevator is moving."));
        }
        Some(DoorStatus::Closed) => {}
        _ => return Err(String::from("Operation not allowed while doors are open.")),
    }
    let current = mem
        .try_current_floor()
        .ok_or_else(|| String::from("Cannot move beyond elevator's range."))?;
    let adjacent = if up {
        current.next_up()
    } else {
        current.next_down()
    };
    let adjacent =
        adjacent.ok_or_else(|| String::from("Cannot move beyond elevator's range."))?;
    if mem.try_destination_floor() == Some(adjacent) {
        return Err(String::from("Cannot move beyond elevator's range."));
    }
    mem.set_destination_floor(adjacent);
    Ok(())
}
