/// ----- SAFETY SYSTEM -----
/// Passive monitor for one car. Wakes on every broadcast of the car's
/// condition variable and, with the mutex held, enforces the safety
/// rules: reopen obstructed doors, latch emergency mode on the stop
/// button or the overload sensor, and treat any out-of-domain field as
/// a consistency error. It never exits on a violation; it degrades the
/// car to emergency mode and keeps watching.

use std::env;
use std::process;
use std::time::Duration;

use log::error;

use shared_resources::shared_mem::{MemGuard, SharedMemory};
use shared_resources::shutdown;
use shared_resources::status::DoorStatus;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let name = match args.as_slice() {
        [name] => name.clone(),
        _ => {
            eprintln!("Usage: {{safety}} {{car name}}");
            process::exit(1);
        }
    };

    shutdown::install_handlers();

    let shared = match SharedMemory::open(&name) {
        Ok(shared) => shared,
        Err(_) => {
            println!("Unable to access car {}.", name);
            process::exit(1);
        }
    };

    while shutdown::keep_running() {
        let mut mem = match shared.lock() {
            Ok(mem) => mem,
            Err(e) => {
                error!("record mutex is unusable: {}", e);
                break;
            }
        };
        mem.timed_wait(Duration::from_secs(1));
        run_checks(&mut mem);
    }
}

fn run_checks(mem: &mut MemGuard) {
    if mem.door_obstruction == 1 && mem.try_status() == Some(DoorStatus::Closing) {
        mem.set_status(DoorStatus::Opening);
        println!("Door obstruction detected! Opening doors.");
        mem.broadcast();
    }

    if mem.emergency_stop == 1 && mem.emergency_mode == 0 {
        println!("The emergency stop button has been pressed!");
        mem.emergency_mode = 1;
        mem.broadcast();
    }

    if mem.overload == 1 && mem.emergency_mode == 0 {
        println!("The overload sensor has been tripped!");
        mem.emergency_mode = 1;
        mem.broadcast();
    }

    if mem.emergency_mode == 0 && !record_is_consistent(mem) {
        println!("Data consistency error!");
        mem.emergency_mode = 1;
        mem.broadcast();
    }
}

fn record_is_consistent(mem: &MemGuard) -> bool {
    if mem.try_current_floor().is_none() || mem.try_destination_floor().is_none() {
        return false;
    }
    let status = match mem.try_status() {
        Some(status) => status,
        None => return false,
    };
    let flags = [
        mem.open_button,
        mem.close_button,
        mem.door_obstruction,
        mem.overload,
        mem.emergency_stop,
        mem.individual_service_mode,
        mem.emergency_mode,
    ];
    if flags.iter().any(|&flag| flag > 1) {
        return false;
    }
    // An obstruction can only be seen while the doors are in motion.
    if mem.door_obstruction == 1 && !status.doors_in_motion() {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_resources::floor::Floor;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn test_record() -> SharedMemory {
        let name = format!(
            "saftest{}x{}",
            process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        );
        let shared = SharedMemory::create(&name).unwrap();
        {
            let mut mem = shared.lock().unwrap();
            mem.set_status(DoorStatus::Closed);
            mem.set_current_floor(Floor::parse("1").unwrap());
            mem.set_destination_floor(Floor::parse("1").unwrap());
        }
        shared.unlink();
        shared
    }

    #[test]
    fn obstruction_while_closing_reopens_the_doors() {
        let shared = test_record();
        let mut mem = shared.lock().unwrap();
        mem.set_status(DoorStatus::Closing);
        mem.door_obstruction = 1;
        run_checks(&mut mem);
        assert_eq!(mem.try_status(), Some(DoorStatus::Opening));
        assert_eq!(mem.emergency_mode, 0);
    }

    #[test]
    fn emergency_stop_latches_emergency_mode() {
        let shared = test_record();
        let mut mem = shared.lock().unwrap();
        mem.emergency_stop = 1;
        run_checks(&mut mem);
        assert_eq!(mem.emergency_mode, 1);
    }

    #[test]
    fn overload_latches_emergency_mode() {
        let shared = test_record();
        let mut mem = shared.lock().unwrap();
        mem.overload = 1;
        run_checks(&mut mem);
        assert_eq!(mem.emergency_mode, 1);
    }

    #[test]
    fn corrupt_flag_is_a_consistency_error() {
        let shared = test_record();
        let mut mem = shared.lock().unwrap();
        mem.open_button = 7;
        run_checks(&mut mem);
        assert_eq!(mem.emergency_mode, 1);
    }

    #[test]
    fn corrupt_floor_is_a_consistency_error() {
        let shared = test_record();
        let mut mem = shared.lock().unwrap();
        mem.current_floor = *b"B0\0\0";
        run_checks(&mut mem);
        assert_eq!(mem.emergency_mode, 1);
    }

    #[test]
    fn obstruction_with_open_doors_is_inconsistent() {
        let shared = test_record();
        let mut mem = shared.lock().unwrap();
        mem.set_status(DoorStatus::Open);
        mem.door_obstruction = 1;
        run_checks(&mut mem);
        assert_eq!(mem.emergency_mode, 1);
    }

    #[test]
    fn a_healthy_record_passes_untouched() {
        let shared = test_record();
        let mut mem = shared.lock().unwrap();
        run_checks(&mut mem);
        assert_eq!(mem.emergency_mode, 0);
        assert_eq!(mem.try_status(), Some(DoorStatus::Closed));
    }
}
