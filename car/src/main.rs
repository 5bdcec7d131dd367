use std::env;
use std::process;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;

use shared_resources::config::ControllerConfig;
use shared_resources::shared_mem::SharedMemory;
use shared_resources::shutdown;
use shared_resources::status::DoorStatus;

use crate::utilities::settings::CarSettings;

pub mod modules;
pub mod utilities;

fn main() {
    env_logger::init();

    // READ ARGUMENTS
    let args: Vec<String> = env::args().skip(1).collect();
    let settings = match CarSettings::parse(&args) {
        Some(settings) => settings,
        None => {
            eprintln!("Usage: {{car}} {{name}} {{lowest floor}} {{highest floor}} {{delay}}");
            process::exit(1);
        }
    };

    shutdown::install_handlers();

    // CREATE THE SHARED RECORD
    let shared = match SharedMemory::create(&settings.name) {
        Ok(shared) => Arc::new(shared),
        Err(e) => {
            eprintln!("Failed to create shared memory for car {}: {}", settings.name, e);
            process::exit(1);
        }
    };
    match shared.lock() {
        Ok(mut mem) => {
            mem.set_current_floor(settings.lowest_floor);
            mem.set_destination_floor(settings.lowest_floor);
            mem.set_status(DoorStatus::Closed);
        }
        Err(e) => {
            eprintln!("Failed to initialise car {}: {}", settings.name, e);
            shared.unlink();
            process::exit(1);
        }
    }

    let endpoint = ControllerConfig::get().endpoint;
    let (directive_tx, directive_rx) = unbounded();

    // INITIALIZE THREAD FOR THE STATE MACHINE
    let driver_handle = {
        let shared = shared.clone();
        let (lowest, highest, delay) =
            (settings.lowest_floor, settings.highest_floor, settings.delay);
        thread::Builder::new()
            .name(String::from("driver"))
            .spawn(move || modules::driver::main(shared, lowest, highest, delay, directive_rx))
    };

    // INITIALIZE THREAD FOR THE CONTROLLER CONNECTION
    let network_handle = {
        let shared = shared.clone();
        let settings = settings.clone();
        thread::Builder::new()
            .name(String::from("companion"))
            .spawn(move || modules::network::main(shared, settings, endpoint, directive_tx))
    };

    if let Ok(handle) = driver_handle {
        handle.join().ok();
    }
    if let Ok(handle) = network_handle {
        handle.join().ok();
    }

    // The creating car is the only process that unlinks the record.
    shared.unlink();
}
