use std::process;
use std::sync::Arc;

use log::info;

use shared_resources::config::ControllerConfig;
use shared_resources::connection;
use shared_resources::shutdown;

use controller::utilities::fleet::Fleet;

fn main() {
    env_logger::init();
    shutdown::install_handlers();

    let config = ControllerConfig::get();
    let fleet = Arc::new(Fleet::new(config.max_cars));

    let listener = match connection::bind_listener(config.endpoint) {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Unable to listen on {}: {}", config.endpoint, e);
            process::exit(1);
        }
    };
    info!("controller listening on {}", config.endpoint);

    controller::run(listener, fleet);
}
