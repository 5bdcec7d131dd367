use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use log::warn;

use shared_resources::connection;
use shared_resources::shutdown;

use crate::utilities::fleet::Fleet;

pub mod modules;
pub mod utilities;

/// Accept loop. The first framed message decides what the peer is: a
/// car registering with the fleet or a transient call client. Anything
/// else is dropped without a reply.
pub fn run(listener: TcpListener, fleet: Arc<Fleet>) {
    while shutdown::keep_running() {
        let mut stream = match listener.accept() {
            Ok((stream, _)) => stream,
            Err(e) => {
                if shutdown::was_interrupted(&e) {
                    break;
                }
                warn!("accept failed: {}", e);
                continue;
            }
        };
        let first_message = match connection::receive_message(&mut stream) {
            Ok(payload) => payload,
            Err(e) => {
                if shutdown::was_interrupted(&e) {
                    break;
                }
                continue;
            }
        };

        if first_message.starts_with("CAR ") {
            let fleet = fleet.clone();
            thread::Builder::new()
                .name(String::from("car handler"))
                .spawn(move || modules::car_handler::main(stream, first_message, fleet))
                .ok();
        } else if first_message.starts_with("CALL ") {
            let fleet = fleet.clone();
            thread::Builder::new()
                .name(String::from("call handler"))
                .spawn(move || modules::call_handler::main(stream, first_message, fleet))
                .ok();
        }
    }
}
