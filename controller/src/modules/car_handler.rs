/// ----- CAR HANDLER MODULE -----
/// One thread per connected car. Registers the car from its handshake,
/// then applies STATUS reports until the car leaves the fleet — by
/// announcing INDIVIDUAL SERVICE or EMERGENCY, by sending something
/// unparseable, or by dropping the connection. All exits take the same
/// removal path.

use std::net::TcpStream;
use std::sync::Arc;

use log::{debug, info, warn};

use shared_resources::connection;
use shared_resources::message::Message;
use shared_resources::shutdown;

use crate::utilities::fleet::Fleet;

pub fn main(mut stream: TcpStream, handshake: String, fleet: Arc<Fleet>) {
    let (name, lowest_floor, highest_floor) = match Message::parse(&handshake) {
        Some(Message::Car {
            name,
            lowest_floor,
            highest_floor,
        }) => (name, lowest_floor, highest_floor),
        _ => {
            debug!("malformed car handshake: {:?}", handshake);
            return;
        }
    };

    let writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(e) => {
            warn!("could not clone car socket: {}", e);
            return;
        }
    };
    let car = match fleet.register(name, lowest_floor, highest_floor, writer) {
        Some(car) => car,
        // Fleet is full: close without a reply.
        None => return,
    };

    while shutdown::keep_running() {
        let payload = match connection::receive_message(&mut stream) {
            Ok(payload) => payload,
            Err(e) => {
                if shutdown::was_interrupted(&e) {
                    shutdown::request_shutdown();
                } else {
                    debug!("car {} connection lost: {}", car.name, e);
                }
                break;
            }
        };
        match Message::parse(&payload) {
            Some(Message::Status {
                status,
                current_floor,
                destination_floor,
            }) => car.apply_status(status, current_floor, destination_floor),
            Some(Message::IndividualService) => {
                info!("car {} switched to individual service", car.name);
                break;
            }
            Some(Message::Emergency) => {
                info!("car {} reported an emergency", car.name);
                break;
            }
            _ => {
                warn!("unparseable message from car {}: {:?}", car.name, payload);
                break;
            }
        }
    }

    fleet.remove(&car);
}
