/// ----- CALL HANDLER MODULE -----
/// One short-lived thread per call client. Validates the request,
/// selects a car and enqueues its stops, replies `CAR <name>` or
/// `UNAVAILABLE`, and closes the connection.

use std::net::TcpStream;
use std::sync::Arc;

use log::debug;

use shared_resources::connection;
use shared_resources::message::Message;

use crate::utilities::fleet::Fleet;

pub fn main(mut stream: TcpStream, request: String, fleet: Arc<Fleet>) {
    let reply = match Message::parse(&request) {
        Some(Message::Call {
            source_floor,
            destination_floor,
        }) => match fleet.assign_call(source_floor, destination_floor) {
            Some(name) => Message::CarAssigned { name },
            None => Message::Unavailable,
        },
        _ => {
            debug!("rejecting malformed call: {:?}", request);
            Message::Unavailable
        }
    };
    if let Err(e) = connection::send_message(&mut stream, &reply.as_string()) {
        debug!("could not answer call client: {}", e);
    }
}
