use std::env;
use std::process;

use shared_resources::config::ControllerConfig;
use shared_resources::connection;
use shared_resources::floor::Floor;
use shared_resources::message::Message;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let (source, destination) = match args.as_slice() {
        [source, destination] => (source, destination),
        _ => {
            eprintln!("Usage: {{call}} {{source floor}} {{destination floor}}");
            process::exit(1);
        }
    };

    let (source, destination) = match (Floor::parse(source), Floor::parse(destination)) {
        (Some(source), Some(destination)) => (source, destination),
        _ => {
            println!("Invalid floor(s) specified.");
            return;
        }
    };
    if source == destination {
        println!("You are already on that floor!");
        return;
    }

    let endpoint = ControllerConfig::get().endpoint;
    let mut stream = match connection::connect(endpoint) {
        Ok(stream) => stream,
        Err(_) => {
            println!("Unable to connect to elevator system.");
            return;
        }
    };
    let request = Message::Call {
        source_floor: source,
        destination_floor: destination,
    };
    if connection::send_message(&mut stream, &request.as_string()).is_err() {
        println!("Unable to connect to elevator system.");
        return;
    }
    let reply = match connection::receive_message(&mut stream) {
        Ok(reply) => reply,
        Err(_) => {
            println!("Unable to connect to elevator system.");
            return;
        }
    };

    match Message::parse(&reply) {
        Some(Message::CarAssigned { name }) => println!("Car {} is arriving.", name),
        Some(Message::Unavailable) => {
            println!("Sorry, no car is available to take this request.")
        }
        _ => println!("Unexpected response from elevator system."),
    }
}
