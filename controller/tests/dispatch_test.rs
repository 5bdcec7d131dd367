/// End-to-end exercises of the controller over real sockets: a fake
/// car and call clients speaking the framed protocol against the
/// accept loop.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use controller::utilities::fleet::Fleet;
use shared_resources::connection;

fn start_controller() -> SocketAddr {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let listener = connection::bind_listener(addr).unwrap();
    let endpoint = listener.local_addr().unwrap();
    let fleet = Arc::new(Fleet::new(10));
    thread::spawn(move || controller::run(listener, fleet));
    endpoint
}

fn send(stream: &mut TcpStream, payload: &str) {
    connection::send_message(stream, payload).unwrap();
}

fn receive(stream: &mut TcpStream) -> String {
    connection::receive_message(stream).unwrap()
}

/// One-shot call client round trip.
fn call(endpoint: SocketAddr, source: &str, destination: &str) -> String {
    let mut stream = TcpStream::connect(endpoint).unwrap();
    send(&mut stream, &format!("CALL {} {}", source, destination));
    receive(&mut stream)
}

/// Registration is asynchronous; retry a call until the expected reply
/// shows up.
fn call_until(endpoint: SocketAddr, source: &str, destination: &str, expected: &str) {
    for _ in 0..100 {
        if call(endpoint, source, destination) == expected {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("never saw {:?} for CALL {} {}", expected, source, destination);
}

fn register_car(endpoint: SocketAddr, handshake: &str, status: &str) -> TcpStream {
    let mut car = TcpStream::connect(endpoint).unwrap();
    send(&mut car, handshake);
    send(&mut car, status);
    car
}

#[test]
fn call_is_assigned_and_stops_are_dispatched_in_order() {
    let endpoint = start_controller();
    let mut car = register_car(endpoint, "CAR A 1 5", "STATUS Closed 1 1");

    call_until(endpoint, "2", "4", "CAR A");
    assert_eq!(receive(&mut car), "FLOOR 2");

    // Doors opening at the pickup: the stop is served and the next one
    // is dispatched.
    send(&mut car, "STATUS Opening 2 2");
    assert_eq!(receive(&mut car), "FLOOR 4");
}

#[test]
fn calls_outside_every_range_are_unavailable() {
    let endpoint = start_controller();
    let _car = register_car(endpoint, "CAR A 1 5", "STATUS Closed 1 1");
    call_until(endpoint, "1", "2", "CAR A");

    assert_eq!(call(endpoint, "B1", "B99"), "UNAVAILABLE");
    assert_eq!(call(endpoint, "1", "6"), "UNAVAILABLE");
}

#[test]
fn malformed_calls_are_unavailable() {
    let endpoint = start_controller();
    let mut stream = TcpStream::connect(endpoint).unwrap();
    send(&mut stream, "CALL up down");
    assert_eq!(receive(&mut stream), "UNAVAILABLE");
}

#[test]
fn the_closer_car_takes_the_call() {
    let endpoint = start_controller();
    let mut car_a = register_car(endpoint, "CAR A 1 5", "STATUS Closed 2 2");
    let _car_b = register_car(endpoint, "CAR B 1 9", "STATUS Closed 5 5");

    // A call only B can cover confirms B finished registering.
    call_until(endpoint, "6", "7", "CAR B");
    thread::sleep(Duration::from_millis(100));

    assert_eq!(call(endpoint, "2", "4"), "CAR A");
    assert_eq!(receive(&mut car_a), "FLOOR 2");
}

#[test]
fn an_emergency_notice_removes_the_car_from_service() {
    let endpoint = start_controller();
    let mut car = register_car(endpoint, "CAR A 1 5", "STATUS Closed 1 1");
    call_until(endpoint, "1", "2", "CAR A");
    assert_eq!(receive(&mut car), "FLOOR 1");

    send(&mut car, "EMERGENCY");
    for _ in 0..100 {
        if call(endpoint, "1", "2") == "UNAVAILABLE" {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("car was never removed from the fleet");
}
