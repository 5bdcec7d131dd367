/// ----- NETWORK MODULE -----
/// The companion loop of a car. Keeps a connection to the controller
/// alive while the car is in normal operation: registers with a CAR
/// handshake, reports STATUS whenever the record changes (with a
/// heartbeat fallback of one delay period), and polls for FLOOR
/// directives. In individual service or emergency mode the car leaves
/// the fleet, sending one parting notice if the connection is still up.

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, tick, unbounded, Sender};
use log::{debug, warn};

use shared_resources::connection;
use shared_resources::floor::Floor;
use shared_resources::message::Message;
use shared_resources::shared_mem::{SharedMemory, StateSnapshot};
use shared_resources::shutdown;

use crate::utilities::settings::CarSettings;

pub fn main(
    shared: Arc<SharedMemory>,
    settings: CarSettings,
    endpoint: SocketAddr,
    directive_tx: Sender<Floor>,
) {
    let delay = settings.delay;
    let (snapshot_tx, snapshot_rx) = unbounded();
    spawn_state_watcher(shared.clone(), delay, snapshot_tx);
    let heartbeat = tick(delay);

    let mut stream: Option<TcpStream> = None;
    while shutdown::keep_running() {
        let parting_notice = match shared.lock() {
            Ok(mem) => {
                if mem.individual_service_mode == 1 {
                    Some(Message::IndividualService)
                } else if mem.emergency_mode == 1 {
                    Some(Message::Emergency)
                } else {
                    None
                }
            }
            Err(e) => {
                warn!("record mutex is unusable: {}", e);
                break;
            }
        };
        if let Some(notice) = parting_notice {
            if let Some(mut s) = stream.take() {
                let _ = connection::send_message(&mut s, &notice.as_string());
            }
            thread::sleep(delay);
            continue;
        }

        if stream.is_none() {
            match register(&shared, &settings, endpoint) {
                Some(s) => {
                    // Drop snapshots queued while we were offline.
                    while snapshot_rx.try_recv().is_ok() {}
                    stream = Some(s);
                }
                None => {
                    thread::sleep(delay);
                    continue;
                }
            }
        }
        let s = match stream.as_mut() {
            Some(s) => s,
            None => continue,
        };

        let report = select! {
            recv(snapshot_rx) -> snapshot => match snapshot {
                Ok(snapshot) => Some(snapshot),
                Err(_) => break,
            },
            recv(heartbeat) -> _ => current_snapshot(&shared),
        };
        let mut healthy = match report {
            Some(snapshot) => send_status(s, snapshot).is_ok(),
            None => true,
        };
        if healthy {
            healthy = poll_directive(s, &shared, &directive_tx);
        }
        if !healthy {
            debug!("lost contact with the controller, reconnecting");
            stream = None;
            thread::sleep(delay);
        }
    }
}

/// Forwards a fresh snapshot into the channel whenever a broadcast on
/// the record changes the reportable fields.
fn spawn_state_watcher(shared: Arc<SharedMemory>, delay: Duration, snapshot_tx: Sender<StateSnapshot>) {
    thread::Builder::new()
        .name(String::from("state watcher"))
        .spawn(move || {
            let mut last = None;
            while shutdown::keep_running() {
                let snapshot = match shared.lock() {
                    Ok(mut mem) => {
                        mem.timed_wait(delay);
                        mem.try_snapshot()
                    }
                    Err(_) => break,
                };
                if let Some(snapshot) = snapshot {
                    if last != Some(snapshot) {
                        last = Some(snapshot);
                        if snapshot_tx.send(snapshot).is_err() {
                            break;
                        }
                    }
                }
            }
        })
        .ok();
}

/// Connect and introduce the car: `CAR <name> <low> <high>` followed by
/// an initial STATUS report.
fn register(
    shared: &SharedMemory,
    settings: &CarSettings,
    endpoint: SocketAddr,
) -> Option<TcpStream> {
    let mut stream = match connection::connect(endpoint) {
        Ok(stream) => stream,
        Err(e) => {
            debug!("controller not reachable: {}", e);
            return None;
        }
    };
    let handshake = Message::Car {
        name: settings.name.clone(),
        lowest_floor: settings.lowest_floor,
        highest_floor: settings.highest_floor,
    };
    if connection::send_message(&mut stream, &handshake.as_string()).is_err() {
        return None;
    }
    let snapshot = current_snapshot(shared)?;
    if send_status(&mut stream, snapshot).is_err() {
        return None;
    }
    Some(stream)
}

fn current_snapshot(shared: &SharedMemory) -> Option<StateSnapshot> {
    match shared.lock() {
        Ok(mem) => mem.try_snapshot(),
        Err(_) => None,
    }
}

fn send_status(stream: &mut TcpStream, snapshot: StateSnapshot) -> std::io::Result<()> {
    let message = Message::Status {
        status: snapshot.status,
        current_floor: snapshot.current_floor,
        destination_floor: snapshot.destination_floor,
    };
    connection::send_message(stream, &message.as_string())
}

/// Non-blocking check for a FLOOR directive. Returns false when the
/// connection should be abandoned.
fn poll_directive(
    stream: &mut TcpStream,
    shared: &SharedMemory,
    directive_tx: &Sender<Floor>,
) -> bool {
    match connection::try_receive_message(stream) {
        Ok(Some(payload)) => {
            match Message::parse(&payload) {
                Some(Message::Floor(floor)) => {
                    if let Ok(mut mem) = shared.lock() {
                        mem.set_destination_floor(floor);
                        mem.broadcast();
                    }
                    directive_tx.send(floor).ok();
                }
                _ => warn!("unexpected message from controller: {:?}", payload),
            }
            true
        }
        Ok(None) => true,
        Err(e) => {
            if shutdown::was_interrupted(&e) {
                shutdown::request_shutdown();
            }
            false
        }
    }
}
