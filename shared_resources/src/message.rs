/// ----- MESSAGE MODULE -----
/// The payload grammar spoken between the controller, the cars and the
/// call clients. Payloads are space-separated ASCII; framing is handled
/// by the connection module.

use super::floor::Floor;
use super::status::DoorStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Car registration handshake: `CAR <name> <lowest> <highest>`.
    Car {
        name: String,
        lowest_floor: Floor,
        highest_floor: Floor,
    },
    /// Periodic car report: `STATUS <status> <current> <destination>`.
    Status {
        status: DoorStatus,
        current_floor: Floor,
        destination_floor: Floor,
    },
    /// Parting notice before a car leaves the fleet.
    IndividualService,
    Emergency,
    /// Controller directive to a car: `FLOOR <floor>`.
    Floor(Floor),
    /// Passenger request: `CALL <source> <destination>`.
    Call {
        source_floor: Floor,
        destination_floor: Floor,
    },
    /// Reply to a call client: `CAR <name>`.
    CarAssigned { name: String },
    Unavailable,
}

impl Message {
    pub fn parse(payload: &str) -> Option<Self> {
        if payload == "INDIVIDUAL SERVICE" {
            return Some(Message::IndividualService);
        }
        let fields: Vec<&str> = payload.split(' ').collect();
        match fields.as_slice() {
            ["CAR", name, lowest, highest] => Some(Message::Car {
                name: validate_name(name)?,
                lowest_floor: Floor::parse(lowest)?,
                highest_floor: Floor::parse(highest)?,
            }),
            ["STATUS", status, current, destination] => Some(Message::Status {
                status: DoorStatus::parse(status)?,
                current_floor: Floor::parse(current)?,
                destination_floor: Floor::parse(destination)?,
            }),
            ["EMERGENCY"] => Some(Message::Emergency),
            ["FLOOR", floor] => Some(Message::Floor(Floor::parse(floor)?)),
            ["CALL", source, destination] => Some(Message::Call {
                source_floor: Floor::parse(source)?,
                destination_floor: Floor::parse(destination)?,
            }),
            ["CAR", name] => Some(Message::CarAssigned {
                name: validate_name(name)?,
            }),
            ["UNAVAILABLE"] => Some(Message::Unavailable),
            _ => None,
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            Message::Car {
                name,
                lowest_floor,
                highest_floor,
            } => format!(
                "CAR {} {} {}",
                name,
                lowest_floor.as_string(),
                highest_floor.as_string()
            ),
            Message::Status {
                status,
                current_floor,
                destination_floor,
            } => format!(
                "STATUS {} {} {}",
                status.as_str(),
                current_floor.as_string(),
                destination_floor.as_string()
            ),
            Message::IndividualService => String::from("INDIVIDUAL SERVICE"),
            Message::Emergency => String::from("EMERGENCY"),
            Message::Floor(floor) => format!("FLOOR {}", floor.as_string()),
            Message::Call {
                source_floor,
                destination_floor,
            } => format!(
                "CALL {} {}",
                source_floor.as_string(),
                destination_floor.as_string()
            ),
            Message::CarAssigned { name } => format!("CAR {}", name),
            Message::Unavailable => String::from("UNAVAILABLE"),
        }
    }
}

fn validate_name(name: &str) -> Option<String> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(String::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(label: &str) -> Floor {
        Floor::parse(label).unwrap()
    }

    #[test]
    fn parse_formats_round_trip() {
        let payloads = [
            "CAR A B2 10",
            "STATUS Between 3 5",
            "INDIVIDUAL SERVICE",
            "EMERGENCY",
            "FLOOR B1",
            "CALL 1 999",
            "CAR A",
            "UNAVAILABLE",
        ];
        for payload in payloads {
            let message = Message::parse(payload).unwrap();
            assert_eq!(message.as_string(), payload, "payload {:?}", payload);
        }
    }

    #[test]
    fn car_handshake_fields() {
        assert_eq!(
            Message::parse("CAR A B2 3"),
            Some(Message::Car {
                name: String::from("A"),
                lowest_floor: floor("B2"),
                highest_floor: floor("3"),
            })
        );
    }

    #[test]
    fn car_with_one_field_is_an_assignment() {
        assert_eq!(
            Message::parse("CAR Alpha2"),
            Some(Message::CarAssigned {
                name: String::from("Alpha2")
            })
        );
    }

    #[test]
    fn rejects_malformed_payloads() {
        for payload in [
            "",
            "CAR",
            "CAR A B2",
            "CAR A B0 3",
            "STATUS Ajar 1 2",
            "STATUS Open 1",
            "FLOOR 0",
            "CALL 1",
            "call 1 2",
            "INDIVIDUAL  SERVICE",
        ] {
            assert_eq!(Message::parse(payload), None, "payload {:?}", payload);
        }
    }
}
